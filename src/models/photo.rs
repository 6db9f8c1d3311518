use serde::{Deserialize, Serialize};

use crate::entities::photo;

/// Descriptor returned once a photo and all of its derivatives are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoredPhoto {
    pub photo_id: i32,
    pub article_id: i32,
    /// Generated filename shared by the original and every derivative.
    pub image_path: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<photo::Model> for StoredPhoto {
    fn from(model: photo::Model) -> Self {
        Self {
            photo_id: model.photo_id,
            article_id: model.article_id,
            image_path: model.image_path,
            created_at: model.created_at,
        }
    }
}
