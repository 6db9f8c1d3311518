use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use crate::entities::{article, photo};
use crate::models::photo::StoredPhoto;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Article {0} not found")]
    ArticleNotFound(i32),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Records that `filename` is a photo of `article_id`. Not idempotent: each call
/// creates a new record.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn store(&self, article_id: i32, filename: &str) -> Result<StoredPhoto, StoreError>;
}

pub struct SeaOrmPhotoStore {
    db: DatabaseConnection,
}

impl SeaOrmPhotoStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PhotoStore for SeaOrmPhotoStore {
    async fn store(&self, article_id: i32, filename: &str) -> Result<StoredPhoto, StoreError> {
        article::Entity::find_by_id(article_id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::ArticleNotFound(article_id))?;

        let photo = photo::ActiveModel {
            article_id: Set(article_id),
            image_path: Set(filename.to_string()),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        let saved = photo.insert(&self.db).await?;
        Ok(saved.into())
    }
}
