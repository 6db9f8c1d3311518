use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    response::Json,
};
use futures::{StreamExt, TryStreamExt};
use std::io;

use super::AppState;
use crate::error::{AppError, PipelineError};
use crate::models::photo::StoredPhoto;
use crate::services::source::{IncomingPart, UploadSource};

/// Feeds the pipeline straight from a multipart body, one field at a time.
pub struct MultipartSource {
    multipart: Multipart,
    max_bytes: u64,
}

impl MultipartSource {
    pub fn new(multipart: Multipart, max_bytes: u64) -> Self {
        Self {
            multipart,
            max_bytes,
        }
    }
}

fn transport_error(err: MultipartError, max_bytes: u64) -> PipelineError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::FileTooLarge { max_bytes }
    } else {
        PipelineError::Transport(io::Error::other(err))
    }
}

// The body limit can trip mid-field; keep that distinguishable from a broken stream.
fn body_error(err: MultipartError) -> io::Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        io::Error::new(io::ErrorKind::FileTooLarge, err)
    } else {
        io::Error::other(err)
    }
}

impl UploadSource for MultipartSource {
    async fn next_part(&mut self) -> Result<Option<IncomingPart<'_>>, PipelineError> {
        let max_bytes = self.max_bytes;
        let field = match self.multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(transport_error(e, max_bytes)),
        };

        Ok(Some(IncomingPart {
            file_name: field.file_name().map(str::to_string),
            content_type: field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
            body: field.map_err(body_error).boxed(),
        }))
    }
}

fn parse_article_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid article id: {raw}")))
}

#[utoipa::path(
    post,
    path = "/api/article/{id}/uploadPhoto",
    tag = "Photos",
    params(
        ("id" = i32, Path, description = "Article the photo belongs to")
    ),
    request_body(
        content = Vec<u8>,
        content_type = "multipart/form-data",
        description = "Form with exactly one file part, conventionally named `photo` (JPEG or PNG). \
                       The first part carrying a filename is taken whatever its field name; plain fields are ignored."
    ),
    responses(
        (status = 200, description = "Photo and resized copies stored", body = StoredPhoto),
        (status = 400, description = "Missing file, extra file, bad extension or declared type", body = crate::error::ApiResponse),
        (status = 404, description = "Article not found", body = crate::error::ApiResponse),
        (status = 413, description = "File too large", body = crate::error::ApiResponse),
        (status = 415, description = "Content is not an accepted image type", body = crate::error::ApiResponse),
        (status = 500, description = "Resize or storage failure", body = crate::error::ApiResponse)
    )
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StoredPhoto>, AppError> {
    let article_id = parse_article_id(&id)?;
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut source = MultipartSource::new(multipart, state.pipeline.config().max_bytes);
    let photo = state.pipeline.run(article_id, &mut source).await?;

    Ok(Json(photo))
}
