use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::Rng;
use futures::stream::{BoxStream, StreamExt};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;

use crate::config::StorageConfig;
use crate::error::PipelineError;
use crate::services::source::UploadSource;
use crate::utils::naming;

pub const MAX_FILES_PER_REQUEST: usize = 1;

const NAME_ATTEMPTS: usize = 5;

/// Raw upload bytes in the staging directory. The file is deleted when this value is
/// dropped unless [`StagedUpload::commit`] moved it first.
#[derive(Debug)]
pub struct StagedUpload {
    filename: String,
    original_name: String,
    size: u64,
    path: TempPath,
}

impl StagedUpload {
    /// Generated name the photo will be stored under.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged bytes to `dest`. Fails instead of replacing an existing file.
    pub fn commit(self, dest: &Path) -> io::Result<()> {
        self.path.persist_noclobber(dest).map_err(|e| e.error)
    }
}

/// Structural checks on an upload plus staging of its bytes. Never looks at content.
pub struct UploadGate {
    config: Arc<StorageConfig>,
}

impl UploadGate {
    pub fn new(config: Arc<StorageConfig>) -> Self {
        Self { config }
    }

    pub fn check_extension(&self, filename: &str) -> Result<(), PipelineError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension {
            Some(ext) if self.config.allowed_extensions.contains(&ext) => Ok(()),
            _ => Err(PipelineError::BadExtension {
                filename: filename.to_string(),
            }),
        }
    }

    pub fn check_declared_type(&self, mime: &str) -> Result<(), PipelineError> {
        if self.config.accepts_type(mime) {
            Ok(())
        } else {
            Err(PipelineError::BadDeclaredType {
                mime: mime.to_string(),
            })
        }
    }

    /// Read the request's parts, enforce the one-file contract and the filters, and
    /// stage the single accepted file.
    pub async fn accept<S: UploadSource>(&self, source: &mut S) -> Result<StagedUpload, PipelineError> {
        let mut staged: Option<StagedUpload> = None;

        while let Some(part) = source.next_part().await? {
            let Some(file_name) = part.file_name else {
                continue;
            };

            // Dropping `staged` on this path removes the first file again.
            if staged.is_some() {
                return Err(PipelineError::TooManyFiles);
            }

            self.check_extension(&file_name)?;
            self.check_declared_type(&part.content_type)?;

            staged = Some(self.stage(file_name, part.body).await?);
        }

        staged.ok_or(PipelineError::NoFile)
    }

    async fn stage(
        &self,
        original_name: String,
        mut body: BoxStream<'_, io::Result<Bytes>>,
    ) -> Result<StagedUpload, PipelineError> {
        tokio::fs::create_dir_all(&self.config.staging_dir).await?;
        let config = Arc::clone(&self.config);
        let requested = original_name.clone();
        let (filename, temp) = tokio::task::spawn_blocking(move || {
            reserve(&config, &requested, Utc::now(), &mut rand::thread_rng())
        })
        .await
        .map_err(io::Error::other)??;
        let (file, path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut size: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| match e.kind() {
                io::ErrorKind::FileTooLarge => PipelineError::FileTooLarge {
                    max_bytes: self.config.max_bytes,
                },
                _ => PipelineError::Transport(e),
            })?;
            size += chunk.len() as u64;
            if size > self.config.max_bytes {
                tracing::debug!(
                    original_name = %original_name,
                    max_bytes = self.config.max_bytes,
                    "Upload exceeded size limit while streaming"
                );
                return Err(PipelineError::FileTooLarge {
                    max_bytes: self.config.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.sync_all().await?;

        tracing::debug!(
            original_name = %original_name,
            filename = %filename,
            size_bytes = size,
            "Upload staged"
        );

        Ok(StagedUpload {
            filename,
            original_name,
            size,
            path,
        })
    }
}

// Draws names until one is free in the storage root, then creates the staging file.
fn reserve<R: Rng + ?Sized>(
    config: &StorageConfig,
    original_name: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> io::Result<(String, NamedTempFile)> {
    for _ in 0..NAME_ATTEMPTS {
        let name = naming::generate_name(original_name, now, rng);
        if config.root.join(&name).try_exists()? {
            tracing::warn!(filename = %name, "Generated photo name already taken, drawing again");
            continue;
        }

        let temp = tempfile::Builder::new()
            .prefix(&format!("{name}."))
            .suffix(".part")
            .tempfile_in(&config.staging_dir)?;
        return Ok((name, temp));
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free photo name after several attempts",
    ))
}
