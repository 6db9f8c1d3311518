use image::{DynamicImage, ImageFormat};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::StorageConfig;
use crate::models::settings::ResizeProfile;
use crate::utils::image_processor;

#[derive(Debug, thiserror::Error)]
pub enum DerivativeError {
    #[error("failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode `{profile}` image: {source}")]
    Encode {
        profile: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write `{profile}` image: {source}")]
    Write {
        profile: String,
        #[source]
        source: io::Error,
    },

    #[error("resize task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Writes one resized copy of an upload per configured profile.
pub struct DerivativeGenerator {
    config: Arc<StorageConfig>,
}

impl DerivativeGenerator {
    pub fn new(config: Arc<StorageConfig>) -> Self {
        Self { config }
    }

    pub fn destination(&self, profile: &ResizeProfile, filename: &str) -> PathBuf {
        self.config.root.join(&profile.directory).join(filename)
    }

    /// Build every derivative of `source`. Either all of them exist afterwards, or none
    /// written by this call do.
    pub async fn build_all(
        &self,
        source: &Path,
        filename: &str,
        format: ImageFormat,
    ) -> Result<Vec<PathBuf>, DerivativeError> {
        let source = source.to_path_buf();
        let img = tokio::task::spawn_blocking(move || image_processor::load_image(&source))
            .await?
            .map_err(DerivativeError::Decode)?;
        let img = Arc::new(img);

        let tasks = self.config.profiles.iter().map(|profile| {
            let img = Arc::clone(&img);
            let profile = profile.clone();
            let dest = self.destination(&profile, filename);
            tokio::task::spawn_blocking(move || write_derivative(&img, &profile, &dest, format))
        });

        // Wait for every profile before deciding, so cleanup never races a running write.
        let results = futures::future::join_all(tasks).await;

        let mut written = Vec::with_capacity(results.len());
        let mut failure = None;
        for result in results {
            match result {
                Ok(Ok(path)) => written.push(path),
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(DerivativeError::Join(e));
                }
            }
        }

        if let Some(err) = failure {
            remove_files(&written).await;
            return Err(err);
        }

        Ok(written)
    }
}

fn write_derivative(
    img: &DynamicImage,
    profile: &ResizeProfile,
    dest: &Path,
    format: ImageFormat,
) -> Result<PathBuf, DerivativeError> {
    let start = Instant::now();
    let resized = image_processor::resize_for_profile(img, profile);
    let bytes = image_processor::encode(resized, format).map_err(|source| DerivativeError::Encode {
        profile: profile.name.clone(),
        source,
    })?;

    write_atomically(dest, &bytes).map_err(|source| DerivativeError::Write {
        profile: profile.name.clone(),
        source,
    })?;

    tracing::debug!(
        profile = %profile.name,
        path = %dest.display(),
        size_bytes = bytes.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Derivative written"
    );

    Ok(dest.to_path_buf())
}

// A reader either sees the complete file under `dest` or nothing at all.
fn write_atomically(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist_noclobber(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Best-effort removal; files that are already gone are fine.
pub async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to remove photo file");
            }
        }
    }
}
