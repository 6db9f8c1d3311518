//! Photo upload pipeline: gate → sniff → resize → commit → persist.
//!
//! Stages run strictly in that order, cheapest first, so no CPU is spent resizing an
//! upload that a later, cheaper check would have rejected. Any failure removes every
//! file the run created before the error is returned.

use image::ImageFormat;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::StorageConfig;
use crate::error::PipelineError;
use crate::models::photo::StoredPhoto;
use crate::services::derivatives::{remove_files, DerivativeGenerator};
use crate::services::photo_store::PhotoStore;
use crate::services::sniffer::{ContentSniffer, MagicSniffer, Sniffed};
use crate::services::source::UploadSource;
use crate::services::upload_gate::{StagedUpload, UploadGate};

/// Where a run stands. A failed run reports the last stage it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    GateChecked,
    Sniffed,
    DerivativesBuilt,
    Persisted,
}

pub struct PhotoPipeline {
    config: Arc<StorageConfig>,
    gate: UploadGate,
    sniffer: Arc<dyn ContentSniffer>,
    derivatives: DerivativeGenerator,
    store: Arc<dyn PhotoStore>,
}

impl PhotoPipeline {
    pub fn new(config: StorageConfig, store: Arc<dyn PhotoStore>) -> Self {
        let config = Arc::new(config);
        Self {
            gate: UploadGate::new(Arc::clone(&config)),
            derivatives: DerivativeGenerator::new(Arc::clone(&config)),
            sniffer: Arc::new(MagicSniffer),
            store,
            config,
        }
    }

    pub fn with_sniffer(mut self, sniffer: Arc<dyn ContentSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Run one upload for `article_id` to completion.
    pub async fn run<S: UploadSource>(
        &self,
        article_id: i32,
        source: &mut S,
    ) -> Result<StoredPhoto, PipelineError> {
        let start = Instant::now();
        let mut stage = Stage::Received;

        match self.advance(article_id, source, &mut stage).await {
            Ok(photo) => {
                tracing::info!(
                    article_id,
                    photo_id = photo.photo_id,
                    filename = %photo.image_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Photo upload stored"
                );
                Ok(photo)
            }
            Err(err) => {
                tracing::warn!(
                    article_id,
                    stage = ?stage,
                    code = err.code(),
                    error = %err,
                    "Photo upload rejected"
                );
                Err(err)
            }
        }
    }

    async fn advance<S: UploadSource>(
        &self,
        article_id: i32,
        source: &mut S,
        stage: &mut Stage,
    ) -> Result<StoredPhoto, PipelineError> {
        let staged = self.gate.accept(source).await?;
        *stage = Stage::GateChecked;
        tracing::debug!(
            article_id,
            original_name = %staged.original_name(),
            filename = %staged.filename(),
            size_bytes = staged.size(),
            "Upload passed the gate"
        );

        let format = self.sniff(&staged).await?;
        *stage = Stage::Sniffed;

        let filename = staged.filename().to_string();
        let mut files = self
            .derivatives
            .build_all(staged.path(), &filename, format)
            .await?;
        *stage = Stage::DerivativesBuilt;

        let original = self.config.root.join(&filename);
        if let Err(e) = commit(staged, original.clone()).await {
            remove_files(&files).await;
            return Err(e.into());
        }
        files.push(original);

        match self.store.store(article_id, &filename).await {
            Ok(photo) => {
                *stage = Stage::Persisted;
                Ok(photo)
            }
            Err(e) => {
                // Nothing references these files, so a retry starts from a clean slate.
                remove_files(&files).await;
                Err(e.into())
            }
        }
    }

    async fn sniff(&self, staged: &StagedUpload) -> Result<ImageFormat, PipelineError> {
        let sniffer = Arc::clone(&self.sniffer);
        let path = staged.path().to_path_buf();
        let sniffed = tokio::task::spawn_blocking(move || sniffer.sniff(&path))
            .await
            .map_err(std::io::Error::other)??;

        let mime = match sniffed {
            Sniffed::Undetectable => return Err(PipelineError::Undetectable),
            Sniffed::Detected(mime) => mime,
        };

        match ImageFormat::from_mime_type(&mime) {
            Some(format) if self.config.accepts_type(&mime) => Ok(format),
            _ => Err(PipelineError::BadRealType { mime }),
        }
    }
}

async fn commit(staged: StagedUpload, dest: PathBuf) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || staged.commit(&dest))
        .await
        .map_err(std::io::Error::other)?
}
