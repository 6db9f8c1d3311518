use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Removes staging files left behind by runs that never finished, e.g. after a crash.
/// Live runs clean up after themselves; only files older than `max_age` are touched.
pub struct StagingSweeper {
    staging_dir: PathBuf,
    max_age: Duration,
}

impl StagingSweeper {
    pub fn new(staging_dir: PathBuf, max_age: Duration) -> Self {
        Self {
            staging_dir,
            max_age,
        }
    }

    pub async fn run_scheduler(self, every: Duration) {
        tracing::info!(dir = %self.staging_dir.display(), "Staging sweeper started");
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Removed stale staging files"),
                Err(e) => tracing::error!(error = %e, "Staging sweep failed"),
            }
        }
    }

    /// Returns how many files were removed.
    pub async fn sweep_once(&self) -> io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("part") {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let age = now
                .duration_since(metadata.modified()?)
                .unwrap_or(Duration::ZERO);
            if age < self.max_age {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Removed stale staging file");
                    removed += 1;
                }
                // A finishing run may have just moved or dropped it.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }
}
