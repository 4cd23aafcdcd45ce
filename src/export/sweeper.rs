// ExportSweeper: periodically deletes export artifacts older than the configured age.
// Leftover temporary files from interrupted writes are removed on the same schedule.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::fs;
use tokio::io;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{PARTIAL_PREFIX, parse_token};
use crate::observability::Metrics;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct ExportSweeper {
    directory: PathBuf,
    max_age: Duration,
    interval: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl ExportSweeper {
    /// `max_age` is the artifact lifetime, `interval` the sweep period.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            directory: directory.into(),
            max_age,
            interval,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn the periodic sweep. Cancel `cancel_token` to stop it.
    #[must_use]
    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel_token).await })
    }

    async fn run(self, cancel_token: CancellationToken) {
        info!(
            directory = %self.directory.display(),
            max_age_secs = self.max_age.as_secs(),
            interval_secs = self.interval.as_secs(),
            "ExportSweeper started"
        );

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("ExportSweeper received shutdown signal, stopping");
                    break;
                }
                () = sleep(self.interval) => {
                    // 失敗しても次の周期で再試行する
                    if let Err(e) = self.sweep_once().await {
                        error!("export sweep error: {e}");
                    }
                }
            }
        }

        info!("ExportSweeper shutdown complete");
    }

    /// Deletes every artifact whose modification time is at least `max_age`
    /// in the past. Per-file failures are logged and counted, not returned.
    ///
    /// # Errors
    /// Returns an error only if the directory itself cannot be listed.
    pub async fn sweep_once(&self) -> io::Result<SweepReport> {
        let mut dir = fs::read_dir(&self.directory).await?;
        let mut report = SweepReport::default();
        let now = SystemTime::now();

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if parse_token(name).is_err() && !name.starts_with(PARTIAL_PREFIX) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(file = name, "failed to stat export artifact: {e}");
                    report.failed += 1;
                    continue;
                }
            };
            report.scanned += 1;

            let age = match metadata.modified() {
                Ok(modified) => now.duration_since(modified).unwrap_or_default(),
                Err(e) => {
                    warn!(file = name, "failed to read artifact mtime: {e}");
                    report.failed += 1;
                    continue;
                }
            };
            if age < self.max_age {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    info!(file = name, age_secs = age.as_secs(), "removed expired export artifact");
                    report.removed += 1;
                }
                // 取得や別の掃除と競合した場合
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    error!(file = name, "failed to remove export artifact: {e}");
                    report.failed += 1;
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            #[allow(clippy::cast_precision_loss)]
            let removed = report.removed as f64;
            metrics.exports_swept.inc_by(removed);
        }
        if report.removed > 0 || report.failed > 0 {
            info!(
                scanned = report.scanned,
                removed = report.removed,
                failed = report.failed,
                "export sweep finished"
            );
        }
        Ok(report)
    }
}
