use crate::services::storage::is_temp_upload_name;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

/// Counters for one pass over the storage directory
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Periodically deletes stored files older than the retention period.
///
/// Every error is handled locally: a failed listing counts as an empty
/// directory, a failed stat or delete skips that one entry. The sweeper never
/// stops on its own; it exits when the shutdown channel flips.
pub struct RetentionSweeper {
    storage_dir: PathBuf,
    retention: Duration,
    sweep_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl RetentionSweeper {
    pub fn new(
        storage_dir: impl Into<PathBuf>,
        retention: Duration,
        sweep_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            retention,
            sweep_interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            target: "retention",
            dir = %self.storage_dir.display(),
            retention_secs = self.retention.as_secs(),
            interval_secs = self.sweep_interval.as_secs(),
            "🚀 Retention sweeper started"
        );

        // First tick fires immediately, so a cycle runs at startup.
        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!(target: "retention", "🛑 Retention sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    sweep_directory(&self.storage_dir, self.retention, SystemTime::now()).await;
                }
            }
        }
    }
}

/// Runs one sweep cycle over `dir`, removing entries last modified more than
/// `retention` before `now`.
pub async fn sweep_directory(dir: &Path, retention: Duration, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(target: "retention", dir = %dir.display(), %err, "failed to list storage directory");
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(target: "retention", %err, "directory listing interrupted");
                break;
            }
        };
        report.scanned += 1;

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::debug!(target: "retention", path = %path.display(), %err, "skipping entry without metadata");
                continue;
            }
        };

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(err) => {
                tracing::debug!(target: "retention", path = %path.display(), %err, "skipping entry without mtime");
                continue;
            }
        };

        if !is_expired(modified, now, retention) {
            continue;
        }

        let removal = if metadata.is_dir() {
            tokio::fs::remove_dir(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        let name = entry.file_name();
        let name = name.to_string_lossy();
        match removal {
            Ok(()) => {
                report.removed += 1;
                tracing::info!(
                    target: "retention",
                    file = %name,
                    stale_upload = is_temp_upload_name(&name),
                    "🗑️ Removed expired file"
                );
            }
            Err(err) => {
                report.failed += 1;
                tracing::warn!(target: "retention", file = %name, %err, "failed to remove expired file");
            }
        }
    }

    if report.failed > 0 {
        tracing::warn!(
            target: "retention",
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "sweep cycle finished with failures"
        );
    } else if report.removed > 0 {
        tracing::info!(
            target: "retention",
            scanned = report.scanned,
            removed = report.removed,
            "✅ Sweep cycle completed"
        );
    } else {
        tracing::debug!(target: "retention", scanned = report.scanned, "nothing to sweep");
    }

    report
}

/// Strictly older than `retention`. Timestamps in the future never expire.
pub fn is_expired(modified: SystemTime, now: SystemTime, retention: Duration) -> bool {
    now.duration_since(modified)
        .map(|age| age > retention)
        .unwrap_or(false)
}
