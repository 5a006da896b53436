//! Poll loop.
//!
//! # Design
//! - State is primed once before the first sleep; files already present at
//!   startup are never processed.
//! - Shutdown is observed only while sleeping, so a tick is never interrupted.
//! - Only an unreadable watched directory ends the loop with an error.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use seqwatch_ingest::IngestDispatcher;
use seqwatch_telemetry::{ActivityJournal, Metrics};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

/// Drives an [`IngestDispatcher`] at a fixed interval.
pub struct PollLoop {
    dispatcher: IngestDispatcher,
    journal: ActivityJournal,
    metrics: Metrics,
    interval: Duration,
    metrics_file: Option<PathBuf>,
}

impl PollLoop {
    /// Loop ticking `dispatcher` every `interval`.
    #[must_use]
    pub const fn new(
        dispatcher: IngestDispatcher,
        journal: ActivityJournal,
        metrics: Metrics,
        interval: Duration,
    ) -> Self {
        Self {
            dispatcher,
            journal,
            metrics,
            interval,
            metrics_file: None,
        }
    }

    /// Rewrite `path` with the metrics exposition after every tick.
    #[must_use]
    pub fn with_metrics_file(mut self, path: Option<PathBuf>) -> Self {
        self.metrics_file = path;
        self
    }

    /// Poll until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the startup journal line cannot be written or the
    /// watched directory becomes unreadable.
    pub async fn run<F>(&self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut state = self
            .dispatcher
            .prime()
            .map_err(|err| AppError::ingest("watch.prime", err))?;
        self.journal
            .append("Watching started")
            .map_err(|err| AppError::telemetry("telemetry.journal", err))?;
        info!(
            seen = state.previous().len(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "watching started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                () = tokio::time::sleep(self.interval) => {}
            }

            match self.dispatcher.tick(&mut state) {
                Ok(report) => {
                    if !report.is_idle() {
                        info!(
                            new_files = report.new_files.len(),
                            runs = report.runs.len(),
                            failures = report.failures.len(),
                            "tick processed new files"
                        );
                    }
                }
                Err(err) => {
                    error!(error = %err, "watched directory unreadable; stopping");
                    self.journal
                        .note(format!("Watching stopped: {}", err.detail()));
                    self.export_metrics();
                    return Err(AppError::ingest("watch.tick", err));
                }
            }
            self.export_metrics();
        }

        match serde_json::to_string(&self.metrics.snapshot()) {
            Ok(summary) => info!(metrics = %summary, "watcher stopped"),
            Err(err) => warn!(error = %err, "failed to summarise metrics"),
        }
        self.journal.note("Watching stopped");
        Ok(())
    }

    fn export_metrics(&self) {
        if let Some(path) = &self.metrics_file {
            if let Err(err) = self.metrics.write_textfile(path) {
                warn!(error = %err, path = %path.display(), "failed to write metrics textfile");
            }
        }
    }
}
