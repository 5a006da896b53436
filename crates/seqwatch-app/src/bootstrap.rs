use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use seqwatch_config::defaults::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use seqwatch_config::{LogFormatSetting, WatcherConfig, load_from_path};
use seqwatch_ingest::IngestDispatcher;
use seqwatch_launch::PipelineLauncher;
use seqwatch_telemetry::{
    ActivityJournal, GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging,
};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::watcher::PollLoop;

/// Dependencies required to bootstrap the watcher.
pub(crate) struct BootstrapDependencies {
    config: Arc<WatcherConfig>,
    journal: ActivityJournal,
    metrics: Metrics,
    dispatcher: IngestDispatcher,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let path = config_path(std::env::var_os(CONFIG_PATH_ENV));
        Self::from_config_path(&path)
    }

    pub(crate) fn from_config_path(path: &Path) -> AppResult<Self> {
        let config = load_from_path(path).map_err(|err| AppError::config("config.load", err))?;
        Self::from_config(config)
    }

    /// Wire the journal, metrics, launcher and dispatcher around a loaded configuration.
    pub(crate) fn from_config(config: WatcherConfig) -> AppResult<Self> {
        let config = Arc::new(config);
        let journal = ActivityJournal::new(config.journal_path());
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let launcher = Arc::new(PipelineLauncher::new(
            Arc::clone(&config),
            journal.clone(),
            metrics.clone(),
        ));
        let dispatcher =
            IngestDispatcher::new(Arc::clone(&config), launcher, journal.clone(), metrics.clone());
        Ok(Self {
            config,
            journal,
            metrics,
            dispatcher,
        })
    }

    pub(crate) fn into_poll_loop(self, interval: Duration) -> PollLoop {
        let metrics_file = self.config.metrics_file.clone();
        PollLoop::new(self.dispatcher, self.journal, self.metrics, interval)
            .with_metrics_file(metrics_file)
    }
}

/// Entry point for the watcher boot sequence.
///
/// # Errors
///
/// Returns an error if configuration loading, telemetry setup or the poll
/// loop fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let config = Arc::clone(&dependencies.config);
    let logging = LoggingConfig {
        level: &config.logging.level,
        format: log_format(config.logging.format),
        ..LoggingConfig::default()
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("watch");

    info!(
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        pipelines = config.pipelines.len(),
        "Seqwatch bootstrap starting"
    );

    let poll = dependencies.into_poll_loop(config.poll_interval);
    poll.run(shutdown_signal()).await?;
    info!("Seqwatch shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}

fn config_path(value: Option<OsString>) -> PathBuf {
    value
        .filter(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

const fn log_format(setting: Option<LogFormatSetting>) -> LogFormat {
    match setting {
        Some(LogFormatSetting::Json) => LogFormat::Json,
        Some(LogFormatSetting::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    }
}
