//! Default values and derived layout names for watcher configuration.
//!
//! # Design
//! - Keep filesystem layout names in one place so the dispatcher and
//!   launcher agree on where runs, errors and logs live.

/// Seconds between directory polls when `poll_interval_secs` is omitted.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
/// Log level used when the `logging.level` key is omitted.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Directory under `output_dir` holding per-run input directories.
pub const PROCESSED_DIR_NAME: &str = "processed";
/// Directory under the processed root holding quarantined files.
pub const ERROR_DIR_NAME: &str = "error";
/// Directory under `output_dir` used as the working directory for launches.
pub const RUN_LOCATION_DIR_NAME: &str = "run_location";
/// Append-only activity journal file name under `log_dir`.
pub const JOURNAL_FILE_NAME: &str = "service.log";
/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SEQWATCH_CONFIG";
/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
