//! Typed watcher and pipeline configuration models.
//!
//! # Design
//! - Pure data carriers produced once by the loader; optional settings are
//!   `Option`s so consumers never probe ad hoc keys.
//! - Layout paths under `output_dir`/`log_dir` are derived here so every
//!   component resolves them the same way.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::defaults::{
    ERROR_DIR_NAME, JOURNAL_FILE_NAME, PROCESSED_DIR_NAME, RUN_LOCATION_DIR_NAME,
};

/// Fully validated watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Pipeline runtime executable invoked for every launch.
    pub nextflow_path: PathBuf,
    /// Directory polled for newly arrived data files.
    pub input_dir: PathBuf,
    /// Root under which processed runs, outputs and the run location live.
    pub output_dir: PathBuf,
    /// Directory receiving per-run logs and the activity journal.
    pub log_dir: PathBuf,
    /// Monitoring endpoint passed to pipelines that enable it.
    pub tower_address: Option<String>,
    /// Delay between directory polls.
    pub poll_interval: Duration,
    /// Diagnostic logging settings.
    pub logging: LoggingSettings,
    /// Optional Prometheus textfile rewritten after each tick.
    pub metrics_file: Option<PathBuf>,
    /// Routable pipelines in configuration order.
    pub pipelines: Vec<PipelineSpec>,
}

impl WatcherConfig {
    /// Root of the per-run input directories.
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.output_dir.join(PROCESSED_DIR_NAME)
    }

    /// Holding area for files that could not be classified.
    #[must_use]
    pub fn error_dir(&self) -> PathBuf {
        self.processed_dir().join(ERROR_DIR_NAME)
    }

    /// Working directory for launched processes.
    #[must_use]
    pub fn run_location(&self) -> PathBuf {
        self.output_dir.join(RUN_LOCATION_DIR_NAME)
    }

    /// Append-only activity journal.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.log_dir.join(JOURNAL_FILE_NAME)
    }

    /// Output location handed to the pipeline for the given run.
    #[must_use]
    pub fn output_path_for(&self, run_id: &str) -> PathBuf {
        self.output_dir.join(run_id)
    }

    /// Look up the pipeline routed by `prefix`, ignoring case.
    ///
    /// When several pipelines share a prefix the first configured one wins.
    #[must_use]
    pub fn find_pipeline(&self, prefix: &str) -> Option<&PipelineSpec> {
        let wanted = prefix.to_lowercase();
        self.pipelines
            .iter()
            .find(|pipeline| pipeline.prefix == wanted)
    }
}

/// Declarative description of one routable pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    /// Lowercased routing prefix.
    pub prefix: String,
    /// Run-command tokens passed after `run` (pipeline name and fixed options).
    pub run_command: Vec<String>,
    /// Runtime version override exported as `NXF_VER`.
    pub version: Option<String>,
    /// Execution profile passed with `-profile`.
    pub profile: Option<String>,
    /// External config file passed with `-config`.
    pub config: Option<String>,
    /// Whether the monitoring endpoint is attached with `-with-tower`.
    pub with_tower: bool,
    /// Flattened `--key value` parameters in configuration order.
    pub params: Vec<PipelineParam>,
    /// Name of the pipeline parameter receiving the input path.
    pub input_parameter: Option<String>,
    /// Whether the input parameter is the run directory or a file inside it.
    pub input_type: InputType,
    /// Name of the pipeline parameter receiving the output path.
    pub output_parameter: Option<String>,
    /// Policy for the `--filetype` parameter.
    pub filetype: Option<FiletypePolicy>,
    /// Fold same-prefix files arriving together into one run.
    pub multiple_inputs: bool,
}

/// One `--name value` pipeline parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineParam {
    /// Parameter name without leading dashes.
    pub name: String,
    /// Rendered parameter value.
    pub value: String,
}

/// Shape of the value passed through the input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    /// The run directory itself.
    Directory,
    /// The first file found inside the run directory.
    #[default]
    File,
}

impl InputType {
    /// Parse the configured `input_type`; anything other than `directory` is file-like.
    #[must_use]
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some(value) if value.eq_ignore_ascii_case("directory") => Self::Directory,
            _ => Self::File,
        }
    }
}

/// Source of the `--filetype` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiletypePolicy {
    /// Derive the type from the first input file's extension.
    Find,
    /// Always pass this value.
    Fixed(String),
}

impl FiletypePolicy {
    /// Keyword selecting the derived policy.
    pub const FIND_KEYWORD: &'static str = "find";

    /// Map a normalised configuration value onto a policy.
    #[must_use]
    pub fn from_setting(value: String) -> Self {
        if value == Self::FIND_KEYWORD {
            Self::Find
        } else {
            Self::Fixed(value)
        }
    }
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Explicit output format; inferred from the build when absent.
    pub format: Option<LogFormatSetting>,
}

/// Configured log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatSetting {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

impl FromStr for LogFormatSetting {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(prefix: &str, run_command: &str) -> PipelineSpec {
        PipelineSpec {
            prefix: prefix.to_string(),
            run_command: vec![run_command.to_string()],
            version: None,
            profile: None,
            config: None,
            with_tower: false,
            params: Vec::new(),
            input_parameter: None,
            input_type: InputType::File,
            output_parameter: None,
            filetype: None,
            multiple_inputs: false,
        }
    }

    fn config(pipelines: Vec<PipelineSpec>) -> WatcherConfig {
        WatcherConfig {
            nextflow_path: PathBuf::from("nextflow"),
            input_dir: PathBuf::from("/data/in"),
            output_dir: PathBuf::from("/data/out"),
            log_dir: PathBuf::from("/data/logs"),
            tower_address: None,
            poll_interval: Duration::from_secs(3),
            logging: LoggingSettings {
                level: "info".to_string(),
                format: None,
            },
            metrics_file: None,
            pipelines,
        }
    }

    #[test]
    fn layout_paths_derive_from_roots() {
        let config = config(Vec::new());
        assert_eq!(config.processed_dir(), PathBuf::from("/data/out/processed"));
        assert_eq!(config.error_dir(), PathBuf::from("/data/out/processed/error"));
        assert_eq!(config.run_location(), PathBuf::from("/data/out/run_location"));
        assert_eq!(config.journal_path(), PathBuf::from("/data/logs/service.log"));
        assert_eq!(
            config.output_path_for("sample_20240101-000000"),
            PathBuf::from("/data/out/sample_20240101-000000")
        );
    }

    #[test]
    fn find_pipeline_is_case_insensitive_and_first_match_wins() {
        let config = config(vec![
            pipeline("rnaseq", "nf-core/rnaseq"),
            pipeline("rnaseq", "other/rnaseq"),
        ]);
        let found = config.find_pipeline("RNASeq");
        assert_eq!(
            found.map(|pipeline| pipeline.run_command[0].as_str()),
            Some("nf-core/rnaseq")
        );
        assert!(config.find_pipeline("chip").is_none());
    }

    #[test]
    fn input_type_treats_unknown_values_as_file() {
        assert_eq!(InputType::from_setting(Some("directory")), InputType::Directory);
        assert_eq!(InputType::from_setting(Some("file")), InputType::File);
        assert_eq!(InputType::from_setting(Some("fastq")), InputType::File);
        assert_eq!(InputType::from_setting(None), InputType::File);
    }

    #[test]
    fn filetype_policy_recognises_find_keyword() {
        assert_eq!(FiletypePolicy::from_setting("find".into()), FiletypePolicy::Find);
        assert_eq!(
            FiletypePolicy::from_setting("bam".into()),
            FiletypePolicy::Fixed("bam".into())
        );
    }
}
