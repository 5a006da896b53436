//! YAML-backed configuration loading.
//!
//! # Design
//! - Deserialize into loosely typed `Raw*` structs first, then validate into the
//!   typed model exactly once; nothing downstream inspects raw keys.
//! - Duplicate prefixes are tolerated (first match wins) but reported.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::defaults::DEFAULT_LOG_LEVEL;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    FiletypePolicy, InputType, LoggingSettings, PipelineSpec, WatcherConfig,
};
use crate::validate::{
    normalize_optional, parse_log_format, parse_params, poll_interval, require_path,
    require_string, scalar_flag, scalar_to_string, split_run_command, validate_prefix,
};

const WATCHER_SECTION: &str = "watcher";

#[derive(Debug, Default, Deserialize)]
struct RawWatcherConfig {
    nextflow_path: Option<String>,
    input_dir: Option<String>,
    output_dir: Option<String>,
    log_dir: Option<String>,
    tower_address: Option<String>,
    poll_interval_secs: Option<u64>,
    #[serde(default)]
    logging: RawLogging,
    metrics_file: Option<String>,
    #[serde(default)]
    pipelines: Vec<RawPipeline>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPipeline {
    prefix: Option<String>,
    run_command: Option<String>,
    #[serde(default)]
    version: Value,
    #[serde(default)]
    profile: Value,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    with_tower: Value,
    #[serde(default)]
    params: Option<Vec<Mapping>>,
    input_parameter: Option<String>,
    input_type: Option<String>,
    output_parameter: Option<String>,
    #[serde(default)]
    filetype: Value,
    #[serde(default)]
    multiple_inputs: Value,
}

/// Read and validate the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] when the file cannot be read, and any error
/// produced by [`load_from_str`] otherwise.
pub fn load_from_path(path: &Path) -> ConfigResult<WatcherConfig> {
    let document = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawWatcherConfig =
        serde_yaml::from_str(&document).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
    let config = build_config(raw)?;
    info!(
        path = %path.display(),
        pipelines = config.pipelines.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parse and validate a configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed YAML and
/// [`ConfigError::MissingField`]/[`ConfigError::InvalidField`] for documents
/// that fail validation.
pub fn load_from_str(document: &str) -> ConfigResult<WatcherConfig> {
    let raw: RawWatcherConfig =
        serde_yaml::from_str(document).map_err(|source| ConfigError::Parse { path: None, source })?;
    build_config(raw)
}

fn build_config(raw: RawWatcherConfig) -> ConfigResult<WatcherConfig> {
    let nextflow_path = require_path(WATCHER_SECTION, "nextflow_path", raw.nextflow_path)?;
    let input_dir = require_path(WATCHER_SECTION, "input_dir", raw.input_dir)?;
    let output_dir = require_path(WATCHER_SECTION, "output_dir", raw.output_dir)?;
    let log_dir = require_path(WATCHER_SECTION, "log_dir", raw.log_dir)?;
    let tower_address = normalize_optional(raw.tower_address);
    let poll_interval = poll_interval(WATCHER_SECTION, raw.poll_interval_secs)?;

    let logging = LoggingSettings {
        level: normalize_optional(raw.logging.level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        format: parse_log_format(raw.logging.format)?,
    };

    let mut pipelines = Vec::with_capacity(raw.pipelines.len());
    let mut seen = HashSet::new();
    for (index, raw_pipeline) in raw.pipelines.into_iter().enumerate() {
        let section = format!("pipelines[{index}]");
        let pipeline = build_pipeline(&section, raw_pipeline, tower_address.is_some())?;
        if !seen.insert(pipeline.prefix.clone()) {
            warn!(
                prefix = %pipeline.prefix,
                section = %section,
                "duplicate pipeline prefix; the earlier entry takes precedence"
            );
        }
        pipelines.push(pipeline);
    }

    Ok(WatcherConfig {
        nextflow_path,
        input_dir,
        output_dir,
        log_dir,
        tower_address,
        poll_interval,
        logging,
        metrics_file: normalize_optional(raw.metrics_file).map(Into::into),
        pipelines,
    })
}

fn build_pipeline(
    section: &str,
    raw: RawPipeline,
    tower_configured: bool,
) -> ConfigResult<PipelineSpec> {
    let prefix = validate_prefix(section, &require_string(section, "prefix", raw.prefix)?)?;
    let run_command = split_run_command(
        section,
        &require_string(section, "run_command", raw.run_command)?,
    )?;

    let with_tower = scalar_flag(section, "with_tower", &raw.with_tower)?;
    if with_tower && !tower_configured {
        return Err(ConfigError::invalid(
            section,
            "with_tower",
            Some("true".to_string()),
            "tower_address_missing",
        ));
    }

    let params = match raw.params {
        Some(entries) => parse_params(section, &entries)?,
        None => Vec::new(),
    };

    Ok(PipelineSpec {
        prefix,
        run_command,
        version: scalar_to_string(section, "version", &raw.version)?,
        profile: scalar_to_string(section, "profile", &raw.profile)?,
        config: scalar_to_string(section, "config", &raw.config)?,
        with_tower,
        params,
        input_parameter: normalize_optional(raw.input_parameter),
        input_type: InputType::from_setting(normalize_optional(raw.input_type).as_deref()),
        output_parameter: normalize_optional(raw.output_parameter),
        filetype: scalar_to_string(section, "filetype", &raw.filetype)?
            .map(FiletypePolicy::from_setting),
        multiple_inputs: scalar_flag(section, "multiple_inputs", &raw.multiple_inputs)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MINIMAL: &str = r"
nextflow_path: /opt/nextflow
input_dir: /data/in
output_dir: /data/out
log_dir: /data/logs
";

    #[test]
    fn minimal_document_applies_defaults() -> ConfigResult<()> {
        let config = load_from_str(MINIMAL)?;
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.format.is_none());
        assert!(config.tower_address.is_none());
        assert!(config.metrics_file.is_none());
        assert!(config.pipelines.is_empty());
        Ok(())
    }

    #[test]
    fn missing_required_field_is_reported() {
        let result = load_from_str("input_dir: /in\noutput_dir: /out\nlog_dir: /logs\n");
        assert!(matches!(
            result,
            Err(ConfigError::MissingField {
                field: "nextflow_path",
                ..
            })
        ));
    }

    #[test]
    fn blank_optional_fields_normalise_to_none() -> ConfigResult<()> {
        let document = format!(
            "{MINIMAL}pipelines:\n  - prefix: Sample\n    run_command: main.nf\n    version: ''\n    profile: ''\n    filetype: ''\n"
        );
        let config = load_from_str(&document)?;
        let pipeline = &config.pipelines[0];
        assert_eq!(pipeline.prefix, "sample");
        assert!(pipeline.version.is_none());
        assert!(pipeline.profile.is_none());
        assert!(pipeline.filetype.is_none());
        assert!(!pipeline.multiple_inputs);
        Ok(())
    }

    #[test]
    fn numeric_version_is_rendered_as_string() -> ConfigResult<()> {
        let document =
            format!("{MINIMAL}pipelines:\n  - prefix: a\n    run_command: main.nf\n    version: 23\n");
        let config = load_from_str(&document)?;
        assert_eq!(config.pipelines[0].version.as_deref(), Some("23"));
        Ok(())
    }

    #[test]
    fn loose_scalars_are_read_by_truthiness() -> ConfigResult<()> {
        let document = format!(
            "{MINIMAL}pipelines:\n  - prefix: a\n    run_command: main.nf\n    with_tower:\n    multiple_inputs: 1\n    profile: 2\n    config: 10\n    filetype: 5\n"
        );
        let config = load_from_str(&document)?;
        let pipeline = &config.pipelines[0];
        assert!(!pipeline.with_tower);
        assert!(pipeline.multiple_inputs);
        assert_eq!(pipeline.profile.as_deref(), Some("2"));
        assert_eq!(pipeline.config.as_deref(), Some("10"));
        assert_eq!(pipeline.filetype, Some(FiletypePolicy::Fixed("5".into())));
        Ok(())
    }

    #[test]
    fn with_tower_requires_address() {
        let document = format!(
            "{MINIMAL}pipelines:\n  - prefix: a\n    run_command: main.nf\n    with_tower: true\n"
        );
        assert!(matches!(
            load_from_str(&document),
            Err(ConfigError::InvalidField {
                field: "with_tower",
                reason: "tower_address_missing",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_prefixes_are_kept_in_order() -> ConfigResult<()> {
        let document = format!(
            "{MINIMAL}pipelines:\n  - prefix: a\n    run_command: first.nf\n  - prefix: A\n    run_command: second.nf\n"
        );
        let config = load_from_str(&document)?;
        assert_eq!(config.pipelines.len(), 2);
        assert_eq!(
            config
                .find_pipeline("a")
                .map(|pipeline| pipeline.run_command[0].as_str()),
            Some("first.nf")
        );
        Ok(())
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            load_from_str("pipelines: [unterminated"),
            Err(ConfigError::Parse { path: None, .. })
        ));
    }
}
