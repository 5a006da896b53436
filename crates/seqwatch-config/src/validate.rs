//! Validation helpers and parsing utilities for configuration documents.

use std::path::PathBuf;
use std::time::Duration;

use serde_yaml::{Mapping, Value};

use crate::defaults::DEFAULT_POLL_INTERVAL_SECS;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{LogFormatSetting, PipelineParam};

/// Trim a string setting, treating blank values as absent.
#[must_use]
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Require a non-blank string setting.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when the value is absent or blank.
pub fn require_string(
    section: &str,
    field: &'static str,
    value: Option<String>,
) -> ConfigResult<String> {
    normalize_optional(value).ok_or_else(|| ConfigError::missing(section, field))
}

/// Require a non-blank path setting.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when the value is absent or blank.
pub fn require_path(
    section: &str,
    field: &'static str,
    value: Option<String>,
) -> ConfigResult<PathBuf> {
    require_string(section, field, value).map(PathBuf::from)
}

/// Validate a routing prefix and return its lowercased form.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the prefix contains the
/// separator, whitespace or a path separator.
pub fn validate_prefix(section: &str, value: &str) -> ConfigResult<String> {
    if value.contains('_') {
        return Err(ConfigError::invalid(
            section,
            "prefix",
            Some(value.to_string()),
            "contains_separator",
        ));
    }
    if value.chars().any(|ch| ch.is_whitespace() || ch == '/' || ch == '\\') {
        return Err(ConfigError::invalid(
            section,
            "prefix",
            Some(value.to_string()),
            "invalid_character",
        ));
    }
    Ok(value.to_lowercase())
}

/// Split a run command into argument tokens.
///
/// Tokens are whitespace separated; quoting is not interpreted, so quote
/// characters are rejected rather than passed through literally.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the command contains quotes.
pub fn split_run_command(section: &str, value: &str) -> ConfigResult<Vec<String>> {
    if value.contains(['"', '\'']) {
        return Err(ConfigError::invalid(
            section,
            "run_command",
            Some(value.to_string()),
            "quoting_unsupported",
        ));
    }
    Ok(value.split_whitespace().map(str::to_string).collect())
}

/// Render a YAML scalar as a string, mapping `null` and blank strings to `None`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for sequences, mappings and tagged values.
pub fn scalar_to_string(
    section: &str,
    field: &'static str,
    value: &Value,
) -> ConfigResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::String(text) => Ok(normalize_optional(Some(text.clone()))),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => Err(ConfigError::invalid(
            section,
            field,
            None,
            "not_scalar",
        )),
    }
}

/// Read a YAML scalar as a switch: `null`, `false`, zero and blank strings are off.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for sequences, mappings and tagged values.
pub fn scalar_flag(section: &str, field: &'static str, value: &Value) -> ConfigResult<bool> {
    Ok(match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        other => scalar_to_string(section, field, other)?.is_some(),
    })
}

/// Flatten the `params` list of single-key maps into ordered parameters.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when an entry is not a single-key map
/// or carries a non-scalar or empty value.
pub fn parse_params(section: &str, entries: &[Mapping]) -> ConfigResult<Vec<PipelineParam>> {
    let mut params = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.len() != 1 {
            return Err(ConfigError::invalid(
                section,
                "params",
                Some(format!("{} keys", entry.len())),
                "expected_single_key",
            ));
        }
        for (key, value) in entry {
            let name = match key {
                Value::String(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => {
                    return Err(ConfigError::invalid(
                        section,
                        "params",
                        None,
                        "invalid_name",
                    ));
                }
            };
            let value = scalar_to_string(section, "params", value)?.ok_or_else(|| {
                ConfigError::invalid(section, "params", Some(name.clone()), "missing_value")
            })?;
            params.push(PipelineParam { name, value });
        }
    }
    Ok(params)
}

/// Resolve the poll interval, applying the default when unset.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for a zero interval.
pub fn poll_interval(section: &str, seconds: Option<u64>) -> ConfigResult<Duration> {
    match seconds {
        None => Ok(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
        Some(0) => Err(ConfigError::invalid(
            section,
            "poll_interval_secs",
            Some("0".to_string()),
            "zero",
        )),
        Some(value) => Ok(Duration::from_secs(value)),
    }
}

/// Parse an optional log format keyword.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for unknown formats.
pub fn parse_log_format(value: Option<String>) -> ConfigResult<Option<LogFormatSetting>> {
    normalize_optional(value)
        .map(|format| {
            format.parse::<LogFormatSetting>().map_err(|()| {
                ConfigError::invalid("logging", "format", Some(format.clone()), "unsupported")
            })
        })
        .transpose()
}
