//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Configuration document was not valid YAML for the expected schema.
    #[error("failed to parse configuration document")]
    Parse {
        /// Path of the configuration file when loaded from disk.
        path: Option<PathBuf>,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// Required field was absent or empty.
    #[error("missing configuration field")]
    MissingField {
        /// Section containing the field (`watcher` or `pipelines[<n>]`).
        section: String,
        /// Name of the missing field.
        field: &'static str,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn missing(section: &str, field: &'static str) -> Self {
        Self::MissingField {
            section: section.to_string(),
            field,
        }
    }

    pub(crate) fn invalid(
        section: &str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.to_string(),
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_helpers_build_variants() {
        let missing = ConfigError::missing("watcher", "input_dir");
        assert!(matches!(
            missing,
            ConfigError::MissingField {
                field: "input_dir",
                ..
            }
        ));
        assert_eq!(missing.to_string(), "missing configuration field");

        let invalid = ConfigError::invalid("pipelines[0]", "prefix", Some("a_b".into()), "underscore");
        assert!(matches!(
            invalid,
            ConfigError::InvalidField {
                reason: "underscore",
                ..
            }
        ));
        assert!(invalid.source().is_none());
    }

    #[test]
    fn read_error_preserves_source() {
        let err = ConfigError::Read {
            path: PathBuf::from("config.yaml"),
            source: io::Error::other("io"),
        };
        assert!(err.source().is_some());
    }
}
