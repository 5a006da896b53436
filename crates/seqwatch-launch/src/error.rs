//! # Design
//!
//! - Provide structured, constant-message errors for command synthesis and process launch.
//! - Capture the offending field or path so failures can be traced to one pipeline entry.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for launch operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Errors produced while synthesizing or starting a pipeline command.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The pipeline entry or run contents cannot produce a command.
    #[error("command synthesis failed")]
    Synthesis {
        /// Pipeline field being rendered.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
        /// Path involved, when the failure concerns the run's inputs.
        path: Option<PathBuf>,
    },
    /// The run directory could not be scanned while synthesizing a command.
    #[error("run directory unreadable")]
    InputScan {
        /// Run directory being scanned.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Preparing log files or the working directory failed.
    #[error("launch io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The process could not be started.
    #[error("process spawn failed")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl LaunchError {
    pub(crate) const fn synthesis(
        field: &'static str,
        reason: &'static str,
        path: Option<PathBuf>,
    ) -> Self {
        Self::Synthesis {
            field,
            reason,
            path,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Render the message, context and source chain for the activity journal.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut rendered = match self {
            Self::Synthesis { field, reason, .. } => format!("{self} ({field}: {reason})"),
            Self::Io { operation, .. } => format!("{self} ({operation})"),
            Self::Spawn { program, .. } => format!("{self} ({program})"),
            Self::InputScan { .. } => self.to_string(),
        };
        let mut source = self.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}
