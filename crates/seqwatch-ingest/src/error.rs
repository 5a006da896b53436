//! # Design
//!
//! - Provide structured, constant-message errors for the ingest pipeline.
//! - Capture operation context (paths, files, run ids) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors produced while detecting, relocating and dispatching files.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The watched directory could not be listed.
    #[error("watched directory unreadable")]
    Snapshot {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The filename carries no usable routing prefix.
    #[error("filename has no routing prefix")]
    Unclassifiable {
        /// Offending filename.
        file: String,
    },
    /// Every candidate name for a run or quarantine target was taken.
    #[error("collision-free name unavailable")]
    CollisionExhausted {
        /// First candidate path tried.
        base: PathBuf,
        /// Number of names attempted.
        attempts: usize,
    },
    /// Moving a file or preparing its destination failed.
    #[error("file relocation failed")]
    Relocation {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Preparing the processed/error/run-location layout failed.
    #[error("ingest layout unavailable")]
    Layout {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The dispatch seam rejected an assembled run.
    #[error("run dispatch failed")]
    Dispatch {
        /// Identifier of the run that failed to dispatch.
        run_id: String,
        /// Underlying dispatch error.
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl IngestError {
    pub(crate) fn relocation(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Relocation {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Short label used for metrics and structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Unclassifiable { .. } => "classification",
            Self::CollisionExhausted { .. } => "collision_exhausted",
            Self::Relocation { .. } => "relocation",
            Self::Layout { .. } => "layout",
            Self::Dispatch { .. } => "dispatch",
        }
    }

    /// Render the message followed by its source chain, for the activity journal.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}
