//! Append-only activity journal.
//!
//! # Design
//! - One timestamped line per event, local time at second precision, so
//!   operators can follow the watcher without structured-log tooling.
//! - The file is opened per append; rotation by external tools is safe.
//! - Callers on the tick path use [`ActivityJournal::note`], which never fails.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use crate::error::{Result, TelemetryError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle to the activity journal file.
#[derive(Debug, Clone)]
pub struct ActivityJournal {
    path: PathBuf,
}

impl ActivityJournal {
    /// Create a journal writing to `path`; the file is created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be opened or written.
    pub fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TelemetryError::JournalOpen {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| TelemetryError::JournalOpen {
                path: self.path.clone(),
                source,
            })?;
        let line = format!("{}: {message}\n", Local::now().format(TIMESTAMP_FORMAT));
        file.write_all(line.as_bytes())
            .map_err(|source| TelemetryError::JournalWrite {
                path: self.path.clone(),
                source,
            })
    }

    /// Append one line, reporting failures through `tracing` instead of the caller.
    pub fn note(&self, message: impl AsRef<str>) {
        if let Err(error) = self.append(message.as_ref()) {
            warn!(
                error = %error,
                path = %self.path.display(),
                "activity journal append failed"
            );
        }
    }
}
