//! Temporary watcher layouts and configuration documents for tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Create a scratch directory that is removed when dropped.
///
/// # Errors
///
/// Returns an error if the temporary directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("seqwatch-")
        .tempdir()
        .context("failed to create temporary directory")
}

/// Directory tree mirroring a deployed watcher: input, output and log roots.
pub struct WatchLayout {
    root: TempDir,
}

impl WatchLayout {
    /// Create the input, output and log directories under a fresh temp root.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn new() -> Result<Self> {
        let root = temp_dir()?;
        for name in ["input", "output", "logs"] {
            let path = root.path().join(name);
            fs::create_dir_all(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
        }
        Ok(Self { root })
    }

    /// Temp root holding the layout.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Watched input directory.
    #[must_use]
    pub fn input_dir(&self) -> PathBuf {
        self.root.path().join("input")
    }

    /// Output root.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("output")
    }

    /// Log directory.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.root.path().join("logs")
    }

    /// Drop a file with the given contents into the watched directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn arrive(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.input_dir().join(name);
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Render a watcher configuration document rooted at this layout.
    ///
    /// `pipelines_yaml` is appended verbatim and should start with `pipelines:`
    /// when non-empty.
    #[must_use]
    pub fn config_yaml(&self, nextflow_path: &str, pipelines_yaml: &str) -> String {
        format!(
            "nextflow_path: {nextflow}\ninput_dir: {input}\noutput_dir: {output}\nlog_dir: {logs}\ntower_address: http://tower.local:8000\npoll_interval_secs: 1\n{pipelines_yaml}",
            nextflow = nextflow_path,
            input = self.input_dir().display(),
            output = self.output_dir().display(),
            logs = self.log_dir().display(),
        )
    }

    /// Write a configuration document next to the layout and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_config(&self, document: &str) -> Result<PathBuf> {
        let path = self.root.path().join("config.yaml");
        fs::write(&path, document).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Sorted names of the regular files directly inside `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Sorted names of the directories directly inside `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn dir_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
