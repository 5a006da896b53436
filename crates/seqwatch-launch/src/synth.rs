//! Nextflow command synthesis.
//!
//! # Design
//! - Clauses are emitted in a fixed order, each only when its setting is present:
//!   version, run command, profile, config, tower, params, input, output,
//!   filetype, background flag.
//! - Output depends only on the pipeline entry, the paths given, and the
//!   sorted contents of the run directory.

use std::path::{Path, PathBuf};

use seqwatch_config::{FiletypePolicy, InputType, PipelineSpec, WatcherConfig};
use walkdir::WalkDir;

use crate::error::{LaunchError, LaunchResult};
use crate::invocation::Invocation;

const VERSION_ENV: &str = "NXF_VER";
const COMPRESSION_SUFFIXES: [&str; 4] = ["gz", "bz2", "xz", "zst"];

/// Builds pipeline invocations for one deployment.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    nextflow_path: PathBuf,
    tower_address: Option<String>,
}

impl CommandSynthesizer {
    /// Synthesizer for the given executable and monitoring endpoint.
    #[must_use]
    pub fn new(nextflow_path: impl Into<PathBuf>, tower_address: Option<String>) -> Self {
        Self {
            nextflow_path: nextflow_path.into(),
            tower_address,
        }
    }

    /// Synthesizer using the executable and endpoint of `config`.
    #[must_use]
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::new(config.nextflow_path.clone(), config.tower_address.clone())
    }

    /// Path of the nextflow executable.
    #[must_use]
    pub fn nextflow_path(&self) -> &Path {
        &self.nextflow_path
    }

    /// Build the background invocation of `spec` for a run.
    ///
    /// `input_dir` is the run directory; `output_path` is the run's reserved
    /// output location.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Synthesis`] when a clause cannot be rendered
    /// (no tower address, empty run directory, no extension to derive a
    /// filetype from) and [`LaunchError::InputScan`] when the run directory
    /// cannot be read.
    pub fn synthesize(
        &self,
        spec: &PipelineSpec,
        input_dir: &Path,
        output_path: &Path,
    ) -> LaunchResult<Invocation> {
        let mut invocation = Invocation::new(self.nextflow_path.display().to_string());
        if let Some(version) = &spec.version {
            invocation = invocation.env(VERSION_ENV, version.as_str());
        }
        invocation.push("run");
        for token in &spec.run_command {
            invocation.push(token.as_str());
        }
        if let Some(profile) = &spec.profile {
            invocation.push("-profile");
            invocation.push(profile.as_str());
        }
        if let Some(config) = &spec.config {
            invocation.push("-config");
            invocation.push(config.as_str());
        }
        if spec.with_tower {
            let address = self.tower_address.as_deref().ok_or_else(|| {
                LaunchError::synthesis("with_tower", "tower_address_missing", None)
            })?;
            invocation.push("-with-tower");
            invocation.push(address);
        }
        for param in &spec.params {
            invocation.push(format!("--{}", param.name));
            invocation.push(param.value.as_str());
        }

        let mut first_input: Option<PathBuf> = None;
        if let Some(parameter) = &spec.input_parameter {
            let value = match spec.input_type {
                InputType::Directory => input_dir.to_path_buf(),
                InputType::File => {
                    cached_first_file(&mut first_input, input_dir, "input_parameter")?
                }
            };
            invocation.push(format!("--{parameter}"));
            invocation.push(value.display().to_string());
        }
        if let Some(parameter) = &spec.output_parameter {
            invocation.push(format!("--{parameter}"));
            invocation.push(output_path.display().to_string());
        }
        match &spec.filetype {
            Some(FiletypePolicy::Fixed(value)) => {
                invocation.push("--filetype");
                invocation.push(value.as_str());
            }
            Some(FiletypePolicy::Find) => {
                let file = cached_first_file(&mut first_input, input_dir, "filetype")?;
                invocation.push("--filetype");
                invocation.push(derive_filetype(&file)?);
            }
            None => {}
        }

        invocation.push("-bg");
        Ok(invocation)
    }
}

fn cached_first_file(
    slot: &mut Option<PathBuf>,
    dir: &Path,
    field: &'static str,
) -> LaunchResult<PathBuf> {
    if let Some(path) = slot {
        return Ok(path.clone());
    }
    let path = first_file(dir, field)?;
    *slot = Some(path.clone());
    Ok(path)
}

/// First regular file in `dir` by name.
fn first_file(dir: &Path, field: &'static str) -> LaunchResult<PathBuf> {
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| LaunchError::InputScan {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            return Ok(entry.into_path());
        }
    }
    Err(LaunchError::synthesis(
        field,
        "run_directory_empty",
        Some(dir.to_path_buf()),
    ))
}

/// Filetype token of `file`: its extension once a trailing compression suffix is removed.
///
/// # Errors
///
/// Returns [`LaunchError::Synthesis`] if no extension remains.
pub fn derive_filetype(file: &Path) -> LaunchResult<String> {
    let missing =
        || LaunchError::synthesis("filetype", "extension_missing", Some(file.to_path_buf()));
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(missing)?;
    let uncompressed = match name.rsplit_once('.') {
        Some((stem, suffix)) if COMPRESSION_SUFFIXES.contains(&suffix) => stem,
        _ => name,
    };
    Path::new(uncompressed)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string)
        .ok_or_else(missing)
}
