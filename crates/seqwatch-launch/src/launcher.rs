//! Process launcher behind the ingest dispatch seam.
//!
//! # Design
//! - Reserved prefixes map to fixed diagnostic commands before any pipeline lookup.
//! - An unknown prefix or a synthesis failure still launches a placeholder so
//!   the run's log files record the attempt.
//! - Children run in their own process group with stdout and stderr in
//!   per-run files under the log directory. They are never awaited.

use std::fs::{self, File};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use seqwatch_config::WatcherConfig;
use seqwatch_ingest::{Run, RunSink};
use seqwatch_telemetry::{ActivityJournal, Metrics};
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{LaunchError, LaunchResult};
use crate::invocation::Invocation;
use crate::synth::CommandSynthesizer;

const NO_PIPELINE_MESSAGE: &str = "Not a correct prefix";
const SYNTHESIS_FAILED_MESSAGE: &str = "Command synthesis failed";

/// What a launch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
    /// A configured pipeline.
    Pipeline,
    /// A fixed command selected by a reserved prefix.
    Diagnostic,
    /// A stand-in recording that no pipeline could be started.
    Placeholder,
}

impl LaunchKind {
    /// Metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Diagnostic => "diagnostic",
            Self::Placeholder => "placeholder",
        }
    }
}

/// A resolved command for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Kind of process.
    pub kind: LaunchKind,
    /// Command to start.
    pub invocation: Invocation,
}

/// Starts one detached process per dispatched run.
pub struct PipelineLauncher {
    config: Arc<WatcherConfig>,
    synthesizer: CommandSynthesizer,
    journal: ActivityJournal,
    metrics: Metrics,
}

impl PipelineLauncher {
    /// Launcher for the pipelines of `config`.
    #[must_use]
    pub fn new(config: Arc<WatcherConfig>, journal: ActivityJournal, metrics: Metrics) -> Self {
        let synthesizer = CommandSynthesizer::from_config(&config);
        Self {
            config,
            synthesizer,
            journal,
            metrics,
        }
    }

    /// Fixed command for a reserved prefix, if `prefix` is one.
    #[must_use]
    pub fn diagnostic(&self, prefix: &str) -> Option<Invocation> {
        let invocation = match prefix.to_lowercase().as_str() {
            "test" => Invocation::new("ls").arg("-a"),
            "nextflow" => Invocation::new(self.synthesizer.nextflow_path().display().to_string())
                .arg("-version"),
            "path" => Invocation::new("printenv").arg("PATH"),
            "home" => Invocation::new("printenv").arg("HOME"),
            _ => return None,
        };
        Some(invocation)
    }

    /// Resolve the command for `run`.
    ///
    /// # Errors
    ///
    /// Returns the synthesis error when the matched pipeline cannot produce a command.
    pub fn plan(&self, run: &Run) -> LaunchResult<LaunchPlan> {
        if let Some(invocation) = self.diagnostic(&run.prefix) {
            return Ok(LaunchPlan {
                kind: LaunchKind::Diagnostic,
                invocation,
            });
        }
        let Some(spec) = self.config.find_pipeline(&run.prefix) else {
            return Ok(placeholder(NO_PIPELINE_MESSAGE));
        };
        let invocation = self
            .synthesizer
            .synthesize(spec, &run.directory, &run.output_path)?;
        Ok(LaunchPlan {
            kind: LaunchKind::Pipeline,
            invocation,
        })
    }

    /// Log file receiving the run's stdout.
    #[must_use]
    pub fn log_path(&self, run: &Run) -> PathBuf {
        self.config.log_dir.join(format!("{}.log", run.id))
    }

    /// Log file receiving the run's stderr.
    #[must_use]
    pub fn err_path(&self, run: &Run) -> PathBuf {
        self.config.log_dir.join(format!("{}.err", run.id))
    }

    fn announce(&self, run: &Run, plan: &LaunchPlan) {
        let rendered = plan.invocation.render();
        match plan.kind {
            LaunchKind::Pipeline => self.journal.note(format!(
                "Launching pipeline based on prefix: {}. Command: {rendered}",
                run.prefix
            )),
            LaunchKind::Diagnostic => self
                .journal
                .note(format!("Launching test '{rendered}' command")),
            LaunchKind::Placeholder => self.journal.note(format!(
                "No pipeline launched for prefix: {}. Command: {rendered}",
                run.prefix
            )),
        }
        self.journal.note(format!(
            "See {} for details.",
            self.log_path(run).display()
        ));
    }

    /// Start `plan` for `run` without waiting for it, returning the child's pid.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the log files cannot be created or the process
    /// cannot be spawned.
    pub fn spawn(&self, run: &Run, plan: &LaunchPlan) -> LaunchResult<Option<u32>> {
        fs::create_dir_all(&self.config.log_dir)
            .map_err(|err| LaunchError::io("launch.create_log_dir", &self.config.log_dir, err))?;
        let run_location = self.config.run_location();
        fs::create_dir_all(&run_location)
            .map_err(|err| LaunchError::io("launch.create_run_location", &run_location, err))?;
        let log_path = self.log_path(run);
        let stdout = File::create(&log_path)
            .map_err(|err| LaunchError::io("launch.create_log", &log_path, err))?;
        let err_path = self.err_path(run);
        let stderr = File::create(&err_path)
            .map_err(|err| LaunchError::io("launch.create_err", &err_path, err))?;

        let invocation = &plan.invocation;
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(key, value)| (key, value)))
            .current_dir(&run_location)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        let pid = child.id();
        info!(
            run = %run.id,
            kind = plan.kind.as_str(),
            pid = ?pid,
            command = %invocation,
            "process launched"
        );
        self.metrics.inc_launch(plan.kind.as_str());
        Ok(pid)
    }

    fn launch(&self, run: &Run, plan: &LaunchPlan) -> LaunchResult<()> {
        self.announce(run, plan);
        self.spawn(run, plan).map(|_| ())
    }
}

fn placeholder(message: &str) -> LaunchPlan {
    LaunchPlan {
        kind: LaunchKind::Placeholder,
        invocation: Invocation::new("echo").arg(message),
    }
}

impl RunSink for PipelineLauncher {
    fn dispatch(&self, run: &Run) -> anyhow::Result<()> {
        match self.plan(run) {
            Ok(plan) => {
                if plan.kind == LaunchKind::Placeholder {
                    warn!(run = %run.id, prefix = %run.prefix, "no pipeline configured for prefix");
                }
                self.launch(run, &plan)?;
                Ok(())
            }
            Err(error) => {
                warn!(run = %run.id, prefix = %run.prefix, error = %error, "command synthesis failed");
                self.journal.note(format!(
                    "An error while building the command for {}: {}",
                    run.id,
                    error.detail()
                ));
                if let Err(fallback) = self.launch(run, &placeholder(SYNTHESIS_FAILED_MESSAGE)) {
                    warn!(run = %run.id, error = %fallback, "placeholder launch failed");
                }
                Err(error.into())
            }
        }
    }
}
