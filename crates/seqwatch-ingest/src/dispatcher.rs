//! Per-tick ingest state machine.
//!
//! # Design
//! - The "previously seen" set lives in [`WatchState`], primed explicitly
//!   before the first tick.
//! - Each new file is classified, pair-checked, relocated and dispatched in
//!   sorted order. A file consumed as a partner or sibling is skipped when its
//!   own turn comes.
//! - Failures are isolated per file: they are logged, journaled and counted,
//!   and the remaining files of the tick are still processed.
//! - Incomplete pairs are requeued by dropping them from the seen set so the
//!   next snapshot reports them as new again.
//! - Files moved out of the watched directory are dropped from the seen set
//!   too, so a later upload under the same name is detected.
//! - Names that are not valid UTF-8 cannot be routed and go straight to the
//!   error area under a lossy rendering of their name.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use seqwatch_config::WatcherConfig;
use seqwatch_telemetry::{ActivityJournal, Metrics};
use tracing::{debug, info, warn};

use crate::classify::{classify, shares_prefix, strip_prefix};
use crate::error::{IngestError, IngestResult};
use crate::model::{FileFailure, Run, RunSink, TickReport};
use crate::pair::{PairState, detect_pair};
use crate::relocate::{Clock, SystemClock, allocate_run_dir, move_file, quarantine_target};
use crate::snapshot::{diff, list_entries};

/// Filenames observed by the previous tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchState {
    previous: BTreeSet<String>,
    undecodable: BTreeSet<OsString>,
}

impl WatchState {
    /// Capture the files already present in `input_dir`; they are never processed.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Snapshot`] if the directory cannot be read.
    pub fn prime(input_dir: &Path) -> IngestResult<Self> {
        let listing = list_entries(input_dir)?;
        Ok(Self {
            previous: listing.files,
            undecodable: listing.undecodable,
        })
    }

    /// Filenames the next tick will treat as already seen.
    #[must_use]
    pub const fn previous(&self) -> &BTreeSet<String> {
        &self.previous
    }

    fn forget(&mut self, name: &str) {
        self.previous.remove(name);
    }

    fn forget_undecodable(&mut self, name: &OsStr) {
        self.undecodable.remove(name);
    }
}

/// Drives one watched directory through its ticks.
pub struct IngestDispatcher {
    config: Arc<WatcherConfig>,
    sink: Arc<dyn RunSink>,
    journal: ActivityJournal,
    metrics: Metrics,
    clock: Arc<dyn Clock>,
}

/// Files of one anchor, its partner, or one folded sibling group.
type Members = Vec<String>;

/// Metrics label for runs whose prefix matches no configured pipeline.
const UNMATCHED_PIPELINE_LABEL: &str = "unknown";

impl IngestDispatcher {
    /// Create a dispatcher that names runs with the system clock.
    #[must_use]
    pub fn new(
        config: Arc<WatcherConfig>,
        sink: Arc<dyn RunSink>,
        journal: ActivityJournal,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            sink,
            journal,
            metrics,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for run directory names.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Prime loop state from the current contents of the watched directory.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Snapshot`] if the directory cannot be read.
    pub fn prime(&self) -> IngestResult<WatchState> {
        WatchState::prime(&self.config.input_dir)
    }

    /// Run one poll tick against `state`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Snapshot`] when the watched directory cannot be
    /// listed. Every other failure is recorded in the returned report.
    pub fn tick(&self, state: &mut WatchState) -> IngestResult<TickReport> {
        let listing = list_entries(&self.config.input_dir)?;
        let new_files = diff(&state.previous, &listing.files);
        let undecodable: Vec<OsString> = listing
            .undecodable
            .difference(&state.undecodable)
            .cloned()
            .collect();

        if let Err(error) = self.prepare_layout() {
            // Leave `state` untouched so the same files are reported again.
            warn!(error = %error, kind = error.kind(), "ingest layout unavailable; tick skipped");
            self.journal.note(format!("An error while preparing directories: {}", error.detail()));
            self.metrics.inc_ingest_failure(error.kind());
            return Ok(TickReport::default());
        }

        state.previous = listing.files;
        state.undecodable = listing.undecodable;
        let arrivals = new_files;
        let mut report = TickReport {
            new_files: arrivals.clone(),
            ..TickReport::default()
        };
        report.new_files.extend(
            undecodable
                .iter()
                .map(|raw| raw.to_string_lossy().into_owned()),
        );
        self.metrics.observe_tick(report.new_files.len());
        if report.is_idle() {
            return Ok(report);
        }

        self.journal
            .note(format!("New files detected: {:?}", report.new_files));
        for raw in &undecodable {
            let label = raw.to_string_lossy().into_owned();
            self.journal.note(format!("Processing file: {label}"));
            match self.quarantine(raw, &label, state) {
                Ok(()) => report.quarantined.push(label),
                Err(error) => self.record_failure(&mut report, &label, error),
            }
        }

        let mut remaining: BTreeSet<String> = arrivals.iter().cloned().collect();
        for name in &arrivals {
            if !remaining.remove(name) {
                continue;
            }
            if let Err(error) = self.process_file(name, &mut remaining, state, &mut report) {
                self.record_failure(&mut report, name, error);
            }
        }

        info!(
            new_files = report.new_files.len(),
            runs = report.runs.len(),
            quarantined = report.quarantined.len(),
            deferred = report.deferred.len(),
            failures = report.failures.len(),
            "tick complete"
        );
        Ok(report)
    }

    fn prepare_layout(&self) -> IngestResult<()> {
        for dir in [
            self.config.processed_dir(),
            self.config.error_dir(),
            self.config.run_location(),
        ] {
            fs::create_dir_all(&dir).map_err(|source| IngestError::Layout { path: dir, source })?;
        }
        Ok(())
    }

    fn process_file(
        &self,
        name: &str,
        remaining: &mut BTreeSet<String>,
        state: &mut WatchState,
        report: &mut TickReport,
    ) -> IngestResult<()> {
        self.journal.note(format!("Processing file: {name}"));
        let prefix = match classify(name) {
            Ok(prefix) => prefix,
            Err(IngestError::Unclassifiable { .. }) => {
                self.quarantine(OsStr::new(name), name, state)?;
                report.quarantined.push(name.to_string());
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        let (anchor, paired) = match detect_pair(name, remaining) {
            PairState::Waiting => {
                state.forget(name);
                debug!(file = name, "pair partner not yet present");
                self.journal
                    .note(format!("Waiting for the pair of {name}; it will be checked again"));
                self.metrics.inc_pair_deferred();
                report.deferred.push(name.to_string());
                return Ok(());
            }
            PairState::Complete { partner } => {
                remaining.remove(&partner);
                (vec![name.to_string(), partner], true)
            }
            PairState::Unpaired => (vec![name.to_string()], false),
        };

        let pipeline = self.config.find_pipeline(prefix);
        let multi_input = pipeline.is_some_and(|pipeline| pipeline.multiple_inputs);
        let pipeline_label = pipeline.map_or(UNMATCHED_PIPELINE_LABEL, |pipeline| {
            pipeline.prefix.as_str()
        });
        let directory = allocate_run_dir(&self.config.processed_dir(), prefix, self.clock.now())?;
        let mut inputs = self.relocate_anchor(&anchor, &directory, state)?;

        if multi_input {
            for group in Self::take_siblings(prefix, paired, &anchor, remaining) {
                for member in group {
                    match self.relocate(&member, &directory, state) {
                        Ok(path) => inputs.push(path),
                        Err(error) => self.record_failure(report, &member, error),
                    }
                }
            }
        }

        let id = directory
            .file_name()
            .map(|run_name| run_name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let run = Run {
            output_path: self.config.output_path_for(&id),
            id,
            prefix: prefix.to_string(),
            directory,
            inputs,
            multi_input,
        };
        self.journal.note(format!(
            "Run {} assembled with {} input file(s) in {}",
            run.id,
            run.inputs.len(),
            run.directory.display()
        ));
        self.sink
            .dispatch(&run)
            .map_err(|source| IngestError::Dispatch {
                run_id: run.id.clone(),
                source: source.into(),
            })?;
        self.metrics.inc_run_dispatched(pipeline_label);
        report.runs.push(run);
        Ok(())
    }

    /// Remove and return the same-prefix files whose pair state matches the anchor's.
    ///
    /// A group whose names would clash with a file already in the run once the
    /// prefix is stripped stays in `remaining` and gets a run of its own.
    fn take_siblings(
        prefix: &str,
        paired: bool,
        anchor: &[String],
        remaining: &mut BTreeSet<String>,
    ) -> Vec<Members> {
        let mut taken: BTreeSet<String> = anchor
            .iter()
            .filter_map(|member| strip_prefix(member))
            .map(str::to_string)
            .collect();
        let candidates: Vec<String> = remaining
            .iter()
            .filter(|candidate| shares_prefix(candidate, prefix))
            .cloned()
            .collect();
        let mut groups = Vec::new();
        for candidate in candidates {
            if !remaining.contains(&candidate) {
                continue;
            }
            let group = match (paired, detect_pair(&candidate, remaining)) {
                (true, PairState::Complete { partner }) => vec![candidate, partner],
                (false, PairState::Unpaired) => vec![candidate],
                _ => continue,
            };
            let stripped: Vec<&str> = group
                .iter()
                .filter_map(|member| strip_prefix(member))
                .collect();
            if stripped.iter().any(|name| taken.contains(*name)) {
                debug!(files = ?group, "sibling name clash; left for its own run");
                continue;
            }
            taken.extend(stripped.into_iter().map(str::to_string));
            for member in &group {
                remaining.remove(member);
            }
            groups.push(group);
        }
        groups
    }

    fn relocate_anchor(
        &self,
        anchor: &[String],
        directory: &Path,
        state: &mut WatchState,
    ) -> IngestResult<Vec<PathBuf>> {
        let mut inputs = Vec::with_capacity(anchor.len());
        for member in anchor {
            match self.relocate(member, directory, state) {
                Ok(path) => inputs.push(path),
                Err(error) => {
                    if inputs.is_empty() {
                        if let Err(cleanup) = fs::remove_dir(directory) {
                            warn!(
                                error = %cleanup,
                                dir = %directory.display(),
                                "failed to remove empty run directory"
                            );
                        }
                    }
                    return Err(error);
                }
            }
        }
        Ok(inputs)
    }

    fn relocate(
        &self,
        name: &str,
        directory: &Path,
        state: &mut WatchState,
    ) -> IngestResult<PathBuf> {
        let stripped = strip_prefix(name).ok_or_else(|| IngestError::Unclassifiable {
            file: name.to_string(),
        })?;
        let destination = directory.join(stripped);
        move_file(&self.config.input_dir.join(name), &destination)?;
        state.forget(name);
        debug!(file = name, destination = %destination.display(), "file relocated");
        Ok(destination)
    }

    /// Move `name` to the error area under the first free variant of `label`.
    fn quarantine(&self, name: &OsStr, label: &str, state: &mut WatchState) -> IngestResult<()> {
        let target = quarantine_target(&self.config.error_dir(), label)?;
        move_file(&self.config.input_dir.join(name), &target)?;
        match name.to_str() {
            Some(decoded) => state.forget(decoded),
            None => state.forget_undecodable(name),
        }
        warn!(file = label, target = %target.display(), "unclassifiable file quarantined");
        self.journal.note(format!(
            "No prefix found in {label}; moved to {}",
            target.display()
        ));
        self.metrics.inc_quarantined();
        Ok(())
    }

    fn record_failure(&self, report: &mut TickReport, file: &str, error: IngestError) {
        warn!(file, kind = error.kind(), error = %error, "failed to process file");
        self.journal
            .note(format!("An error while processing {file}: {}", error.detail()));
        self.metrics.inc_ingest_failure(error.kind());
        report.failures.push(FileFailure {
            file: file.to_string(),
            error,
        });
    }
}
