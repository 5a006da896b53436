use crate::error::IngestError;
use crate::model::Run;

/// Failure recorded against one file during a tick.
#[derive(Debug)]
pub struct FileFailure {
    /// File the failure is attributed to.
    pub file: String,
    /// What went wrong.
    pub error: IngestError,
}

/// Outcome of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Files newly present this tick, sorted.
    pub new_files: Vec<String>,
    /// Files moved to the error area.
    pub quarantined: Vec<String>,
    /// Pair halves left in place until their partner arrives.
    pub deferred: Vec<String>,
    /// Runs handed to the sink.
    pub runs: Vec<Run>,
    /// Per-file failures; the affected files stay where they were.
    pub failures: Vec<FileFailure>,
}

impl TickReport {
    /// Whether the tick saw nothing new.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.new_files.is_empty()
    }
}
