use std::path::PathBuf;

/// A unit of work: one run directory holding the files of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Run identifier, equal to the run directory's name.
    pub id: String,
    /// Routing prefix exactly as it appeared in the anchor filename.
    pub prefix: String,
    /// Run directory under the processed area.
    pub directory: PathBuf,
    /// Output location reserved for the run.
    pub output_path: PathBuf,
    /// Files relocated into the run directory, anchor first.
    pub inputs: Vec<PathBuf>,
    /// Whether same-prefix files from the tick were folded into this run.
    pub multi_input: bool,
}

/// Receiver of assembled runs.
///
/// Implementations must not block on the work they start: the dispatcher
/// processes the remaining files of the tick only after `dispatch` returns.
pub trait RunSink: Send + Sync {
    /// Hand `run` off for execution.
    ///
    /// # Errors
    ///
    /// Returns an error when the run could not be handed off; the run
    /// directory is left in place.
    fn dispatch(&self, run: &Run) -> anyhow::Result<()>;
}
