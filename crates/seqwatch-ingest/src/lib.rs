#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Detect, pair, relocate and dispatch newly arrived data files.
//!
//! Layout: `snapshot.rs` (directory listing + diff), `classify.rs` (routing
//! prefixes), `pair.rs` (paired-read detection), `relocate.rs` (run
//! directories, quarantine, moves), `dispatcher.rs` (per-tick state machine),
//! `model/` (runs, reports, dispatch seam).

pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod pair;
pub mod relocate;
pub mod snapshot;

pub use classify::{classify, shares_prefix, strip_prefix};
pub use dispatcher::{IngestDispatcher, WatchState};
pub use error::{IngestError, IngestResult};
pub use model::{FileFailure, Run, RunSink, TickReport};
pub use pair::{PairState, detect_pair, pair_partner};
pub use relocate::{
    Clock, MAX_NAME_ATTEMPTS, RUN_TIMESTAMP_FORMAT, SystemClock, allocate_run_dir, move_file,
    quarantine_target,
};
pub use snapshot::{Listing, diff, list_entries, list_files};
