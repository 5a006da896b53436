//! Values exchanged between the dispatcher and its collaborators.

mod report;
mod run;

pub use report::{FileFailure, TickReport};
pub use run::{Run, RunSink};
