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

//! Turn assembled runs into background pipeline processes.
//!
//! Layout: `invocation.rs` (argument-vector commands), `synth.rs` (pipeline
//! command synthesis), `launcher.rs` (reserved prefixes, placeholders and
//! process spawning), `error.rs`.

pub mod error;
pub mod invocation;
pub mod launcher;
pub mod synth;

pub use error::{LaunchError, LaunchResult};
pub use invocation::Invocation;
pub use launcher::{LaunchKind, LaunchPlan, PipelineLauncher};
pub use synth::{CommandSynthesizer, derive_filetype};
