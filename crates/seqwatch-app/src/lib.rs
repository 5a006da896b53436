#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Seqwatch application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `watcher.rs` (poll loop).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application error types.
pub mod error;
/// Poll loop driving the ingest dispatcher.
pub mod watcher;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
