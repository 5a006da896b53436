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

//! Telemetry primitives shared across the seqwatch workspace.
//!
//! This crate centralises diagnostic logging, the append-only activity
//! journal, and Prometheus counters so the dispatcher and launcher report
//! their work the same way.
//!
//! Layout: `init.rs` (subscriber setup), `context.rs` (process span guard),
//! `journal.rs` (activity journal), `metrics.rs` (counters), `error.rs`.

pub mod context;
pub mod error;
pub mod init;
pub mod journal;
pub mod metrics;

pub use context::GlobalContextGuard;
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use journal::ActivityJournal;
pub use metrics::{Metrics, MetricsSnapshot};
