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
#![allow(clippy::multiple_crate_versions)]

//! Binary entrypoint that loads the watcher configuration and polls the
//! input directory until interrupted.

use seqwatch_app::{AppResult, run_app};

/// Bootstraps the watcher and blocks until shutdown.
#[tokio::main(flavor = "current_thread")]
async fn main() -> AppResult<()> {
    run_app().await
}
