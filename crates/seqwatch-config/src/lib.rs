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

//! File-backed configuration for the ingestion dispatcher.
//!
//! Layout: `model.rs` (typed watcher + pipeline models), `validate.rs`
//! (normalisation/parsing helpers), `loader.rs` (YAML loading entry points).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_from_path, load_from_str};
pub use model::{
    FiletypePolicy, InputType, LogFormatSetting, LoggingSettings, PipelineParam, PipelineSpec,
    WatcherConfig,
};
