//! # Design
//!
//! - Centralize application-level errors for bootstrap and the poll loop.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seqwatch_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seqwatch_telemetry::TelemetryError,
    },
    /// The ingest loop hit a fatal error.
    #[error("ingest operation failed")]
    Ingest {
        /// Operation identifier.
        operation: &'static str,
        /// Source ingest error.
        source: seqwatch_ingest::IngestError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seqwatch_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seqwatch_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn ingest(
        operation: &'static str,
        source: seqwatch_ingest::IngestError,
    ) -> Self {
        Self::Ingest { operation, source }
    }
}
