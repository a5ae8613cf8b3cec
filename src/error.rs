//! Error taxonomy of a benchmark run.
//!
//! Collaborators (factories, server, collectors) report failures with [`anyhow`]; the
//! orchestration wraps them into a [`BenchError`] at the seam where they surface, so the
//! run loop boundary can tell which stage broke.

use thiserror::Error;

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Failure of one benchmark stage.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Unknown agent identifier, malformed token or inconsistent setup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An agent factory failed to produce its agent.
    #[error("could not provision agent '{agent}': {source:#}")]
    Provisioning {
        /// Identifier given to the registry.
        agent: String,
        /// Underlying factory failure.
        source: anyhow::Error,
    },

    /// The remote-protocol connection could not be acquired.
    #[error("could not acquire connection: {0:#}")]
    Connection(anyhow::Error),

    /// A match generator failed.
    #[error("game generation failed: {0:#}")]
    Generation(anyhow::Error),

    /// A statistics collector failed.
    #[error("stats collector '{collector}' failed: {source:#}")]
    Collector {
        /// Name of the failing collector.
        collector: &'static str,
        /// Underlying collector failure.
        source: anyhow::Error,
    },

    /// The scheduler or the embedded server could not run.
    #[error("benchmark runtime failed: {0:#}")]
    Runtime(anyhow::Error),
}

impl BenchError {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        BenchError::Configuration(msg.into())
    }
}
