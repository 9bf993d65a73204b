//! Error types for the CLI

use async_runtime::RuntimeError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// The event loop failed while driving a scenario
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// No scenario is registered under this name
    #[error("unknown scenario '{0}' (try --list)")]
    UnknownScenario(String),

    /// Report serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
