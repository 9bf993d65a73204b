//! Errors raised by the host event loop.
//!
//! Promise rejections are not errors at this level; they are ordinary
//! terminal states. These variants describe the loop itself failing.

use crate::promise::PromiseId;
use core_types::JsError;
use thiserror::Error;

/// Failure while driving the event loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A task returned an error.
    #[error("task failed: {0}")]
    TaskFailed(#[from] JsError),

    /// The configured turn budget ran out.
    #[error("turn limit of {limit} exceeded")]
    TurnLimitExceeded {
        /// Configured budget
        limit: u64,
    },

    /// No work remained while the awaited promise was still pending.
    #[error("event loop went idle while promise {promise} was still pending")]
    Stalled {
        /// The promise that never settled
        promise: PromiseId,
    },
}

/// Result type for event loop operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
