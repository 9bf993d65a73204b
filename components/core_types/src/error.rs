//! Error objects and error kinds.
//!
//! A [`JsError`] is what a handler "throws": it is converted into a
//! [`Value::Error`](crate::Value::Error) and carried as a rejection reason.

use std::fmt;
use thiserror::Error;

/// The kind of error.
///
/// These correspond to the built-in error constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Plain `Error`
    Error,
    /// Type error (e.g. a promise resolved with itself)
    TypeError,
    /// Internal runtime error
    InternalError,
}

impl ErrorKind {
    /// Returns the constructor name used when the error is displayed.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error with a kind and a message.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError};
///
/// let error = JsError::type_error("Chaining cycle detected for promise");
/// assert_eq!(error.kind, ErrorKind::TypeError);
/// assert_eq!(error.to_string(), "TypeError: Chaining cycle detected for promise");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl JsError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates an `InternalError`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }
}
