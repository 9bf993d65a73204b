//! Core value types and error handling for the promise runtime.
//!
//! This crate provides the payloads that flow through settlement cells:
//! the values a promise fulfills with and the reasons it rejects with.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`JsError`] - Error objects thrown by handlers or used as rejection reasons
//! - [`ErrorKind`] - Built-in error constructor a [`JsError`] was created from
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert_eq!(num.to_string(), "42");
//!
//! let error = JsError::new(ErrorKind::Error, "Random error");
//! assert_eq!(Value::from(error).to_string(), "Error: Random error");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ErrorKind, JsError};
pub use value::Value;
