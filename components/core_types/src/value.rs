//! Runtime value representation.
//!
//! This module provides the `Value` enum carried as the payload of a
//! fulfilled promise and as the reason of a rejected one.

use crate::JsError;
use std::fmt;

/// Represents any runtime value.
///
/// Numbers keep the small-integer / double split so integer results stay
/// exact. Arrays hold the ordered results of combinators such as `all`.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let undefined = Value::Undefined;
/// let number = Value::Smi(42);
/// let list = Value::Array(vec![Value::Smi(1), Value::Smi(2)]);
///
/// assert_eq!(undefined.to_string(), "undefined");
/// assert_eq!(number.to_string(), "42");
/// assert_eq!(list.to_string(), "[1, 2]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The undefined value
    Undefined,
    /// The null value
    Null,
    /// Boolean (true or false)
    Boolean(bool),
    /// Small integer
    Smi(i32),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// String value
    String(std::string::String),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Error object
    Error(JsError),
}

impl Value {
    /// Returns the error object if this value is one.
    pub fn as_error(&self) -> Option<&JsError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the elements if this value is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Smi(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<JsError> for Value {
    fn from(error: JsError) -> Self {
        Value::Error(error)
    }
}

/// Console-style rendering.
///
/// Strings print bare at the top level but quoted inside arrays, the way a
/// console shows `[ 'a', 1 ]`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => fmt_nested(other, f),
        }
    }
}

fn fmt_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Undefined => write!(f, "undefined"),
        Value::Null => write!(f, "null"),
        Value::Boolean(b) => write!(f, "{}", b),
        Value::Smi(n) => write!(f, "{}", n),
        Value::Double(n) => {
            if n.is_nan() {
                write!(f, "NaN")
            } else if n.is_infinite() {
                if n.is_sign_positive() {
                    write!(f, "Infinity")
                } else {
                    write!(f, "-Infinity")
                }
            } else if n.fract() == 0.0 && n.abs() < 1e15 {
                // Integer-valued doubles display without decimal point
                write!(f, "{}", *n as i64)
            } else {
                write!(f, "{}", n)
            }
        }
        Value::String(s) => write!(f, "'{}'", s),
        Value::Array(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                fmt_nested(item, f)?;
            }
            write!(f, "]")
        }
        Value::Error(e) => write!(f, "{}", e),
    }
}
