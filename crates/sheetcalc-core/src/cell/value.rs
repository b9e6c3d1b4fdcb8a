//! Value types

use crate::cell::CellKind;
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// A computed cell result, or the literal held by a plain cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value
    #[default]
    Blank,

    /// Numeric value (all numbers are f64, including date serials)
    Number(f64),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Text value
    Text(SharedString),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(ErrorCode),
}

impl Value {
    /// Create a new text value
    pub fn text<S: AsRef<str>>(s: S) -> Self {
        Value::Text(SharedString::new(s))
    }

    /// Check if the value is blank
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Blank)
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The error code, if this is an error
    pub fn error(&self) -> Option<ErrorCode> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Extract a number
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(other.mismatch("number")),
        }
    }

    /// Extract a boolean
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(other.mismatch("boolean")),
        }
    }

    /// Extract text
    pub fn as_text(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s.as_str()),
            other => Err(other.mismatch("text")),
        }
    }

    /// Extract an error code
    pub fn as_error(&self) -> Result<ErrorCode> {
        match self {
            Value::Error(e) => Ok(*e),
            other => Err(other.mismatch("error")),
        }
    }

    /// The kind a plain cell holding this value reports
    pub fn kind(&self) -> CellKind {
        match self {
            Value::Blank => CellKind::Blank,
            Value::Number(_) => CellKind::Numeric,
            Value::Boolean(_) => CellKind::Boolean,
            Value::Text(_) => CellKind::Text,
            Value::Error(_) => CellKind::Error,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Blank => "blank",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "text",
            Value::Error(_) => "error",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            actual: self.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Blank => Ok(()),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Text(s) => write!(f, "{}", s.as_str()),
            Value::Error(e) => write!(f, "{}", e),
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
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<ErrorCode> for Value {
    fn from(e: ErrorCode) -> Self {
        Value::Error(e)
    }
}

/// Formula error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// #NULL! - Intersection of two ranges that do not intersect
    NullIntersection,
    /// #DIV/0! - Division by zero
    DivideByZero,
    /// #VALUE! - Wrong type of argument or operand
    InvalidValue,
    /// #REF! - Reference to a missing sheet or an out-of-bounds cell
    InvalidReference,
    /// #NAME? - Unrecognized function or name
    NameNotFound,
    /// #NUM! - Non-finite or out-of-domain numeric result
    NumericOverflow,
    /// #N/A - Value not available
    NotApplicable,
    /// A cell that depends on itself
    CircularReference,
}

impl ErrorCode {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NullIntersection => "#NULL!",
            ErrorCode::DivideByZero => "#DIV/0!",
            ErrorCode::InvalidValue => "#VALUE!",
            ErrorCode::InvalidReference => "#REF!",
            ErrorCode::NameNotFound => "#NAME?",
            ErrorCode::NumericOverflow => "#NUM!",
            ErrorCode::NotApplicable => "#N/A",
            ErrorCode::CircularReference => "#CIRCULAR!",
        }
    }

    /// Parse an error string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(ErrorCode::NullIntersection),
            "#DIV/0!" => Some(ErrorCode::DivideByZero),
            "#VALUE!" => Some(ErrorCode::InvalidValue),
            "#REF!" => Some(ErrorCode::InvalidReference),
            "#NAME?" => Some(ErrorCode::NameNotFound),
            "#NUM!" => Some(ErrorCode::NumericOverflow),
            "#N/A" => Some(ErrorCode::NotApplicable),
            "#CIRCULAR!" => Some(ErrorCode::CircularReference),
            _ => None,
        }
    }

    /// Get the numeric error code
    ///
    /// Circular references have no code in the file formats; they use 0xC4.
    pub fn code(&self) -> u8 {
        match self {
            ErrorCode::NullIntersection => 0x00,
            ErrorCode::DivideByZero => 0x07,
            ErrorCode::InvalidValue => 0x0F,
            ErrorCode::InvalidReference => 0x17,
            ErrorCode::NameNotFound => 0x1D,
            ErrorCode::NumericOverflow => 0x24,
            ErrorCode::NotApplicable => 0x2A,
            ErrorCode::CircularReference => 0xC4,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference-counted string, so copying a text value between cache,
/// cells and function arguments never copies the bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedString(Arc<str>);

impl SharedString {
    /// Create a new shared string
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    /// Get the string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length of the string in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the string is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42), Value::Number(42.0));
        assert_eq!(Value::from(3.5), Value::Number(3.5));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from("hello").as_text().unwrap(), "hello");
        assert_eq!(
            Value::from(ErrorCode::NotApplicable),
            Value::Error(ErrorCode::NotApplicable)
        );
    }

    #[test]
    fn test_typed_extraction_mismatch() {
        assert_eq!(Value::Number(2.0).as_number().unwrap(), 2.0);
        assert!(Value::Boolean(true).as_bool().unwrap());

        let err = Value::text("x").as_number().unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "number",
                actual: "text"
            }
        ));

        assert!(Value::Blank.as_text().is_err());
        assert!(Value::Number(1.0).as_error().is_err());
        assert!(Value::Boolean(false).as_number().is_err());
    }

    #[test]
    fn test_blank_is_distinct() {
        assert_ne!(Value::Blank, Value::Number(0.0));
        assert_ne!(Value::Blank, Value::text(""));
        assert_ne!(Value::Blank, Value::Boolean(false));
        assert_eq!(Value::Blank, Value::default());
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::Blank.kind(), CellKind::Blank);
        assert_eq!(Value::Number(1.0).kind(), CellKind::Numeric);
        assert_eq!(Value::Boolean(true).kind(), CellKind::Boolean);
        assert_eq!(Value::text("a").kind(), CellKind::Text);
        assert_eq!(
            Value::Error(ErrorCode::DivideByZero).kind(),
            CellKind::Error
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
        assert_eq!(Value::Blank.to_string(), "");
        assert_eq!(Value::Error(ErrorCode::NameNotFound).to_string(), "#NAME?");
    }

    #[test]
    fn test_error_code_parse() {
        assert_eq!(ErrorCode::from_str("#DIV/0!"), Some(ErrorCode::DivideByZero));
        assert_eq!(ErrorCode::from_str("#n/a"), Some(ErrorCode::NotApplicable));
        assert_eq!(ErrorCode::from_str("invalid"), None);
        assert_eq!(ErrorCode::InvalidReference.code(), 0x17);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_error_code_serde() {
        for code in [ErrorCode::DivideByZero, ErrorCode::CircularReference] {
            let json = serde_json::to_string(&code).unwrap();
            let back: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(back, code);
        }
        assert_eq!(
            serde_json::to_string(&ErrorCode::NotApplicable).unwrap(),
            "\"NotApplicable\""
        );
    }
}
