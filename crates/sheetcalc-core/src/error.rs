//! Error types for sheetcalc-core
//!
//! These are contract violations: a caller handed the workbook something it
//! cannot represent. Errors a formula author can cause are [`crate::ErrorCode`]
//! values instead.

use crate::cell::CellKind;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or evaluating a workbook
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetIndexOutOfBounds(usize, usize),

    /// Sheet not found by name or id
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// A typed accessor was called on the wrong variant
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// An operation was handed a cell of a kind it does not support
    #[error("Unsupported cell kind for {operation}: {kind}")]
    UnsupportedCellKind {
        operation: &'static str,
        kind: CellKind,
    },

    /// A reference token that cannot name any cell
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    /// Formula text that does not parse
    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    /// Evaluation nested deeper than the configured limit
    #[error("Evaluation exceeded the maximum depth of {0}")]
    RecursionLimit(usize),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
