//! Formula error types
//!
//! These are contract violations surfaced to the caller. Problems a formula
//! author can cause (bad operands, dangling references) become
//! [`sheetcalc_core::ErrorCode`] values inside the result instead.

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing, resolution or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula text does not follow the grammar
    #[error("Parse error: {0}")]
    Parse(String),

    /// A reference token that cannot name any cell in any workbook
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    /// A well-formed reference that names nothing in this workbook
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Invalid argument handed to a library entry point
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Error raised by the workbook model
    #[error(transparent)]
    Core(#[from] sheetcalc_core::Error),
}

impl From<FormulaError> for sheetcalc_core::Error {
    fn from(err: FormulaError) -> Self {
        match err {
            FormulaError::Parse(msg) => sheetcalc_core::Error::FormulaParse(msg),
            FormulaError::MalformedReference(msg) => {
                sheetcalc_core::Error::MalformedReference(msg)
            }
            FormulaError::Core(inner) => inner,
            other => sheetcalc_core::Error::Other(other.to_string()),
        }
    }
}
