//! Formula error types

use sheetcalc_core::{ErrorCode, FormulaValue};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula evaluation
///
/// None of these cross the engine boundary: they are converted to an
/// [`ErrorCode`] with [`FormulaError::to_error_code`].
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Missing argument, wrong arity or invalid domain; rendered as a bare `#ERROR`
    #[error("invalid arguments")]
    Invalid,

    /// Invalid argument with a description
    #[error("{0}")]
    Argument(String),

    /// Argument that should have been numeric
    #[error("Expected a number, got '{0}'")]
    NotNumeric(String),

    /// Arithmetic expression that could not be evaluated
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Unknown function
    #[error("Unknown function {0}")]
    UnknownFunction(String),

    /// A range with more or fewer than two endpoints
    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    /// Range expansion above the configured cell limit
    #[error("Range too large")]
    RangeTooLarge,

    /// Reference to invalid cell
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Error value received as an argument, passed on unchanged
    #[error("{0}")]
    Value(ErrorCode),

    /// Error from the core crate
    #[error(transparent)]
    Core(#[from] sheetcalc_core::Error),
}

impl FormulaError {
    /// Build an argument error from any message
    pub fn argument<S: Into<String>>(msg: S) -> Self {
        FormulaError::Argument(msg.into())
    }

    /// The error code this failure is displayed as
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            FormulaError::Invalid => ErrorCode::Error,
            FormulaError::Value(code) => code.clone(),
            other => ErrorCode::Message(other.to_string()),
        }
    }
}

impl From<FormulaError> for FormulaValue {
    fn from(e: FormulaError) -> Self {
        FormulaValue::Error(e.to_error_code())
    }
}
