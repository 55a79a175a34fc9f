//! Formula result values

use std::fmt;

/// Error markers produced by evaluation
///
/// Every variant renders as text beginning with `#`, which is how cells and
/// information functions recognise an error value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// #ERROR - generic failure (bad arity, domain error, ...)
    Error,
    /// #ERROR: <message> - failure with a description
    Message(String),
    /// #N/A - value not available
    Na,
    /// #FEATURE_NOT_IMPLEMENTED - recognised function without an implementation
    NotImplemented,
    /// #CIRCULAR_REFERENCE - the cell takes part in a dependency cycle
    CircularReference,
}

impl ErrorCode {
    /// Build an error carrying a message
    pub fn message<S: Into<String>>(msg: S) -> Self {
        ErrorCode::Message(msg.into())
    }

    /// Parse the rendered form of an error
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "#ERROR" => Some(ErrorCode::Error),
            "#N/A" => Some(ErrorCode::Na),
            "#FEATURE_NOT_IMPLEMENTED" => Some(ErrorCode::NotImplemented),
            "#CIRCULAR_REFERENCE" => Some(ErrorCode::CircularReference),
            _ => s
                .strip_prefix("#ERROR: ")
                .map(|msg| ErrorCode::Message(msg.to_string())),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Error => write!(f, "#ERROR"),
            ErrorCode::Message(msg) => write!(f, "#ERROR: {}", msg),
            ErrorCode::Na => write!(f, "#N/A"),
            ErrorCode::NotImplemented => write!(f, "#FEATURE_NOT_IMPLEMENTED"),
            ErrorCode::CircularReference => write!(f, "#CIRCULAR_REFERENCE"),
        }
    }
}

/// The value a formula evaluates to
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FormulaValue {
    /// Numeric value (dates are rendered as text, not serial numbers)
    Number(f64),
    /// Text value
    Text(String),
    /// Boolean value (TRUE/FALSE)
    Boolean(bool),
    /// Error value
    Error(ErrorCode),
}

impl FormulaValue {
    /// Create a text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        FormulaValue::Text(s.into())
    }

    /// Create an error value with a message
    pub fn error_message<S: Into<String>>(msg: S) -> Self {
        FormulaValue::Error(ErrorCode::Message(msg.into()))
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Numeric view of the value.
    ///
    /// Booleans count as 1/0 and text is coerced with [`coerce_number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Text(s) => coerce_number(s),
            FormulaValue::Error(_) => None,
        }
    }

    /// Truthiness used by the logical functions.
    ///
    /// Zero and empty text are false; errors are true, like any non-empty text.
    pub fn is_truthy(&self) -> bool {
        match self {
            FormulaValue::Number(n) => *n != 0.0,
            FormulaValue::Text(s) => !s.is_empty(),
            FormulaValue::Boolean(b) => *b,
            FormulaValue::Error(_) => true,
        }
    }

    /// Rendered text of the value (what a cell displays)
    pub fn as_text(&self) -> String {
        match self {
            FormulaValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Default for FormulaValue {
    fn default() -> Self {
        FormulaValue::Text(String::new())
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Number(n) => write!(f, "{}", format_number(*n)),
            FormulaValue::Text(s) => write!(f, "{}", s),
            FormulaValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            FormulaValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<i64> for FormulaValue {
    fn from(n: i64) -> Self {
        FormulaValue::Number(n as f64)
    }
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::Text(s.to_string())
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::Text(s)
    }
}

impl From<ErrorCode> for FormulaValue {
    fn from(e: ErrorCode) -> Self {
        FormulaValue::Error(e)
    }
}

/// Interpret cell text as a number: surrounding whitespace is ignored and the
/// rest must be a complete decimal literal (`inf`/`nan` spellings included).
pub fn coerce_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Format a number for display.
///
/// Integral values below 1e15 print without a fractional part; infinities print
/// as `inf` / `-inf`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
