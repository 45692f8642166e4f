//! Expression error types

use thiserror::Error;

/// Result type for expression operations
pub type ExprResult<T> = std::result::Result<T, ExprError>;

/// Errors that can occur during expression parsing or evaluation.
///
/// These are recovered at the cell-graph boundary (logged, value defaults
/// to `0.0`); they never escape past it.
#[derive(Debug, Error)]
pub enum ExprError {
    /// Expression parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// Identifier outside the allowlist
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Function call with the wrong number of arguments
    #[error("{function} takes {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Cell reference that could not be bound to a value
    #[error("unresolved cell reference '{0}'")]
    Unresolved(String),

    /// Division by zero or a math-domain failure
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Malformed transfer-function origin
    #[error("malformed transfer function '{0}'")]
    MalformedTf(String),
}
