//! Error types for program parsing, evaluation, marshaling and the engine call.

use thiserror::Error;

/// Errors surfaced by the crate.
///
/// None of these are retried internally: a malformed program or an
/// unreachable native library cannot succeed without caller intervention.
#[derive(Debug, Error)]
pub enum XgpError {
    /// A text program could not be parsed.
    #[error("malformed expression `{expr}`: {reason}")]
    MalformedExpression {
        /// The (sub)expression that failed to parse.
        expr: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A JSON program or ensemble document does not follow the schema.
    #[error("schema error: {0}")]
    Schema(String),
    /// The operator name is not in the operator table.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    /// An operator node was built with the wrong number of operands.
    #[error("operator `{op}` expects {expected} operand(s), got {got}")]
    ArityMismatch {
        /// Operator name.
        op: &'static str,
        /// Declared arity.
        expected: usize,
        /// Operands supplied.
        got: usize,
    },
    /// A variable references a column the input matrix does not have.
    #[error("variable X[{index}] out of range for a matrix with {columns} column(s)")]
    IndexOutOfRange {
        /// Referenced column.
        index: usize,
        /// Columns available.
        columns: usize,
    },
    /// An array of unsupported dimensionality was handed to the marshaler.
    #[error("cannot marshal an array with {ndim} dimension(s); expected 1 or 2")]
    Shape {
        /// Dimensionality of the rejected array.
        ndim: usize,
    },
    /// A string was not valid UTF-8.
    #[error("encoding error: {0}")]
    Encoding(String),
    /// The native routine could not be resolved, or the call failed.
    #[error("boundary call failed: {0}")]
    BoundaryCall(String),
    /// A prediction was requested before any program was installed.
    #[error("model is not fitted")]
    NotFitted,
    /// Configuration values are out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Features, targets and weights do not line up.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored model or dataset could not be decoded.
    #[error("persistence error: {0}")]
    Persist(String),
}

impl XgpError {
    pub(crate) fn malformed(expr: &str, reason: impl Into<String>) -> Self {
        Self::MalformedExpression {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = XgpError> = std::result::Result<T, E>;
