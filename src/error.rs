use rust_decimal::Decimal;

/// Runtime error kinds
///
/// Every fallible operation in the crate reports one of these. The external
/// API layer maps them onto HTTP status codes via [`RuntimeError::http_status`]
/// and a machine-readable kind via [`RuntimeError::kind`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Bad input, rejected before any state change
    Validation(String),
    /// Unknown strategy, market or trade id
    NotFound(String),
    /// The trade would drive cash below zero; nothing was applied
    InsufficientFunds { required: Decimal, available: Decimal },
    /// Operation not valid in the current lifecycle state
    Conflict(String),
    /// Unexpected failure inside a strategy tick, caught at the runtime boundary
    InternalFault(String),
}

impl RuntimeError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::Validation(_) => "validation_error",
            RuntimeError::NotFound(_) => "not_found",
            RuntimeError::InsufficientFunds { .. } => "insufficient_funds",
            RuntimeError::Conflict(_) => "conflict",
            RuntimeError::InternalFault(_) => "internal_fault",
        }
    }

    /// HTTP status code the API layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            RuntimeError::Validation(_) => 400,
            RuntimeError::InsufficientFunds { .. } => 400,
            RuntimeError::NotFound(_) => 404,
            RuntimeError::Conflict(_) => 409,
            RuntimeError::InternalFault(_) => 500,
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Validation(msg) => write!(f, "Validation error: {}", msg),
            RuntimeError::NotFound(msg) => write!(f, "Not found: {}", msg),
            RuntimeError::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "Insufficient funds: required {}, available {}",
                required, available
            ),
            RuntimeError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            RuntimeError::InternalFault(msg) => write!(f, "Internal fault: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}
