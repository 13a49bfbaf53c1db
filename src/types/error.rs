//! Error types for the gateway engine.
//!
//! Lower layers return `GatewayError` values instead of raising; the
//! dispatcher is the single place where an error becomes a wire response.
//! Every variant maps onto exactly one three-digit status code, so callers
//! can branch on `StatusCode` alone.

use thiserror::Error;

use crate::types::status;
use crate::types::transaction::TransactionStatus;

/// A transient failure synthesized by the error-injection layer.
///
/// Picked uniformly at random when a biller's configured error rate fires.
/// The engine never retries these, so simulated outages stay observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimulatedFault {
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("Processing delay exceeded")]
    Timeout,
    #[error("External service error")]
    ExternalService,
    #[error("Database error")]
    Database,
    #[error("Unknown system error")]
    System,
}

impl SimulatedFault {
    /// Wire status code carried by this fault.
    pub fn status_code(&self) -> &'static str {
        match self {
            SimulatedFault::ServiceUnavailable => status::SERVICE_UNAVAILABLE,
            SimulatedFault::Timeout => status::TIMEOUT,
            SimulatedFault::ExternalService => status::EXTERNAL_SERVICE_ERROR,
            SimulatedFault::Database => status::DATABASE_ERROR,
            SimulatedFault::System => status::SYSTEM_ERROR,
        }
    }
}

/// Main error type for the gateway.
///
/// Validation variants are always produced before any persistence; business
/// variants are caller-correctable; `Simulated` carries an injected transient
/// fault; the remaining variants are internal faults surfaced as `5xx` codes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// A required request parameter is absent or empty.
    #[error("Missing parameter: {name}")]
    MissingParameter {
        /// Wire name of the missing parameter
        name: String,
    },

    /// A parameter is present but unusable.
    #[error("{detail}")]
    InvalidParameter {
        /// Human-readable description of the problem
        detail: String,
    },

    /// Amount is missing, unparsable, or outside the biller's allowed set.
    #[error("{detail}")]
    InvalidAmount { detail: String },

    /// Customer reference does not match the biller's configured format.
    #[error("Customer reference does not match the expected format")]
    InvalidReference,

    /// Phone number does not match the operator's configured format.
    #[error("Phone number does not match the expected format")]
    InvalidPhone,

    /// No active biller configured under this code.
    #[error("Biller not found: {code}")]
    BillerNotFound { code: String },

    /// No transaction recorded under this identifier.
    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: String },

    /// The transaction exists but cancellation is not permitted.
    #[error("{reason}")]
    CannotCancel { reason: String },

    /// A status change was requested that the state machine forbids.
    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Injected transient fault.
    #[error(transparent)]
    Simulated(#[from] SimulatedFault),

    /// Biller configuration itself is unusable (e.g. a broken regex).
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The backing store rejected an operation.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        GatewayError::Serialization {
            message: error.to_string(),
        }
    }
}

impl GatewayError {
    /// Wire status code for this error.
    pub fn status_code(&self) -> &'static str {
        match self {
            GatewayError::MissingParameter { .. } => status::MISSING_PARAMETER,
            GatewayError::InvalidParameter { .. } => status::INVALID_PARAMETER,
            GatewayError::InvalidAmount { .. } => status::INVALID_AMOUNT,
            GatewayError::InvalidReference => status::INVALID_REFERENCE,
            GatewayError::InvalidPhone => status::INVALID_PHONE,
            GatewayError::BillerNotFound { .. } => status::BILLER_NOT_FOUND,
            GatewayError::TransactionNotFound { .. } => status::TRANSACTION_NOT_FOUND,
            GatewayError::CannotCancel { .. } => status::CANNOT_CANCEL,
            GatewayError::IllegalTransition { .. } => status::INVALID_PARAMETER,
            GatewayError::Simulated(fault) => fault.status_code(),
            GatewayError::Configuration { .. } => status::SYSTEM_ERROR,
            GatewayError::Storage { .. } => status::DATABASE_ERROR,
            GatewayError::Serialization { .. } => status::SYSTEM_ERROR,
        }
    }

    /// Create a MissingParameter error
    pub fn missing_parameter(name: &str) -> Self {
        GatewayError::MissingParameter {
            name: name.to_string(),
        }
    }

    /// Create an InvalidParameter error
    pub fn invalid_parameter(detail: impl Into<String>) -> Self {
        GatewayError::InvalidParameter {
            detail: detail.into(),
        }
    }

    /// Create an InvalidParameter error for an unrecognized operation value
    pub fn unsupported_operation(operation: &str) -> Self {
        GatewayError::InvalidParameter {
            detail: format!("Unsupported operation: {operation}"),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(detail: impl Into<String>) -> Self {
        GatewayError::InvalidAmount {
            detail: detail.into(),
        }
    }

    /// Create a BillerNotFound error
    pub fn biller_not_found(code: &str) -> Self {
        GatewayError::BillerNotFound {
            code: code.to_string(),
        }
    }

    /// Create a TransactionNotFound error
    pub fn transaction_not_found(id: &str) -> Self {
        GatewayError::TransactionNotFound { id: id.to_string() }
    }

    /// Create a CannotCancel error
    pub fn cannot_cancel(reason: impl Into<String>) -> Self {
        GatewayError::CannotCancel {
            reason: reason.into(),
        }
    }

    /// Create an IllegalTransition error
    pub fn illegal_transition(from: TransactionStatus, to: TransactionStatus) -> Self {
        GatewayError::IllegalTransition { from, to }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        GatewayError::Storage {
            message: message.into(),
        }
    }
}
