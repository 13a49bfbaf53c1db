//! Types module
//!
//! Core data structures used throughout the gateway:
//! - `request`: wire envelopes and typed operation parameters
//! - `transaction`: transaction records and lifecycle states
//! - `biller`: biller configuration
//! - `status`: status codes and localized labels
//! - `error`: error types for the gateway engine

pub mod biller;
pub mod error;
pub mod request;
pub mod status;
pub mod transaction;

pub use biller::{BillerCategory, BillerConfig, ServiceKind};
pub use error::{GatewayError, SimulatedFault};
pub use request::{
    InquireMultipleParams, InquireParams, Operation, OperationRequest, PayMultipleParams,
    PayParams, ServiceRequest, ServiceResponse, TransactionRef,
};
pub use transaction::{Transaction, TransactionEvent, TransactionStatus};
