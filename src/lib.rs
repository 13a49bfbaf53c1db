//! Bill Payment Gateway Engine
//! # Overview
//!
//! This library implements a simulated bill payment and telecom recharge
//! gateway: a single JSON request/response contract covering bill inquiry,
//! payment, batch operations and transaction lifecycle management.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Wire envelope, typed operation parameters, domain errors,
//!   status codes and localized labels
//! - [`catalog`] - Biller catalog with per-biller validation formats, delays
//!   and error rates
//! - [`engine`] - Business logic components:
//!   - [`engine::dispatcher`] - Operation routing and post-payment side channels
//!   - [`engine::processor`] - Inquiry and payment execution with replay
//!   - [`engine::state_machine`] - Status transitions, `STATUS` and `CANCEL`
//!   - [`engine::batch`] - `INQUIRE_MULTIPLE` and `PAY_MULTIPLE`
//! - [`store`] - Transaction persistence with atomic session-keyed inserts
//! - [`guard`] - Transport-level idempotency cache and brute-force lockout
//! - [`notify`] - Payment history archive and webhook notification
//! - [`cli`] - CLI argument parsing
//!
//! # Operations
//!
//! Requests carry `ParamIn["Operation"]`, one of:
//!
//! - **INQUIRE**: Look up a bill or validate a recharge number
//! - **PAY**: Settle a payment or recharge, idempotently per session id
//! - **INQUIRE_MULTIPLE**: Current bill plus recent bill history
//! - **PAY_MULTIPLE**: A batch of payments under one group transaction id
//! - **STATUS**: Read a transaction's current state
//! - **CANCEL**: Cancel a recent `COMPLETED` or `PENDING` transaction
//!
//! # Status Codes
//!
//! Every response carries a three-digit status code: `000`/`001`/`002` for
//! outcomes, `1xx` for validation failures, `2xx` for business rejections
//! and `5xx` for (simulated) infrastructure faults. Labels are localized in
//! French, English and Arabic, with French as the fallback.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod guard;
pub mod notify;
pub mod store;
pub mod types;

pub use catalog::{BillerCatalog, InMemoryBillerCatalog};
pub use config::{GatewayConfig, SecurityConfig};
pub use engine::{BillerProcessor, Gateway, OperationDispatcher, TransactionLifecycle};
pub use guard::{BruteForceGuard, IdempotencyCache};
pub use store::{InMemoryTransactionStore, TransactionStore};
pub use types::error::GatewayError;
pub use types::request::{Operation, ServiceRequest, ServiceResponse};
pub use types::transaction::{Transaction, TransactionStatus};
