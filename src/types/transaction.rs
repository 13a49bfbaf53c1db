//! Transaction records and their lifecycle states.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a payment or recharge transaction.
///
/// Legal transitions are enforced by the state machine in
/// [`crate::engine::state_machine`]; the enum itself is just data.
/// `CANCELLED` and `REFUNDED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunding,
    Refunded,
}

impl TransactionStatus {
    /// True for states that admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Cancelled | TransactionStatus::Refunded
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Refunding => "REFUNDING",
            TransactionStatus::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

/// A persisted payment or recharge.
///
/// `session_id` is the caller-supplied idempotency key: the store enforces
/// at most one transaction per session id. `raw_request` and `raw_response`
/// hold the serialized wire envelopes for audit and for replay
/// reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Globally unique identifier (UUID, simple format)
    pub transaction_id: String,
    pub biller_code: String,
    pub biller_name: String,
    /// Set for bill payments, absent for recharges
    pub customer_reference: Option<String>,
    /// Set for recharges, absent for bill payments
    pub phone_number: Option<String>,
    pub amount: Decimal,
    pub status: TransactionStatus,
    /// Idempotency key, unique across all transactions
    pub session_id: String,
    pub service_id: String,
    pub channel_id: String,
    /// Shared tag linking the members of one batch payment
    pub group_transaction_id: Option<String>,
    pub receipt_number: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub raw_request: Option<String>,
    pub raw_response: Option<String>,
}

/// Append-only audit row written on every state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub transaction_id: String,
    /// Action tag, e.g. `PAYMENT`, `RECHARGE`, `CANCEL`, `STATUS_CHANGE`
    pub action: String,
    pub details: String,
    pub previous_status: Option<TransactionStatus>,
    pub new_status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

/// Formats a business timestamp the way the wire contract expects.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
