//! Transaction lifecycle: legal status transitions, `STATUS` and `CANCEL`.
//!
//! The transition table is the single authority on what a status may become.
//! `STATUS` is a pure read. `CANCEL` validates and mutates inside one atomic
//! store update, so a concurrent second cancel observes the first one's
//! result instead of double-cancelling. Every transition appends an audit
//! event with the previous and new status.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::TransactionStore;
use crate::types::error::GatewayError;
use crate::types::request::{ServiceRequest, ServiceResponse, TransactionRef};
use crate::types::transaction::{
    format_timestamp, Transaction, TransactionEvent, TransactionStatus,
};

/// Hours after creation during which a transaction may still be cancelled.
const CANCEL_WINDOW_HOURS: i64 = 24;

/// Checks one status change against the transition table.
///
/// Legal moves: `PENDING -> {COMPLETED, FAILED, CANCELLED}`,
/// `COMPLETED -> {CANCELLED, REFUNDING}`, `FAILED -> PENDING` (retry),
/// `REFUNDING -> {REFUNDED, FAILED}`. Terminal states admit nothing.
pub fn validate_transition(
    from: TransactionStatus,
    to: TransactionStatus,
) -> Result<(), GatewayError> {
    use TransactionStatus::*;

    let legal = matches!(
        (from, to),
        (Pending, Completed)
            | (Pending, Failed)
            | (Pending, Cancelled)
            | (Completed, Cancelled)
            | (Completed, Refunding)
            | (Failed, Pending)
            | (Refunding, Refunded)
            | (Refunding, Failed)
    );
    if legal {
        Ok(())
    } else {
        Err(GatewayError::illegal_transition(from, to))
    }
}

/// Payload of a `STATUS` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionStatusView {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub biller_code: String,
    pub amount: Decimal,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub receipt_number: Option<String>,
}

/// Payload of a `CANCEL` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CancellationView {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub biller_code: String,
    pub amount: Decimal,
    pub cancelled_at: Option<String>,
}

/// Lifecycle operations over persisted transactions.
pub struct TransactionLifecycle {
    store: Arc<dyn TransactionStore>,
}

impl TransactionLifecycle {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        TransactionLifecycle { store }
    }

    /// `STATUS`: reads the current state of a transaction.
    pub async fn status(
        &self,
        request: &ServiceRequest,
        params: &TransactionRef,
    ) -> Result<ServiceResponse, GatewayError> {
        let tx = self
            .store
            .get_by_transaction_id(&params.transaction_id)
            .await
            .ok_or_else(|| GatewayError::transaction_not_found(&params.transaction_id))?;

        let view = TransactionStatusView {
            transaction_id: tx.transaction_id.clone(),
            status: tx.status,
            biller_code: tx.biller_code.clone(),
            amount: tx.amount,
            created_at: format_timestamp(&tx.created_at),
            completed_at: tx.completed_at.as_ref().map(format_timestamp),
            receipt_number: tx.receipt_number.clone(),
        };

        Ok(ServiceResponse::ok(
            request,
            "Statut récupéré avec succès",
            serde_json::to_value(view)?,
        ))
    }

    /// `CANCEL`: moves a `COMPLETED` or `PENDING` transaction to
    /// `CANCELLED`, within 24 hours of creation.
    pub async fn cancel(
        &self,
        request: &ServiceRequest,
        params: &TransactionRef,
    ) -> Result<ServiceResponse, GatewayError> {
        let before = self
            .store
            .get_by_transaction_id(&params.transaction_id)
            .await
            .ok_or_else(|| GatewayError::transaction_not_found(&params.transaction_id))?;

        let updated = self
            .store
            .apply(
                &params.transaction_id,
                Box::new(|tx| {
                    if !matches!(
                        tx.status,
                        TransactionStatus::Completed | TransactionStatus::Pending
                    ) {
                        return Err(GatewayError::cannot_cancel(format!(
                            "Cannot cancel a transaction in status {}",
                            tx.status
                        )));
                    }
                    let age = Utc::now() - tx.created_at;
                    if age > chrono::Duration::hours(CANCEL_WINDOW_HOURS) {
                        return Err(GatewayError::cannot_cancel(
                            "Cannot cancel a transaction older than 24 hours",
                        ));
                    }
                    tx.status = TransactionStatus::Cancelled;
                    tx.cancelled_at = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;

        self.store
            .append_event(TransactionEvent {
                transaction_id: updated.transaction_id.clone(),
                action: "CANCEL".to_string(),
                details: "Transaction cancelled by caller".to_string(),
                previous_status: Some(before.status),
                new_status: TransactionStatus::Cancelled,
                timestamp: Utc::now(),
            })
            .await;
        info!(transaction_id = %updated.transaction_id, "transaction cancelled");

        let view = CancellationView {
            transaction_id: updated.transaction_id.clone(),
            status: updated.status,
            biller_code: updated.biller_code.clone(),
            amount: updated.amount,
            cancelled_at: updated.cancelled_at.as_ref().map(format_timestamp),
        };

        Ok(ServiceResponse::ok(
            request,
            "Transaction annulée avec succès",
            serde_json::to_value(view)?,
        ))
    }

    /// Generic status change used by refund-style flows.
    ///
    /// Validates against the transition table, maintains the timestamp and
    /// failure-reason bookkeeping, and appends a `STATUS_CHANGE` event.
    pub async fn change_status(
        &self,
        transaction_id: &str,
        new_status: TransactionStatus,
        reason: Option<String>,
    ) -> Result<Transaction, GatewayError> {
        let before = self
            .store
            .get_by_transaction_id(transaction_id)
            .await
            .ok_or_else(|| GatewayError::transaction_not_found(transaction_id))?;

        let closure_reason = reason.clone();
        let updated = self
            .store
            .apply(
                transaction_id,
                Box::new(move |tx| {
                    validate_transition(tx.status, new_status)?;
                    tx.status = new_status;
                    let now = Utc::now();
                    match new_status {
                        TransactionStatus::Completed => {
                            tx.completed_at = Some(now);
                            tx.failure_reason = None;
                        }
                        TransactionStatus::Cancelled => tx.cancelled_at = Some(now),
                        TransactionStatus::Failed => tx.failure_reason = closure_reason,
                        _ => {}
                    }
                    Ok(())
                }),
            )
            .await?;

        self.store
            .append_event(TransactionEvent {
                transaction_id: updated.transaction_id.clone(),
                action: "STATUS_CHANGE".to_string(),
                details: reason.unwrap_or_else(|| {
                    format!("Status changed from {} to {}", before.status, new_status)
                }),
                previous_status: Some(before.status),
                new_status,
                timestamp: Utc::now(),
            })
            .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTransactionStore;
    use rstest::rstest;

    fn seeded_transaction(transaction_id: &str, status: TransactionStatus) -> Transaction {
        Transaction {
            transaction_id: transaction_id.to_string(),
            biller_code: "EGY-GAS".to_string(),
            biller_name: "Gaz d'Égypte".to_string(),
            customer_reference: Some("GZ1234567".to_string()),
            phone_number: None,
            amount: Decimal::from(120),
            status,
            session_id: format!("sess-{transaction_id}"),
            service_id: "BILL".to_string(),
            channel_id: "API".to_string(),
            group_transaction_id: None,
            receipt_number: Some("REC20250101123456".to_string()),
            failure_reason: None,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            cancelled_at: None,
            raw_request: None,
            raw_response: None,
        }
    }

    async fn lifecycle_with(
        transactions: Vec<Transaction>,
    ) -> (TransactionLifecycle, Arc<InMemoryTransactionStore>) {
        let store = Arc::new(InMemoryTransactionStore::new());
        for tx in transactions {
            store.create(tx).await.unwrap();
        }
        (TransactionLifecycle::new(store.clone()), store)
    }

    #[rstest]
    #[case::pending_completes(TransactionStatus::Pending, TransactionStatus::Completed, true)]
    #[case::pending_fails(TransactionStatus::Pending, TransactionStatus::Failed, true)]
    #[case::pending_cancels(TransactionStatus::Pending, TransactionStatus::Cancelled, true)]
    #[case::completed_cancels(TransactionStatus::Completed, TransactionStatus::Cancelled, true)]
    #[case::completed_refunds(TransactionStatus::Completed, TransactionStatus::Refunding, true)]
    #[case::failed_retries(TransactionStatus::Failed, TransactionStatus::Pending, true)]
    #[case::refunding_settles(TransactionStatus::Refunding, TransactionStatus::Refunded, true)]
    #[case::refunding_fails(TransactionStatus::Refunding, TransactionStatus::Failed, true)]
    #[case::completed_cannot_pend(TransactionStatus::Completed, TransactionStatus::Pending, false)]
    #[case::cancelled_is_terminal(TransactionStatus::Cancelled, TransactionStatus::Pending, false)]
    #[case::refunded_is_terminal(TransactionStatus::Refunded, TransactionStatus::Refunding, false)]
    #[case::pending_cannot_refund(TransactionStatus::Pending, TransactionStatus::Refunding, false)]
    #[case::no_self_loop(TransactionStatus::Completed, TransactionStatus::Completed, false)]
    fn transition_table(
        #[case] from: TransactionStatus,
        #[case] to: TransactionStatus,
        #[case] legal: bool,
    ) {
        assert_eq!(validate_transition(from, to).is_ok(), legal);
    }

    #[tokio::test]
    async fn status_is_a_pure_read() {
        let (lifecycle, store) =
            lifecycle_with(vec![seeded_transaction("tx-1", TransactionStatus::Completed)]).await;
        let request = ServiceRequest::new("sess-q", "BILL");

        let response = lifecycle
            .status(
                &request,
                &TransactionRef {
                    transaction_id: "tx-1".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(response.status_code, "000");
        let out = response.param_out.unwrap();
        assert_eq!(out["Status"], "COMPLETED");
        assert_eq!(out["TransactionId"], "tx-1");
        assert!(store.events_for("tx-1").await.is_empty());
    }

    #[tokio::test]
    async fn status_unknown_transaction_is_not_found() {
        let (lifecycle, _) = lifecycle_with(vec![]).await;
        let request = ServiceRequest::new("sess-q", "BILL");
        let err = lifecycle
            .status(
                &request,
                &TransactionRef {
                    transaction_id: "missing".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::transaction_not_found("missing"));
    }

    #[tokio::test]
    async fn cancel_completes_with_event_and_timestamp() {
        let (lifecycle, store) =
            lifecycle_with(vec![seeded_transaction("tx-1", TransactionStatus::Completed)]).await;
        let request = ServiceRequest::new("sess-c", "BILL");

        let response = lifecycle
            .cancel(
                &request,
                &TransactionRef {
                    transaction_id: "tx-1".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(response.status_code, "000");
        let out = response.param_out.unwrap();
        assert_eq!(out["Status"], "CANCELLED");
        assert!(out["CancelledAt"].is_string());

        let tx = store.get_by_transaction_id("tx-1").await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Cancelled);
        assert!(tx.cancelled_at.is_some());

        let events = store.events_for("tx-1").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "CANCEL");
        assert_eq!(events[0].previous_status, Some(TransactionStatus::Completed));
    }

    #[rstest]
    #[case::cancelled(TransactionStatus::Cancelled)]
    #[case::refunded(TransactionStatus::Refunded)]
    #[case::failed(TransactionStatus::Failed)]
    #[case::refunding(TransactionStatus::Refunding)]
    #[tokio::test]
    async fn cancel_rejects_illegal_source_states(#[case] status: TransactionStatus) {
        let (lifecycle, store) = lifecycle_with(vec![seeded_transaction("tx-1", status)]).await;
        let request = ServiceRequest::new("sess-c", "BILL");

        let err = lifecycle
            .cancel(
                &request,
                &TransactionRef {
                    transaction_id: "tx-1".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), "206");
        assert_eq!(
            store.get_by_transaction_id("tx-1").await.unwrap().status,
            status
        );
        assert!(store.events_for("tx-1").await.is_empty());
    }

    #[tokio::test]
    async fn cancel_rejects_transactions_older_than_the_window() {
        let mut stale = seeded_transaction("tx-1", TransactionStatus::Completed);
        stale.created_at = Utc::now() - chrono::Duration::hours(25);
        let (lifecycle, _) = lifecycle_with(vec![stale]).await;
        let request = ServiceRequest::new("sess-c", "BILL");

        let err = lifecycle
            .cancel(
                &request,
                &TransactionRef {
                    transaction_id: "tx-1".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::cannot_cancel("Cannot cancel a transaction older than 24 hours")
        );
    }

    #[tokio::test]
    async fn change_status_runs_a_refund_flow() {
        let (lifecycle, store) =
            lifecycle_with(vec![seeded_transaction("tx-1", TransactionStatus::Completed)]).await;

        lifecycle
            .change_status("tx-1", TransactionStatus::Refunding, None)
            .await
            .unwrap();
        let refunded = lifecycle
            .change_status(
                "tx-1",
                TransactionStatus::Refunded,
                Some("Refund settled".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(refunded.status, TransactionStatus::Refunded);
        let events = store.events_for("tx-1").await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].details, "Refund settled");
        assert_eq!(events[1].previous_status, Some(TransactionStatus::Refunding));
    }

    #[tokio::test]
    async fn change_status_rejects_illegal_moves() {
        let (lifecycle, _) =
            lifecycle_with(vec![seeded_transaction("tx-1", TransactionStatus::Pending)]).await;

        let err = lifecycle
            .change_status("tx-1", TransactionStatus::Refunded, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::illegal_transition(
                TransactionStatus::Pending,
                TransactionStatus::Refunded
            )
        );
    }

    #[tokio::test]
    async fn change_status_to_failed_records_the_reason() {
        let (lifecycle, _) =
            lifecycle_with(vec![seeded_transaction("tx-1", TransactionStatus::Pending)]).await;

        let failed = lifecycle
            .change_status(
                "tx-1",
                TransactionStatus::Failed,
                Some("Upstream rejected".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(failed.failure_reason.as_deref(), Some("Upstream rejected"));

        // FAILED -> PENDING retry is legal and clears nothing
        let retried = lifecycle
            .change_status("tx-1", TransactionStatus::Pending, None)
            .await
            .unwrap();
        assert_eq!(retried.status, TransactionStatus::Pending);
    }
}
