//! Routes a decoded request to the owning component.
//!
//! One entry point, `process`, returns the ordered, never-empty response
//! list the wire contract promises. Domain errors are converted to error
//! responses here, so the components below stay `Result`-based. Payment
//! responses additionally flow into the history archive (awaited, failures
//! logged) and the webhook notifier (detached, bounded by a timeout).

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::batch::BatchOrchestrator;
use crate::engine::processor::BillerProcessor;
use crate::engine::state_machine::TransactionLifecycle;
use crate::notify::{log_history_failure, HistoryRecorder, WebhookNotifier, WebhookPayload};
use crate::types::error::GatewayError;
use crate::types::request::{OperationRequest, ServiceRequest, ServiceResponse};

pub struct OperationDispatcher {
    processor: Arc<BillerProcessor>,
    lifecycle: TransactionLifecycle,
    batch: BatchOrchestrator,
    history: Arc<dyn HistoryRecorder>,
    webhook: Arc<dyn WebhookNotifier>,
    webhook_timeout: Duration,
}

impl OperationDispatcher {
    pub fn new(
        processor: Arc<BillerProcessor>,
        lifecycle: TransactionLifecycle,
        batch: BatchOrchestrator,
        history: Arc<dyn HistoryRecorder>,
        webhook: Arc<dyn WebhookNotifier>,
        webhook_timeout: Duration,
    ) -> Self {
        OperationDispatcher {
            processor,
            lifecycle,
            batch,
            history,
            webhook,
            webhook_timeout,
        }
    }

    /// Executes one request and returns its response list.
    ///
    /// Single operations yield one response; `PAY_MULTIPLE` yields the
    /// summary followed by one response per instruction. A decode failure
    /// yields a single error response.
    pub async fn process(&self, request: &ServiceRequest) -> Vec<ServiceResponse> {
        info!(
            session_id = %request.session_id,
            service_id = %request.service_id,
            "processing request"
        );

        let (operation, decoded) = match OperationRequest::decode(request) {
            Ok(decoded) => decoded,
            Err(error) => return vec![ServiceResponse::from_error(request, &error)],
        };
        info!(session_id = %request.session_id, %operation, "dispatching");

        let responses = match decoded {
            OperationRequest::Inquire(params) => {
                vec![self.single(request, self.processor.inquire(request, &params).await)]
            }
            OperationRequest::InquireMultiple(params) => {
                vec![self.single(request, self.batch.inquire_multiple(request, &params).await)]
            }
            OperationRequest::Pay(params) => {
                vec![self.single(request, self.processor.pay(request, &params).await)]
            }
            OperationRequest::PayMultiple(params) => {
                self.batch.pay_multiple(request, &params).await
            }
            OperationRequest::Status(params) => {
                vec![self.single(request, self.lifecycle.status(request, &params).await)]
            }
            OperationRequest::Cancel(params) => {
                vec![self.single(request, self.lifecycle.cancel(request, &params).await)]
            }
        };

        if operation.is_payment() {
            self.record_payment(request, &responses).await;
        }
        responses
    }

    fn single(
        &self,
        request: &ServiceRequest,
        result: Result<ServiceResponse, GatewayError>,
    ) -> ServiceResponse {
        match result {
            Ok(response) => response,
            Err(error) => ServiceResponse::from_error(request, &error),
        }
    }

    /// Archives payment responses and fires detached webhook notifications.
    async fn record_payment(&self, request: &ServiceRequest, responses: &[ServiceResponse]) {
        for response in responses {
            info!(
                session_id = %response.session_id,
                status_code = %response.status_code,
                "payment response"
            );
            if let Err(error) = self.history.save(request, response).await {
                log_history_failure(&response.session_id, &error);
            }

            let webhook = Arc::clone(&self.webhook);
            let payload = WebhookPayload::from_response(response);
            let timeout = self.webhook_timeout;
            tokio::spawn(async move {
                // best-effort; the response has already been produced
                let _ = tokio::time::timeout(timeout, webhook.notify(payload)).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BillerCatalog, InMemoryBillerCatalog};
    use crate::notify::{InMemoryHistory, LoggingNotifier};
    use crate::store::InMemoryTransactionStore;
    use crate::types::biller::{BillerCategory, BillerConfig};
    use serde_json::json;

    async fn dispatcher_fixture() -> (OperationDispatcher, Arc<InMemoryHistory>) {
        let catalog = Arc::new(InMemoryBillerCatalog::new());
        catalog
            .upsert(
                BillerConfig::bill_payment("EGY-GAS", "Gaz d'Égypte", BillerCategory::Gas)
                    .with_reference_format("^GZ[0-9]{7,11}$"),
            )
            .await;
        let store = Arc::new(InMemoryTransactionStore::new());
        let processor = Arc::new(BillerProcessor::new(catalog.clone(), store.clone()));
        let history = Arc::new(InMemoryHistory::new());
        let dispatcher = OperationDispatcher::new(
            processor.clone(),
            TransactionLifecycle::new(store.clone()),
            BatchOrchestrator::new(processor),
            history.clone(),
            Arc::new(LoggingNotifier),
            Duration::from_secs(5),
        );
        (dispatcher, history)
    }

    fn request_with(session_id: &str, params: serde_json::Value) -> ServiceRequest {
        let mut req = ServiceRequest::new(session_id, "BILL");
        if let serde_json::Value::Object(map) = params {
            req.param_in = map.into_iter().collect();
        }
        req
    }

    #[tokio::test]
    async fn decode_failure_yields_a_single_error_response() {
        let (dispatcher, history) = dispatcher_fixture().await;
        let request = request_with("sess-1", json!({"BillerCode": "EGY-GAS"}));

        let responses = dispatcher.process(&request).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status_code, "101");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn inquire_is_routed_and_not_archived() {
        let (dispatcher, history) = dispatcher_fixture().await;
        let request = request_with(
            "sess-1",
            json!({
                "Operation": "INQUIRE",
                "BillerCode": "EGY-GAS",
                "CustomerReference": "GZ1234567"
            }),
        );

        let responses = dispatcher.process(&request).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status_code, "000");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn pay_is_archived_even_when_it_fails() {
        let (dispatcher, history) = dispatcher_fixture().await;
        let ok = request_with(
            "sess-ok",
            json!({
                "Operation": "PAY",
                "BillerCode": "EGY-GAS",
                "CustomerReference": "GZ1234567",
                "Amount": "50"
            }),
        );
        let bad = request_with(
            "sess-bad",
            json!({
                "Operation": "PAY",
                "BillerCode": "EGY-GAS",
                "CustomerReference": "WRONG",
                "Amount": "50"
            }),
        );

        let ok_responses = dispatcher.process(&ok).await;
        let bad_responses = dispatcher.process(&bad).await;
        assert_eq!(ok_responses[0].status_code, "000");
        assert_eq!(bad_responses[0].status_code, "104");

        assert_eq!(history.for_session("sess-ok").len(), 1);
        assert_eq!(history.for_session("sess-bad").len(), 1);
        assert_eq!(history.for_session("sess-bad")[0].status_code, "104");
    }

    #[tokio::test]
    async fn pay_multiple_archives_every_response() {
        let (dispatcher, history) = dispatcher_fixture().await;
        let request = request_with(
            "sess-batch",
            json!({
                "Operation": "PAY_MULTIPLE",
                "Payments": [
                    {"BillerCode": "EGY-GAS", "CustomerReference": "GZ1234567", "Amount": "50"},
                    {"BillerCode": "EGY-GAS", "CustomerReference": "GZ7654321", "Amount": "75"}
                ]
            }),
        );

        let responses = dispatcher.process(&request).await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].status_code, "000");
        // summary under the caller's session, one entry per detail session
        assert_eq!(history.len(), 3);
        assert_eq!(history.for_session("sess-batch").len(), 1);
    }

    #[tokio::test]
    async fn status_and_cancel_are_routed() {
        let (dispatcher, _) = dispatcher_fixture().await;
        let pay = request_with(
            "sess-1",
            json!({
                "Operation": "PAY",
                "BillerCode": "EGY-GAS",
                "CustomerReference": "GZ1234567",
                "Amount": "50"
            }),
        );
        let paid = dispatcher.process(&pay).await;
        let tx_id = paid[0].param_out.as_ref().unwrap()["TransactionId"]
            .as_str()
            .unwrap()
            .to_string();

        let status = request_with(
            "sess-2",
            json!({"Operation": "STATUS", "TransactionId": tx_id}),
        );
        let responses = dispatcher.process(&status).await;
        assert_eq!(responses[0].status_code, "000");
        assert_eq!(
            responses[0].param_out.as_ref().unwrap()["Status"],
            "COMPLETED"
        );

        let cancel = request_with(
            "sess-3",
            json!({"Operation": "CANCEL", "TransactionId": tx_id}),
        );
        let responses = dispatcher.process(&cancel).await;
        assert_eq!(responses[0].status_code, "000");

        let responses = dispatcher.process(&cancel).await;
        assert_eq!(responses[0].status_code, "206");
    }
}
