//! The transaction engine and its public facade.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use crate::catalog::{BillerCatalog, InMemoryBillerCatalog};
use crate::config::GatewayConfig;
use crate::guard::{BruteForceGuard, IdempotencyCache};
use crate::notify::{HistoryRecorder, InMemoryHistory, LoggingNotifier, WebhookNotifier};
use crate::store::{InMemoryTransactionStore, TransactionStore};
use crate::types::request::{Operation, ServiceRequest, ServiceResponse};
use crate::types::status;

pub mod batch;
pub mod dispatcher;
pub mod processor;
pub mod state_machine;

pub use batch::BatchOrchestrator;
pub use dispatcher::OperationDispatcher;
pub use processor::{BillInquiry, BillPaymentReceipt, BillerProcessor, RechargeInquiry, RechargeReceipt};
pub use state_machine::{validate_transition, TransactionLifecycle};

/// Serialized body served when even the error response fails to encode.
const ENCODING_FAILURE_BODY: &str =
    r#"[{"SessionId":"","ServiceId":"","StatusCode":"500","StatusLabel":"Erreur système"}]"#;

/// The assembled gateway: dispatcher plus the transport-level guards.
///
/// [`process`](Gateway::process) is the typed entry point;
/// [`handle_raw`](Gateway::handle_raw) wraps it for serialized JSON bodies
/// and adds the idempotency cache in front of payment operations. The
/// brute-force guard is owned here for the hosting layer's authentication
/// path; the engine itself never consults it.
pub struct Gateway {
    dispatcher: OperationDispatcher,
    cache: IdempotencyCache,
    guard: BruteForceGuard,
}

impl Gateway {
    /// Gateway over the seeded biller catalog and in-memory collaborators.
    pub fn new(config: GatewayConfig) -> Self {
        Gateway::with_parts(
            config,
            Arc::new(InMemoryBillerCatalog::seeded()),
            Arc::new(InMemoryTransactionStore::new()),
            Arc::new(InMemoryHistory::new()),
            Arc::new(LoggingNotifier),
        )
    }

    /// Gateway over caller-supplied collaborators.
    pub fn with_parts(
        config: GatewayConfig,
        catalog: Arc<dyn BillerCatalog>,
        store: Arc<dyn TransactionStore>,
        history: Arc<dyn HistoryRecorder>,
        webhook: Arc<dyn WebhookNotifier>,
    ) -> Self {
        let processor = Arc::new(BillerProcessor::new(catalog, store.clone()));
        let dispatcher = OperationDispatcher::new(
            Arc::clone(&processor),
            TransactionLifecycle::new(store),
            BatchOrchestrator::new(processor),
            history,
            webhook,
            config.webhook_timeout,
        );
        Gateway {
            dispatcher,
            cache: IdempotencyCache::new(config.idempotency_ttl),
            guard: BruteForceGuard::new(config.security),
        }
    }

    /// Typed entry point.
    pub async fn process(&self, request: &ServiceRequest) -> Vec<ServiceResponse> {
        self.dispatcher.process(request).await
    }

    /// Wire entry point over a serialized request body.
    ///
    /// A payment request with a non-empty session id is answered from the
    /// idempotency cache when the same body was already served within the
    /// TTL; the serialized response list is cached on the way out. An
    /// unparsable body yields a single `100` response.
    pub async fn handle_raw(&self, body: &str) -> String {
        let request: ServiceRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "unparsable request body");
                return invalid_request_body(&error);
            }
        };

        let cacheable = !request.session_id.is_empty()
            && request
                .param_string("Operation")
                .and_then(|raw| raw.parse::<Operation>().ok())
                .is_some_and(|operation| operation.is_payment());

        if cacheable {
            if let Some(cached) = self.cache.get(&request.session_id) {
                return cached;
            }
        }

        let responses = self.dispatcher.process(&request).await;
        let encoded = match serde_json::to_string(&responses) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(%error, "failed to encode response list");
                return ENCODING_FAILURE_BODY.to_string();
            }
        };

        if cacheable {
            self.cache.put(&request.session_id, encoded.clone());
        }
        encoded
    }

    /// Lockout guard for the hosting layer's authentication path.
    pub fn guard(&self) -> &BruteForceGuard {
        &self.guard
    }

    /// Periodic sweep of the idempotency cache and the lockout guard.
    pub fn spawn_maintenance(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                gateway.cache.sweep_expired();
                gateway.guard.sweep_expired();
                info!("maintenance sweep completed");
            }
        })
    }
}

fn invalid_request_body(error: &serde_json::Error) -> String {
    let detail = error.to_string();
    let response = ServiceResponse {
        session_id: String::new(),
        service_id: String::new(),
        status_code: status::INVALID_REQUEST.to_string(),
        status_label: format!("Requête invalide - {detail}"),
        param_out: Some(json!({ "ErrorMessage": detail })),
    };
    serde_json::to_string(&vec![response]).unwrap_or_else(|_| ENCODING_FAILURE_BODY.to_string())
}
