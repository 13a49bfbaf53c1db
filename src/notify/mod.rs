//! Outbound side channels: webhook notification and payment history.
//!
//! Delivery mechanics live outside the engine; these traits are the seams
//! the dispatcher talks to after a payment operation. Webhook calls are
//! best-effort and detached from the response path, history writes are
//! awaited but their failures are logged and swallowed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::error::GatewayError;
use crate::types::request::{ServiceRequest, ServiceResponse};

/// Payload pushed to the webhook collaborator after a payment response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookPayload {
    pub session_id: String,
    pub service_id: String,
    pub status_code: String,
    pub status_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_out: Option<Value>,
    pub date: DateTime<Utc>,
}

impl WebhookPayload {
    pub fn from_response(response: &ServiceResponse) -> Self {
        WebhookPayload {
            session_id: response.session_id.clone(),
            service_id: response.service_id.clone(),
            status_code: response.status_code.clone(),
            status_label: response.status_label.clone(),
            param_out: response.param_out.clone(),
            date: Utc::now(),
        }
    }
}

/// Best-effort notification of a third-party system.
#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    async fn notify(&self, payload: WebhookPayload) -> Result<(), GatewayError>;
}

/// Notifier that only logs the payload. Stands in for HTTP delivery, which
/// belongs to the hosting layer.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl WebhookNotifier for LoggingNotifier {
    async fn notify(&self, payload: WebhookPayload) -> Result<(), GatewayError> {
        debug!(
            session_id = %payload.session_id,
            status_code = %payload.status_code,
            "webhook notification"
        );
        Ok(())
    }
}

/// One recorded request/response pair.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub session_id: String,
    pub service_id: String,
    pub status_code: String,
    pub raw_request: String,
    pub raw_response: String,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only archive of payment request/response pairs.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn save(
        &self,
        request: &ServiceRequest,
        response: &ServiceResponse,
    ) -> Result<(), GatewayError>;
}

/// In-memory history keyed by session id.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: DashMap<String, Vec<HistoryEntry>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        InMemoryHistory {
            entries: DashMap::new(),
        }
    }

    /// Entries recorded under one session id, oldest first.
    pub fn for_session(&self, session_id: &str) -> Vec<HistoryEntry> {
        self.entries
            .get(session_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryHistory {
    async fn save(
        &self,
        request: &ServiceRequest,
        response: &ServiceResponse,
    ) -> Result<(), GatewayError> {
        let entry = HistoryEntry {
            session_id: response.session_id.clone(),
            service_id: response.service_id.clone(),
            status_code: response.status_code.clone(),
            raw_request: serde_json::to_string(request)?,
            raw_response: serde_json::to_string(response)?,
            recorded_at: Utc::now(),
        };
        self.entries
            .entry(entry.session_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }
}

/// Logs a failed history write without disturbing the response path.
pub(crate) fn log_history_failure(session_id: &str, error: &GatewayError) {
    warn!(session_id, %error, "failed to record payment history");
}
