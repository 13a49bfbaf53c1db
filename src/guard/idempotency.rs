//! Transport-level idempotency cache.
//!
//! Guards against network-layer retransmission of payment requests: the
//! serialized response for a session id is kept for a bounded time and
//! returned verbatim on a repeated body, without invoking downstream logic.
//! The domain-level replay check in the processor covers everything this
//! cache cannot (restarts, other instances).

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

/// Time-bounded response cache keyed by session id.
#[derive(Debug)]
pub struct IdempotencyCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl IdempotencyCache {
    pub fn new(ttl: Duration) -> Self {
        IdempotencyCache {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cached serialized response, if present and not expired.
    ///
    /// An expired entry is removed on the way out.
    pub fn get(&self, session_id: &str) -> Option<String> {
        let hit = self.entries.get(session_id)?;
        if hit.expires_at <= Instant::now() {
            drop(hit);
            self.entries.remove(session_id);
            return None;
        }
        info!(session_id, "duplicate payment request, serving cached response");
        Some(hit.body.clone())
    }

    /// Stores the serialized response under the session id.
    pub fn put(&self, session_id: &str, body: String) {
        self.entries.insert(
            session_id.to_string(),
            CacheEntry {
                body,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops expired entries to bound memory.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "swept expired idempotency entries");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
