//! Gateway configuration.

use std::time::Duration;

/// Brute-force lockout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Master switch; a disabled guard never counts or locks
    pub enabled: bool,
    /// Failed attempts before the principal is locked out
    pub max_attempts: u32,
    /// How long a lockout lasts once armed
    pub lockout_duration: Duration,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig {
            enabled: true,
            max_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
        }
    }
}

/// Top-level engine settings.
///
/// Defaults match production behavior; tests shrink the durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub security: SecurityConfig,
    /// Lifetime of a transport-level idempotency cache entry
    pub idempotency_ttl: Duration,
    /// Upper bound on a single webhook notification attempt
    pub webhook_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            security: SecurityConfig::default(),
            idempotency_ttl: Duration::from_secs(24 * 60 * 60),
            webhook_timeout: Duration::from_secs(5),
        }
    }
}
