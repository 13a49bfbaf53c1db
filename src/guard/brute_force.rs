//! Brute-force lockout guard.
//!
//! Tracks failed authentication attempts per principal and locks the
//! principal out once a threshold is reached. Owned by the gateway and
//! handed to the hosting layer's authentication path; the transaction
//! engine itself never consults it.
//!
//! All mutations are per-key atomic read-modify-write operations through
//! the map's entry API, so concurrent attempts against one username cannot
//! lose updates and different usernames never contend.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;

/// Per-username attempt counter plus optional lockout deadline.
#[derive(Debug, Clone, Copy)]
struct LockoutEntry {
    attempts: u32,
    locked_until: Option<Instant>,
}

/// In-memory lockout guard.
#[derive(Debug)]
pub struct BruteForceGuard {
    attempts: DashMap<String, LockoutEntry>,
    config: SecurityConfig,
}

impl BruteForceGuard {
    pub fn new(config: SecurityConfig) -> Self {
        BruteForceGuard {
            attempts: DashMap::new(),
            config,
        }
    }

    /// True while the username's lockout deadline lies in the future.
    pub fn is_locked_out(&self, username: &str) -> bool {
        if !self.config.enabled {
            return false;
        }
        let locked = self
            .attempts
            .get(username)
            .and_then(|entry| entry.locked_until)
            .is_some_and(|deadline| deadline > Instant::now());
        if locked {
            warn!(username, "authentication attempt on locked account");
        }
        locked
    }

    /// Records one failed attempt; arms the lockout at the threshold.
    pub fn register_failed_attempt(&self, username: &str) {
        if !self.config.enabled {
            return;
        }

        let mut entry = self
            .attempts
            .entry(username.to_string())
            .or_insert(LockoutEntry {
                attempts: 0,
                locked_until: None,
            });
        entry.attempts += 1;

        if entry.attempts >= self.config.max_attempts {
            entry.locked_until = Some(Instant::now() + self.config.lockout_duration);
            warn!(
                username,
                attempts = entry.attempts,
                "account locked after repeated failed attempts"
            );
        } else {
            info!(
                username,
                attempts = entry.attempts,
                max = self.config.max_attempts,
                "failed authentication attempt"
            );
        }
    }

    /// Clears the counter after a successful authentication.
    pub fn reset_attempts(&self, username: &str) {
        if self.attempts.remove(username).is_some() {
            info!(username, "attempt counter reset");
        }
    }

    /// Attempts left before the lockout arms; `u32::MAX` when disabled.
    pub fn remaining_attempts(&self, username: &str) -> u32 {
        if !self.config.enabled {
            return u32::MAX;
        }
        let used = self
            .attempts
            .get(username)
            .map(|entry| entry.attempts)
            .unwrap_or(0);
        self.config.max_attempts.saturating_sub(used)
    }

    /// Time left on an armed lockout, if any.
    pub fn lockout_remaining(&self, username: &str) -> Option<Duration> {
        let deadline = self.attempts.get(username)?.locked_until?;
        Some(deadline.saturating_duration_since(Instant::now()))
    }

    /// Drops entries whose lockout deadline has passed, to bound memory.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let before = self.attempts.len();
        self.attempts
            .retain(|_, entry| !entry.locked_until.is_some_and(|deadline| deadline <= now));
        let removed = before - self.attempts.len();
        if removed > 0 {
            debug!(removed, "swept expired lockout entries");
        }
    }
}
