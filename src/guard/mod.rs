//! Process-local protection components.
//!
//! Both guards are ephemeral: their state lives in this process only and is
//! rebuilt from zero on restart. Multi-instance deployments rely on the
//! domain-level session check in the processor, which goes through the
//! transaction store.

pub mod brute_force;
pub mod idempotency;

pub use brute_force::BruteForceGuard;
pub use idempotency::IdempotencyCache;
