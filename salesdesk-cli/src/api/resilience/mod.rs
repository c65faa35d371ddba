//! Resilience features for backend calls
//!
//! The scripting backend is slow, quota-bound, and occasionally flaky.
//! Retry with backoff covers the flakiness; a concurrency limiter keeps us
//! under its small concurrent-execution quota.

pub mod concurrency;
pub mod config;
pub mod retry;

pub use concurrency::{ConcurrencyLimiter, ConcurrencyStats};
pub use config::{ConcurrencyConfig, ResilienceConfig};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};
