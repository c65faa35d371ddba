//! Concurrency limiter
//!
//! The scripting backend allows only a handful of concurrent executions
//! per deployment before requests start queueing server-side and timing
//! out. A semaphore keeps the gateway below that ceiling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::config::ConcurrencyConfig;

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    config: ConcurrencyConfig,
    acquired: Arc<AtomicU64>,
    waited: Arc<AtomicU64>,
}

impl ConcurrencyLimiter {
    pub fn new(config: ConcurrencyConfig) -> Self {
        let permits = if config.enabled {
            config.max_concurrent_requests
        } else {
            // Large but valid when disabled (Tokio caps permits at 2^61-1).
            1_000_000
        };

        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
            acquired: Arc::new(AtomicU64::new(0)),
            waited: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquire a slot, waiting when the backend is saturated. The permit
    /// releases on drop.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        if self.config.enabled && self.semaphore.available_permits() == 0 {
            self.waited.fetch_add(1, Ordering::Relaxed);
            debug!(
                "concurrency: waiting for a slot ({} in flight)",
                self.config.max_concurrent_requests
            );
        }

        // The semaphore is never closed, so acquire cannot fail.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed");
        self.acquired.fetch_add(1, Ordering::Relaxed);
        permit
    }

    pub fn available_permits(&self) -> usize {
        if !self.config.enabled {
            return usize::MAX;
        }
        self.semaphore.available_permits()
    }

    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            available_permits: self.available_permits(),
            max_concurrent_requests: self.config.max_concurrent_requests,
            acquired: self.acquired.load(Ordering::Relaxed),
            waited: self.waited.load(Ordering::Relaxed),
            enabled: self.config.enabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConcurrencyStats {
    pub available_permits: usize,
    pub max_concurrent_requests: usize,
    pub acquired: u64,
    pub waited: u64,
    pub enabled: bool,
}
