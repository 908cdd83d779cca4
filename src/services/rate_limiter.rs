use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Duration, Instant};

use crate::errors::AppError;

/// Paces outgoing quote requests: at most `max_concurrent` in flight and a
/// minimum spacing derived from `requests_per_minute`.
///
/// Free provider tiers allow roughly 8 (Twelve Data) and 5 (Alpha Vantage)
/// requests per minute.
pub struct QuoteRateLimiter {
    semaphore: Arc<Semaphore>,
    next_slot: Mutex<Instant>,
    min_delay: Duration,
}

impl QuoteRateLimiter {
    pub fn new(max_concurrent: usize, requests_per_minute: u32) -> Self {
        let per_minute = u64::from(requests_per_minute.max(1));
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            next_slot: Mutex::new(Instant::now()),
            min_delay: Duration::from_millis(60_000 / per_minute),
        }
    }

    /// Waits for a permit and for this caller's time slot. The permit is
    /// released when the guard drops.
    pub async fn acquire(&self) -> Result<QuotePermit, AppError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::External("quote rate limiter closed".into()))?;

        // Reserve a slot under the lock, sleep outside it.
        let slot = {
            let mut next = self.next_slot.lock();
            let slot = (*next).max(Instant::now());
            *next = slot + self.min_delay;
            slot
        };
        sleep_until(slot).await;

        Ok(QuotePermit { _permit: permit })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

async fn sleep_until(slot: Instant) {
    let now = Instant::now();
    if slot > now {
        sleep(slot - now).await;
    }
}

pub struct QuotePermit {
    _permit: OwnedSemaphorePermit,
}
