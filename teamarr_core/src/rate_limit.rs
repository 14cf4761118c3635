//! Token-bucket rate limiter for provider clients.
//!
//! Callers `acquire()` a token before each outbound request. The wait time
//! is computed under the lock but slept outside it, so a slow caller never
//! starves the bucket for others. Per-cycle statistics are resettable at
//! generation start.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Statistics snapshot for UI feedback.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RateLimitStats {
    pub total_requests: u64,
    pub total_wait_seconds: f64,
    pub is_rate_limited: bool,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with a sustained rate and burst allowance.
#[derive(Debug)]
pub struct TokenBucket {
    /// Sustained requests per second.
    rate: f64,
    /// Maximum tokens accumulated while idle.
    burst_size: f64,
    state: Mutex<BucketState>,
    total_requests: AtomicU64,
    /// Microseconds spent waiting, accumulated across acquires.
    total_wait_micros: AtomicU64,
}

impl TokenBucket {
    pub fn new(rate: f64, burst_size: u32) -> Self {
        let burst = f64::from(burst_size).max(1.0);
        Self {
            rate: rate.max(0.001),
            burst_size: burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: Instant::now(),
            }),
            total_requests: AtomicU64::new(0),
            total_wait_micros: AtomicU64::new(0),
        }
    }

    /// Block until a token is available.
    pub async fn acquire(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - state.tokens;
                    Some(Duration::from_secs_f64(deficit / self.rate))
                }
            };
            match wait {
                None => return,
                Some(d) => {
                    self.total_wait_micros
                        .fetch_add(d.as_micros() as u64, Ordering::Relaxed);
                    // Sleep outside the lock; re-check after waking since
                    // another task may have drained the refill.
                    tokio::time::sleep(d).await;
                }
            }
        }
    }

    /// Non-blocking acquire; true when a token was taken.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            self.total_requests.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let elapsed = state.last_refill.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.rate).min(self.burst_size);
            state.last_refill = Instant::now();
        }
    }

    pub fn stats(&self) -> RateLimitStats {
        let wait_micros = self.total_wait_micros.load(Ordering::Relaxed);
        RateLimitStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_wait_seconds: wait_micros as f64 / 1_000_000.0,
            is_rate_limited: wait_micros > 0,
        }
    }

    /// Reset per-cycle counters (call at generation start).
    pub fn reset_stats(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.total_wait_micros.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_then_wait() {
        let bucket = TokenBucket::new(100.0, 3);
        // Burst allowance: first three acquires are immediate.
        let start = Instant::now();
        bucket.acquire().await;
        bucket.acquire().await;
        bucket.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));

        // Fourth must wait for refill (~10ms at 100/s).
        bucket.acquire().await;
        assert!(bucket.stats().is_rate_limited);
        assert_eq!(bucket.stats().total_requests, 4);
    }

    #[tokio::test]
    async fn test_try_acquire_exhaustion() {
        let bucket = TokenBucket::new(0.001, 2);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[tokio::test]
    async fn test_reset_stats() {
        let bucket = TokenBucket::new(10.0, 1);
        bucket.acquire().await;
        assert_eq!(bucket.stats().total_requests, 1);
        bucket.reset_stats();
        assert_eq!(bucket.stats().total_requests, 0);
        assert!(!bucket.stats().is_rate_limited);
    }
}
