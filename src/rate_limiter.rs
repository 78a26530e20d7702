//! Client-side submission rate limiting.

use std::time::{Duration, Instant};

/// Enforces a minimum interval between successive `acquire()` calls.
///
/// Single-owner, not reentrant, not `Clone` — exactly one
/// [`RolloutClient`](crate::client::RolloutClient) holds a `RateLimiter` and
/// it is never shared across threads or client instances (spec §4.1, §5).
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_acquire: Option<Instant>,
}

impl RateLimiter {
    /// Construct a limiter enforcing at most `tps_limit` acquires per second.
    pub fn new(tps_limit: u32) -> Self {
        let tps_limit = tps_limit.max(1);
        Self {
            min_interval: Duration::from_secs_f64(1.0 / tps_limit as f64),
            last_acquire: None,
        }
    }

    /// Block until at least `1 / tps_limit` seconds have elapsed since the
    /// previous successful `acquire()`.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_acquire {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_acquire = Some(Instant::now());
    }
}
