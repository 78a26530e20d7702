//! The per-future HEAD-polling backoff state machine.
//!
//! Deliberately separate from [`backoff::BackoffConfig`](crate::backoff::BackoffConfig):
//! that module governs transport-level retry on `submit`, this one governs
//! how often a single [`RolloutFuture`](crate::rollout_future::RolloutFuture)
//! re-polls the object store after a 404. It has no jitter and no retry
//! count — it grows monotonically for the lifetime of one future and is
//! read by the batch engine to decide when to next call `done()`.

use std::time::{Duration, Instant};

/// Per-future poll interval state: starts at `initial`, multiplies by
/// `factor` after each 404, capped at `max`.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    interval: Duration,
    last_poll: Option<Instant>,
}

impl PollBackoff {
    /// Construct with the given initial interval, cap, and multiplicative
    /// factor. `ready_to_poll()` is true immediately — the first HEAD fires
    /// without waiting.
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial,
            max,
            factor,
            interval: initial,
            last_poll: None,
        }
    }

    /// Current poll interval in effect.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a 404 at `now`, growing the interval (capped at `max`).
    pub fn record_miss(&mut self, now: Instant) {
        self.last_poll = Some(now);
        let grown = self.interval.as_secs_f64() * self.factor;
        self.interval = Duration::from_secs_f64(grown).min(self.max);
    }

    /// Seconds until the next poll should fire, relative to `now`.
    /// `None` means "never polled yet" — poll immediately.
    pub fn time_until_next_poll(&self, now: Instant) -> Duration {
        match self.last_poll {
            None => Duration::ZERO,
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// True iff enough time has passed since the last poll (or it has
    /// never been polled).
    pub fn ready_to_poll(&self, now: Instant) -> bool {
        self.time_until_next_poll(now) == Duration::ZERO
    }

    /// Override the backoff parameters in place, resetting the interval to
    /// the new initial value. Used by the batch engine to apply
    /// batch-level backoff settings to a freshly created future (spec
    /// §4.4 fill phase: "override the returned future's backoff
    /// parameters with the batch-level ones").
    pub fn reconfigure(&mut self, initial: Duration, max: Duration, factor: f64) {
        self.initial = initial;
        self.max = max;
        self.factor = factor;
        self.interval = initial;
    }

    #[cfg(test)]
    pub fn initial(&self) -> Duration {
        self.initial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_ready_without_a_poll() {
        let b = PollBackoff::new(Duration::from_millis(500), Duration::from_secs(30), 1.5);
        let now = Instant::now();
        assert!(b.ready_to_poll(now));
        assert_eq!(b.time_until_next_poll(now), Duration::ZERO);
    }

    #[test]
    fn backoff_schedule_matches_spec_example() {
        // initial=1.0, factor=2.0, cap=10.0 -> after four misses: 2,4,8,10
        let mut b = PollBackoff::new(Duration::from_secs_f64(1.0), Duration::from_secs_f64(10.0), 2.0);
        let t0 = Instant::now();
        b.record_miss(t0);
        assert_eq!(b.interval(), Duration::from_secs_f64(2.0));
        b.record_miss(t0);
        assert_eq!(b.interval(), Duration::from_secs_f64(4.0));
        b.record_miss(t0);
        assert_eq!(b.interval(), Duration::from_secs_f64(8.0));
        b.record_miss(t0);
        assert_eq!(b.interval(), Duration::from_secs_f64(10.0));
    }

    #[test]
    fn reconfigure_resets_interval_and_bounds() {
        let mut b = PollBackoff::new(Duration::from_secs_f64(1.0), Duration::from_secs_f64(10.0), 2.0);
        b.record_miss(Instant::now());
        assert_eq!(b.interval(), Duration::from_secs_f64(2.0));
        b.reconfigure(Duration::from_millis(250), Duration::from_secs(5), 3.0);
        assert_eq!(b.interval(), Duration::from_millis(250));
        assert_eq!(b.initial(), Duration::from_millis(250));
    }
}
