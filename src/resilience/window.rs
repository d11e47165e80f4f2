//! Bucketed sliding window of request outcomes.
//!
//! # Layout
//! ```text
//! window = W, buckets = N, span = W / N
//!
//! epoch(now) = (now - origin) / span
//! slot       = epoch % N
//!
//! |b0|b1|b2|...|bN-1|   ring, each slot tagged with the epoch it holds
//! ```
//!
//! A slot whose tag is older than the current epoch is cleared before it is
//! written. Reads only sum slots whose tag lies in the last N epochs. Rotation
//! is therefore computed from the clock at access time.

use std::time::{Duration, Instant};

/// Largest number of buckets a window is split into.
pub const MAX_BUCKETS: usize = 10_000;

/// Result of one proxied request, as seen by the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Classify an upstream HTTP status. Only 5xx counts against a backend.
    pub fn from_status(status: u16) -> Self {
        if (500..600).contains(&status) {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}

/// Success and failure totals over some span of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub successes: u64,
    pub failures: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    /// Failures over total samples; 0.0 for an empty window.
    pub fn failure_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.failures as f64 / total as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    epoch: u64,
    counts: Counts,
}

/// Fixed-length ring of time buckets.
#[derive(Debug)]
pub struct SlidingWindow {
    origin: Instant,
    span: Duration,
    buckets: Vec<Bucket>,
}

impl SlidingWindow {
    /// Create a window of `length` split into `buckets` slots.
    ///
    /// The bucket count is clamped to `1..=MAX_BUCKETS`; a zero span becomes
    /// one nanosecond.
    pub fn new(length: Duration, buckets: usize, origin: Instant) -> Self {
        let buckets = buckets.clamp(1, MAX_BUCKETS);
        let divisor = u32::try_from(buckets).unwrap_or(u32::MAX);
        let span = (length / divisor).max(Duration::from_nanos(1));
        Self {
            origin,
            span,
            buckets: vec![Bucket::default(); buckets],
        }
    }

    fn epoch(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        (elapsed / self.span.as_nanos()) as u64
    }

    /// Add one outcome to the bucket covering `now`.
    pub fn record(&mut self, outcome: Outcome, now: Instant) {
        let epoch = self.epoch(now);
        let slot = (epoch % self.buckets.len() as u64) as usize;
        let bucket = &mut self.buckets[slot];
        if bucket.epoch != epoch {
            *bucket = Bucket {
                epoch,
                counts: Counts::default(),
            };
        }
        match outcome {
            Outcome::Success => bucket.counts.successes += 1,
            Outcome::Failure => bucket.counts.failures += 1,
        }
    }

    /// Totals over the buckets still inside the window at `now`.
    pub fn counts(&self, now: Instant) -> Counts {
        let current = self.epoch(now);
        let len = self.buckets.len() as u64;
        self.buckets
            .iter()
            .filter(|b| b.epoch <= current && current - b.epoch < len)
            .fold(Counts::default(), |acc, b| Counts {
                successes: acc.successes + b.counts.successes,
                failures: acc.failures + b.counts.failures,
            })
    }

    /// Forget every recorded outcome.
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(|b| *b = Bucket::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(Outcome::from_status(200), Outcome::Success);
        assert_eq!(Outcome::from_status(404), Outcome::Success);
        assert_eq!(Outcome::from_status(500), Outcome::Failure);
        assert_eq!(Outcome::from_status(503), Outcome::Failure);
    }

    #[test]
    fn test_empty_window_has_zero_rate() {
        let t0 = Instant::now();
        let window = SlidingWindow::new(ms(1000), 10, t0);
        let counts = window.counts(t0);
        assert_eq!(counts.total(), 0);
        assert_eq!(counts.failure_rate(), 0.0);
    }

    #[test]
    fn test_counts_accumulate_across_buckets() {
        let t0 = Instant::now();
        let mut window = SlidingWindow::new(ms(1000), 10, t0);

        window.record(Outcome::Success, t0);
        window.record(Outcome::Failure, t0 + ms(150));
        window.record(Outcome::Failure, t0 + ms(420));

        let counts = window.counts(t0 + ms(500));
        assert_eq!(counts, Counts { successes: 1, failures: 2 });
        assert!((counts.failure_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_old_buckets_fall_out_of_window() {
        let t0 = Instant::now();
        let mut window = SlidingWindow::new(ms(1000), 10, t0);

        window.record(Outcome::Failure, t0);
        window.record(Outcome::Success, t0 + ms(600));

        // First bucket still live at 999ms, gone at 1000ms.
        assert_eq!(window.counts(t0 + ms(999)).failures, 1);
        let later = window.counts(t0 + ms(1000));
        assert_eq!(later, Counts { successes: 1, failures: 0 });

        assert_eq!(window.counts(t0 + ms(5000)).total(), 0);
    }

    #[test]
    fn test_reused_slot_is_reset() {
        let t0 = Instant::now();
        let mut window = SlidingWindow::new(ms(100), 2, t0);

        window.record(Outcome::Failure, t0);
        window.record(Outcome::Failure, t0);
        // Same slot (epoch 2 % 2 == 0), new epoch.
        window.record(Outcome::Success, t0 + ms(100));

        assert_eq!(
            window.counts(t0 + ms(100)),
            Counts { successes: 1, failures: 0 }
        );
    }

    #[test]
    fn test_bucket_count_is_clamped() {
        let t0 = Instant::now();
        let mut window = SlidingWindow::new(Duration::from_millis(5_000_000_000), 1 << 32, t0);
        assert_eq!(window.buckets.len(), MAX_BUCKETS);

        window.record(Outcome::Failure, t0);
        assert_eq!(window.counts(t0).failures, 1);

        let window = SlidingWindow::new(Duration::from_secs(1), 0, t0);
        assert_eq!(window.buckets.len(), 1);
    }

    #[test]
    fn test_clear() {
        let t0 = Instant::now();
        let mut window = SlidingWindow::new(ms(1000), 4, t0);
        window.record(Outcome::Failure, t0);
        window.clear();
        assert_eq!(window.counts(t0).total(), 0);
    }
}
