//! Weighted random selection over healthy backends.
//!
//! # Algorithm
//! ```text
//! for each backend (config order):
//!     look up its Timeline by id      (never cached across requests)
//!     Open     → skip
//!     HalfOpen → admit with probability half_open_percent / 100, else skip
//!     Closed / admitted HalfOpen → cumulative += weight
//! pick = uniform(0..cumulative)
//! first backend whose cumulative bound exceeds pick wins
//! ```
//!
//! # Design Decisions
//! - Cumulative table rebuilt per selection; backend counts are small
//! - Only the random source varies between calls, so tests seed it
//! - HalfOpen admission is an absolute gate: a lone probing backend still
//!   sees only its trial share, and a rejected selection is `None`

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::load_balancer::backend::{Backend, BackendId};
use crate::resilience::{CircuitState, Timeline};

/// Timelines of one app, keyed by backend identity.
pub type TimelineTable = HashMap<BackendId, Arc<Timeline>>;

const FULL_PERCENT: u32 = 100;

/// Per-app weighted backend selector.
#[derive(Debug, Clone)]
pub struct Balancer {
    backends: Vec<Backend>,
    half_open_percent: u32,
}

impl Balancer {
    /// `half_open_percent` is the chance, per selection, that a HalfOpen
    /// backend is admitted as a candidate (clamped to 1..=100).
    pub fn new(backends: Vec<Backend>, half_open_percent: u32) -> Self {
        Self {
            backends,
            half_open_percent: half_open_percent.clamp(1, FULL_PERCENT),
        }
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Select a backend using the thread-local random source.
    pub fn select(&self, timelines: &TimelineTable, now: Instant) -> Option<&Backend> {
        self.select_with(timelines, now, &mut rand::thread_rng())
    }

    /// Select a backend with the given random source.
    ///
    /// Returns `None` when no backend is Closed and no HalfOpen backend was
    /// admitted this time (or none has a timeline).
    pub fn select_with<R: Rng + ?Sized>(
        &self,
        timelines: &TimelineTable,
        now: Instant,
        rng: &mut R,
    ) -> Option<&Backend> {
        let mut cumulative: Vec<(usize, u64)> = Vec::with_capacity(self.backends.len());
        let mut total = 0u64;

        for (index, backend) in self.backends.iter().enumerate() {
            let Some(timeline) = timelines.get(backend.id()) else {
                continue;
            };
            let admitted = match timeline.state(now) {
                CircuitState::Closed => true,
                CircuitState::HalfOpen => self.admit_half_open(rng),
                CircuitState::Open => false,
            };
            if !admitted {
                continue;
            }
            total += u64::from(backend.weight());
            cumulative.push((index, total));
        }

        if total == 0 {
            return None;
        }

        let pick = rng.gen_range(0..total);
        let slot = cumulative.partition_point(|&(_, bound)| bound <= pick);
        cumulative.get(slot).map(|&(index, _)| &self.backends[index])
    }

    fn admit_half_open<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.half_open_percent >= FULL_PERCENT || rng.gen_range(0..FULL_PERCENT) < self.half_open_percent
    }
}
