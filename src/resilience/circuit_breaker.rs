//! Per-backend circuit breaker over a sliding window ("timeline").
//!
//! # States
//! - Closed: normal operation, backend receives full traffic
//! - Open: backend tripped, excluded from selection
//! - HalfOpen: probation, backend receives reduced trial traffic
//!
//! # State Transitions
//! ```text
//! Closed   → Open:     samples >= min_samples && failure_rate >= failure_threshold
//! Open     → HalfOpen: now - changed_at >= cooldown (checked lazily)
//! HalfOpen → Closed:   half_open_successes consecutive successes, window cleared
//! HalfOpen → Open:     any failure, cooldown restarts
//! ```
//!
//! # Design Decisions
//! - One breaker per backend, owned by the registry
//! - Counts are the only stored data; rate and state reads derive from them
//! - Short critical section behind a `Mutex`; no I/O while held

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::load_balancer::backend::BackendId;
use crate::observability::metrics;
use crate::resilience::window::{Counts, Outcome, SlidingWindow};

/// Breaker tuning shared by every timeline in a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineConfig {
    /// Total length of the sliding window.
    pub window: Duration,
    /// Number of buckets the window is divided into.
    pub buckets: usize,
    /// Failure rate (0.0..=1.0) at or above which the circuit opens.
    pub failure_threshold: f64,
    /// Samples required in the window before the rate is trusted.
    pub min_samples: u64,
    /// Time spent Open before probing.
    pub cooldown: Duration,
    /// Consecutive HalfOpen successes needed to close.
    pub half_open_successes: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(10),
            buckets: 10,
            failure_threshold: 0.5,
            min_samples: 10,
            cooldown: Duration::from_secs(5),
            half_open_successes: 1,
        }
    }
}

/// Externally visible circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Whether the balancer may send traffic to a backend in this state.
    pub fn is_eligible(&self) -> bool {
        !matches!(self, CircuitState::Open)
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal state, carrying what each state needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed,
    Open,
    HalfOpen { successes: u32 },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed => CircuitState::Closed,
            Phase::Open => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    changed_at: Instant,
    window: SlidingWindow,
}

/// A point-in-time view of one timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSnapshot {
    pub state: CircuitState,
    pub counts: Counts,
    pub failure_rate: f64,
    pub changed_at: Instant,
}

/// Sliding-window circuit breaker for a single backend.
#[derive(Debug)]
pub struct Timeline {
    app: String,
    backend: BackendId,
    config: TimelineConfig,
    inner: Mutex<Inner>,
}

impl Timeline {
    /// A fresh timeline for `backend` as used by `app`: Closed, empty window.
    pub fn new(app: impl Into<String>, backend: BackendId, config: TimelineConfig, now: Instant) -> Self {
        let window = SlidingWindow::new(config.window, config.buckets, now);
        Self {
            app: app.into(),
            backend,
            config,
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                changed_at: now,
                window,
            }),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn backend(&self) -> &BackendId {
        &self.backend
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, promoting Open to HalfOpen once the cooldown has passed.
    pub fn state(&self, now: Instant) -> CircuitState {
        let mut inner = self.lock();
        self.expire_cooldown(&mut inner, now);
        inner.phase.state()
    }

    /// Record an outcome and apply any resulting transition.
    ///
    /// Returns the state after the outcome has been applied.
    pub fn record(&self, outcome: Outcome, now: Instant) -> CircuitState {
        let mut inner = self.lock();
        self.expire_cooldown(&mut inner, now);
        inner.window.record(outcome, now);

        match (inner.phase, outcome) {
            (Phase::Closed, _) => {
                let counts = inner.window.counts(now);
                if counts.total() >= self.config.min_samples
                    && counts.failure_rate() >= self.config.failure_threshold
                {
                    tracing::warn!(
                        app = %self.app,
                        backend = %self.backend,
                        failures = counts.failures,
                        samples = counts.total(),
                        failure_rate = counts.failure_rate(),
                        "Circuit tripped"
                    );
                    self.transition(&mut inner, Phase::Open, now);
                }
            }
            (Phase::HalfOpen { successes }, Outcome::Success) => {
                let successes = successes + 1;
                if successes >= self.config.half_open_successes {
                    inner.window.clear();
                    self.transition(&mut inner, Phase::Closed, now);
                } else {
                    inner.phase = Phase::HalfOpen { successes };
                }
            }
            (Phase::HalfOpen { .. }, Outcome::Failure) => {
                tracing::warn!(app = %self.app, backend = %self.backend, "Half-open request failed, circuit re-opened");
                self.transition(&mut inner, Phase::Open, now);
            }
            // Late outcomes from requests dispatched before the trip.
            (Phase::Open, _) => {}
        }

        inner.phase.state()
    }

    /// Counts, derived rate and state at `now`.
    pub fn snapshot(&self, now: Instant) -> TimelineSnapshot {
        let mut inner = self.lock();
        self.expire_cooldown(&mut inner, now);
        let counts = inner.window.counts(now);
        TimelineSnapshot {
            state: inner.phase.state(),
            counts,
            failure_rate: counts.failure_rate(),
            changed_at: inner.changed_at,
        }
    }

    fn expire_cooldown(&self, inner: &mut Inner, now: Instant) {
        if inner.phase == Phase::Open
            && now.saturating_duration_since(inner.changed_at) >= self.config.cooldown
        {
            self.transition(inner, Phase::HalfOpen { successes: 0 }, now);
        }
    }

    fn transition(&self, inner: &mut Inner, to: Phase, now: Instant) {
        let from = inner.phase.state();
        inner.phase = to;
        inner.changed_at = now;

        let to = to.state();
        if to != CircuitState::Open {
            tracing::info!(app = %self.app, backend = %self.backend, from = %from, to = %to, "Circuit state changed");
        }
        metrics::record_circuit_transition(&self.app, &self.backend.to_string(), from, to);
    }
}
