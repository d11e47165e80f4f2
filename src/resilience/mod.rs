//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce upstream deadline, elapsed = failure)
//!     → window.rs (outcome lands in the current time bucket)
//!     → circuit_breaker.rs (evaluate failure rate, open/close circuit)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries: a failed attempt is reported, not replayed
//! - Circuit breaker prevents cascading failures
//! - Time is read lazily through `clock.rs`; no background timers

pub mod circuit_breaker;
pub mod clock;
pub mod timeouts;
pub mod window;

pub use circuit_breaker::{CircuitState, Timeline, TimelineConfig, TimelineSnapshot};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use window::{Counts, Outcome};
