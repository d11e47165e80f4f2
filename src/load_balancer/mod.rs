//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → app entry identified
//!     → balancer.rs (weighted pick among eligible backends)
//!         - consult each backend's Timeline by id
//!         - Open excluded, HalfOpen down-weighted
//!     → backend.rs (host/port/weight of the chosen upstream)
//!     → Return backend or NoHealthyBackend
//! ```
//!
//! # Design Decisions
//! - Balancer is stateless apart from its immutable weight table
//! - Timelines are owned by the registry, looked up per selection
//! - Unhealthy (Open) backends excluded from selection

pub mod backend;
pub mod balancer;

pub use backend::{Backend, BackendId};
pub use balancer::{Balancer, TimelineTable};
