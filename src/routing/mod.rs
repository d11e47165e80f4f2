//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, method)
//!     → matcher.rs (normalize host, evaluate match conditions)
//!     → router.rs (route lookup across apps)
//!     → Return: matched app name or NoMatch
//!
//! Route Compilation (on every app registration):
//!     validated App
//!     → Compile matchers (host, prefixes, methods)
//!     → Copy current Router with the app's route replaced
//!     → Swap the new Router in atomically
//! ```
//!
//! # Design Decisions
//! - Routes immutable once built; updates replace the whole table
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins

pub mod matcher;
pub mod router;

pub use matcher::RouteRequest;
pub use router::{Route, Router};
