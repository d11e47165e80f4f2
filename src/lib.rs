//! Reverse proxy with per-backend circuit breakers.
//!
//! Apps (a domain, path prefixes, methods and weighted backends) are
//! registered at runtime through the control plane. The data plane matches
//! each request to an app and forwards it to one of the app's backends,
//! skipping backends whose recent failure rate tripped their breaker.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::{BoundProxy, Shutdown};
pub use registry::{AppConfig, BackendConfig, Registry};
