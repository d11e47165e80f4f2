//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → CLI flag overrides applied in main
//!     → RegistryOptions / server settings derived at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; apps are managed at runtime through
//!   the control plane, not through this file
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BreakerConfig, ControlConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    RoutingConfig, TimeoutConfig,
};
pub use validation::{validate_config, ConfigIssue};
