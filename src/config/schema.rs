//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.
//! App routing rules are not part of the file; they arrive through the
//! control plane at runtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::registry::RegistryOptions;
use crate::resilience::TimelineConfig;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Data-plane listener.
    pub listener: ListenerConfig,

    /// Control-plane listener and limits.
    pub control: ControlConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Circuit breaker tuning, applied to every backend.
    pub breaker: BreakerConfig,

    /// Request-to-app matching behaviour.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Registry tuning derived from the breaker and routing sections.
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            timeline: self.breaker.timeline_config(),
            half_open_weight_percent: self.breaker.half_open_weight_percent,
            host_fallback: self.routing.host_fallback,
        }
    }
}

/// Data-plane listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Control-plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    /// Bind address of the control API.
    pub bind_address: String,

    /// Optional API key (Bearer token). Without one the API is open.
    pub api_key: Option<String>,

    /// Per-request timeout for control calls in seconds.
    pub request_timeout_secs: u64,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:12345".to_string(),
            api_key: None,
            request_timeout_secs: 10,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for an upstream response in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Sliding window length in milliseconds.
    pub window_ms: u64,

    /// Number of buckets the window is split into.
    pub buckets: usize,

    /// Failure rate at or above which a backend trips (0.0 - 1.0].
    pub failure_threshold: f64,

    /// Samples needed in the window before the failure rate is acted on.
    pub min_samples: u64,

    /// Time a tripped backend stays excluded before probing, in milliseconds.
    pub cooldown_ms: u64,

    /// Consecutive successes while half-open needed to close.
    pub half_open_successes: u32,

    /// Percentage of selections a half-open backend is admitted to for a trial request.
    pub half_open_weight_percent: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_ms: 10_000,
            buckets: 10,
            failure_threshold: 0.5,
            min_samples: 10,
            cooldown_ms: 5_000,
            half_open_successes: 1,
            half_open_weight_percent: 10,
        }
    }
}

impl BreakerConfig {
    pub fn timeline_config(&self) -> TimelineConfig {
        TimelineConfig {
            window: Duration::from_millis(self.window_ms),
            buckets: self.buckets,
            failure_threshold: self.failure_threshold,
            min_samples: self.min_samples,
            cooldown: Duration::from_millis(self.cooldown_ms),
            half_open_successes: self.half_open_successes,
        }
    }
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// When no app claims the request host, match against every app.
    pub host_fallback: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            host_fallback: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
