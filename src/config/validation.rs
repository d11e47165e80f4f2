//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds in range)
//! - Validate addresses and detect listener conflicts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::resilience::window::MAX_BUCKETS;

/// A single problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    let listener = parse_addr(&config.listener.bind_address, "listener.bind_address", &mut issues);
    let control = parse_addr(&config.control.bind_address, "control.bind_address", &mut issues);
    if let (Some(listener), Some(control)) = (listener, control) {
        if listener == control && listener.port() != 0 {
            issues.push(ConfigIssue::new(
                "control.bind_address",
                "must differ from listener.bind_address",
            ));
        }
    }
    if config.control.request_timeout_secs == 0 {
        issues.push(ConfigIssue::new("control.request_timeout_secs", "must be greater than 0"));
    }
    if config.control.max_body_bytes == 0 {
        issues.push(ConfigIssue::new("control.max_body_bytes", "must be greater than 0"));
    }
    if matches!(&config.control.api_key, Some(key) if key.trim().is_empty()) {
        issues.push(ConfigIssue::new("control.api_key", "must not be blank when set"));
    }

    if config.timeouts.connect_secs == 0 {
        issues.push(ConfigIssue::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        issues.push(ConfigIssue::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    let breaker = &config.breaker;
    if breaker.buckets == 0 {
        issues.push(ConfigIssue::new("breaker.buckets", "must be at least 1"));
    } else if breaker.buckets > MAX_BUCKETS {
        issues.push(ConfigIssue::new(
            "breaker.buckets",
            format!("must be at most {}", MAX_BUCKETS),
        ));
    } else if breaker.window_ms < breaker.buckets as u64 {
        issues.push(ConfigIssue::new(
            "breaker.window_ms",
            format!("must be at least 1ms per bucket ({} buckets)", breaker.buckets),
        ));
    }
    if !(breaker.failure_threshold > 0.0 && breaker.failure_threshold <= 1.0) {
        issues.push(ConfigIssue::new("breaker.failure_threshold", "must be in (0.0, 1.0]"));
    }
    if breaker.min_samples == 0 {
        issues.push(ConfigIssue::new("breaker.min_samples", "must be at least 1"));
    }
    if breaker.half_open_successes == 0 {
        issues.push(ConfigIssue::new("breaker.half_open_successes", "must be at least 1"));
    }
    if !(1..=100).contains(&breaker.half_open_weight_percent) {
        issues.push(ConfigIssue::new("breaker.half_open_weight_percent", "must be in 1..=100"));
    }

    if config.observability.metrics_enabled {
        parse_addr(&config.observability.metrics_address, "observability.metrics_address", &mut issues);
    }
    if config.observability.log_level.trim().is_empty() {
        issues.push(ConfigIssue::new("observability.log_level", "must not be empty"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn parse_addr(value: &str, field: &'static str, issues: &mut Vec<ConfigIssue>) -> Option<SocketAddr> {
    match value.parse() {
        Ok(addr) => Some(addr),
        Err(e) => {
            issues.push(ConfigIssue::new(field, format!("invalid socket address {:?}: {}", value, e)));
            None
        }
    }
}
