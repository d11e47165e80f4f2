//! Control-plane app payload and its validation.
//!
//! # Responsibilities
//! - Mirror the JSON body of `POST /app`
//! - Reject semantically invalid configurations as a whole
//! - Produce a normalized, validated [`App`]
//!
//! # Design Decisions
//! - Missing fields deserialize to empty values so they surface as
//!   validation errors rather than parse errors
//! - Port and weight are parsed as signed integers so out-of-range values
//!   are reported precisely
//! - An app serves exactly one method (see `MAX_METHODS_PER_APP`)

use axum::http::uri::Authority;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::load_balancer::{Backend, BackendId};
use crate::routing::matcher::normalize_host;

/// Apps are currently restricted to a single HTTP method.
pub const MAX_METHODS_PER_APP: usize = 1;

/// Body of a register/update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub domain: String,
    pub paths: Vec<String>,
    pub methods: Vec<String>,
    pub backends: Vec<BackendConfig>,
}

/// One upstream in an [`AppConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,
    pub port: i64,
    pub weight: i64,
}

impl BackendConfig {
    pub fn new(host: impl Into<String>, port: u16, weight: u32) -> Self {
        Self {
            host: host.into(),
            port: i64::from(port),
            weight: i64::from(weight),
        }
    }
}

/// Reasons an [`AppConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("domain must not be empty")]
    EmptyDomain,
    #[error("domain {0:?} is not a valid host name")]
    InvalidDomain(String),
    #[error("at least one path is required")]
    NoPaths,
    #[error("path {0:?} must start with '/'")]
    InvalidPath(String),
    #[error("at least one method is required")]
    NoMethods,
    #[error("{count} methods given, an app accepts at most {max}")]
    TooManyMethods { count: usize, max: usize },
    #[error("method {0:?} is not a valid HTTP method")]
    InvalidMethod(String),
    #[error("at least one backend is required")]
    NoBackends,
    #[error("backend #{index}: host must not be empty")]
    EmptyHost { index: usize },
    #[error("backend #{index}: port {port} is outside 1-65535")]
    InvalidPort { index: usize, port: i64 },
    #[error("backend #{index}: weight {weight} must be a positive 32-bit integer")]
    InvalidWeight { index: usize, weight: i64 },
    #[error("backend #{index}: {authority:?} is not a valid host:port")]
    InvalidAuthority { index: usize, authority: String },
    #[error("backend {0} is listed more than once")]
    DuplicateBackend(String),
}

/// A validated app, ready to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    /// Lowercased domain; the registry key.
    pub domain: String,
    /// Path prefixes in configured order, duplicates removed.
    pub paths: Vec<String>,
    pub methods: Vec<Method>,
    pub backends: Vec<Backend>,
}

impl AppConfig {
    /// Validate and normalize.
    pub fn validate(&self) -> Result<App, ValidationError> {
        Ok(App {
            domain: validate_domain(&self.domain)?,
            paths: validate_paths(&self.paths)?,
            methods: validate_methods(&self.methods)?,
            backends: validate_backends(&self.backends)?,
        })
    }
}

fn validate_domain(domain: &str) -> Result<String, ValidationError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ValidationError::EmptyDomain);
    }
    match domain.parse::<Authority>() {
        Ok(authority) if authority.port().is_none() => {
            normalize_host(domain).ok_or(ValidationError::EmptyDomain)
        }
        _ => Err(ValidationError::InvalidDomain(domain.to_string())),
    }
}

fn validate_paths(paths: &[String]) -> Result<Vec<String>, ValidationError> {
    if paths.is_empty() {
        return Err(ValidationError::NoPaths);
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.starts_with('/') {
            return Err(ValidationError::InvalidPath(path.clone()));
        }
        if seen.insert(path.as_str()) {
            out.push(path.clone());
        }
    }
    Ok(out)
}

fn validate_methods(methods: &[String]) -> Result<Vec<Method>, ValidationError> {
    match methods.len() {
        0 => return Err(ValidationError::NoMethods),
        count if count > MAX_METHODS_PER_APP => {
            return Err(ValidationError::TooManyMethods {
                count,
                max: MAX_METHODS_PER_APP,
            })
        }
        _ => {}
    }
    methods
        .iter()
        .map(|m| {
            let token = m.trim().to_ascii_uppercase();
            if token.is_empty() {
                return Err(ValidationError::InvalidMethod(m.clone()));
            }
            Method::from_bytes(token.as_bytes()).map_err(|_| ValidationError::InvalidMethod(m.clone()))
        })
        .collect()
}

fn validate_backends(backends: &[BackendConfig]) -> Result<Vec<Backend>, ValidationError> {
    if backends.is_empty() {
        return Err(ValidationError::NoBackends);
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(backends.len());
    for (index, cfg) in backends.iter().enumerate() {
        let host = cfg.host.trim();
        if host.is_empty() {
            return Err(ValidationError::EmptyHost { index });
        }
        let port = u16::try_from(cfg.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(ValidationError::InvalidPort { index, port: cfg.port })?;
        let weight = u32::try_from(cfg.weight)
            .ok()
            .filter(|w| *w != 0)
            .ok_or(ValidationError::InvalidWeight { index, weight: cfg.weight })?;

        let id = BackendId::new(host, port);
        let authority = id.to_string();
        if authority.parse::<Authority>().is_err() {
            return Err(ValidationError::InvalidAuthority { index, authority });
        }
        if !seen.insert(id.clone()) {
            return Err(ValidationError::DuplicateBackend(authority));
        }
        out.push(Backend::new(id, weight));
    }
    Ok(out)
}
