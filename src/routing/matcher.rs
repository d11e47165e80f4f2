//! Route matching logic.
//!
//! # Responsibilities
//! - Match host (exact match, case-insensitive, port ignored)
//! - Match path prefix (case-sensitive), reporting the matched length
//! - Match method (exact membership in the allowed set)
//!
//! # Design Decisions
//! - Host is normalized once per request, not once per route
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

use axum::http::uri::Authority;
use axum::http::{header, Method, Request};

/// The parts of a request the router looks at.
#[derive(Debug, Clone)]
pub struct RouteRequest<'a> {
    host: Option<String>,
    path: &'a str,
    method: &'a Method,
}

impl<'a> RouteRequest<'a> {
    pub fn new(host: Option<&str>, path: &'a str, method: &'a Method) -> Self {
        Self {
            host: host.and_then(normalize_host),
            path,
            method,
        }
    }

    /// Extract host (Host header, else URI authority), path and method.
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().authority().map(|a| a.as_str()));
        Self::new(host, req.uri().path(), req.method())
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn path(&self) -> &str {
        self.path
    }

    pub fn method(&self) -> &Method {
        self.method
    }
}

/// Lowercase the host and drop any port.
pub fn normalize_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let host = match raw.parse::<Authority>() {
        Ok(authority) => authority.host().to_ascii_lowercase(),
        Err(_) => raw.to_ascii_lowercase(),
    };
    Some(host)
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RouteRequest<'_>) -> bool;
}

/// Matches the request host.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized the same way request hosts are.
    pub fn new(host: &str) -> Self {
        Self {
            expected_host: normalize_host(host).unwrap_or_default(),
        }
    }

    pub fn host(&self) -> &str {
        &self.expected_host
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &RouteRequest<'_>) -> bool {
        req.host() == Some(self.expected_host.as_str())
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Length of the prefix if `path` starts with it.
    pub fn matched_len(&self, path: &str) -> Option<usize> {
        path.starts_with(&self.prefix).then_some(self.prefix.len())
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &RouteRequest<'_>) -> bool {
        self.matched_len(req.path()).is_some()
    }
}

/// Matches the request method against an allowed set.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &RouteRequest<'_>) -> bool {
        self.methods.contains(req.method())
    }
}
