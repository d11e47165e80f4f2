//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server of an app
//! - Identify it by (host, port); the weight is not part of identity
//! - Render the authority used when forwarding

use std::fmt;

/// Identity of a backend: host plus port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId {
    host: String,
    port: u16,
}

impl BackendId {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bare IPv6 literals need brackets inside an authority.
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A single weighted backend. Immutable once installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    id: BackendId,
    weight: u32,
}

impl Backend {
    /// Create a backend. Weight is validated upstream and must be positive.
    pub fn new(id: BackendId, weight: u32) -> Self {
        Self { id, weight }
    }

    pub fn id(&self) -> &BackendId {
        &self.id
    }

    pub fn host(&self) -> &str {
        self.id.host()
    }

    pub fn port(&self) -> u16 {
        self.id.port()
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_authority() {
        assert_eq!(BackendId::new("127.0.0.1", 8080).to_string(), "127.0.0.1:8080");
        assert_eq!(BackendId::new("api.internal", 80).to_string(), "api.internal:80");
        assert_eq!(BackendId::new("::1", 9000).to_string(), "[::1]:9000");
    }

    #[test]
    fn test_identity_ignores_weight() {
        let a = Backend::new(BackendId::new("10.0.0.1", 80), 1);
        let b = Backend::new(BackendId::new("10.0.0.1", 80), 5);
        assert_eq!(a.id(), b.id());
        assert_ne!(a, b);
    }
}
