//! Read-only views returned by inspection.

use serde::{Deserialize, Serialize};

use crate::resilience::CircuitState;

/// Configuration and live state of one app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub domain: String,
    pub paths: Vec<String>,
    pub methods: Vec<String>,
    pub backends: Vec<BackendSnapshot>,
}

impl AppSnapshot {
    pub fn backend(&self, host: &str, port: u16) -> Option<&BackendSnapshot> {
        self.backends.iter().find(|b| b.host == host && b.port == port)
    }
}

/// Configuration and breaker state of one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSnapshot {
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub state: CircuitState,
    pub failure_rate: f64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// Summary of what a registration changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub domain: String,
    /// Backends that got a fresh timeline.
    pub added: usize,
    /// Backends whose timeline (and health history) carried over.
    pub retained: usize,
    /// Backends whose timeline was dropped.
    pub removed: usize,
}
