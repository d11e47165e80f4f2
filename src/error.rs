//! Error taxonomy shared by the control and data planes.

use std::time::Duration;

use crate::registry::ValidationError;

/// Everything a request can fail with.
///
/// Control-plane errors never touch shared state; data-plane errors are
/// reported per request and fed back into the backend's timeline where
/// relevant. None of them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Control-plane body could not be read or parsed.
    #[error("malformed request body: {0}")]
    MalformedInput(String),

    /// Well-formed but semantically invalid app configuration.
    #[error("invalid app configuration: {0}")]
    Validation(#[from] ValidationError),

    /// No app matches the request, or the named app is unknown.
    #[error("{0}")]
    NotFound(String),

    /// The app exists but every backend's circuit is open.
    #[error("no healthy backend available for {0}")]
    NoHealthyBackend(String),

    /// The selected backend could not be reached or errored mid-request.
    #[error("upstream {backend} failed: {reason}")]
    Upstream { backend: String, reason: String },

    /// The selected backend did not answer within the deadline.
    #[error("upstream {backend} timed out after {after:?}")]
    UpstreamTimeout { backend: String, after: Duration },
}
