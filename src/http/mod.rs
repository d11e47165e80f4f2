//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → dispatch.rs (registry resolves app + backend)
//!     → request.rs (rewrite for upstream)
//!     → hyper client (bounded by the upstream deadline)
//!     → response.rs (error mapping)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{proxy_router, HttpServer, ProxyState};
