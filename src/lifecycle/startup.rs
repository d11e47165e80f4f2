//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order (metrics, registry, servers)
//! - Bind both listeners before any traffic is accepted
//! - Hook OS signals up to graceful shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind last, so traffic only arrives when everything is ready
//! - `bind` and `serve` are separate so callers can learn ephemeral ports

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::registry::Registry;

/// Errors that abort startup or serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid {field} {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A proxy whose listeners are bound but not yet serving.
pub struct BoundProxy {
    server: HttpServer,
    proxy_listener: TcpListener,
    control_listener: TcpListener,
    proxy_addr: SocketAddr,
    control_addr: SocketAddr,
}

impl BoundProxy {
    /// Build the server and bind both listeners.
    pub async fn bind(config: &ProxyConfig) -> Result<Self, StartupError> {
        let server = HttpServer::new(config);

        let proxy_listener = bind_listener(&config.listener.bind_address).await?;
        let control_listener = bind_listener(&config.control.bind_address).await?;
        let proxy_addr = proxy_listener.local_addr()?;
        let control_addr = control_listener.local_addr()?;

        Ok(Self {
            server,
            proxy_listener,
            control_listener,
            proxy_addr,
            control_addr,
        })
    }

    pub fn proxy_addr(&self) -> SocketAddr {
        self.proxy_addr
    }

    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.server.registry().clone()
    }

    /// Serve until `shutdown` fires.
    pub async fn serve(self, shutdown: Shutdown) -> Result<(), StartupError> {
        self.server
            .run(self.proxy_listener, self.control_listener, shutdown)
            .await?;
        Ok(())
    }
}

/// Run the proxy until SIGINT or SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse().map_err(|_| {
            StartupError::InvalidAddress {
                field: "observability.metrics_address",
                value: config.observability.metrics_address.clone(),
            }
        })?;
        metrics::init_metrics(addr)?;
    }

    let proxy = BoundProxy::bind(&config).await?;
    tracing::info!(
        proxy = %proxy.proxy_addr(),
        control = %proxy.control_addr(),
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    proxy.serve(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn bind_listener(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.control.bind_address = "127.0.0.1:0".into();
        config
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let proxy = BoundProxy::bind(&ephemeral_config()).await.unwrap();
        assert_ne!(proxy.proxy_addr().port(), 0);
        assert_ne!(proxy.proxy_addr(), proxy.control_addr());

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(proxy.serve(shutdown.clone()));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let mut config = ephemeral_config();
        config.listener.bind_address = "not-an-address".into();
        let err = BoundProxy::bind(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
