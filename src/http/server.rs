//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the data-plane and control-plane Axum routers
//! - Wire up middleware (tracing, request ID, limits)
//! - Bind both routers to their listeners
//! - Drain both on shutdown
//!
//! # Design Decisions
//! - One registry shared by both planes through `ProxyState`
//! - Control plane on its own listener so app paths never collide with it
//! - Data plane has no request timeout layer; the upstream deadline applies

use axum::body::Body;
use axum::Router;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::{ProxyConfig, TimeoutConfig};
use crate::http::dispatch::proxy_handler;
use crate::http::request::UuidRequestId;
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::registry::Registry;

/// State injected into data-plane and control-plane handlers.
#[derive(Clone)]
pub struct ProxyState {
    pub registry: Arc<Registry>,
    pub client: Client<HttpConnector, Body>,
    pub upstream_timeout: Duration,
    /// Bearer token required by the control plane, if any.
    pub api_key: Option<Arc<str>>,
}

impl ProxyState {
    pub fn new(registry: Arc<Registry>, timeouts: &TimeoutConfig, api_key: Option<String>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            registry,
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
            api_key: api_key.map(Arc::from),
        }
    }
}

/// Build the data-plane router: every method and path goes to the dispatcher.
pub fn proxy_router(state: ProxyState) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

/// The proxy's two HTTP servers.
pub struct HttpServer {
    proxy: Router,
    control: Router,
    registry: Arc<Registry>,
}

impl HttpServer {
    /// Create both servers around a fresh registry.
    pub fn new(config: &ProxyConfig) -> Self {
        let registry = Arc::new(Registry::new(config.registry_options()));
        Self::with_registry(config, registry)
    }

    /// Create both servers around an existing registry.
    pub fn with_registry(config: &ProxyConfig, registry: Arc<Registry>) -> Self {
        let state = ProxyState::new(
            registry.clone(),
            &config.timeouts,
            config.control.api_key.clone(),
        );
        Self {
            proxy: proxy_router(state.clone()),
            control: admin::control_router(state, &config.control),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Serve both planes until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        proxy_listener: TcpListener,
        control_listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            proxy = %proxy_listener.local_addr()?,
            control = %control_listener.local_addr()?,
            "HTTP servers starting"
        );

        let proxy = axum::serve(
            proxy_listener,
            self.proxy.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown::wait(shutdown.subscribe()));

        let control = axum::serve(
            control_listener,
            self.control.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown::wait(shutdown.subscribe()));

        tokio::try_join!(proxy.into_future(), control.into_future())?;

        tracing::info!("HTTP servers stopped");
        Ok(())
    }
}
