//! Data-plane request dispatch.
//!
//! # Data Flow
//! ```text
//! Request
//!     → registry.resolve (route match + weighted pick over eligible backends)
//!     → upstream_request (URI rewrite, header hygiene)
//!     → client.request under the upstream deadline
//!     → outcome fed back into the backend's timeline
//!     → response streamed to the client
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream attempt per request; failures are not retried
//! - Upstream 5xx responses are passed through but count as failures
//! - Routing errors never touch a timeline

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::ProxyError;
use crate::http::request::{request_id, strip_hop_by_hop, upstream_request};
use crate::http::server::ProxyState;
use crate::observability::metrics;
use crate::resilience::timeouts::{call_with_deadline, DeadlineError};
use crate::resilience::Outcome;
use crate::routing::RouteRequest;

/// Forward a request to a healthy backend of the app that serves it.
pub async fn proxy_handler(State(state): State<ProxyState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let resolved = state.registry.resolve(&RouteRequest::from_request(&request));
    let target = match resolved {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, error = %e, "Request not routed");
            metrics::record_request(method.as_str(), e.status_code().as_u16(), "none", start);
            return e.into_response();
        }
    };

    let backend = target.backend.id().clone();
    let backend_label = backend.to_string();
    tracing::debug!(
        request_id = %request_id,
        app = %target.app,
        backend = %backend_label,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let upstream = match upstream_request(request, &backend, client_addr) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %backend_label, error = %e, "Could not build upstream request");
            let err = ProxyError::Upstream {
                backend: backend_label.clone(),
                reason: e.to_string(),
            };
            metrics::record_request(method.as_str(), err.status_code().as_u16(), &backend_label, start);
            return err.into_response();
        }
    };

    let (outcome, response) =
        match call_with_deadline(state.upstream_timeout, state.client.request(upstream)).await {
            Ok(upstream_response) => {
                let outcome = Outcome::from_status(upstream_response.status().as_u16());
                let (mut parts, body) = upstream_response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                (outcome, Response::from_parts(parts, Body::new(body)))
            }
            Err(DeadlineError::Inner(e)) => {
                tracing::error!(request_id = %request_id, backend = %backend_label, error = %e, "Upstream error");
                let err = ProxyError::Upstream {
                    backend: backend_label.clone(),
                    reason: e.to_string(),
                };
                (Outcome::Failure, err.into_response())
            }
            Err(DeadlineError::Elapsed(after)) => {
                tracing::warn!(request_id = %request_id, backend = %backend_label, timeout = ?after, "Upstream timed out");
                let err = ProxyError::UpstreamTimeout {
                    backend: backend_label.clone(),
                    after,
                };
                (Outcome::Failure, err.into_response())
            }
        };

    let circuit = state.registry.record(&target.app, &backend, outcome);
    metrics::record_request(method.as_str(), response.status().as_u16(), &backend_label, start);
    tracing::debug!(
        request_id = %request_id,
        backend = %backend_label,
        status = response.status().as_u16(),
        outcome = ?outcome,
        circuit = ?circuit,
        latency_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
