//! Control plane: app registration and inspection.
//!
//! # Endpoints
//! - `POST /app` register or replace an app
//! - `GET /inspect/{name}` app configuration plus backend breaker state
//! - `GET /apps` registered app names
//! - `GET /status` process status

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use self::auth::control_auth_middleware;
use self::handlers::*;
use crate::config::ControlConfig;
use crate::http::request::UuidRequestId;
use crate::http::server::ProxyState;

#[allow(deprecated)]
pub fn control_router(state: ProxyState, config: &ControlConfig) -> Router {
    Router::new()
        .route("/app", post(register_app))
        .route("/inspect/{name}", get(inspect_app))
        .route("/apps", get(list_apps))
        .route("/status", get(get_status))
        .layer(middleware::from_fn_with_state(state.clone(), control_auth_middleware))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}
