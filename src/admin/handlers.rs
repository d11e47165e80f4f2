use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::ProxyError;
use crate::http::server::ProxyState;
use crate::registry::{AppConfig, AppSnapshot, Registration};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub apps: usize,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub registration: Registration,
}

/// `POST /app`: install or replace an app.
///
/// The body is parsed by hand so that an empty or truncated body is reported
/// as malformed input (400) rather than an extractor rejection.
pub async fn register_app(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Json<RegisterResponse>, ProxyError> {
    let config: AppConfig = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, bytes = body.len(), "Malformed app configuration");
        ProxyError::MalformedInput(e.to_string())
    })?;

    let registration = state.registry.register(&config)?;
    Ok(Json(RegisterResponse {
        status: "ok",
        registration,
    }))
}

/// `GET /inspect/{name}`: configuration plus live breaker state.
pub async fn inspect_app(
    State(state): State<ProxyState>,
    Path(name): Path<String>,
) -> Result<Json<AppSnapshot>, ProxyError> {
    state.registry.inspect(&name).map(Json)
}

/// `GET /apps`: registered app names.
pub async fn list_apps(State(state): State<ProxyState>) -> Json<Vec<String>> {
    Json(state.registry.apps())
}

pub async fn get_status(State(state): State<ProxyState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        apps: state.registry.len(),
    })
}
