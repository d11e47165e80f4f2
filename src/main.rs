//! breaker-proxy
//!
//! A reverse proxy with runtime-registered apps and per-backend circuit
//! breakers, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Control client                     ┌──────────────────────────────────────────┐
//!     ──── POST /app ───────────────────▶│ admin (control listener)                 │
//!     ──── GET /inspect/{name} ─────────▶│   → registry.register / registry.inspect │
//!                                        └──────────────────┬───────────────────────┘
//!                                                           │ ArcSwap<RegistryState>
//!                                                           ▼
//!     Client Request                     ┌──────────────────────────────────────────┐
//!     ─────────────────────────────────▶ │ http (data listener)                     │
//!                                        │   → routing::Router   (app match)        │
//!                                        │   → load_balancer     (weighted pick)    │
//!                                        │   → hyper client      (upstream call)    │──▶ Backend
//!                                        │   → resilience        (timeline update)  │
//!     Client Response ◀───────────────── │                                          │◀── Backend
//!                                        └──────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use breaker_proxy::config::{load_config, validate_config, ConfigError, LogFormat, ProxyConfig};
use breaker_proxy::lifecycle::startup;
use breaker_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "breaker-proxy")]
#[command(about = "Reverse proxy with per-backend circuit breakers", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data-plane bind address, overriding the file.
    #[arg(long)]
    listen: Option<String>,

    /// Control-plane bind address, overriding the file.
    #[arg(long)]
    control_listen: Option<String>,

    /// Log output format, overriding the file.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(control) = self.control_listen {
            config.control.bind_address = control;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.listener.bind_address,
        control = %config.control.bind_address,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        failure_threshold = config.breaker.failure_threshold,
        "breaker-proxy starting"
    );

    startup::run(config).await?;
    Ok(())
}
