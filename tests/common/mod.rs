//! Shared utilities for integration and load testing.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use breaker_proxy::lifecycle::{BoundProxy, StartupError};
use breaker_proxy::{ProxyConfig, Shutdown};
use serde_json::{json, Value};

/// Start a simple mock backend that returns a fixed response.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, response.to_string()) }).await
}

/// Start a programmable mock backend. Each connection serves one response.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = std::sync::Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A running proxy on ephemeral ports.
pub struct TestProxy {
    pub proxy_addr: SocketAddr,
    pub control_addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), StartupError>>,
}

impl TestProxy {
    #[allow(dead_code)]
    pub fn proxy_url(&self, path: &str) -> String {
        format!("http://{}{}", self.proxy_addr, path)
    }

    pub fn control_url(&self, path: &str) -> String {
        format!("http://{}{}", self.control_addr, path)
    }
}

/// Start a proxy with `config`, with both listeners moved to ephemeral ports.
pub async fn start_proxy(mut config: ProxyConfig) -> TestProxy {
    config.listener.bind_address = "127.0.0.1:0".into();
    config.control.bind_address = "127.0.0.1:0".into();

    let proxy = BoundProxy::bind(&config).await.unwrap();
    let proxy_addr = proxy.proxy_addr();
    let control_addr = proxy.control_addr();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(proxy.serve(shutdown.clone()));

    // Let the servers subscribe to shutdown and start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestProxy {
        proxy_addr,
        control_addr,
        shutdown,
        handle,
    }
}

/// HTTP client that never reuses connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// App body for `domain` routing `/` GET traffic to `backends` (address, weight).
pub fn app_json(domain: &str, backends: &[(SocketAddr, u32)]) -> Value {
    let backends: Vec<Value> = backends
        .iter()
        .map(|(addr, weight)| json!({"host": addr.ip().to_string(), "port": addr.port(), "weight": weight}))
        .collect();
    json!({
        "domain": domain,
        "paths": ["/"],
        "methods": ["GET"],
        "backends": backends,
    })
}

/// Register an app through the control plane, returning the status code.
pub async fn register(proxy: &TestProxy, body: &Value) -> u16 {
    client()
        .post(proxy.control_url("/app"))
        .json(body)
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}
