//! Failure injection tests: breaker trips, exclusion, recovery and timeouts.

use axum::http::StatusCode;
use breaker_proxy::ProxyConfig;
use reqwest::header::HOST;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;

fn fast_breaker() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.breaker.min_samples = 4;
    config.breaker.failure_threshold = 0.5;
    config.breaker.cooldown_ms = 300;
    config
}

async fn backend_state(proxy: &common::TestProxy, domain: &str, port: u16) -> String {
    let snapshot: Value = common::client()
        .get(proxy.control_url(&format!("/inspect/{}", domain)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    snapshot["backends"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["port"] == port)
        .map(|b| b["state"].as_str().unwrap().to_string())
        .unwrap()
}

#[tokio::test]
async fn test_failing_backend_trips_then_recovers() {
    let healthy = Arc::new(AtomicBool::new(false));
    let h = healthy.clone();
    let backend = common::start_programmable_backend(move || {
        let h = h.clone();
        async move {
            if h.load(Ordering::SeqCst) {
                (200, "ok".into())
            } else {
                (500, "dead".into())
            }
        }
    })
    .await;

    let proxy = common::start_proxy(fast_breaker()).await;
    let client = common::client();
    assert_eq!(common::register(&proxy, &common::app_json("www.example.com", &[(backend, 1)])).await, 200);

    // Upstream 5xx responses are passed through and counted.
    for _ in 0..4 {
        let res = client
            .get(proxy.proxy_url("/"))
            .header(HOST, "www.example.com")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert_eq!(backend_state(&proxy, "www.example.com", backend.port()).await, "open");

    let res = client
        .get(proxy.proxy_url("/"))
        .header(HOST, "www.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    // After the cooldown only a share of requests is admitted as a trial request;
    // the rest are refused until one succeeds and closes the circuit.
    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(backend_state(&proxy, "www.example.com", backend.port()).await, "half_open");

    let mut refused = 0;
    let mut recovered = false;
    for _ in 0..500 {
        let res = client
            .get(proxy.proxy_url("/"))
            .header(HOST, "www.example.com")
            .send()
            .await
            .unwrap();
        match res.status() {
            StatusCode::OK => {
                recovered = true;
                break;
            }
            StatusCode::SERVICE_UNAVAILABLE => refused += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert!(recovered, "a half-open request should eventually be admitted");
    println!("refused {refused} requests while half-open");
    assert_eq!(backend_state(&proxy, "www.example.com", backend.port()).await, "closed");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_open_backend_is_excluded() {
    let good = common::start_mock_backend("good").await;
    let bad = common::start_programmable_backend(|| async { (503, "down".into()) }).await;

    let mut config = fast_breaker();
    config.breaker.cooldown_ms = 60_000;
    let proxy = common::start_proxy(config).await;
    let client = common::client();
    assert_eq!(
        common::register(&proxy, &common::app_json("www.example.com", &[(good, 1), (bad, 1)])).await,
        200
    );

    // Keep sending until the failing backend has tripped.
    let mut tripped = false;
    for _ in 0..200 {
        let _ = client
            .get(proxy.proxy_url("/"))
            .header(HOST, "www.example.com")
            .send()
            .await
            .unwrap();
        if backend_state(&proxy, "www.example.com", bad.port()).await == "open" {
            tripped = true;
            break;
        }
    }
    assert!(tripped, "failing backend should trip");

    for _ in 0..20 {
        let res = client
            .get(proxy.proxy_url("/"))
            .header(HOST, "www.example.com")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "good");
    }

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let proxy = common::start_proxy(ProxyConfig::default()).await;
    assert_eq!(common::register(&proxy, &common::app_json("www.example.com", &[(dead, 1)])).await, 200);

    let res = common::client()
        .get(proxy.proxy_url("/"))
        .header(HOST, "www.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains(&dead.port().to_string()));

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "late".into())
    })
    .await;

    let mut config = ProxyConfig::default();
    config.timeouts.upstream_secs = 1;
    let proxy = common::start_proxy(config).await;
    assert_eq!(common::register(&proxy, &common::app_json("www.example.com", &[(backend, 1)])).await, 200);

    let res = common::client()
        .get(proxy.proxy_url("/"))
        .header(HOST, "www.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

    proxy.shutdown.trigger();
}
