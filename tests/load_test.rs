//! Load testing: concurrent dispatch while apps are re-registered.

use breaker_proxy::ProxyConfig;
use reqwest::header::HOST;
use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_load_with_concurrent_reconfiguration() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;
    assert_eq!(common::register(&proxy, &common::app_json("www.example.com", &[(a, 1)])).await, 200);

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = proxy.proxy_url("/");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                if let Ok(res) = client.get(&url).header(HOST, "www.example.com").send().await {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    // Flip the backend pool back and forth while traffic flows.
    for i in 0..20 {
        let pool = if i % 2 == 0 { vec![(a, 1), (b, 2)] } else { vec![(b, 1)] };
        assert_eq!(common::register(&proxy, &common::app_json("www.example.com", &pool)).await, 200);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "every request should succeed");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    proxy.shutdown.trigger();
}
