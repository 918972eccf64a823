//! Batch fetches through the bounded fan-out against a mock upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use herostats::{fan_out, ApiClient, ApiConfig, CacheStore, RetryPolicy};

mod common;

use common::{request_path, MockReply, MockUpstream};

/// Upstream that echoes the request path and tracks concurrent requests.
async fn echo_upstream(peak: Arc<AtomicUsize>) -> MockUpstream {
    let current = Arc::new(AtomicUsize::new(0));
    MockUpstream::start(move |index, request_line| {
        let current = current.clone();
        let peak = peak.clone();
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            // Vary latency so responses complete out of order.
            tokio::time::sleep(Duration::from_millis(10 + (index as u64 % 5) * 7)).await;
            current.fetch_sub(1, Ordering::SeqCst);

            let path = request_path(&request_line);
            if path.ends_with("/matches/2") {
                MockReply::status(500)
            } else {
                MockReply::ok(json!({ "path": path }).to_string())
            }
        }
    })
    .await
}

fn client_for(upstream: &MockUpstream, max_concurrency: usize) -> ApiClient {
    ApiClient::new(
        ApiConfig::default()
            .with_base_url(upstream.base_url())
            .with_max_concurrency(max_concurrency)
            .with_retry_policy(RetryPolicy::none()),
    )
}

#[tokio::test]
async fn test_fetch_many_preserves_order_and_bounds_concurrency() {
    let peak = Arc::new(AtomicUsize::new(0));
    let upstream = echo_upstream(peak.clone()).await;
    let client = client_for(&upstream, 6);
    let paths: Vec<String> = (10..30).map(|i| format!("/matches/{}", i)).collect();

    let results = client.fetch_many(&paths).await;

    assert_eq!(results.len(), 20);
    for (i, result) in results.iter().enumerate() {
        let expected = json!({ "path": format!("/api/matches/{}", i + 10) });
        assert_eq!(result.as_ref(), Some(&expected));
    }
    assert_eq!(upstream.hits(), 20);
    assert!(
        peak.load(Ordering::SeqCst) <= 6,
        "peak in-flight was {}",
        peak.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_fetch_many_isolates_failed_item() {
    let upstream = echo_upstream(Arc::new(AtomicUsize::new(0))).await;
    let client = client_for(&upstream, 6);
    let paths: Vec<String> = (0..5).map(|i| format!("/matches/{}", i)).collect();

    let results = client.fetch_many(&paths).await;

    assert_eq!(results.len(), 5);
    assert!(results[2].is_none());
    for i in [0, 1, 3, 4] {
        assert_eq!(
            results[i],
            Some(json!({ "path": format!("/api/matches/{}", i) }))
        );
    }
}

#[tokio::test]
async fn test_fetch_many_cached_deduplicates_sequential_repeats() {
    let upstream = echo_upstream(Arc::new(AtomicUsize::new(0))).await;
    let client = client_for(&upstream, 1);
    let cache = CacheStore::new();
    let paths: Vec<String> = ["/heroes", "/matches/7", "/heroes", "/heroes"]
        .iter()
        .map(|p| p.to_string())
        .collect();

    let results = client.fetch_many_cached(&paths, &cache, 60).await;

    assert_eq!(upstream.hits(), 2);
    assert_eq!(results[0], results[2]);
    assert_eq!(results[2], results[3]);
    assert_eq!(results[1], Some(json!({ "path": "/api/matches/7" })));
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_fan_out_with_client_and_index() {
    let upstream = echo_upstream(Arc::new(AtomicUsize::new(0))).await;
    let client = client_for(&upstream, 6);
    let match_ids = vec![101u64, 102, 103];

    let results = fan_out(
        match_ids,
        |match_id, index| {
            let client = &client;
            async move {
                let payload: Value = client
                    .fetch_resource(&format!("/matches/{}", match_id))
                    .await?;
                Ok::<_, herostats::ApiError>((index, payload))
            }
        },
        2,
    )
    .await;

    for (i, result) in results.into_iter().enumerate() {
        let (index, payload) = result.expect("every item should succeed");
        assert_eq!(index, i);
        assert_eq!(payload["path"], format!("/api/matches/{}", 101 + i));
    }
}
