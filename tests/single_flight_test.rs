mod helpers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use curio::error::IndexError;
use helpers::{index_with, search_all, skill, test_config, MockStore};

#[tokio::test]
async fn concurrent_cold_searches_share_one_build() {
    let dir = tempfile::tempdir().unwrap();
    let local = MockStore::new(vec![skill("alpha"), skill("beta")]);
    let remote = MockStore::empty();
    let collection = MockStore::empty();
    // A slow local tier keeps the build in flight long enough for every
    // caller to pile up behind it.
    local.set_delay(Duration::from_millis(20));
    let index = Arc::new(index_with(
        test_config(dir.path()),
        local.clone(),
        remote.clone(),
        collection.clone(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let handle = index.clone();
        handles.push(tokio::spawn(async move { handle.search(search_all()).await }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    // Eight callers, one build: six type listings per tier, not forty-eight.
    assert_eq!(local.calls(), 6);
    assert_eq!(remote.calls(), 6);
    assert_eq!(collection.calls(), 6);
    for result in &results {
        assert_eq!(result, &results[0]);
        assert_eq!(result.total, 2);
    }
}

#[tokio::test]
async fn build_failure_is_shared_with_every_waiter() {
    let dir = tempfile::tempdir().unwrap();
    let local = MockStore::empty();
    let remote = MockStore::empty();
    let collection = MockStore::empty();
    local.set_fail(true);
    remote.set_fail(true);
    collection.set_fail(true);
    local.set_delay(Duration::from_millis(20));
    let index = Arc::new(index_with(
        test_config(dir.path()),
        local.clone(),
        remote.clone(),
        collection.clone(),
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let handle = index.clone();
        handles.push(tokio::spawn(async move { handle.search(search_all()).await }));
    }
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(IndexError::Unavailable { .. })));
    }
    // The failed attempt ran once, not once per caller.
    assert_eq!(local.calls(), 6);
}

#[tokio::test]
async fn stale_snapshot_is_served_while_rebuild_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.ttl_ms = 50;
    let local = MockStore::new(vec![skill("alpha")]);
    let index = Arc::new(index_with(
        config,
        local.clone(),
        MockStore::empty(),
        MockStore::empty(),
    ));

    let first = index.search(search_all()).await.unwrap();
    assert_eq!(first.items[0].name, "alpha");

    local.set_records(vec![skill("beta")]);
    local.set_delay(Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(80)).await;

    // The first caller past the TTL initiates the rebuild and waits for it.
    let initiator = {
        let handle = index.clone();
        tokio::spawn(async move { handle.search(search_all()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    // A caller arriving mid-build gets the previous snapshot immediately
    // instead of queueing behind the slow tier.
    let started = Instant::now();
    let during = index.search(search_all()).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(during.items[0].name, "alpha");

    let rebuilt = initiator.await.unwrap().unwrap();
    assert_eq!(rebuilt.items[0].name, "beta");
}

#[tokio::test]
async fn forced_rebuild_attaches_to_inflight_build() {
    let dir = tempfile::tempdir().unwrap();
    let local = MockStore::new(vec![skill("alpha")]);
    local.set_delay(Duration::from_millis(30));
    let index = Arc::new(index_with(
        test_config(dir.path()),
        local.clone(),
        MockStore::empty(),
        MockStore::empty(),
    ));

    let searcher = {
        let handle = index.clone();
        tokio::spawn(async move { handle.search(search_all()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let stats = index.rebuild().await.unwrap();

    searcher.await.unwrap().unwrap();
    assert_eq!(stats.elements, 1);
    assert_eq!(local.calls(), 6);
}
