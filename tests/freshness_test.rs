mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{index_with, search_all, skill, test_config, MockStore};

#[tokio::test]
async fn fresh_memory_serves_without_new_listings() {
    let dir = tempfile::tempdir().unwrap();
    let local = MockStore::new(vec![skill("alpha")]);
    let remote = MockStore::empty();
    let collection = MockStore::empty();
    let index = index_with(
        test_config(dir.path()),
        local.clone(),
        remote.clone(),
        collection.clone(),
    );

    let first = index.search(search_all()).await.unwrap();
    assert_eq!(first.total, 1);
    // One refresh lists each of the six element types once per tier.
    assert_eq!(local.calls(), 6);
    assert_eq!(remote.calls(), 6);

    let second = index.search(search_all()).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(local.calls(), 6);
    assert_eq!(remote.calls(), 6);
}

#[tokio::test]
async fn expired_snapshot_rebuilds_before_serving() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.ttl_ms = 50;
    let local = MockStore::new(vec![skill("alpha")]);
    let index = index_with(config, local.clone(), MockStore::empty(), MockStore::empty());

    let first = index.search(search_all()).await.unwrap();
    assert_eq!(first.items[0].name, "alpha");

    // Past the TTL, a query must see the source's current state, not the
    // expired snapshot.
    local.set_records(vec![skill("beta")]);
    tokio::time::sleep(Duration::from_millis(120)).await;

    let second = index.search(search_all()).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "beta");
    assert_eq!(local.calls(), 12);
}

#[tokio::test]
async fn fresh_disk_snapshot_loads_without_rebuilding() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let seeder = index_with(
        config.clone(),
        MockStore::new(vec![skill("alpha")]),
        MockStore::empty(),
        MockStore::empty(),
    );
    let seeded = seeder.search(search_all()).await.unwrap();

    // A second process over the same snapshot path starts cold but finds
    // the persisted build.
    let local = MockStore::new(vec![skill("other")]);
    let index = index_with(config, local.clone(), MockStore::empty(), MockStore::empty());
    let result = index.search(search_all()).await.unwrap();
    assert_eq!(result, seeded);
    assert_eq!(local.calls(), 0);
}

#[tokio::test]
async fn newer_disk_snapshot_replaces_older_memory() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let local_a = MockStore::new(vec![skill("alpha")]);
    let index_a = index_with(
        config.clone(),
        local_a.clone(),
        MockStore::empty(),
        MockStore::empty(),
    );
    let first = index_a.search(search_all()).await.unwrap();
    assert_eq!(first.items[0].name, "alpha");
    assert_eq!(local_a.calls(), 6);

    // A sibling handle rebuilds and persists a newer snapshot. Millisecond
    // timestamps need a beat between the two builds.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let index_b = index_with(
        config,
        MockStore::new(vec![skill("beta")]),
        MockStore::empty(),
        MockStore::empty(),
    );
    index_b.rebuild().await.unwrap();

    // The first handle notices disk moved ahead of its memory and reloads
    // instead of serving the older copy or listing again.
    let second = index_a.search(search_all()).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "beta");
    assert_eq!(local_a.calls(), 6);
}

#[tokio::test]
async fn failed_save_leaves_memory_authoritative() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    // A directory squatting on the snapshot path makes every save fail.
    std::fs::create_dir_all(&config.snapshot_path).unwrap();

    let local = MockStore::new(vec![skill("alpha")]);
    let index = index_with(config, local.clone(), MockStore::empty(), MockStore::empty());

    let first = index.search(search_all()).await.unwrap();
    assert_eq!(first.total, 1);
    assert_eq!(local.calls(), 6);

    let second = index.search(search_all()).await.unwrap();
    assert_eq!(second, first);
    // The unsaveable snapshot keeps serving from memory; no rebuild loop.
    assert_eq!(local.calls(), 6);
}

#[tokio::test]
async fn stats_reflect_build_age_and_staleness() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.ttl_ms = 40;
    let index = index_with(
        config,
        MockStore::new(vec![skill("alpha")]),
        MockStore::empty(),
        MockStore::empty(),
    );

    assert_eq!(index.stats().state, "idle");
    index.search(search_all()).await.unwrap();

    let stats = index.stats();
    assert_eq!(stats.state, "ready");
    assert_eq!(stats.elements, 1);
    assert_eq!(stats.stale, Some(false));

    tokio::time::sleep(Duration::from_millis(80)).await;
    let aged = index.stats();
    // Status only reports; it never rebuilds on its own.
    assert_eq!(aged.stale, Some(true));
    assert_eq!(aged.build_id, stats.build_id);
}

#[tokio::test]
async fn handles_share_one_index_through_arc() {
    let dir = tempfile::tempdir().unwrap();
    let local = MockStore::new(vec![skill("alpha")]);
    let index = Arc::new(index_with(
        test_config(dir.path()),
        local.clone(),
        MockStore::empty(),
        MockStore::empty(),
    ));

    let handle = index.clone();
    let spawned = tokio::spawn(async move { handle.search(search_all()).await });
    let direct = index.search(search_all()).await.unwrap();
    let from_task = spawned.await.unwrap().unwrap();
    assert_eq!(direct, from_task);
}
