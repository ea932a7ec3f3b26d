#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use curio::elements::{ElementRecord, ElementType};
use curio::index::{CapabilityIndex, IndexConfig, SearchRequest};
use curio::sources::ElementStore;

/// Scriptable in-memory element store. Records can be swapped between
/// refreshes, listings can be made to fail or stall, and every
/// `list_elements` call is counted (one refresh makes one call per
/// element type).
pub struct MockStore {
    records: Mutex<Vec<ElementRecord>>,
    fail: Mutex<bool>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl MockStore {
    pub fn new(records: Vec<ElementRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            fail: Mutex::new(false),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn set_records(&self, records: Vec<ElementRecord>) {
        *self.records.lock() = records;
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ElementStore for MockStore {
    async fn list_elements(
        &self,
        element_type: Option<ElementType>,
    ) -> anyhow::Result<Vec<ElementRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock() {
            anyhow::bail!("listing refused");
        }
        let records = self.records.lock().clone();
        Ok(match element_type {
            Some(t) => records.into_iter().filter(|r| r.element_type == t).collect(),
            None => records,
        })
    }
}

/// A minimal record of the given type and name.
pub fn record(element_type: ElementType, name: &str) -> ElementRecord {
    ElementRecord {
        id: String::new(),
        element_type,
        name: name.to_string(),
        path: None,
        version: None,
        tags: Vec::new(),
        verbs: Vec::new(),
        description: String::new(),
        last_modified: None,
    }
}

/// A skill record, the most common fixture.
pub fn skill(name: &str) -> ElementRecord {
    record(ElementType::Skill, name)
}

pub fn versioned(mut record: ElementRecord, version: &str) -> ElementRecord {
    record.version = Some(version.to_string());
    record
}

pub fn tagged(mut record: ElementRecord, tags: &[&str]) -> ElementRecord {
    record.tags = tags.iter().map(|t| t.to_string()).collect();
    record
}

pub fn with_verbs(mut record: ElementRecord, verbs: &[&str]) -> ElementRecord {
    record.verbs = verbs.iter().map(|v| v.to_string()).collect();
    record
}

pub fn described(mut record: ElementRecord, description: &str) -> ElementRecord {
    record.description = description.to_string();
    record
}

/// Index config pointed at a scratch snapshot, with a generous TTL so
/// tests control staleness explicitly.
pub fn test_config(dir: &Path) -> IndexConfig {
    IndexConfig {
        ttl_ms: 60_000,
        max_comparisons: 500,
        min_edge_score: 0.15,
        max_cache_bytes: 1_000_000,
        tier_timeout_ms: 2_000,
        snapshot_path: dir.join("index.json"),
    }
}

/// A capability index wired to the three given stores.
pub fn index_with(
    config: IndexConfig,
    local: Arc<MockStore>,
    remote: Arc<MockStore>,
    collection: Arc<MockStore>,
) -> CapabilityIndex {
    CapabilityIndex::new(config, local, remote, collection)
}

/// A search request matching everything, all tiers.
pub fn search_all() -> SearchRequest {
    SearchRequest {
        term: String::new(),
        tiers: None,
        limit: None,
        offset: None,
    }
}

/// A search request for a single term, all tiers.
pub fn search_term(term: &str) -> SearchRequest {
    SearchRequest {
        term: term.to_string(),
        tiers: None,
        limit: None,
        offset: None,
    }
}
