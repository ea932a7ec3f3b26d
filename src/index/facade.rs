//! Query facade over the unified index.
//!
//! Every query ensures freshness first, then reads the published snapshot.
//! "Nothing found" is always an empty collection; the only raised condition
//! is `IndexError::Unavailable` when no snapshot can be produced at all.
//! Search results are memoized keyed by the full request and dropped as a
//! group whenever a snapshot with a new build id is observed.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::cache::BoundedCache;
use super::scoring;
use super::snapshot::IndexSnapshot;
use super::unified::UnifiedIndex;
use super::IndexConfig;
use crate::elements::{ElementKey, ElementRef, Tier};
use crate::error::IndexError;
use crate::sources::ElementStore;

pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// A search query. Doubles as the memoization key, so every field takes
/// part in equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    /// Case-insensitive term matched against name and tags; empty matches
    /// everything.
    pub term: String,
    /// Restrict results to these tiers; `None` means all.
    pub tiers: Option<Vec<Tier>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub items: Vec<ElementRef>,
    pub total: usize,
    pub has_more: bool,
}

/// Status report for the `status` command and logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub state: String,
    pub build_id: Option<String>,
    pub built_at: Option<i64>,
    pub age_ms: Option<i64>,
    pub ttl_ms: Option<u64>,
    pub stale: Option<bool>,
    pub keys: usize,
    pub elements: usize,
    pub elements_by_type: BTreeMap<String, usize>,
    pub elements_by_tier: BTreeMap<String, usize>,
    pub edges: usize,
    pub verbs: usize,
    pub query_cache_entries: usize,
    pub query_cache_bytes: usize,
}

pub struct CapabilityIndex {
    unified: Arc<UnifiedIndex>,
    query_cache: BoundedCache<SearchRequest, SearchResult>,
    last_build_id: Mutex<Option<String>>,
}

impl CapabilityIndex {
    pub fn new(
        config: IndexConfig,
        local: Arc<dyn ElementStore>,
        remote: Arc<dyn ElementStore>,
        collection: Arc<dyn ElementStore>,
    ) -> Self {
        let query_cache = BoundedCache::new(config.max_cache_bytes);
        Self {
            unified: Arc::new(UnifiedIndex::new(config, local, remote, collection)),
            query_cache,
            last_build_id: Mutex::new(None),
        }
    }

    /// Search name and tags, returning one preferred entry per key.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResult, IndexError> {
        let snapshot = self.unified.ensure_fresh().await?;
        self.observe_build(&snapshot);

        if let Some(memoized) = self.query_cache.get(&request) {
            debug!("search served from query cache");
            return Ok(memoized);
        }

        let result = run_search(&snapshot, &request);
        self.query_cache
            .set(request, result.clone(), result_size(&result));
        Ok(result)
    }

    /// Elements related to `key`, best edge score first.
    pub async fn find_similar(
        &self,
        key: &ElementKey,
        limit: usize,
    ) -> Result<Vec<ElementRef>, IndexError> {
        let snapshot = self.unified.ensure_fresh().await?;
        self.observe_build(&snapshot);
        Ok(similar_in(&snapshot, key, limit))
    }

    /// Elements declaring `verb`. Unknown verbs yield an empty list.
    pub async fn by_verb(&self, verb: &str) -> Result<Vec<ElementRef>, IndexError> {
        let snapshot = self.unified.ensure_fresh().await?;
        self.observe_build(&snapshot);

        let normalized = scoring::normalize_verb(verb);
        let Some(keys) = snapshot.verb_map.get(&normalized) else {
            return Ok(Vec::new());
        };
        Ok(keys
            .iter()
            .filter_map(|key| snapshot.preferred(key).cloned())
            .collect())
    }

    /// Status without triggering a rebuild.
    pub fn stats(&self) -> IndexStats {
        let state = self.unified.state();
        let mut stats = IndexStats {
            state: state.to_string(),
            ..IndexStats::default()
        };
        let Some(snapshot) = self.unified.peek() else {
            return stats;
        };

        let now = Utc::now().timestamp_millis();
        stats.build_id = Some(snapshot.build_id.clone());
        stats.built_at = Some(snapshot.built_at);
        stats.age_ms = Some(now - snapshot.built_at);
        stats.ttl_ms = Some(snapshot.ttl_ms);
        stats.stale = Some(snapshot.is_stale(now));
        stats.keys = snapshot.elements_by_key.len();
        stats.elements = snapshot.element_count();
        for refs in snapshot.elements_by_key.values() {
            for element in refs {
                *stats
                    .elements_by_type
                    .entry(element.element_type.to_string())
                    .or_insert(0) += 1;
                *stats
                    .elements_by_tier
                    .entry(element.tier.to_string())
                    .or_insert(0) += 1;
            }
        }
        stats.edges = snapshot.relationships.len();
        stats.verbs = snapshot.verb_map.len();
        stats.query_cache_entries = self.query_cache.len();
        stats.query_cache_bytes = self.query_cache.bytes_used();
        stats
    }

    /// Force a rebuild regardless of TTL and report the resulting state.
    pub async fn rebuild(&self) -> Result<IndexStats, IndexError> {
        let snapshot = self.unified.rebuild().await?;
        self.observe_build(&snapshot);
        Ok(self.stats())
    }

    /// Drop memoized queries the moment a different build is seen.
    fn observe_build(&self, snapshot: &IndexSnapshot) {
        let mut last = self.last_build_id.lock();
        if last.as_deref() != Some(snapshot.build_id.as_str()) {
            if last.is_some() {
                debug!(
                    "build {} observed, dropping memoized queries",
                    snapshot.build_id
                );
            }
            self.query_cache.clear();
            *last = Some(snapshot.build_id.clone());
        }
    }
}

fn run_search(snapshot: &IndexSnapshot, request: &SearchRequest) -> SearchResult {
    let term = request.term.trim().to_lowercase();
    let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let offset = request.offset.unwrap_or(0);

    // Snapshot keys are already ordered by (type, name), which is the
    // documented result order.
    let mut matches = Vec::new();
    for refs in snapshot.elements_by_key.values() {
        let allowed: Vec<&ElementRef> = refs
            .iter()
            .filter(|element| tier_allowed(request, element.tier))
            .collect();
        let Some(preferred) = allowed.first() else {
            continue;
        };
        if !term.is_empty() && !allowed.iter().any(|element| matches_term(element, &term)) {
            continue;
        }
        matches.push((*preferred).clone());
    }

    let total = matches.len();
    let items: Vec<ElementRef> = matches.into_iter().skip(offset).take(limit).collect();
    let has_more = offset + items.len() < total;
    SearchResult {
        items,
        total,
        has_more,
    }
}

fn tier_allowed(request: &SearchRequest, tier: Tier) -> bool {
    match &request.tiers {
        Some(tiers) => tiers.contains(&tier),
        None => true,
    }
}

fn matches_term(element: &ElementRef, term: &str) -> bool {
    element.name.to_lowercase().contains(term)
        || element
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(term))
}

/// Aggregate edges touching `key` at the maximum score per neighbor,
/// ordered score descending with ties broken by neighbor key.
fn similar_in(snapshot: &IndexSnapshot, key: &ElementKey, limit: usize) -> Vec<ElementRef> {
    let mut best: BTreeMap<&ElementKey, f64> = BTreeMap::new();
    for edge in &snapshot.relationships {
        let neighbor = if &edge.a == key {
            &edge.b
        } else if &edge.b == key {
            &edge.a
        } else {
            continue;
        };
        let entry = best.entry(neighbor).or_insert(0.0);
        if edge.score > *entry {
            *entry = edge.score;
        }
    }

    let mut neighbors: Vec<(&ElementKey, f64)> = best.into_iter().collect();
    neighbors.sort_by(|x, y| {
        y.1.partial_cmp(&x.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| x.0.cmp(y.0))
    });
    neighbors.truncate(limit);
    neighbors
        .into_iter()
        .filter_map(|(neighbor, _)| snapshot.preferred(neighbor).cloned())
        .collect()
}

fn result_size(result: &SearchResult) -> usize {
    serde_json::to_vec(result).map(|bytes| bytes.len()).unwrap_or(0)
}
