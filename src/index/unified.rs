//! Build, freshness, and single-flight coordination.
//!
//! The published snapshot is an `Arc` swapped under a synchronous RwLock,
//! never mutated in place, so readers always see a whole snapshot. At most
//! one rebuild runs at a time: the first caller claims a watch-channel
//! build slot and spawns the build to completion; later callers attach to
//! the same channel and share its outcome, including failure. Callers that
//! arrive mid-build with a previous snapshot in memory are served that
//! snapshot instead of blocking, except before the very first build.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::relationships::RelationshipGraph;
use super::snapshot::{DiskProbe, IndexSnapshot, SnapshotStore};
use super::tier::{RefreshOutcome, TierIndex};
use super::IndexConfig;
use crate::elements::{ElementKey, ElementRef, Tier};
use crate::error::IndexError;
use crate::sources::ElementStore;

/// Outcome shared through the build slot; the error side is stringly so
/// it can be cloned to every waiter.
type BuildResult = Result<Arc<IndexSnapshot>, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Building,
    Ready,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Ready => "ready",
        }
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct UnifiedIndex {
    config: IndexConfig,
    local: TierIndex,
    remote: TierIndex,
    collection: TierIndex,
    store: SnapshotStore,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    /// Occupied while a rebuild is in flight; late arrivals clone the
    /// receiver and wait on it.
    build_slot: Mutex<Option<watch::Receiver<Option<BuildResult>>>>,
}

impl UnifiedIndex {
    pub fn new(
        config: IndexConfig,
        local: Arc<dyn ElementStore>,
        remote: Arc<dyn ElementStore>,
        collection: Arc<dyn ElementStore>,
    ) -> Self {
        let store = SnapshotStore::new(config.snapshot_path.clone());
        Self {
            local: TierIndex::new(Tier::Local, local, &config),
            remote: TierIndex::new(Tier::Remote, remote, &config),
            collection: TierIndex::new(Tier::Collection, collection, &config),
            store,
            current: RwLock::new(None),
            build_slot: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The published snapshot, if any. Never triggers a rebuild.
    pub fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().clone()
    }

    /// Non-rebuilding view for status reporting: memory first, else
    /// whatever disk holds, however old.
    pub fn peek(&self) -> Option<Arc<IndexSnapshot>> {
        if let Some(snapshot) = self.current() {
            return Some(snapshot);
        }
        match self.store.load() {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.install(snapshot.clone());
                Some(snapshot)
            }
            Err(_) => None,
        }
    }

    pub fn state(&self) -> BuildState {
        if self.build_slot.lock().is_some() {
            return BuildState::Building;
        }
        if self.current.read().is_some() {
            BuildState::Ready
        } else {
            BuildState::Idle
        }
    }

    /// Return a fresh snapshot, rebuilding if needed.
    pub async fn ensure_fresh(self: &Arc<Self>) -> Result<Arc<IndexSnapshot>, IndexError> {
        let now = Utc::now().timestamp_millis();

        // 1. Disk age first. Deciding from the in-memory copy alone can
        //    serve data past its TTL.
        let probe = self.store.probe(now);

        // 2. Reuse memory only when it is live and no older than disk. A
        //    failed save leaves disk behind memory, and memory stays
        //    authoritative then.
        if let Some(snapshot) = self.current() {
            if !snapshot.is_stale(now) && memory_is_current(&snapshot, probe) {
                debug!("serving in-memory snapshot {}", snapshot.build_id);
                return Ok(snapshot);
            }
        }

        // 3. Disk holds a fresh snapshot this process has not loaded yet.
        if matches!(probe, DiskProbe::Fresh { .. }) {
            match self.store.load() {
                Ok(snapshot) if !snapshot.is_stale(now) => {
                    debug!("loading persisted snapshot {}", snapshot.build_id);
                    let snapshot = Arc::new(snapshot);
                    self.install(snapshot.clone());
                    return Ok(snapshot);
                }
                Ok(_) => {}
                Err(e) => warn!("persisted snapshot unreadable, rebuilding: {e}"),
            }
        }

        // 4. Nothing fresh anywhere: rebuild, sharing any build already in
        //    flight.
        self.rebuild_shared(true).await
    }

    /// Force a rebuild regardless of TTL, through the same single-flight
    /// path as `ensure_fresh`.
    pub async fn rebuild(self: &Arc<Self>) -> Result<Arc<IndexSnapshot>, IndexError> {
        self.rebuild_shared(false).await
    }

    async fn rebuild_shared(
        self: &Arc<Self>,
        serve_previous: bool,
    ) -> Result<Arc<IndexSnapshot>, IndexError> {
        let (rx, attached) = {
            let mut slot = self.build_slot.lock();
            match slot.as_ref() {
                Some(rx) => (rx.clone(), true),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx.clone());
                    let index = Arc::clone(self);
                    // Detached so the build runs to completion even if the
                    // initiating caller goes away.
                    tokio::spawn(async move {
                        let result = index.rebuild_inner().await;
                        *index.build_slot.lock() = None;
                        let _ = tx.send(Some(result));
                    });
                    (rx, false)
                }
            }
        };

        // A rebuild in progress does not block reads against the previous
        // snapshot, except before the very first build.
        if attached && serve_previous {
            if let Some(previous) = self.current() {
                debug!("rebuild in flight, serving previous snapshot {}", previous.build_id);
                return Ok(previous);
            }
        }

        let mut rx = rx;
        let value = rx
            .wait_for(|outcome| outcome.is_some())
            .await
            .map_err(|_| IndexError::Unavailable {
                reason: "rebuild abandoned before completion".into(),
            })?;
        let outcome = (*value).clone();
        drop(value);
        match outcome {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(reason)) => Err(IndexError::Unavailable { reason }),
            None => Err(IndexError::Unavailable {
                reason: "rebuild abandoned before completion".into(),
            }),
        }
    }

    async fn rebuild_inner(&self) -> BuildResult {
        let started = std::time::Instant::now();
        info!("index rebuild started");

        // 1. Refresh the three tiers concurrently; latency is the slowest
        //    tier, not the sum.
        let (local, remote, collection) = tokio::join!(
            self.local.refresh(),
            self.remote.refresh(),
            self.collection.refresh(),
        );
        let outcomes = [local, remote, collection];

        // 2. A failed tier degrades the build, it does not abort it.
        for outcome in &outcomes {
            if outcome.failed {
                warn!("{} tier contributed nothing to this rebuild", outcome.tier);
            }
        }

        // 3. Every tier failed: fall back to memory, then disk.
        if outcomes.iter().all(|o| o.failed) {
            if let Some(previous) = self.current() {
                warn!(
                    "all tiers failed; keeping previous snapshot {}",
                    previous.build_id
                );
                return Ok(previous);
            }
            if let Ok(snapshot) = self.store.load() {
                warn!(
                    "all tiers failed; serving persisted snapshot {}",
                    snapshot.build_id
                );
                let snapshot = Arc::new(snapshot);
                self.install(snapshot.clone());
                return Ok(snapshot);
            }
            return Err("all tiers failed and no prior snapshot exists".into());
        }

        // 4. Merge tiers into the preferred-first element table.
        let elements = merge_tiers(outcomes);

        // 5. Bounded relationship discovery over the merged table.
        let graph = RelationshipGraph::build(&elements, &self.config);

        // 6. Publish, then persist. A failed save is a warning and the
        //    in-memory snapshot stays authoritative.
        let snapshot = Arc::new(IndexSnapshot::new(
            elements,
            graph.edges,
            graph.verb_map,
            self.config.ttl_ms,
        ));
        self.install(snapshot.clone());
        if let Err(e) = self.store.save(&snapshot) {
            warn!("snapshot save failed; memory copy stays authoritative: {e}");
        }
        info!(
            "index rebuild {} finished in {}ms: {} elements, {} edges, {} verbs ({} pairs scored)",
            snapshot.build_id,
            started.elapsed().as_millis(),
            snapshot.element_count(),
            snapshot.relationships.len(),
            snapshot.verb_map.len(),
            graph.scored_pairs,
        );
        Ok(snapshot)
    }

    fn install(&self, snapshot: Arc<IndexSnapshot>) {
        *self.current.write() = Some(snapshot);
    }
}

fn memory_is_current(snapshot: &IndexSnapshot, probe: DiskProbe) -> bool {
    match probe {
        DiskProbe::Missing => true,
        DiskProbe::Fresh { built_at } | DiskProbe::Stale { built_at } => {
            snapshot.built_at >= built_at
        }
    }
}

/// Group the three tiers' refs by key and order each group preferred-first.
fn merge_tiers(outcomes: [RefreshOutcome; 3]) -> BTreeMap<ElementKey, Vec<ElementRef>> {
    let mut merged: BTreeMap<ElementKey, Vec<ElementRef>> = BTreeMap::new();
    for outcome in outcomes {
        for element in outcome.elements {
            merged
                .entry(ElementKey::of(&element))
                .or_default()
                .push(element);
        }
    }
    for refs in merged.values_mut() {
        refs.sort_by(preferred_order);
    }
    merged
}

/// Highest version first, then tier priority, then name.
fn preferred_order(a: &ElementRef, b: &ElementRef) -> Ordering {
    compare_versions(b.version.as_deref(), a.version.as_deref())
        .then_with(|| a.tier.priority().cmp(&b.tier.priority()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Lenient dotted-numeric comparison; non-numeric segments fall back to
/// lexicographic, an absent version loses to any version.
fn compare_versions(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_version_strings(a, b),
    }
}

fn compare_version_strings(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        let (sa, sb) = (left.next(), right.next());
        if sa.is_none() && sb.is_none() {
            return Ordering::Equal;
        }
        let sa = sa.unwrap_or("");
        let sb = sb.unwrap_or("");
        let ord = match (sa.parse::<u64>(), sb.parse::<u64>()) {
            (Ok(na), Ok(nb)) => na.cmp(&nb),
            _ => sa.cmp(sb),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElementRecord, ElementType};

    fn element(name: &str, tier: Tier, version: Option<&str>) -> ElementRef {
        ElementRecord {
            id: String::new(),
            element_type: ElementType::Skill,
            name: name.into(),
            path: None,
            version: version.map(String::from),
            tags: Vec::new(),
            verbs: Vec::new(),
            description: String::new(),
            last_modified: None,
        }
        .into_ref(tier)
    }

    fn outcome(tier: Tier, elements: Vec<ElementRef>) -> RefreshOutcome {
        RefreshOutcome {
            tier,
            elements,
            failed: false,
        }
    }

    #[test]
    fn dotted_numeric_version_compare() {
        assert_eq!(
            compare_versions(Some("1.10"), Some("1.9")),
            Ordering::Greater
        );
        assert_eq!(compare_versions(Some("1.0.1"), Some("1.0")), Ordering::Greater);
        assert_eq!(compare_versions(Some("2.0"), Some("10.0")), Ordering::Less);
        assert_eq!(compare_versions(Some("1.0"), Some("1.0")), Ordering::Equal);
        assert_eq!(compare_versions(Some("0.1"), None), Ordering::Greater);
        assert_eq!(compare_versions(None, None), Ordering::Equal);
        // Non-numeric segments compare lexicographically.
        assert_eq!(
            compare_versions(Some("1.beta"), Some("1.alpha")),
            Ordering::Greater
        );
    }

    #[test]
    fn merge_prefers_highest_version() {
        let merged = merge_tiers([
            outcome(Tier::Local, vec![element("code-review", Tier::Local, Some("1.0"))]),
            outcome(
                Tier::Remote,
                vec![element("code-review", Tier::Remote, Some("1.1"))],
            ),
            outcome(Tier::Collection, vec![]),
        ]);
        let refs = merged
            .get(&ElementKey::new(ElementType::Skill, "code-review"))
            .unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].tier, Tier::Remote);
        assert_eq!(refs[0].version.as_deref(), Some("1.1"));
    }

    #[test]
    fn merge_breaks_version_ties_by_tier_priority() {
        let merged = merge_tiers([
            outcome(Tier::Local, vec![element("code-review", Tier::Local, Some("1.0"))]),
            outcome(
                Tier::Remote,
                vec![element("code-review", Tier::Remote, Some("1.0"))],
            ),
            outcome(
                Tier::Collection,
                vec![element("code-review", Tier::Collection, Some("1.0"))],
            ),
        ]);
        let refs = merged
            .get(&ElementKey::new(ElementType::Skill, "code-review"))
            .unwrap();
        let tiers: Vec<Tier> = refs.iter().map(|r| r.tier).collect();
        assert_eq!(tiers, vec![Tier::Local, Tier::Remote, Tier::Collection]);
    }

    #[test]
    fn merge_groups_names_case_insensitively() {
        let merged = merge_tiers([
            outcome(Tier::Local, vec![element("Code-Review", Tier::Local, None)]),
            outcome(Tier::Remote, vec![element("code-review", Tier::Remote, None)]),
            outcome(Tier::Collection, vec![]),
        ]);
        assert_eq!(merged.len(), 1);
        let refs = merged
            .get(&ElementKey::new(ElementType::Skill, "code-review"))
            .unwrap();
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn memory_currency_against_disk_probe() {
        let snapshot = IndexSnapshot::new(BTreeMap::new(), Vec::new(), BTreeMap::new(), 60_000);
        assert!(memory_is_current(&snapshot, DiskProbe::Missing));
        assert!(memory_is_current(
            &snapshot,
            DiskProbe::Fresh {
                built_at: snapshot.built_at - 1
            }
        ));
        assert!(!memory_is_current(
            &snapshot,
            DiskProbe::Fresh {
                built_at: snapshot.built_at + 1
            }
        ));
    }
}
