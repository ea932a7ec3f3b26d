//! The capability index: tiered listing, merge, relationship discovery,
//! snapshot persistence, and the query facade.

pub mod cache;
pub mod facade;
pub mod relationships;
pub mod scoring;
pub mod snapshot;
pub mod tier;
pub mod unified;

pub use cache::BoundedCache;
pub use facade::{CapabilityIndex, IndexStats, SearchRequest, SearchResult};
pub use relationships::{EdgeKind, RelationshipEdge, RelationshipGraph};
pub use snapshot::{DiskProbe, IndexSnapshot, SnapshotStore, SNAPSHOT_SCHEMA_VERSION};
pub use tier::{RefreshOutcome, TierIndex};
pub use unified::{BuildState, UnifiedIndex};

use std::path::PathBuf;

/// Tuning knobs for the index. Defaults match the documented contract;
/// the config file narrows or widens them per deployment.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Snapshot time-to-live in milliseconds.
    pub ttl_ms: u64,
    /// Comparison budget for one relationship build.
    pub max_comparisons: usize,
    /// Edges scoring below this are discarded.
    pub min_edge_score: f64,
    /// Byte budget shared by each bounded cache instance.
    pub max_cache_bytes: usize,
    /// Deadline for one tier's full refresh.
    pub tier_timeout_ms: u64,
    /// Where the JSON snapshot lives.
    pub snapshot_path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 300_000,
            max_comparisons: 500,
            min_edge_score: 0.15,
            max_cache_bytes: 50_000_000,
            tier_timeout_ms: 10_000,
            snapshot_path: crate::config::default_curio_dir().join("index.json"),
        }
    }
}
