//! Snapshot model and JSON persistence.
//!
//! A snapshot is immutable once built; rebuilds produce a wholly new value.
//! On disk it is a single JSON document written via tmp-file plus atomic
//! rename under an advisory file lock, so a reader never sees a half-written
//! file and two processes never interleave writes. Freshness probes parse
//! only the header fields and memoize the result keyed on (mtime, length) —
//! the rename-only write discipline makes that pair a reliable change check.

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::Utc;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::relationships::RelationshipEdge;
use crate::elements::{ElementKey, ElementRef};
use crate::error::IndexError;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

// ── Snapshot model ──────────────────────────────────────────────────────────

/// The full index state: merged elements, relationship edges, verb lookup.
///
/// Per-key ref lists are ordered preferred-first. `built_at` is epoch
/// milliseconds; staleness is solely `now - built_at > ttl_ms`, judged
/// against the snapshot's own stamped TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub schema_version: u32,
    pub build_id: String,
    pub built_at: i64,
    pub ttl_ms: u64,
    pub elements_by_key: std::collections::BTreeMap<ElementKey, Vec<ElementRef>>,
    pub relationships: Vec<RelationshipEdge>,
    pub verb_map: std::collections::BTreeMap<String, Vec<ElementKey>>,
}

impl IndexSnapshot {
    pub fn new(
        elements_by_key: std::collections::BTreeMap<ElementKey, Vec<ElementRef>>,
        relationships: Vec<RelationshipEdge>,
        verb_map: std::collections::BTreeMap<String, Vec<ElementKey>>,
        ttl_ms: u64,
    ) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            build_id: Uuid::now_v7().to_string(),
            built_at: Utc::now().timestamp_millis(),
            ttl_ms,
            elements_by_key,
            relationships,
            verb_map,
        }
    }

    pub fn is_stale(&self, now_ms: i64) -> bool {
        now_ms - self.built_at > self.ttl_ms as i64
    }

    /// The preferred ref for a key, if the key exists.
    pub fn preferred(&self, key: &ElementKey) -> Option<&ElementRef> {
        self.elements_by_key.get(key)?.first()
    }

    /// Total refs across all keys and tiers.
    pub fn element_count(&self) -> usize {
        self.elements_by_key.values().map(Vec::len).sum()
    }
}

/// Header projection of the snapshot file, decoded without materializing
/// the element table.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotHeader {
    pub schema_version: u32,
    pub build_id: String,
    pub built_at: i64,
    pub ttl_ms: u64,
}

impl SnapshotHeader {
    pub fn is_stale(&self, now_ms: i64) -> bool {
        now_ms - self.built_at > self.ttl_ms as i64
    }
}

/// Result of a disk freshness probe. Corrupt and schema-mismatched files
/// are reported as `Missing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiskProbe {
    Fresh { built_at: i64 },
    Stale { built_at: i64 },
    Missing,
}

// ── Persistent store ────────────────────────────────────────────────────────

struct HeaderMemo {
    mtime: SystemTime,
    len: u64,
    /// `None` memoizes a corrupt or schema-mismatched file.
    header: Option<SnapshotHeader>,
}

pub struct SnapshotStore {
    path: PathBuf,
    header_memo: Mutex<Option<HeaderMemo>>,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            header_memo: Mutex::new(None),
        }
    }

    /// Classify the on-disk snapshot without deserializing the element
    /// table. Any unreadable state maps to `Missing`.
    pub fn probe(&self, now_ms: i64) -> DiskProbe {
        let meta = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return DiskProbe::Missing,
            Err(e) => {
                warn!("snapshot probe failed for {}: {e}", self.path.display());
                return DiskProbe::Missing;
            }
        };
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let len = meta.len();

        let mut memo = self.header_memo.lock();
        let header = match memo.as_ref() {
            Some(m) if m.mtime == mtime && m.len == len => m.header.clone(),
            _ => {
                let header = self.parse_header();
                *memo = Some(HeaderMemo {
                    mtime,
                    len,
                    header: header.clone(),
                });
                header
            }
        };
        drop(memo);

        match header {
            Some(h) if !h.is_stale(now_ms) => DiskProbe::Fresh {
                built_at: h.built_at,
            },
            Some(h) => DiskProbe::Stale {
                built_at: h.built_at,
            },
            None => DiskProbe::Missing,
        }
    }

    fn parse_header(&self) -> Option<SnapshotHeader> {
        let bytes = std::fs::read(&self.path).ok()?;
        let header: SnapshotHeader = match serde_json::from_slice(&bytes) {
            Ok(header) => header,
            Err(e) => {
                warn!("snapshot at {} is corrupt: {e}", self.path.display());
                return None;
            }
        };
        if header.schema_version != SNAPSHOT_SCHEMA_VERSION {
            warn!(
                "snapshot at {} has schema v{}, expected v{}; treating as absent",
                self.path.display(),
                header.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            );
            return None;
        }
        Some(header)
    }

    /// Deserialize the full snapshot.
    pub fn load(&self) -> Result<IndexSnapshot, IndexError> {
        let bytes = std::fs::read(&self.path)?;
        let snapshot: IndexSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| IndexError::Corrupt(format!("{}: {e}", self.path.display())))?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(IndexError::Corrupt(format!(
                "{}: schema v{}, expected v{}",
                self.path.display(),
                snapshot.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            )));
        }
        Ok(snapshot)
    }

    /// Persist a snapshot: advisory lock, write to a tmp file, atomic
    /// rename into place.
    pub fn save(&self, snapshot: &IndexSnapshot) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::Persistence(format!("create {}: {e}", parent.display()))
            })?;
        }
        let lock_path = self.path.with_extension("lock");
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| {
                IndexError::Persistence(format!("open {}: {e}", lock_path.display()))
            })?;
        lock_file.try_lock_exclusive().map_err(|e| {
            IndexError::Persistence(format!("lock {}: {e}", lock_path.display()))
        })?;

        let result = self.write_locked(snapshot);
        let _ = lock_file.unlock();
        result
    }

    fn write_locked(&self, snapshot: &IndexSnapshot) -> Result<(), IndexError> {
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|e| IndexError::Persistence(format!("serialize snapshot: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)
            .map_err(|e| IndexError::Persistence(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            IndexError::Persistence(format!("rename {}: {e}", tmp.display()))
        })?;
        *self.header_memo.lock() = None;
        Ok(())
    }
}
