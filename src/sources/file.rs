//! Local portfolio store.
//!
//! The portfolio is one subdirectory per element type (`profiles/`,
//! `skills/`, ...) holding one JSON descriptor per element. A missing
//! subdirectory lists as empty; a descriptor that fails to parse is
//! skipped with a warning so one bad file cannot hide the rest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::ElementStore;
use crate::elements::{ElementRecord, ElementType};

/// On-disk descriptor shape. The type comes from the directory, `id` and
/// `last_modified` fall back to the file stem and mtime.
#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    verbs: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    last_modified: Option<String>,
}

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn list_type(&self, element_type: ElementType) -> Vec<ElementRecord> {
        let dir = self.root.join(element_type.plural());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("cannot read {}: {e}", dir.display());
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_descriptor(&path, element_type) {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping {}: {e:#}", path.display()),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

#[async_trait]
impl ElementStore for FileStore {
    async fn list_elements(
        &self,
        element_type: Option<ElementType>,
    ) -> Result<Vec<ElementRecord>> {
        let records = match element_type {
            Some(element_type) => self.list_type(element_type),
            None => ElementType::ALL
                .iter()
                .flat_map(|t| self.list_type(*t))
                .collect(),
        };
        Ok(records)
    }
}

fn read_descriptor(path: &Path, element_type: ElementType) -> Result<ElementRecord> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let descriptor: Descriptor =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("element");
    let id = descriptor
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("{element_type}_{stem}"));
    let last_modified = descriptor.last_modified.or_else(|| file_mtime(path));

    Ok(ElementRecord {
        id,
        element_type,
        name: descriptor.name,
        path: Some(path.display().to_string()),
        version: descriptor.version,
        tags: descriptor.tags,
        verbs: descriptor.verbs,
        description: descriptor.description,
        last_modified,
    })
}

fn file_mtime(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(chrono::DateTime::<chrono::Utc>::from(modified).to_rfc3339())
}
