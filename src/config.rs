use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::index::IndexConfig;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CurioConfig {
    pub server: ServerConfig,
    pub portfolio: PortfolioConfig,
    pub remote: RemoteConfig,
    pub collection: CollectionConfig,
    pub index: IndexSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PortfolioConfig {
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the hosted collection; empty disables the tier.
    pub base_url: String,
    /// Environment variable the bearer token is read from.
    pub token_env: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectionConfig {
    /// Base URL of the community collection; empty disables the tier.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexSettings {
    pub ttl_ms: u64,
    pub max_comparisons: usize,
    pub min_edge_score: f64,
    pub max_cache_bytes: usize,
    pub tier_timeout_ms: u64,
    pub snapshot_path: String,
}

impl Default for CurioConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            portfolio: PortfolioConfig::default(),
            remote: RemoteConfig::default(),
            collection: CollectionConfig::default(),
            index: IndexSettings::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        let dir = default_curio_dir()
            .join("portfolio")
            .to_string_lossy()
            .into_owned();
        Self { dir }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token_env: "CURIO_API_TOKEN".into(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        let defaults = IndexConfig::default();
        Self {
            ttl_ms: defaults.ttl_ms,
            max_comparisons: defaults.max_comparisons,
            min_edge_score: defaults.min_edge_score,
            max_cache_bytes: defaults.max_cache_bytes,
            tier_timeout_ms: defaults.tier_timeout_ms,
            snapshot_path: defaults.snapshot_path.to_string_lossy().into_owned(),
        }
    }
}

/// Returns `~/.curio/`
pub fn default_curio_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".curio")
}

/// Returns the default config file path: `~/.curio/config.toml`
pub fn default_config_path() -> PathBuf {
    default_curio_dir().join("config.toml")
}

impl CurioConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CurioConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (CURIO_PORTFOLIO, CURIO_REMOTE_URL,
    /// CURIO_COLLECTION_URL, CURIO_SNAPSHOT, CURIO_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CURIO_PORTFOLIO") {
            self.portfolio.dir = val;
        }
        if let Ok(val) = std::env::var("CURIO_REMOTE_URL") {
            self.remote.base_url = val;
        }
        if let Ok(val) = std::env::var("CURIO_COLLECTION_URL") {
            self.collection.base_url = val;
        }
        if let Ok(val) = std::env::var("CURIO_SNAPSHOT") {
            self.index.snapshot_path = val;
        }
        if let Ok(val) = std::env::var("CURIO_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the portfolio directory, expanding `~` if needed.
    pub fn resolved_portfolio_dir(&self) -> PathBuf {
        expand_tilde(&self.portfolio.dir)
    }

    /// The index tuning knobs with the snapshot path resolved.
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            ttl_ms: self.index.ttl_ms,
            max_comparisons: self.index.max_comparisons,
            min_edge_score: self.index.min_edge_score,
            max_cache_bytes: self.index.max_cache_bytes,
            tier_timeout_ms: self.index.tier_timeout_ms,
            snapshot_path: expand_tilde(&self.index.snapshot_path),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
