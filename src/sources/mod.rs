//! Element source adapters behind the [`ElementStore`] trait.
//!
//! One store per tier: the local portfolio reads JSON descriptors off
//! disk, the remote and collection tiers fetch an HTTP catalog, and
//! unconfigured tiers fall back to the always-empty null store.

pub mod file;
pub mod http;

pub use file::FileStore;
pub use http::HttpCatalogStore;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::CurioConfig;
use crate::elements::{ElementRecord, ElementType};

/// A tier's listing collaborator. Implementations are side-effect-free,
/// skip unreadable items instead of raising, and report elements without
/// a tier — the index stamps the tier on.
#[async_trait]
pub trait ElementStore: Send + Sync {
    /// List elements, optionally narrowed to one type. `None` lists all.
    async fn list_elements(
        &self,
        element_type: Option<ElementType>,
    ) -> Result<Vec<ElementRecord>>;
}

/// Supplies the bearer token for a token-gated catalog.
pub trait TokenProvider: Send + Sync {
    fn get_token(&self) -> Option<String>;
}

/// Reads the token from an environment variable; empty counts as absent.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvTokenProvider {
    fn get_token(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|token| !token.is_empty())
    }
}

/// The empty store, used when a tier is unconfigured.
pub struct NullStore;

#[async_trait]
impl ElementStore for NullStore {
    async fn list_elements(
        &self,
        _element_type: Option<ElementType>,
    ) -> Result<Vec<ElementRecord>> {
        Ok(Vec::new())
    }
}

/// Build the (local, remote, collection) stores from configuration.
pub fn create_stores(
    config: &CurioConfig,
) -> Result<(
    Arc<dyn ElementStore>,
    Arc<dyn ElementStore>,
    Arc<dyn ElementStore>,
)> {
    let local: Arc<dyn ElementStore> =
        Arc::new(FileStore::new(config.resolved_portfolio_dir()));

    let remote: Arc<dyn ElementStore> = if config.remote.base_url.is_empty() {
        Arc::new(NullStore)
    } else {
        let tokens = Arc::new(EnvTokenProvider::new(&config.remote.token_env));
        Arc::new(HttpCatalogStore::new(
            config.remote.base_url.clone(),
            Some(tokens),
        )?)
    };

    let collection: Arc<dyn ElementStore> = if config.collection.base_url.is_empty() {
        Arc::new(NullStore)
    } else {
        Arc::new(HttpCatalogStore::new(config.collection.base_url.clone(), None)?)
    };

    Ok((local, remote, collection))
}
