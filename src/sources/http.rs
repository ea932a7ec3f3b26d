//! HTTP catalog store for the remote and collection tiers.
//!
//! Fetches `GET {base_url}/elements?type=<t>` expecting a JSON body of the
//! form `{"elements": [...]}`. Items decode individually so one malformed
//! entry cannot poison a listing. When a token provider is attached and
//! yields no token, the listing short-circuits to empty — a missing
//! credential degrades the tier, it is not an error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ElementStore, TokenProvider};
use crate::elements::{ElementRecord, ElementType};

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    elements: Vec<Value>,
}

pub struct HttpCatalogStore {
    client: reqwest::Client,
    base_url: String,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl HttpCatalogStore {
    pub fn new(
        base_url: impl Into<String>,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;
        let base_url = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn catalog_url(&self, element_type: Option<ElementType>) -> String {
        match element_type {
            Some(t) => format!("{}/elements?type={t}", self.base_url),
            None => format!("{}/elements", self.base_url),
        }
    }
}

#[async_trait]
impl ElementStore for HttpCatalogStore {
    async fn list_elements(
        &self,
        element_type: Option<ElementType>,
    ) -> Result<Vec<ElementRecord>> {
        let mut request = self.client.get(self.catalog_url(element_type));
        if let Some(tokens) = &self.tokens {
            match tokens.get_token() {
                Some(token) => request = request.bearer_auth(token),
                None => {
                    debug!("no token for {}, listing nothing", self.base_url);
                    return Ok(Vec::new());
                }
            }
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("fetching {}", self.base_url))?
            .error_for_status()
            .with_context(|| format!("fetching {}", self.base_url))?;
        let catalog: Catalog = response
            .json()
            .await
            .with_context(|| format!("decoding catalog from {}", self.base_url))?;
        Ok(decode_elements(catalog, element_type))
    }
}

fn decode_elements(catalog: Catalog, element_type: Option<ElementType>) -> Vec<ElementRecord> {
    let mut records = Vec::new();
    for item in catalog.elements {
        match serde_json::from_value::<ElementRecord>(item) {
            Ok(record) => {
                // Servers that ignore the type parameter get filtered here.
                if element_type.map_or(true, |t| record.element_type == t) {
                    records.push(record);
                }
            }
            Err(e) => warn!("skipping catalog item: {e}"),
        }
    }
    records
}
