//! Per-tier element listing.
//!
//! A refresh walks the six element types under a single tier deadline, so a
//! slow source still yields the types gathered before the clock ran out.
//! The remote and collection tiers keep the last successful listing per
//! type in a bounded cache and fall back to it when a listing fails or the
//! deadline is spent. A refresh never raises: total failure is an empty
//! outcome with `failed` set, which keeps the other tiers' rebuild alive.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use super::cache::BoundedCache;
use super::IndexConfig;
use crate::elements::{ElementRef, ElementType, Tier};
use crate::sources::ElementStore;

pub struct RefreshOutcome {
    pub tier: Tier,
    pub elements: Vec<ElementRef>,
    pub failed: bool,
}

pub struct TierIndex {
    tier: Tier,
    store: Arc<dyn ElementStore>,
    timeout_ms: u64,
    /// Last successful listing per type; network tiers only.
    listings: Option<BoundedCache<ElementType, Vec<ElementRef>>>,
}

impl TierIndex {
    pub fn new(tier: Tier, store: Arc<dyn ElementStore>, config: &IndexConfig) -> Self {
        let listings = match tier {
            Tier::Local => None,
            Tier::Remote | Tier::Collection => {
                Some(BoundedCache::new(config.max_cache_bytes))
            }
        };
        Self {
            tier,
            store,
            timeout_ms: config.tier_timeout_ms,
            listings,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// List every element type once, stamped with this tier.
    pub async fn refresh(&self) -> RefreshOutcome {
        let deadline = Instant::now() + Duration::from_millis(self.timeout_ms);
        let mut elements = Vec::new();
        let mut failures = 0usize;

        for element_type in ElementType::ALL {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    "{} tier: deadline spent before listing {}s",
                    self.tier, element_type
                );
                if !self.extend_from_cache(element_type, &mut elements) {
                    failures += 1;
                }
                continue;
            }
            let listing = tokio::time::timeout(
                remaining,
                self.store.list_elements(Some(element_type)),
            )
            .await;
            match listing {
                Ok(Ok(records)) => {
                    let refs: Vec<ElementRef> = records
                        .into_iter()
                        .map(|record| record.into_ref(self.tier))
                        .collect();
                    if let Some(cache) = &self.listings {
                        cache.set(element_type, refs.clone(), listing_size(&refs));
                    }
                    elements.extend(refs);
                }
                Ok(Err(e)) => {
                    warn!("{} tier: listing {}s failed: {e:#}", self.tier, element_type);
                    if !self.extend_from_cache(element_type, &mut elements) {
                        failures += 1;
                    }
                }
                Err(_) => {
                    warn!("{} tier: listing {}s timed out", self.tier, element_type);
                    if !self.extend_from_cache(element_type, &mut elements) {
                        failures += 1;
                    }
                }
            }
        }

        RefreshOutcome {
            tier: self.tier,
            failed: elements.is_empty() && failures > 0,
            elements,
        }
    }

    fn extend_from_cache(
        &self,
        element_type: ElementType,
        elements: &mut Vec<ElementRef>,
    ) -> bool {
        let Some(cache) = &self.listings else {
            return false;
        };
        match cache.get(&element_type) {
            Some(cached) => {
                elements.extend(cached);
                true
            }
            None => false,
        }
    }
}

fn listing_size(refs: &[ElementRef]) -> usize {
    serde_json::to_vec(refs).map(|bytes| bytes.len()).unwrap_or(0)
}
