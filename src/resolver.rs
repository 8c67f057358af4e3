//! Media Resolution - tiered lookup with a no-propagation rule
//!
//! # Tiers (in resolution priority order)
//!
//! 1. **Local** - sled cache (fastest, offline-capable)
//! 2. **Remote** - authoritative store (may reject reads)
//! 3. **StaticFallback** - bundled catalog (always available, generic)
//!
//! Tiers are queried one after another; the first non-empty answer wins and
//! its order is kept as-is. Remote failures are logged and skipped, never
//! surfaced to the caller.
//!
//! A Remote answer that still points at fetchable locators is never written
//! into Local. [`Resolution::may_propagate`] carries the rule and
//! [`BackfillController`] enforces it.

use crate::error::Result;
use crate::model::{MediaReference, MediaSet, Provenance, Tier};
use crate::sync::{BackfillController, BackfillOutcome, PayloadOptimizer, SkipReason};
use crate::tiers::{LocalCache, MediaTier};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Resolution - Returned to caller
// =============================================================================

/// Media chosen for an entity and the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub media: MediaSet,
    pub tier: Tier,
}

impl Resolution {
    pub fn new(media: MediaSet, tier: Tier) -> Self {
        Self { media, tier }
    }

    /// Whether this result may be written into the Local tier.
    ///
    /// False only for Remote results that contain an indirection.
    pub fn may_propagate(&self) -> bool {
        match self.tier {
            Tier::Remote => self.media.is_self_contained(),
            Tier::Local | Tier::StaticFallback => true,
        }
    }

    /// Badge shown next to the media
    pub fn provenance(&self) -> Provenance {
        Provenance::from(self.tier)
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    /// Flagged primary image, else the first one
    pub fn primary(&self) -> Option<&MediaReference> {
        self.media.primary()
    }
}

/// Resolution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub resolutions: u64,
    pub local_hits: u64,
    pub remote_hits: u64,
    pub fallback_hits: u64,
    /// Tier queries that errored
    pub tier_failures: u64,
}

#[derive(Default)]
struct Counters {
    resolutions: AtomicU64,
    hits: [AtomicU64; 3],
    tier_failures: AtomicU64,
}

// =============================================================================
// Resolver - Main resolution engine
// =============================================================================

/// Tiered media resolver.
///
/// `Send + Sync`; share it behind an `Arc` to resolve distinct entities
/// concurrently. Concurrent resolutions of one entity are not deduplicated.
#[derive(Default)]
pub struct Resolver {
    /// Registered tiers, sorted by priority
    tiers: Vec<Arc<dyn MediaTier>>,
    /// Local cache handle used for backfill
    local: Option<Arc<LocalCache>>,
    optimizer: PayloadOptimizer,
    counters: Counters,
}

impl Resolver {
    /// Resolver with no tiers; everything resolves to an empty fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual three-tier stack.
    pub fn standard(
        local: Arc<LocalCache>,
        remote: Arc<dyn MediaTier>,
        fallback: Arc<dyn MediaTier>,
    ) -> Self {
        Self::new().with_local(local).with_tier(remote).with_tier(fallback)
    }

    /// Register a tier. Tiers are kept in priority order; a second adapter
    /// for the same tier is tried after the first.
    pub fn with_tier(mut self, tier: Arc<dyn MediaTier>) -> Self {
        self.tiers.push(tier);
        self.tiers.sort_by_key(|t| t.tier());
        self
    }

    /// Register the Local tier and keep it as the backfill target.
    pub fn with_local(mut self, local: Arc<LocalCache>) -> Self {
        self.local = Some(local.clone());
        self.with_tier(local)
    }

    /// Payload shrinking applied to backfilled media
    pub fn with_optimizer(mut self, optimizer: PayloadOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Tiers in the order they are queried
    pub fn tiers(&self) -> Vec<Tier> {
        self.tiers.iter().map(|t| t.tier()).collect()
    }

    pub fn local(&self) -> Option<&Arc<LocalCache>> {
        self.local.as_ref()
    }

    /// Resolve an entity's media. Never fails.
    ///
    /// When every tier errors or comes back empty the result is an empty set
    /// attributed to StaticFallback.
    pub async fn resolve(&self, entity_id: &str) -> Resolution {
        self.counters.resolutions.fetch_add(1, Ordering::Relaxed);

        for adapter in &self.tiers {
            let tier = adapter.tier();
            match adapter.get(entity_id).await {
                Ok(media) if !media.is_empty() => {
                    self.counters.hits[tier as usize].fetch_add(1, Ordering::Relaxed);
                    debug!(entity = %entity_id, tier = %tier, count = media.len(), "Resolved media");
                    return Resolution::new(media, tier);
                }
                Ok(_) => {
                    debug!(entity = %entity_id, tier = %tier, "Tier has no media");
                }
                Err(e) => {
                    self.counters.tier_failures.fetch_add(1, Ordering::Relaxed);
                    if e.is_transient() {
                        warn!(entity = %entity_id, tier = %tier, error = %e, "Tier unavailable, falling through");
                    } else {
                        warn!(entity = %entity_id, tier = %tier, error = %e, "Tier query failed, falling through");
                    }
                }
            }
        }

        debug!(entity = %entity_id, "No tier produced media");
        Resolution::new(MediaSet::new(), Tier::StaticFallback)
    }

    /// Resolve, then write a self-contained Remote result into Local.
    ///
    /// Backfill write errors are returned; the resolution itself still
    /// succeeded, so it is handed back alongside.
    pub async fn resolve_and_backfill(
        &self,
        entity_id: &str,
    ) -> (Resolution, Result<BackfillOutcome>) {
        let resolution = self.resolve(entity_id).await;
        let outcome = match &self.local {
            Some(local) => BackfillController::new(local.clone())
                .with_optimizer(self.optimizer.clone())
                .backfill(entity_id, &resolution),
            None => Ok(BackfillOutcome::Skipped(SkipReason::NoLocalTier)),
        };
        if let Ok(BackfillOutcome::Replaced(count)) = &outcome {
            info!(entity = %entity_id, count = *count, "Backfilled local cache from remote");
        }
        (resolution, outcome)
    }

    /// Primary image of the resolved set
    pub async fn primary(&self, entity_id: &str) -> Option<MediaReference> {
        self.resolve(entity_id).await.primary().cloned()
    }

    pub fn stats(&self) -> ResolverStats {
        let hits = |tier: Tier| self.counters.hits[tier as usize].load(Ordering::Relaxed);
        ResolverStats {
            resolutions: self.counters.resolutions.load(Ordering::Relaxed),
            local_hits: hits(Tier::Local),
            remote_hits: hits(Tier::Remote),
            fallback_hits: hits(Tier::StaticFallback),
            tier_failures: self.counters.tier_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataUri, MediaSource};
    use crate::tiers::StaticCatalog;

    fn locator(url: &str) -> MediaReference {
        MediaReference::new(MediaSource::Locator(url.into()), Tier::Remote)
    }

    #[test]
    fn test_may_propagate() {
        let inline = MediaReference::inline(DataUri::from_bytes("image/png", b"a"), Tier::Remote);
        let self_contained = Resolution::new(MediaSet::from(vec![inline.clone()]), Tier::Remote);
        assert!(self_contained.may_propagate());

        let mixed = Resolution::new(
            MediaSet::from(vec![inline, locator("https://cdn.example.com/b.png")]),
            Tier::Remote,
        );
        assert!(!mixed.may_propagate());

        let fallback = Resolution::new(MediaSet::new(), Tier::StaticFallback);
        assert!(fallback.may_propagate());
        assert_eq!(fallback.provenance(), Provenance::Generic);
    }

    #[tokio::test]
    async fn test_tiers_are_sorted_by_priority() {
        let local = Arc::new(LocalCache::temporary().unwrap());
        let catalog = Arc::new(StaticCatalog::from_entries([("div-1", vec!["/a.jpg".to_string()])]).unwrap());
        let resolver = Resolver::new().with_tier(catalog).with_local(local);
        assert_eq!(resolver.tiers(), vec![Tier::Local, Tier::StaticFallback]);

        let resolution = resolver.resolve("div-1").await;
        assert_eq!(resolution.tier, Tier::StaticFallback);
        assert_eq!(resolver.stats().fallback_hits, 1);
    }

    #[tokio::test]
    async fn test_empty_resolver_returns_empty_fallback() {
        let resolution = Resolver::new().resolve("anything").await;
        assert!(resolution.is_empty());
        assert_eq!(resolution.tier, Tier::StaticFallback);
    }
}
