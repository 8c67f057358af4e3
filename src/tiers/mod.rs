//! Tier store adapters
//!
//! Three stores answer the same capability interface:
//! - **Local** ([`LocalCache`]) - sled-backed, synchronous, never fails a read
//! - **Remote** ([`RemoteTier`] over a [`RemoteStore`]) - async, may reject
//! - **StaticFallback** ([`StaticCatalog`]) - bundled, read-only, total

mod fallback;
mod http;
mod local;
mod remote;

pub use fallback::{CatalogFile, StaticCatalog};
pub use http::{HttpRemote, HttpRemoteConfig};
pub use local::LocalCache;
pub use remote::{
    FailureMode, GenerationMeta, MemoryRemote, OfflineRemote, RemoteImage, RemoteStore, RemoteTier,
};

use crate::error::{ContentError, Result};
use crate::model::{MediaSet, Tier};
use async_trait::async_trait;

/// Capability interface shared by every tier.
///
/// Reads return the tier's natural order. Writes default to
/// [`ContentError::ReadOnly`]; tiers that accept writes override them.
#[async_trait]
pub trait MediaTier: Send + Sync {
    /// Which tier this adapter serves
    fn tier(&self) -> Tier;

    /// Media for an entity; empty when the tier has nothing
    async fn get(&self, entity_id: &str) -> Result<MediaSet>;

    /// Replace the entity's media in full
    async fn put(&self, entity_id: &str, media: MediaSet) -> Result<()> {
        let _ = (entity_id, media);
        Err(ContentError::ReadOnly(self.tier()))
    }

    /// Remove one item by position
    async fn remove(&self, entity_id: &str, index: usize) -> Result<()> {
        let _ = (entity_id, index);
        Err(ContentError::ReadOnly(self.tier()))
    }

    /// Remove every item for the entity
    async fn clear(&self, entity_id: &str) -> Result<()> {
        let _ = entity_id;
        Err(ContentError::ReadOnly(self.tier()))
    }
}
