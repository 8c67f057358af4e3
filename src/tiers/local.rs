//! Local cache tier
//!
//! Durable per-entity media sets in sled. One key per entity, value is the
//! JSON array of references (inline payloads as data URIs). Writes are single
//! key replacements; append is read-modify-write with no compare-and-swap.

use super::MediaTier;
use crate::error::{ContentError, Result};
use crate::model::{MediaReference, MediaSet, Tier};
use async_trait::async_trait;
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info, warn};

const MEDIA_TREE: &str = "media";

/// Local cache database
pub struct LocalCache {
    #[allow(dead_code)]
    db: Db,
    media: Tree,
}

impl LocalCache {
    /// Open or create the cache database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened local cache");
        Self::from_db(db)
    }

    /// In-memory cache that is discarded on drop
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let media = db.open_tree(MEDIA_TREE)?;
        Ok(Self { db, media })
    }

    /// Stored set for an entity.
    ///
    /// Absence, storage errors and undecodable entries all read as empty;
    /// the read path never fails.
    pub fn get(&self, entity_id: &str) -> MediaSet {
        match self.try_get(entity_id) {
            Ok(set) => set,
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "Local cache read failed, treating as empty");
                MediaSet::new()
            }
        }
    }

    /// Stored set for an entity, surfacing decode/storage errors.
    pub fn try_get(&self, entity_id: &str) -> Result<MediaSet> {
        match self.media.get(entity_id.as_bytes())? {
            Some(value) => {
                let set: MediaSet = serde_json::from_slice(&value)?;
                Ok(set.served_by(Tier::Local))
            }
            None => Ok(MediaSet::new()),
        }
    }

    /// Replace the entity's set in full. An empty set removes the key.
    pub fn replace_all(&self, entity_id: &str, media: &MediaSet) -> Result<()> {
        if media.is_empty() {
            return self.clear(entity_id);
        }
        let value = serde_json::to_vec(media)?;
        self.media.insert(entity_id.as_bytes(), value)?;
        debug!(entity = %entity_id, count = media.len(), "Replaced local media");
        Ok(())
    }

    /// Append to the existing set, returning the new length.
    pub fn append(&self, entity_id: &str, references: &[MediaReference]) -> Result<usize> {
        let mut media = self.try_get(entity_id)?;
        media.extend(references.iter().cloned());
        self.replace_all(entity_id, &media)?;
        debug!(entity = %entity_id, added = references.len(), total = media.len(), "Appended local media");
        Ok(media.len())
    }

    /// Remove one item by position, returning it.
    pub fn remove_at(&self, entity_id: &str, index: usize) -> Result<MediaReference> {
        let mut media = self.try_get(entity_id)?;
        let removed = media.remove(index)?;
        self.replace_all(entity_id, &media)?;
        Ok(removed)
    }

    /// Drop the entity's entry entirely.
    pub fn clear(&self, entity_id: &str) -> Result<()> {
        self.media.remove(entity_id.as_bytes())?;
        debug!(entity = %entity_id, "Cleared local media");
        Ok(())
    }

    /// Drop every entity's entry, returning how many there were.
    pub fn clear_all(&self) -> Result<usize> {
        let count = self.media.len();
        self.media.clear()?;
        debug!(count, "Cleared all local media");
        Ok(count)
    }

    /// Entities that currently have a cached set
    pub fn entities(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for item in self.media.iter() {
            let (key, _) = item?;
            match String::from_utf8(key.to_vec()) {
                Ok(id) => ids.push(id),
                Err(_) => warn!("Skipping non UTF-8 local cache key"),
            }
        }
        Ok(ids)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.media.flush().map_err(ContentError::from)?;
        Ok(())
    }
}

#[async_trait]
impl MediaTier for LocalCache {
    fn tier(&self) -> Tier {
        Tier::Local
    }

    async fn get(&self, entity_id: &str) -> Result<MediaSet> {
        Ok(LocalCache::get(self, entity_id))
    }

    async fn put(&self, entity_id: &str, media: MediaSet) -> Result<()> {
        self.replace_all(entity_id, &media)
    }

    async fn remove(&self, entity_id: &str, index: usize) -> Result<()> {
        self.remove_at(entity_id, index).map(|_| ())
    }

    async fn clear(&self, entity_id: &str) -> Result<()> {
        LocalCache::clear(self, entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataUri, MediaSource};

    fn inline(bytes: &[u8]) -> MediaReference {
        MediaReference::inline(DataUri::from_bytes("image/png", bytes), Tier::Remote)
    }

    #[test]
    fn test_absent_entity_is_empty() {
        let cache = LocalCache::temporary().unwrap();
        assert!(cache.get("missing").is_empty());
    }

    #[test]
    fn test_replace_append_remove_clear() {
        let cache = LocalCache::temporary().unwrap();
        cache
            .replace_all("div-1", &MediaSet::from(vec![inline(b"a"), inline(b"b")]))
            .unwrap();
        assert_eq!(cache.append("div-1", &[inline(b"c")]).unwrap(), 3);

        let removed = cache.remove_at("div-1", 1).unwrap();
        assert_eq!(removed.source, inline(b"b").source);

        let set = cache.get("div-1");
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|r| r.source_tier == Tier::Local));

        assert!(matches!(
            cache.remove_at("div-1", 9),
            Err(ContentError::IndexOutOfRange { index: 9, len: 2 })
        ));

        cache.clear("div-1").unwrap();
        assert!(cache.get("div-1").is_empty());
        assert!(cache.entities().unwrap().is_empty());
    }

    #[test]
    fn test_clear_all_drops_every_entity() {
        let cache = LocalCache::temporary().unwrap();
        for entity in ["div-1", "div-2", "oceanography"] {
            cache.append(entity, &[inline(b"a")]).unwrap();
        }
        assert_eq!(cache.clear_all().unwrap(), 3);
        assert!(cache.entities().unwrap().is_empty());
        assert_eq!(cache.clear_all().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_entry_reads_as_empty() {
        let cache = LocalCache::temporary().unwrap();
        cache.media.insert("div-1", b"not json".to_vec()).unwrap();
        assert!(cache.get("div-1").is_empty());
        assert!(cache.try_get("div-1").is_err());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.sled");
        {
            let cache = LocalCache::open(&path).unwrap();
            cache
                .replace_all(
                    "oceanography",
                    &MediaSet::from(vec![MediaReference::new(
                        MediaSource::Bundled("/assets/a.jpg".into()),
                        Tier::StaticFallback,
                    )]),
                )
                .unwrap();
            cache.flush().unwrap();
        }
        let cache = LocalCache::open(&path).unwrap();
        assert_eq!(cache.get("oceanography").sources(), vec!["/assets/a.jpg"]);
        assert_eq!(cache.entities().unwrap(), vec!["oceanography"]);
    }
}
