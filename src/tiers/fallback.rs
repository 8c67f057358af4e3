//! Static fallback catalog
//!
//! Curated default hero images bundled with the build. Always available,
//! never fails, read-only.

use super::MediaTier;
use crate::error::{ContentError, Result};
use crate::model::{MediaReference, MediaSet, MediaSource, Tier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

const BUNDLED_CATALOG: &str = include_str!("../../assets/fallback_catalog.json");

/// On-disk catalog format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Served for entities without their own entry; may be empty
    #[serde(default)]
    pub generic: Vec<String>,
    /// entity id -> ordered asset paths
    #[serde(default)]
    pub entities: HashMap<String, Vec<String>>,
}

/// Bundled catalog of default media
#[derive(Debug)]
pub struct StaticCatalog {
    entities: HashMap<String, MediaSet>,
    generic: MediaSet,
    lookups: AtomicUsize,
}

impl StaticCatalog {
    /// The catalog compiled into the binary
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Load a catalog file that replaces the bundled one
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ContentError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        let catalog = Self::from_json(&content)?;
        info!(
            path = %path.as_ref().display(),
            entities = catalog.entities.len(),
            "Loaded fallback catalog"
        );
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    pub fn from_file(file: CatalogFile) -> Result<Self> {
        let entities = file
            .entities
            .into_iter()
            .map(|(id, paths)| Ok((id, to_set(&paths)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self {
            entities,
            generic: to_set(&file.generic)?,
            lookups: AtomicUsize::new(0),
        })
    }

    /// Catalog with explicit entries and no generic set
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        Self::from_file(CatalogFile {
            generic: Vec::new(),
            entities: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// Total lookup: the entity's curated set, else the generic set (possibly empty).
    pub fn lookup(&self, entity_id: &str) -> MediaSet {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.entities
            .get(entity_id)
            .unwrap_or(&self.generic)
            .clone()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    /// How many lookups have been served
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

fn to_set(paths: &[String]) -> Result<MediaSet> {
    paths
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            Ok(MediaReference::new(MediaSource::parse(p)?, Tier::StaticFallback)
                .with_created_at(DateTime::<Utc>::default()))
        })
        .collect()
}

#[async_trait]
impl MediaTier for StaticCatalog {
    fn tier(&self) -> Tier {
        Tier::StaticFallback
    }

    async fn get(&self, entity_id: &str) -> Result<MediaSet> {
        Ok(self.lookup(entity_id))
    }
}
