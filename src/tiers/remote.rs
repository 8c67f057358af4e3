//! Remote authoritative tier
//!
//! [`RemoteStore`] is the narrow interface to the document/object store.
//! [`RemoteTier`] adapts any store to the [`MediaTier`] capability interface.

use super::MediaTier;
use crate::error::{ContentError, Result};
use crate::model::{GeneratorMetadata, MediaReference, MediaSet, MediaSource, Tier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

// =============================================================================
// Wire types
// =============================================================================

/// One image record held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteImage {
    pub id: String,
    pub entity_id: String,
    /// Locator for stored objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inline data URI, when the record embeds the bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_model: Option<String>,
}

fn default_active() -> bool {
    true
}

impl RemoteImage {
    /// Convert to a media reference; the payload wins over the url.
    ///
    /// Anything that is not a `data:` URI is served by the store and becomes
    /// a [`MediaSource::Locator`], relative paths included.
    pub fn to_reference(&self) -> Result<MediaReference> {
        let raw = [self.payload.as_deref(), self.url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| ContentError::NotFound(format!("image {} has no source", self.id)))?;
        let source = if raw.starts_with("data:") {
            MediaSource::parse(raw)?
        } else {
            MediaSource::Locator(raw.to_string())
        };

        let mut reference = MediaReference::new(source, Tier::Remote)
            .with_created_at(self.uploaded_at);
        reference.id = Some(self.id.clone());
        reference.is_primary = self.is_primary;
        reference.filename = self.filename.clone();
        if self.ai_generated {
            reference.generator = Some(GeneratorMetadata {
                prompt: self.generation_prompt.clone().unwrap_or_default(),
                model: self.generation_model.clone().unwrap_or_default(),
                generated_at: self.uploaded_at,
            });
        }
        Ok(reference)
    }
}

/// Metadata saved alongside a generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    pub prompt: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl From<&GeneratorMetadata> for GenerationMeta {
    fn from(meta: &GeneratorMetadata) -> Self {
        Self {
            prompt: meta.prompt.clone(),
            model: meta.model.clone(),
            generated_at: meta.generated_at,
        }
    }
}

// =============================================================================
// Remote Store - narrow interface to the authoritative store
// =============================================================================

/// Authoritative document/object store.
///
/// Any call may fail with [`ContentError::PermissionDenied`] or
/// [`ContentError::Unavailable`]; readers treat that as a tier miss.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Images for an entity, in store order
    async fn media_set(&self, entity_id: &str) -> Result<Vec<RemoteImage>>;

    /// Make `image_id` the only primary image of the entity
    async fn set_primary(&self, image_id: &str, entity_id: &str) -> Result<()>;

    /// Delete an image record
    async fn delete(&self, image_id: &str) -> Result<()>;

    /// Store an uploaded image
    async fn upload_image(
        &self,
        entity_id: &str,
        source: &MediaSource,
        filename: Option<&str>,
    ) -> Result<RemoteImage>;

    /// Store a generated image (locator or inline payload)
    async fn save_generated_image(
        &self,
        entity_id: &str,
        source: &MediaSource,
        meta: &GenerationMeta,
    ) -> Result<RemoteImage>;

    /// Raw page document, `None` when the page has never been saved
    async fn load_document(&self, page_id: &str) -> Result<Option<Value>>;

    /// Write a page document, creating it when missing
    async fn save_document(&self, page_id: &str, document: &Value) -> Result<()>;
}

// =============================================================================
// Remote Tier - MediaTier adapter
// =============================================================================

/// Adapts a [`RemoteStore`] to the tier interface.
///
/// Natural order: active images, newest upload first.
#[derive(Clone)]
pub struct RemoteTier {
    store: Arc<dyn RemoteStore>,
}

impl RemoteTier {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    async fn active_images(&self, entity_id: &str) -> Result<Vec<RemoteImage>> {
        let mut images: Vec<RemoteImage> = self
            .store
            .media_set(entity_id)
            .await?
            .into_iter()
            .filter(|img| img.is_active)
            .collect();
        images.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(images)
    }
}

#[async_trait]
impl MediaTier for RemoteTier {
    fn tier(&self) -> Tier {
        Tier::Remote
    }

    async fn get(&self, entity_id: &str) -> Result<MediaSet> {
        let images = self.active_images(entity_id).await?;
        let mut set = MediaSet::new();
        for image in &images {
            match image.to_reference() {
                Ok(reference) => set.push(reference),
                Err(e) => warn!(entity = %entity_id, image = %image.id, error = %e, "Skipping unusable remote image"),
            }
        }
        debug!(entity = %entity_id, count = set.len(), "Fetched remote media");
        Ok(set)
    }

    async fn put(&self, entity_id: &str, media: MediaSet) -> Result<()> {
        MediaTier::clear(self, entity_id).await?;
        for reference in &media {
            match &reference.generator {
                Some(generator) => {
                    self.store
                        .save_generated_image(entity_id, &reference.source, &generator.into())
                        .await?;
                }
                None => {
                    self.store
                        .upload_image(entity_id, &reference.source, reference.filename.as_deref())
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn remove(&self, entity_id: &str, index: usize) -> Result<()> {
        let images = self.active_images(entity_id).await?;
        let image = images.get(index).ok_or(ContentError::IndexOutOfRange {
            index,
            len: images.len(),
        })?;
        self.store.delete(&image.id).await
    }

    async fn clear(&self, entity_id: &str) -> Result<()> {
        for image in self.active_images(entity_id).await? {
            self.store.delete(&image.id).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Memory Remote - in-process store
// =============================================================================

/// Failure to inject into a [`MemoryRemote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    PermissionDenied,
    Unavailable,
}

impl FailureMode {
    fn to_error(self, op: &str) -> ContentError {
        match self {
            FailureMode::PermissionDenied => {
                ContentError::PermissionDenied(format!("{}: missing or insufficient permissions", op))
            }
            FailureMode::Unavailable => ContentError::Unavailable(format!("{}: backend unavailable", op)),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    images: Vec<RemoteImage>,
    documents: HashMap<String, Value>,
    read_failure: Option<FailureMode>,
    write_failure: Option<FailureMode>,
}

/// In-process remote store with failure injection and call counting.
///
/// Used for offline runs and as the test double for the remote tier.
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
    media_reads: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every read with the given mode (`None` to recover)
    pub async fn fail_reads(&self, mode: Option<FailureMode>) {
        self.state.lock().await.read_failure = mode;
    }

    /// Fail every write with the given mode (`None` to recover)
    pub async fn fail_writes(&self, mode: Option<FailureMode>) {
        self.state.lock().await.write_failure = mode;
    }

    /// Seed an image record directly
    pub async fn insert_image(&self, image: RemoteImage) {
        self.state.lock().await.images.push(image);
    }

    /// Seed a page document directly
    pub async fn insert_document(&self, page_id: impl Into<String>, document: Value) {
        self.state.lock().await.documents.insert(page_id.into(), document);
    }

    /// Stored document without failure injection
    pub async fn document(&self, page_id: &str) -> Option<Value> {
        self.state.lock().await.documents.get(page_id).cloned()
    }

    /// Every image record without failure injection
    pub async fn images(&self) -> Vec<RemoteImage> {
        self.state.lock().await.images.clone()
    }

    /// Number of `media_set` calls observed
    pub fn media_reads(&self) -> usize {
        self.media_reads.load(Ordering::SeqCst)
    }

    fn new_image(entity_id: &str, source: &MediaSource) -> RemoteImage {
        let (url, payload) = match source {
            MediaSource::Inline(uri) => (None, Some(uri.to_string())),
            other => (Some(other.to_string()), None),
        };
        RemoteImage {
            id: format!("{}_{}", entity_id, uuid::Uuid::new_v4().simple()),
            entity_id: entity_id.to_string(),
            url,
            payload,
            is_primary: false,
            ai_generated: false,
            is_active: true,
            uploaded_at: Utc::now(),
            filename: None,
            generation_prompt: None,
            generation_model: None,
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn media_set(&self, entity_id: &str) -> Result<Vec<RemoteImage>> {
        self.media_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        if let Some(mode) = state.read_failure {
            return Err(mode.to_error("media_set"));
        }
        Ok(state
            .images
            .iter()
            .filter(|img| img.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn set_primary(&self, image_id: &str, entity_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mode) = state.write_failure {
            return Err(mode.to_error("set_primary"));
        }
        if !state.images.iter().any(|img| img.id == image_id) {
            return Err(ContentError::NotFound(format!("image {}", image_id)));
        }
        for image in state.images.iter_mut().filter(|img| img.entity_id == entity_id) {
            image.is_primary = image.id == image_id;
        }
        Ok(())
    }

    async fn delete(&self, image_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mode) = state.write_failure {
            return Err(mode.to_error("delete"));
        }
        let before = state.images.len();
        state.images.retain(|img| img.id != image_id);
        if state.images.len() == before {
            return Err(ContentError::NotFound(format!("image {}", image_id)));
        }
        Ok(())
    }

    async fn upload_image(
        &self,
        entity_id: &str,
        source: &MediaSource,
        filename: Option<&str>,
    ) -> Result<RemoteImage> {
        let mut state = self.state.lock().await;
        if let Some(mode) = state.write_failure {
            return Err(mode.to_error("upload_image"));
        }
        let mut image = Self::new_image(entity_id, source);
        image.filename = filename.map(str::to_string);
        state.images.push(image.clone());
        Ok(image)
    }

    async fn save_generated_image(
        &self,
        entity_id: &str,
        source: &MediaSource,
        meta: &GenerationMeta,
    ) -> Result<RemoteImage> {
        let mut state = self.state.lock().await;
        if let Some(mode) = state.write_failure {
            return Err(mode.to_error("save_generated_image"));
        }
        let mut image = Self::new_image(entity_id, source);
        image.ai_generated = true;
        image.uploaded_at = meta.generated_at;
        image.generation_prompt = Some(meta.prompt.clone());
        image.generation_model = Some(meta.model.clone());
        state.images.push(image.clone());
        Ok(image)
    }

    async fn load_document(&self, page_id: &str) -> Result<Option<Value>> {
        let state = self.state.lock().await;
        if let Some(mode) = state.read_failure {
            return Err(mode.to_error("load_document"));
        }
        Ok(state.documents.get(page_id).cloned())
    }

    async fn save_document(&self, page_id: &str, document: &Value) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mode) = state.write_failure {
            return Err(mode.to_error("save_document"));
        }
        state.documents.insert(page_id.to_string(), document.clone());
        Ok(())
    }
}

// =============================================================================
// Offline Remote - no remote configured
// =============================================================================

/// Stand-in when no remote is configured; every call is `Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRemote;

impl OfflineRemote {
    fn offline<T>() -> Result<T> {
        Err(ContentError::Unavailable("no remote store configured".into()))
    }
}

#[async_trait]
impl RemoteStore for OfflineRemote {
    async fn media_set(&self, _entity_id: &str) -> Result<Vec<RemoteImage>> {
        Self::offline()
    }

    async fn set_primary(&self, _image_id: &str, _entity_id: &str) -> Result<()> {
        Self::offline()
    }

    async fn delete(&self, _image_id: &str) -> Result<()> {
        Self::offline()
    }

    async fn upload_image(
        &self,
        _entity_id: &str,
        _source: &MediaSource,
        _filename: Option<&str>,
    ) -> Result<RemoteImage> {
        Self::offline()
    }

    async fn save_generated_image(
        &self,
        _entity_id: &str,
        _source: &MediaSource,
        _meta: &GenerationMeta,
    ) -> Result<RemoteImage> {
        Self::offline()
    }

    async fn load_document(&self, _page_id: &str) -> Result<Option<Value>> {
        Self::offline()
    }

    async fn save_document(&self, _page_id: &str, _document: &Value) -> Result<()> {
        Self::offline()
    }
}
