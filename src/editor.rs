//! Editor-facing load/save of page content
//!
//! Documents are normalized on every load. Saves go to the Remote store only;
//! the Local tier never holds page text.

use crate::config::LanguageSet;
use crate::error::{ContentError, Result};
use crate::model::ContentRecord;
use crate::normalize::normalize;
use crate::tiers::RemoteStore;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

fn default_updated_by() -> String {
    "admin".to_string()
}

/// Loads and saves [`ContentRecord`]s against the Remote store
pub struct ContentEditor {
    remote: Arc<dyn RemoteStore>,
    langs: LanguageSet,
    updated_by: String,
}

impl ContentEditor {
    pub fn new(remote: Arc<dyn RemoteStore>, langs: LanguageSet) -> Self {
        Self {
            remote,
            langs,
            updated_by: default_updated_by(),
        }
    }

    /// Name written into `updatedBy` on save
    pub fn with_updated_by(mut self, updated_by: impl Into<String>) -> Self {
        self.updated_by = updated_by.into();
        self
    }

    pub fn languages(&self) -> &LanguageSet {
        &self.langs
    }

    /// Load a page; a page that was never saved yields the empty skeleton.
    pub async fn load(&self, page_id: &str) -> Result<ContentRecord> {
        let raw = match self.remote.load_document(page_id).await {
            Ok(Some(raw)) => raw,
            Ok(None) | Err(ContentError::NotFound(_)) => Value::Null,
            Err(e) => return Err(e),
        };
        Ok(normalize(&raw, &self.langs))
    }

    /// Edit one translated hero field using this editor's languages
    pub fn set_field(
        &self,
        record: &mut ContentRecord,
        lang: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        record.set_translation_field(lang, key, value, &self.langs)
    }

    /// Save the canonical shape plus `lastUpdated` and `updatedBy`.
    ///
    /// Returns the document as written. Failures are returned as-is; check
    /// [`ContentError::is_retryable`] before offering a retry.
    pub async fn save(&self, page_id: &str, record: &ContentRecord) -> Result<Value> {
        let mut document = record.to_document()?;
        if let Value::Object(map) = &mut document {
            map.insert(
                "lastUpdated".into(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
            map.insert("updatedBy".into(), Value::String(self.updated_by.clone()));
        }

        match self.remote.save_document(page_id, &document).await {
            Ok(()) => {
                info!(page = %page_id, updated_by = %self.updated_by, "Saved page content");
                Ok(document)
            }
            Err(e) => {
                error!(page = %page_id, error = %e, retryable = e.is_retryable(), "Failed to save page content");
                Err(e)
            }
        }
    }
}
