//! HTTP client for the remote content store
//!
//! JSON REST surface:
//!
//! | Operation | Request |
//! |---|---|
//! | media set | `GET /entities/{entity}/images` |
//! | upload | `POST /entities/{entity}/images` |
//! | generated image | `POST /entities/{entity}/images/generated` |
//! | set primary | `POST /images/{id}/primary` |
//! | delete | `DELETE /images/{id}` |
//! | page document | `GET` / `PUT /pages/{page}` |

use super::remote::{GenerationMeta, RemoteImage, RemoteStore};
use crate::error::{ContentError, Result};
use crate::model::MediaSource;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`HttpRemote`]
#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Optional bearer token
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody<'a> {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedBody<'a> {
    source: String,
    #[serde(flatten)]
    meta: &'a GenerationMeta,
}

/// Remote store over HTTP
pub struct HttpRemote {
    config: HttpRemoteConfig,
    client: Client,
}

impl HttpRemote {
    pub fn new(mut config: HttpRemoteConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| ContentError::Config(format!("invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        while config.base_url.ends_with('/') {
            config.base_url.pop();
        }
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn entity_url(&self, entity_id: &str, suffix: &str) -> String {
        format!(
            "{}/entities/{}/images{}",
            self.config.base_url,
            urlencoding::encode(entity_id),
            suffix
        )
    }

    fn image_url(&self, image_id: &str, suffix: &str) -> String {
        format!(
            "{}/images/{}{}",
            self.config.base_url,
            urlencoding::encode(image_id),
            suffix
        )
    }

    fn page_url(&self, page_id: &str) -> String {
        format!("{}/pages/{}", self.config.base_url, urlencoding::encode(page_id))
    }

    /// Map a non-success status to the store's error taxonomy.
    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, what, &body))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let response = Self::check_status(response, what).await?;
        Ok(response.json().await?)
    }
}

fn status_error(status: StatusCode, what: &str, body: &str) -> ContentError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ContentError::PermissionDenied(format!("{} ({}): {}", what, status.as_u16(), body))
        }
        StatusCode::NOT_FOUND => ContentError::NotFound(what.to_string()),
        _ => ContentError::Unavailable(format!("{} ({}): {}", what, status.as_u16(), body)),
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn media_set(&self, entity_id: &str) -> Result<Vec<RemoteImage>> {
        let url = self.entity_url(entity_id, "");
        debug!(url = %url, "Fetching remote media");
        let response = self.client.get(&url).send().await?;
        match Self::handle_response(response, entity_id).await {
            Err(ContentError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn set_primary(&self, image_id: &str, entity_id: &str) -> Result<()> {
        let url = self.image_url(image_id, "/primary");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "entityId": entity_id }))
            .send()
            .await?;
        Self::check_status(response, image_id).await?;
        Ok(())
    }

    async fn delete(&self, image_id: &str) -> Result<()> {
        let url = self.image_url(image_id, "");
        let response = self.client.delete(&url).send().await?;
        Self::check_status(response, image_id).await?;
        Ok(())
    }

    async fn upload_image(
        &self,
        entity_id: &str,
        source: &MediaSource,
        filename: Option<&str>,
    ) -> Result<RemoteImage> {
        let url = self.entity_url(entity_id, "");
        let body = UploadBody {
            source: source.to_string(),
            filename,
        };
        let response = self.client.post(&url).json(&body).send().await?;
        Self::handle_response(response, entity_id).await
    }

    async fn save_generated_image(
        &self,
        entity_id: &str,
        source: &MediaSource,
        meta: &GenerationMeta,
    ) -> Result<RemoteImage> {
        let url = self.entity_url(entity_id, "/generated");
        let body = GeneratedBody {
            source: source.to_string(),
            meta,
        };
        let response = self.client.post(&url).json(&body).send().await?;
        Self::handle_response(response, entity_id).await
    }

    async fn load_document(&self, page_id: &str) -> Result<Option<Value>> {
        let url = self.page_url(page_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::handle_response(response, page_id).await.map(Some)
    }

    async fn save_document(&self, page_id: &str, document: &Value) -> Result<()> {
        let url = self.page_url(page_id);
        let response = self.client.put(&url).json(document).send().await?;
        Self::check_status(response, page_id).await?;
        Ok(())
    }
}
