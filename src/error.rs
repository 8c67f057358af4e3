//! Error types for content-tiers

use thiserror::Error;

/// Result type for content pipeline operations
pub type Result<T> = std::result::Result<T, ContentError>;

/// Content pipeline error types
#[derive(Error, Debug)]
pub enum ContentError {
    /// Remote store rejected the request (credentials, rules)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Remote store could not be reached or answered with a server error
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Entity, page or image not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local cache database error
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed data URI
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Base64 payload could not be decoded
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload could not be decoded or re-encoded as an image
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Attempted to pin an indirection into the local cache
    #[error("Refusing to cache indirection for {entity}: {locator}")]
    NotSelfContained { entity: String, locator: String },

    /// Write attempted against a read-only tier
    #[error("Tier {0} is read-only")]
    ReadOnly(crate::model::Tier),

    /// Index outside the bounds of a media set
    #[error("Index {index} out of range for {len} item(s)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ContentError {
    /// Whether this is a transient remote failure the read path falls through on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ContentError::PermissionDenied(_) | ContentError::Unavailable(_) | ContentError::Http(_)
        )
    }

    /// Whether a failed write may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}
