//! Configuration for content-tiers

use crate::error::{ContentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default data directory for the local cache
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("content-tiers")
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub languages: LanguageSet,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub optimize: OptimizeConfig,
}

/// Supported content languages.
///
/// Passed explicitly into the normalizer and editor; there is no process-wide
/// language preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSet {
    /// Every language a hero translation must exist for
    #[serde(default = "default_supported_languages")]
    pub supported: Vec<String>,

    /// Language whose entry is projected onto the flat legacy fields
    #[serde(default = "default_language")]
    pub default: String,
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self {
            supported: default_supported_languages(),
            default: default_language(),
        }
    }
}

impl LanguageSet {
    pub fn new(supported: Vec<String>, default: impl Into<String>) -> Self {
        Self {
            supported,
            default: default.into(),
        }
    }

    /// Supported codes, always including the default language.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        let extra = if self.supported.iter().any(|c| c == &self.default) {
            None
        } else {
            Some(self.default.as_str())
        };
        self.supported.iter().map(String::as_str).chain(extra)
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.codes().any(|c| c == code)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default.trim().is_empty() {
            return Err(ContentError::Config("default language must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory of the sled database backing the local cache
    #[serde(default = "default_data_dir")]
    pub path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote content API. Unset means offline.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Optional bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Replace the bundled catalog with this JSON file
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Hero carousel interval in milliseconds
    #[serde(default = "default_rotation_interval")]
    pub interval_ms: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_rotation_interval(),
        }
    }
}

impl RotationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Value written to `updatedBy` on save
    #[serde(default = "default_updated_by")]
    pub updated_by: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            updated_by: default_updated_by(),
        }
    }
}

/// Shrinking of inline payloads before they are written to the local cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Wider images are scaled down to this width
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// JPEG quality (1-100) for large payloads
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// JPEG quality for payloads at or under `small_payload_chars`
    #[serde(default = "default_small_quality")]
    pub small_quality: u8,

    /// Data URI length, in characters, that counts as small
    #[serde(default = "default_small_payload_chars")]
    pub small_payload_chars: usize,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_width: default_max_width(),
            quality: default_quality(),
            small_quality: default_small_quality(),
            small_payload_chars: default_small_payload_chars(),
        }
    }
}

// Defaults
fn default_supported_languages() -> Vec<String> {
    vec!["si".to_string(), "ta".to_string(), "en".to_string()]
}
fn default_language() -> String { "en".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_rotation_interval() -> u64 { 5000 }
fn default_updated_by() -> String { "admin".to_string() }
fn default_true() -> bool { true }
fn default_max_width() -> u32 { 1200 }
fn default_quality() -> u8 { 65 }
fn default_small_quality() -> u8 { 75 }
fn default_small_payload_chars() -> usize { 200_000 }

impl Config {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ContentError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ContentError::Config(e.to_string()))?;
        config.languages.validate()?;
        Ok(config)
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ContentError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| ContentError::Config(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Path of the sled database
    pub fn local_db_path(&self) -> PathBuf {
        self.local.path.join("local-cache.sled")
    }
}
