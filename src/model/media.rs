//! Media references and ordered media sets

use super::Tier;
use crate::error::{ContentError, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Data URI - self-contained encoded payload
// =============================================================================

/// An inline image payload, `data:<mime-type>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    /// Base64 text, kept encoded so round-trips are byte-identical
    payload: String,
}

impl DataUri {
    /// Encode raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            payload: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Wrap an already base64-encoded payload.
    ///
    /// Accepts either bare base64 or a full data URI (the prefix is stripped),
    /// which is what image generators tend to hand back.
    pub fn from_base64(mime_type: impl Into<String>, encoded: &str) -> Result<Self> {
        let bare = match encoded.split_once(',') {
            Some((_, rest)) if encoded.starts_with("data:") => rest,
            _ => encoded,
        };
        let bare = bare.trim();
        base64::engine::general_purpose::STANDARD.decode(bare)?;
        Ok(Self {
            mime_type: mime_type.into(),
            payload: bare.to_string(),
        })
    }

    /// Parse `data:<mime>;base64,<payload>`.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ContentError::InvalidDataUri("missing data: prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ContentError::InvalidDataUri("missing payload separator".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ContentError::InvalidDataUri(format!("not base64 encoded: {}", header)))?;
        if mime_type.is_empty() {
            return Err(ContentError::InvalidDataUri("empty mime type".into()));
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            payload: payload.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without the header
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Decode the payload bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.payload)?)
    }

    /// Approximate decoded size in bytes.
    pub fn decoded_len(&self) -> usize {
        self.payload.len() / 4 * 3
    }

    /// Length of the full `data:` URI string.
    pub fn encoded_len(&self) -> usize {
        "data:".len() + self.mime_type.len() + ";base64,".len() + self.payload.len()
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.payload)
    }
}

// =============================================================================
// Media Source - what a reference points at
// =============================================================================

/// Where the bytes of a media reference live.
///
/// Serialized as a single string so stored sets stay plain arrays of URIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaSource {
    /// Encoded payload, renders with no fetch
    Inline(DataUri),
    /// Asset path shipped with the build
    Bundled(String),
    /// Fetchable locator that can go stale (signed URL, CDN link)
    Locator(String),
}

impl MediaSource {
    /// Classify a stored or remote string.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ContentError::InvalidDataUri("empty media source".into()));
        }
        if value.starts_with("data:") {
            return Ok(MediaSource::Inline(DataUri::parse(value)?));
        }
        if value.contains("://") || value.starts_with("//") {
            return Ok(MediaSource::Locator(value.to_string()));
        }
        Ok(MediaSource::Bundled(value.to_string()))
    }

    pub fn is_self_contained(&self) -> bool {
        !matches!(self, MediaSource::Locator(_))
    }

    pub fn as_data_uri(&self) -> Option<&DataUri> {
        match self {
            MediaSource::Inline(uri) => Some(uri),
            _ => None,
        }
    }
}

impl TryFrom<String> for MediaSource {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self> {
        MediaSource::parse(&value)
    }
}

impl From<MediaSource> for String {
    fn from(source: MediaSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Inline(uri) => write!(f, "{}", uri),
            MediaSource::Bundled(path) | MediaSource::Locator(path) => f.write_str(path),
        }
    }
}

// =============================================================================
// Media Reference
// =============================================================================

/// Provenance of an automatically generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorMetadata {
    /// Prompt text the image was generated from
    pub prompt: String,
    /// Generator identity (model name)
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

/// One displayable image for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// Remote image id, when the reference came from the remote store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: MediaSource,
    /// Which tier produced this reference
    pub source_tier: Tier,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorMetadata>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl MediaReference {
    pub fn new(source: MediaSource, source_tier: Tier) -> Self {
        Self {
            id: None,
            source,
            source_tier,
            created_at: Utc::now(),
            generator: None,
            is_primary: false,
            filename: None,
        }
    }

    /// A self-contained reference for freshly encoded bytes.
    pub fn inline(uri: DataUri, source_tier: Tier) -> Self {
        Self::new(MediaSource::Inline(uri), source_tier)
    }

    pub fn with_generator(mut self, generator: GeneratorMetadata) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.source_tier = tier;
        self
    }

    pub fn is_self_contained(&self) -> bool {
        self.source.is_self_contained()
    }

    pub fn is_generated(&self) -> bool {
        self.generator.is_some()
    }
}

// =============================================================================
// Media Set
// =============================================================================

/// Ordered images for one entity.
///
/// The order is whatever the producing tier returned; sets from different
/// tiers are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaSet(Vec<MediaReference>);

impl MediaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaReference> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&MediaReference> {
        self.0.get(index)
    }

    pub fn as_slice(&self) -> &[MediaReference] {
        &self.0
    }

    pub fn push(&mut self, reference: MediaReference) {
        self.0.push(reference);
    }

    pub fn extend(&mut self, references: impl IntoIterator<Item = MediaReference>) {
        self.0.extend(references);
    }

    pub fn remove(&mut self, index: usize) -> Result<MediaReference> {
        if index >= self.0.len() {
            return Err(ContentError::IndexOutOfRange {
                index,
                len: self.0.len(),
            });
        }
        Ok(self.0.remove(index))
    }

    /// True when every member renders without a fetch (vacuously for empty).
    pub fn is_self_contained(&self) -> bool {
        self.0.iter().all(MediaReference::is_self_contained)
    }

    /// Members that need a network fetch.
    pub fn indirections(&self) -> impl Iterator<Item = &MediaReference> {
        self.0.iter().filter(|r| !r.is_self_contained())
    }

    /// Drop indirections, returning how many were removed.
    pub fn retain_self_contained(&mut self) -> usize {
        let before = self.0.len();
        self.0.retain(MediaReference::is_self_contained);
        before - self.0.len()
    }

    /// Flagged primary image, else the first one.
    pub fn primary(&self) -> Option<&MediaReference> {
        self.0.iter().find(|r| r.is_primary).or_else(|| self.0.first())
    }

    /// Stamp every member with the tier that served it.
    pub fn served_by(self, tier: Tier) -> Self {
        Self(self.0.into_iter().map(|r| r.with_tier(tier)).collect())
    }

    /// Renderable source strings, in order.
    pub fn sources(&self) -> Vec<String> {
        self.0.iter().map(|r| r.source.to_string()).collect()
    }

    pub fn into_vec(self) -> Vec<MediaReference> {
        self.0
    }
}

impl From<Vec<MediaReference>> for MediaSet {
    fn from(references: Vec<MediaReference>) -> Self {
        Self(references)
    }
}

impl FromIterator<MediaReference> for MediaSet {
    fn from_iter<I: IntoIterator<Item = MediaReference>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MediaSet {
    type Item = MediaReference;
    type IntoIter = std::vec::IntoIter<MediaReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MediaSet {
    type Item = &'a MediaReference;
    type IntoIter = std::slice::Iter<'a, MediaReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_parse_and_format() {
        let uri = DataUri::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime_type(), "image/png");
        assert_eq!(uri.decode().unwrap(), b"hello");
        assert_eq!(uri.to_string(), "data:image/png;base64,aGVsbG8=");
        assert_eq!(uri.encoded_len(), uri.to_string().len());
    }

    #[test]
    fn test_data_uri_rejects_malformed() {
        assert!(DataUri::parse("image/png;base64,aGVsbG8=").is_err());
        assert!(DataUri::parse("data:image/png,plain").is_err());
        assert!(DataUri::parse("data:;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_data_uri_from_base64_strips_prefix() {
        let uri = DataUri::from_base64("image/jpeg", "data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.payload(), "aGVsbG8=");
        assert_eq!(uri.mime_type(), "image/jpeg");
        assert!(DataUri::from_base64("image/png", "not base64!").is_err());
    }

    #[test]
    fn test_source_classification() {
        assert!(matches!(
            MediaSource::parse("data:image/png;base64,aGVsbG8=").unwrap(),
            MediaSource::Inline(_)
        ));
        assert!(matches!(
            MediaSource::parse("https://firebasestorage.example.com/o/a.png?token=x").unwrap(),
            MediaSource::Locator(_)
        ));
        assert!(matches!(
            MediaSource::parse("/assets/divisions/oceanography-1.jpg").unwrap(),
            MediaSource::Bundled(_)
        ));
        assert!(MediaSource::parse("   ").is_err());
    }

    #[test]
    fn test_set_self_contained_and_primary() {
        let inline = MediaReference::inline(DataUri::from_bytes("image/png", b"a"), Tier::Local);
        let locator = MediaReference::new(
            MediaSource::Locator("https://cdn.example.com/b.png".into()),
            Tier::Remote,
        );
        let mut set = MediaSet::from(vec![inline.clone(), locator.clone()]);
        assert!(!set.is_self_contained());
        assert_eq!(set.indirections().count(), 1);
        assert_eq!(set.primary(), Some(&inline));

        let mut flagged = locator;
        flagged.is_primary = true;
        set.push(flagged.clone());
        assert_eq!(set.primary(), Some(&flagged));

        assert_eq!(set.retain_self_contained(), 2);
        assert!(set.is_self_contained());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_serializes_sources_as_strings() {
        let set = MediaSet::from(vec![MediaReference::new(
            MediaSource::Bundled("/assets/a.jpg".into()),
            Tier::StaticFallback,
        )]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["source"], "/assets/a.jpg");
        assert_eq!(json[0]["source_tier"], "static_fallback");
    }
}
