//! Source tiers and provenance

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backing stores, in resolution priority order.
///
/// Lower numeric value = higher priority (tried first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Tier {
    /// Durable local cache - fastest, holds self-contained payloads only
    Local = 0,
    /// Authoritative remote store - slow, may reject reads
    Remote = 1,
    /// Bundled catalog - always available, generic
    StaticFallback = 2,
}

impl Tier {
    /// All tiers in resolution order
    pub const ORDER: [Tier; 3] = [Tier::Local, Tier::Remote, Tier::StaticFallback];

    /// Whether queries against this tier may fail and should fall through
    pub fn can_fail_transiently(&self) -> bool {
        matches!(self, Tier::Remote)
    }

    /// Whether every result from this tier renders without a further fetch.
    ///
    /// `None` for Remote: it depends on what the stored record holds, see
    /// [`MediaSet::is_self_contained`](crate::model::MediaSet::is_self_contained).
    pub fn produces_self_contained_results(&self) -> Option<bool> {
        match self {
            Tier::Local | Tier::StaticFallback => Some(true),
            Tier::Remote => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Local => "local",
            Tier::Remote => "remote",
            Tier::StaticFallback => "static_fallback",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the presentation layer shows as the content badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Curated or generated content for this entity is active
    Curated,
    /// Showing the bundled generic defaults
    Generic,
}

impl From<Tier> for Provenance {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Local | Tier::Remote => Provenance::Curated,
            Tier::StaticFallback => Provenance::Generic,
        }
    }
}

impl Provenance {
    pub fn is_curated(&self) -> bool {
        matches!(self, Provenance::Curated)
    }
}
