//! Data model: tiers, media references and content records

mod content;
mod media;
mod tier;

pub use content::{
    ContentRecord, Hero, HeroText, HeroTranslation, PageMetadata, DEFAULT_PRIMARY_CTA_ICON,
    DEFAULT_SECONDARY_CTA_ICON,
};
pub use media::{DataUri, GeneratorMetadata, MediaReference, MediaSet, MediaSource};
pub use tier::{Provenance, Tier};
