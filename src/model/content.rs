//! Canonical page content record
//!
//! Produced once by [`normalize`](crate::normalize::normalize); every consumer
//! downstream may assume the per-language completeness invariant holds.

use crate::config::LanguageSet;
use crate::error::{ContentError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Default icon for the primary call to action
pub const DEFAULT_PRIMARY_CTA_ICON: &str = "Map";
/// Default icon for the secondary call to action
pub const DEFAULT_SECONDARY_CTA_ICON: &str = "Heart";

/// Text fields shared by each translation and the flat legacy projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroText {
    pub badge: String,
    pub subheading: String,
    pub title: String,
    pub highlight: String,
    pub description: String,
    pub primary_cta_label: String,
    pub secondary_cta_label: String,
    pub left_stat_label: String,
    pub left_stat_value: String,
    pub right_stat_label: String,
    pub right_stat_value: String,
    pub image: String,
}

impl HeroText {
    /// Serialized keys, in declaration order.
    pub const KEYS: [&'static str; 12] = [
        "badge",
        "subheading",
        "title",
        "highlight",
        "description",
        "primaryCtaLabel",
        "secondaryCtaLabel",
        "leftStatLabel",
        "leftStatValue",
        "rightStatLabel",
        "rightStatValue",
        "image",
    ];

    pub(crate) fn field_mut(&mut self, key: &str) -> Option<&mut String> {
        let field = match key {
            "badge" => &mut self.badge,
            "subheading" => &mut self.subheading,
            "title" => &mut self.title,
            "highlight" => &mut self.highlight,
            "description" => &mut self.description,
            "primaryCtaLabel" => &mut self.primary_cta_label,
            "secondaryCtaLabel" => &mut self.secondary_cta_label,
            "leftStatLabel" => &mut self.left_stat_label,
            "leftStatValue" => &mut self.left_stat_value,
            "rightStatLabel" => &mut self.right_stat_label,
            "rightStatValue" => &mut self.right_stat_value,
            "image" => &mut self.image,
            _ => return None,
        };
        Some(field)
    }
}

/// One language's hero block. Every field is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroTranslation {
    #[serde(flatten)]
    pub text: HeroText,
    pub primary_cta_icon: String,
    pub secondary_cta_icon: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Default for HeroTranslation {
    fn default() -> Self {
        Self {
            text: HeroText::default(),
            primary_cta_icon: DEFAULT_PRIMARY_CTA_ICON.to_string(),
            secondary_cta_icon: DEFAULT_SECONDARY_CTA_ICON.to_string(),
            images: Vec::new(),
        }
    }
}

impl HeroTranslation {
    /// Set a field by its serialized key.
    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match key {
            "primaryCtaIcon" => self.primary_cta_icon = value,
            "secondaryCtaIcon" => self.secondary_cta_icon = value,
            _ => {
                let field = self
                    .text
                    .field_mut(key)
                    .ok_or_else(|| ContentError::NotFound(format!("hero field {}", key)))?;
                *field = value;
            }
        }
        Ok(())
    }
}

/// Hero block of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    /// Default-language projection, for consumers that read flat fields
    #[serde(flatten)]
    pub text: HeroText,
    /// Language-independent ordered image list
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub translations: BTreeMap<String, HeroTranslation>,
    /// Non-text settings (`ctaLink`, `ctaText`, ...) kept verbatim
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Hero {
    pub fn translation(&self, lang: &str) -> Option<&HeroTranslation> {
        self.translations.get(lang)
    }

    /// Copy the default language's text onto the flat fields.
    pub fn reproject(&mut self, langs: &LanguageSet) {
        if let Some(default) = self.translations.get(&langs.default) {
            self.text = default.text.clone();
        }
    }
}

/// Page-level SEO fields, single language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical content record for one page or entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub hero: Hero,
    pub metadata: PageMetadata,
    /// Page-specific sections, opaque to this crate
    #[serde(default)]
    pub sections: Value,
    /// Other top-level keys (`lastUpdated`, `updatedBy`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentRecord {
    /// Edit one translation field; editing the default language keeps the
    /// flat projection in step.
    pub fn set_translation_field(
        &mut self,
        lang: &str,
        key: &str,
        value: impl Into<String>,
        langs: &LanguageSet,
    ) -> Result<()> {
        let translation = self
            .hero
            .translations
            .get_mut(lang)
            .ok_or_else(|| ContentError::NotFound(format!("language {}", lang)))?;
        translation.set_field(key, value)?;
        if lang == langs.default {
            self.hero.reproject(langs);
        }
        Ok(())
    }

    pub fn add_hero_image(&mut self, source: impl Into<String>) {
        self.hero.images.push(source.into());
    }

    pub fn set_hero_image(&mut self, index: usize, source: impl Into<String>) -> Result<()> {
        let len = self.hero.images.len();
        let slot = self
            .hero
            .images
            .get_mut(index)
            .ok_or(ContentError::IndexOutOfRange { index, len })?;
        *slot = source.into();
        Ok(())
    }

    pub fn remove_hero_image(&mut self, index: usize) -> Result<String> {
        let len = self.hero.images.len();
        if index >= len {
            return Err(ContentError::IndexOutOfRange { index, len });
        }
        Ok(self.hero.images.remove(index))
    }

    /// Serialize the canonical shape (flat and nested hero fields both present).
    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_langs(langs: &LanguageSet) -> ContentRecord {
        let mut record = ContentRecord::default();
        for code in langs.codes() {
            record
                .hero
                .translations
                .insert(code.to_string(), HeroTranslation::default());
        }
        record
    }

    #[test]
    fn test_translation_defaults() {
        let t = HeroTranslation::default();
        assert_eq!(t.primary_cta_icon, "Map");
        assert_eq!(t.secondary_cta_icon, "Heart");
        assert_eq!(t.text.title, "");
    }

    #[test]
    fn test_edit_default_language_reprojects() {
        let langs = LanguageSet::default();
        let mut record = record_with_langs(&langs);

        record.set_translation_field("en", "title", "Ocean Research", &langs).unwrap();
        assert_eq!(record.hero.text.title, "Ocean Research");

        record.set_translation_field("si", "title", "සාගර", &langs).unwrap();
        assert_eq!(record.hero.text.title, "Ocean Research");
        assert_eq!(record.hero.translations["si"].text.title, "සාගර");
    }

    #[test]
    fn test_edit_unknown_field_or_language() {
        let langs = LanguageSet::default();
        let mut record = record_with_langs(&langs);
        assert!(record.set_translation_field("fr", "title", "x", &langs).is_err());
        assert!(record.set_translation_field("en", "subtitle", "x", &langs).is_err());
        record.set_translation_field("en", "primaryCtaIcon", "Ship", &langs).unwrap();
        assert_eq!(record.hero.translations["en"].primary_cta_icon, "Ship");
    }

    #[test]
    fn test_hero_image_list_edits() {
        let mut record = ContentRecord::default();
        record.add_hero_image("/assets/a.jpg");
        record.add_hero_image("");
        record.set_hero_image(1, "/assets/b.jpg").unwrap();
        assert_eq!(record.hero.images, vec!["/assets/a.jpg", "/assets/b.jpg"]);
        assert_eq!(record.remove_hero_image(0).unwrap(), "/assets/a.jpg");
        assert!(record.remove_hero_image(5).is_err());
    }

    #[test]
    fn test_document_has_flat_and_nested_fields() {
        let langs = LanguageSet::default();
        let mut record = record_with_langs(&langs);
        record.set_translation_field("en", "badge", "New", &langs).unwrap();
        let doc = record.to_document().unwrap();
        assert_eq!(doc["hero"]["badge"], "New");
        assert_eq!(doc["hero"]["translations"]["en"]["badge"], "New");
        assert_eq!(doc["hero"]["translations"]["en"]["primaryCtaLabel"], "");
        assert_eq!(doc["metadata"]["keywords"], "");
    }
}
