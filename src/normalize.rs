//! Schema normalizer
//!
//! Turns any stored page document, including the old flat single-language
//! `hero.*` shape or `{}`, into a canonical [`ContentRecord`]:
//!
//! 1. every supported language has a complete hero translation (empty-template
//!    defaulting merge, existing values win)
//! 2. legacy flat hero fields fill the default language entry's empty fields
//! 3. the default language entry is projected back onto the flat fields
//! 4. `metadata` always carries `title`, `description` and `keywords`
//!
//! The input is never mutated, and normalizing a canonical record's document
//! yields the same record.

use crate::config::LanguageSet;
use crate::model::{
    ContentRecord, Hero, HeroText, HeroTranslation, PageMetadata, DEFAULT_PRIMARY_CTA_ICON,
    DEFAULT_SECONDARY_CTA_ICON,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Legacy flat key → translation key, in lookup order.
const LEGACY_FIELDS: [(&[&str], &str); 12] = [
    (&["badge"], "badge"),
    (&["subtitle", "subheading"], "subheading"),
    (&["title"], "title"),
    (&["highlight"], "highlight"),
    (&["description"], "description"),
    (&["ctaText", "primaryCtaLabel"], "primaryCtaLabel"),
    (&["secondaryCtaLabel"], "secondaryCtaLabel"),
    (&["leftStatLabel"], "leftStatLabel"),
    (&["leftStatValue"], "leftStatValue"),
    (&["rightStatLabel"], "rightStatLabel"),
    (&["rightStatValue"], "rightStatValue"),
    (&["image"], "image"),
];

/// Normalize a raw stored document.
pub fn normalize(raw: &Value, langs: &LanguageSet) -> ContentRecord {
    let mut root = match raw {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    let hero = normalize_hero(take_object(&mut root, "hero"), langs);
    let metadata = normalize_metadata(take_object(&mut root, "metadata"));
    let sections = root
        .remove("sections")
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| Value::Array(Vec::new()));

    ContentRecord {
        hero,
        metadata,
        sections,
        extra: root,
    }
}

fn normalize_hero(mut raw: Map<String, Value>, langs: &LanguageSet) -> Hero {
    let mut raw_translations = take_object(&mut raw, "translations");

    let mut translations: BTreeMap<String, HeroTranslation> = BTreeMap::new();
    for code in langs.codes() {
        let entry = take_object(&mut raw_translations, code);
        translations.insert(code.to_string(), translation_from(&entry));
    }
    // Languages outside the configured set are kept, completed the same way
    for (code, entry) in raw_translations {
        let entry = match entry {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        translations.insert(code, translation_from(&entry));
    }

    let legacy_images = string_list(raw.get("images"));
    let default_entry = translations
        .entry(langs.default.clone())
        .or_default();

    if has_legacy_values(&raw, &legacy_images) {
        debug!(lang = %langs.default, "Migrating legacy flat hero fields");
        migrate_legacy(&raw, default_entry, &legacy_images);
    }

    let text = default_entry.text.clone();
    let images = if !legacy_images.is_empty() {
        legacy_images
    } else {
        default_entry
            .images
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect()
    };

    // Whatever is left over is a non-text setting
    for key in HeroText::KEYS {
        raw.remove(key);
    }
    raw.remove("images");

    Hero {
        text,
        images,
        translations,
        settings: raw,
    }
}

fn legacy_value(raw: &Map<String, Value>, legacy_keys: &[&str]) -> String {
    legacy_keys
        .iter()
        .map(|k| string_value(raw.get(*k)))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

fn has_legacy_values(raw: &Map<String, Value>, legacy_images: &[String]) -> bool {
    !legacy_images.is_empty()
        || LEGACY_FIELDS
            .iter()
            .any(|(legacy_keys, _)| !legacy_value(raw, legacy_keys).is_empty())
}

/// Fill the default-language entry from legacy flat fields.
///
/// Nested values win: only empty translation fields are filled.
fn migrate_legacy(raw: &Map<String, Value>, entry: &mut HeroTranslation, legacy_images: &[String]) {
    for (legacy_keys, key) in LEGACY_FIELDS {
        let value = legacy_value(raw, legacy_keys);
        if let Some(field) = entry.text.field_mut(key) {
            if field.is_empty() {
                *field = value;
            }
        }
    }
    if entry.images.is_empty() {
        entry.images = legacy_images.to_vec();
    }
}

fn translation_from(entry: &Map<String, Value>) -> HeroTranslation {
    let mut translation = HeroTranslation::default();
    for key in HeroText::KEYS {
        if let Some(field) = translation.text.field_mut(key) {
            *field = string_value(entry.get(key));
        }
    }
    translation.primary_cta_icon =
        string_or(entry.get("primaryCtaIcon"), DEFAULT_PRIMARY_CTA_ICON);
    translation.secondary_cta_icon =
        string_or(entry.get("secondaryCtaIcon"), DEFAULT_SECONDARY_CTA_ICON);
    translation.images = string_list(entry.get("images"));
    translation
}

fn normalize_metadata(mut raw: Map<String, Value>) -> PageMetadata {
    let title = string_value(raw.remove("title").as_ref());
    let description = string_value(raw.remove("description").as_ref());
    let keywords = string_value(raw.remove("keywords").as_ref());
    PageMetadata {
        title,
        description,
        keywords,
        extra: raw,
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

/// Coerce a scalar to a string; absent, null and structured values become "".
fn string_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn string_or(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        other => string_value(other),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document() {
        let langs = LanguageSet::default();
        let record = normalize(&json!({}), &langs);
        for code in ["si", "ta", "en"] {
            let t = &record.hero.translations[code];
            assert_eq!(t.text.title, "");
            assert_eq!(t.primary_cta_icon, "Map");
        }
        assert_eq!(record.metadata.title, "");
        assert_eq!(record.sections, json!([]));
    }

    #[test]
    fn test_non_object_input_is_treated_as_empty() {
        let langs = LanguageSet::default();
        assert_eq!(normalize(&json!(null), &langs), normalize(&json!({}), &langs));
        assert_eq!(normalize(&json!([1, 2]), &langs), normalize(&json!({}), &langs));
    }

    #[test]
    fn test_input_not_mutated() {
        let langs = LanguageSet::default();
        let raw = json!({ "hero": { "title": "Welcome" } });
        let before = raw.clone();
        let _ = normalize(&raw, &langs);
        assert_eq!(raw, before);
    }

    #[test]
    fn test_legacy_aliases() {
        let langs = LanguageSet::default();
        let record = normalize(
            &json!({ "hero": { "title": "T", "subtitle": "S", "ctaText": "Go" } }),
            &langs,
        );
        let en = &record.hero.translations["en"].text;
        assert_eq!(en.subheading, "S");
        assert_eq!(en.primary_cta_label, "Go");
        // ctaText is also a hero setting and stays where it was
        assert_eq!(record.hero.settings["ctaText"], "Go");
    }

    #[test]
    fn test_nested_values_win_over_legacy() {
        let langs = LanguageSet::default();
        let record = normalize(
            &json!({
                "hero": {
                    "title": "Old title",
                    "description": "Old description",
                    "translations": { "en": { "description": "New description" } }
                }
            }),
            &langs,
        );
        let en = &record.hero.translations["en"].text;
        assert_eq!(en.title, "Old title");
        assert_eq!(en.description, "New description");
        assert_eq!(record.hero.text.description, "New description");
    }

    #[test]
    fn test_legacy_fills_gaps_when_default_has_title() {
        let langs = LanguageSet::default();
        let record = normalize(
            &json!({
                "hero": {
                    "title": "Legacy",
                    "badge": "Legacy badge",
                    "translations": { "en": { "title": "Current" } }
                }
            }),
            &langs,
        );
        assert_eq!(record.hero.translations["en"].text.badge, "Legacy badge");
        assert_eq!(record.hero.text.title, "Current");
    }

    #[test]
    fn test_legacy_fields_without_title_migrate() {
        let langs = LanguageSet::default();
        let record = normalize(
            &json!({ "hero": { "badge": "New", "description": "Legacy description" } }),
            &langs,
        );
        let en = &record.hero.translations["en"].text;
        assert_eq!(en.badge, "New");
        assert_eq!(en.description, "Legacy description");
        assert_eq!(record.hero.text.badge, "New");
        assert_eq!(record.hero.text.description, "Legacy description");
        assert_eq!(record.hero.translations["si"].text.description, "");
    }

    #[test]
    fn test_legacy_images_without_text_migrate() {
        let langs = LanguageSet::default();
        let record = normalize(&json!({ "hero": { "images": ["/a.jpg"] } }), &langs);
        assert_eq!(record.hero.translations["en"].images, vec!["/a.jpg"]);
        assert_eq!(record.hero.images, vec!["/a.jpg"]);
    }

    #[test]
    fn test_scalar_coercion() {
        let langs = LanguageSet::default();
        let record = normalize(
            &json!({
                "hero": { "translations": { "en": { "leftStatValue": 42, "title": null } } },
                "metadata": { "title": true }
            }),
            &langs,
        );
        assert_eq!(record.hero.translations["en"].text.left_stat_value, "42");
        assert_eq!(record.hero.translations["en"].text.title, "");
        assert_eq!(record.metadata.title, "true");
    }

    #[test]
    fn test_flat_images_fall_back_to_default_translation() {
        let langs = LanguageSet::default();
        let record = normalize(
            &json!({
                "hero": { "translations": { "en": { "images": ["/a.jpg", "", "/b.jpg"] } } }
            }),
            &langs,
        );
        assert_eq!(record.hero.images, vec!["/a.jpg", "/b.jpg"]);
    }

    #[test]
    fn test_extra_languages_are_completed() {
        let langs = LanguageSet::default();
        let record = normalize(
            &json!({ "hero": { "translations": { "fr": { "title": "Bonjour" } } } }),
            &langs,
        );
        assert_eq!(record.hero.translations["fr"].text.title, "Bonjour");
        assert_eq!(record.hero.translations["fr"].text.badge, "");
    }
}
