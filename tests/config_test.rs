//! Config loading and defaults integration tests

use std::path::PathBuf;

use content_tiers::{Config, ContentError, LanguageSet};
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("content-tiers.toml");

    let mut config = Config::default();
    config.local.path = PathBuf::from("/var/lib/content-tiers");
    config.remote.base_url = Some("https://content.example.org/api".into());
    config.fallback.catalog_path = Some(PathBuf::from("/etc/content-tiers/catalog.json"));
    config.rotation.interval_ms = 8000;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.local.path, PathBuf::from("/var/lib/content-tiers"));
    assert_eq!(loaded.remote.base_url.as_deref(), Some("https://content.example.org/api"));
    assert_eq!(loaded.remote.timeout_secs, 30);
    assert_eq!(loaded.rotation.interval_ms, 8000);
    assert_eq!(loaded.languages, LanguageSet::default());
    assert_eq!(
        loaded.local_db_path(),
        PathBuf::from("/var/lib/content-tiers/local-cache.sled")
    );
}

#[test]
fn test_custom_languages() {
    let config: Config = toml::from_str(
        r#"
[languages]
supported = ["si", "ta"]
default = "en"
"#,
    )
    .unwrap();

    let codes: Vec<&str> = config.languages.codes().collect();
    assert_eq!(codes, vec!["si", "ta", "en"]);
    assert!(config.languages.is_supported("en"));
    assert!(!config.languages.is_supported("fr"));
}

#[test]
fn test_empty_default_language_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[languages]\ndefault = \"\"\n").unwrap();

    assert!(matches!(Config::load(&path), Err(ContentError::Config(_))));
}

#[test]
fn test_missing_file_is_config_error() {
    let result = Config::load("/nonexistent/content-tiers.toml");
    assert!(matches!(result, Err(ContentError::Config(_))));
}
