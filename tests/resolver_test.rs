//! Resolver integration tests: tier priority, fallthrough and backfill

use std::sync::Arc;

use chrono::{Duration, Utc};
use content_tiers::model::Provenance;
use content_tiers::tiers::{FailureMode, RemoteImage};
use content_tiers::{
    BackfillController, BackfillOutcome, DataUri, LocalCache, MediaReference, MediaSet,
    MemoryRemote, RemoteTier, Resolver, StaticCatalog, Tier,
};

// ============================================================================
// Helpers
// ============================================================================

struct Stack {
    local: Arc<LocalCache>,
    remote: Arc<MemoryRemote>,
    catalog: Arc<StaticCatalog>,
    resolver: Resolver,
}

fn stack() -> Stack {
    let local = Arc::new(LocalCache::temporary().unwrap());
    let remote = Arc::new(MemoryRemote::new());
    let catalog = Arc::new(
        StaticCatalog::from_entries([
            ("div-1", vec!["/img1.jpg".to_string(), "/img2.jpg".to_string()]),
            ("oceanography", vec!["/assets/ocean.jpg".to_string()]),
        ])
        .unwrap(),
    );
    let resolver = Resolver::standard(
        local.clone(),
        Arc::new(RemoteTier::new(remote.clone())),
        catalog.clone(),
    );
    Stack {
        local,
        remote,
        catalog,
        resolver,
    }
}

fn remote_image(id: &str, entity: &str, source: &str, age_mins: i64) -> RemoteImage {
    let (url, payload) = if source.starts_with("data:") {
        (None, Some(source.to_string()))
    } else {
        (Some(source.to_string()), None)
    };
    RemoteImage {
        id: id.into(),
        entity_id: entity.into(),
        url,
        payload,
        is_primary: false,
        ai_generated: false,
        is_active: true,
        uploaded_at: Utc::now() - Duration::minutes(age_mins),
        filename: None,
        generation_prompt: None,
        generation_model: None,
    }
}

fn inline(bytes: &[u8]) -> MediaReference {
    MediaReference::inline(DataUri::from_bytes("image/png", bytes), Tier::Local)
}

// ============================================================================
// Priority
// ============================================================================

#[tokio::test]
async fn test_local_hit_skips_remote_and_fallback() {
    let s = stack();
    s.local
        .replace_all("div-1", &MediaSet::from(vec![inline(b"cached")]))
        .unwrap();

    let resolution = s.resolver.resolve("div-1").await;
    assert_eq!(resolution.tier, Tier::Local);
    assert_eq!(resolution.provenance(), Provenance::Curated);
    assert_eq!(s.remote.media_reads(), 0);
    assert_eq!(s.catalog.lookups(), 0);
}

#[tokio::test]
async fn test_remote_hit_skips_fallback() {
    let s = stack();
    s.remote
        .insert_image(remote_image("a", "div-1", "data:image/png;base64,aGVsbG8=", 1))
        .await;

    let resolution = s.resolver.resolve("div-1").await;
    assert_eq!(resolution.tier, Tier::Remote);
    assert_eq!(s.remote.media_reads(), 1);
    assert_eq!(s.catalog.lookups(), 0);
}

#[tokio::test]
async fn test_remote_order_is_preserved() {
    let s = stack();
    s.remote
        .insert_image(remote_image("old", "div-1", "https://cdn.example.com/old.png", 60))
        .await;
    s.remote
        .insert_image(remote_image("new", "div-1", "https://cdn.example.com/new.png", 1))
        .await;

    let resolution = s.resolver.resolve("div-1").await;
    assert_eq!(
        resolution.media.sources(),
        vec!["https://cdn.example.com/new.png", "https://cdn.example.com/old.png"]
    );
}

// ============================================================================
// Fallthrough
// ============================================================================

#[tokio::test]
async fn test_permission_denied_falls_through_to_catalog() {
    let s = stack();
    s.remote.fail_reads(Some(FailureMode::PermissionDenied)).await;

    let resolution = s.resolver.resolve("div-1").await;
    assert_eq!(resolution.tier, Tier::StaticFallback);
    assert_eq!(resolution.media.sources(), vec!["/img1.jpg", "/img2.jpg"]);
    assert_eq!(resolution.provenance(), Provenance::Generic);
    assert_eq!(s.resolver.stats().tier_failures, 1);

    // nothing was written for the next load
    let (_, outcome) = s.resolver.resolve_and_backfill("div-1").await;
    assert!(!outcome.unwrap().is_replaced());
    assert!(s.local.get("div-1").is_empty());
}

#[tokio::test]
async fn test_unknown_entity_without_generic_set_is_empty() {
    let s = stack();
    s.remote.fail_reads(Some(FailureMode::Unavailable)).await;

    let resolution = s.resolver.resolve("unknown").await;
    assert!(resolution.is_empty());
    assert_eq!(resolution.tier, Tier::StaticFallback);
}

#[tokio::test]
async fn test_bundled_catalog_is_total() {
    let resolver = Resolver::standard(
        Arc::new(LocalCache::temporary().unwrap()),
        Arc::new(RemoteTier::new(Arc::new(content_tiers::OfflineRemote))),
        Arc::new(StaticCatalog::bundled().unwrap()),
    );
    for entity in ["oceanography", "marine-biology", "never-heard-of-it"] {
        let resolution = resolver.resolve(entity).await;
        assert_eq!(resolution.tier, Tier::StaticFallback);
        assert!(!resolution.is_empty(), "{} resolved empty", entity);
        assert!(resolution.media.is_self_contained());
    }
}

// ============================================================================
// Propagation
// ============================================================================

#[tokio::test]
async fn test_self_contained_remote_result_is_backfilled() {
    let s = stack();
    s.remote
        .insert_image(remote_image("a", "div-1", "data:image/png;base64,aGVsbG8=", 2))
        .await;
    s.remote
        .insert_image(remote_image("b", "div-1", "data:image/png;base64,d29ybGQ=", 1))
        .await;

    let (resolution, outcome) = s.resolver.resolve_and_backfill("div-1").await;
    assert_eq!(outcome.unwrap(), BackfillOutcome::Replaced(2));
    assert_eq!(s.local.get("div-1").sources(), resolution.media.sources());

    // the next load is served locally
    let again = s.resolver.resolve("div-1").await;
    assert_eq!(again.tier, Tier::Local);
    assert_eq!(s.remote.media_reads(), 1);
}

#[tokio::test]
async fn test_flushed_backfill_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("local-cache.sled");
    let remote = Arc::new(MemoryRemote::new());
    remote
        .insert_image(remote_image("a", "div-1", "data:image/png;base64,aGVsbG8=", 1))
        .await;

    {
        let resolver = Resolver::standard(
            Arc::new(LocalCache::open(&path).unwrap()),
            Arc::new(RemoteTier::new(remote.clone())),
            Arc::new(StaticCatalog::from_entries(Vec::<(&str, Vec<String>)>::new()).unwrap()),
        );
        let (_, outcome) = resolver.resolve_and_backfill("div-1").await;
        if let BackfillOutcome::Replaced(_) = outcome.unwrap() {
            resolver.local().unwrap().flush().unwrap();
        }
    }

    let local = LocalCache::open(&path).unwrap();
    assert_eq!(local.get("div-1").sources(), vec!["data:image/png;base64,aGVsbG8="]);
}

#[tokio::test]
async fn test_remote_indirections_never_reach_local() {
    let s = stack();
    s.remote
        .insert_image(remote_image("a", "div-1", "data:image/png;base64,aGVsbG8=", 2))
        .await;
    s.remote
        .insert_image(remote_image("b", "div-1", "https://cdn.example.com/b.png?token=x", 1))
        .await;

    let (resolution, outcome) = s.resolver.resolve_and_backfill("div-1").await;
    assert_eq!(resolution.tier, Tier::Remote);
    assert!(!resolution.may_propagate());
    assert!(!outcome.unwrap().is_replaced());
    assert!(s.local.get("div-1").is_empty());

    // and every load keeps going back to the remote tier
    s.resolver.resolve("div-1").await;
    assert_eq!(s.remote.media_reads(), 2);
}

#[tokio::test]
async fn test_remote_relative_paths_are_not_backfilled() {
    let s = stack();
    s.remote
        .insert_image(remote_image("a", "div-1", "/uploads/div-1/a.png", 1))
        .await;

    let (resolution, outcome) = s.resolver.resolve_and_backfill("div-1").await;
    assert_eq!(resolution.tier, Tier::Remote);
    assert_eq!(resolution.media.sources(), vec!["/uploads/div-1/a.png"]);
    assert!(!resolution.may_propagate());
    assert!(!outcome.unwrap().is_replaced());
    assert!(s.local.get("div-1").is_empty());
}

#[tokio::test]
async fn test_poisoned_local_entry_shadows_until_purged() {
    let s = stack();
    // legacy entry holding a dead locator
    s.local
        .replace_all(
            "div-1",
            &MediaSet::from(vec![MediaReference::new(
                content_tiers::MediaSource::Locator("https://gen.example.com/expired".into()),
                Tier::Remote,
            )]),
        )
        .unwrap();
    s.remote
        .insert_image(remote_image("a", "div-1", "data:image/png;base64,aGVsbG8=", 1))
        .await;

    assert_eq!(s.resolver.resolve("div-1").await.tier, Tier::Local);

    let report = BackfillController::new(s.local.clone())
        .purge_indirections()
        .unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(s.resolver.resolve("div-1").await.tier, Tier::Remote);
}

#[tokio::test]
async fn test_primary_prefers_flagged_image() {
    let s = stack();
    s.remote
        .insert_image(remote_image("a", "div-1", "https://cdn.example.com/a.png", 1))
        .await;
    let mut flagged = remote_image("b", "div-1", "https://cdn.example.com/b.png", 5);
    flagged.is_primary = true;
    s.remote.insert_image(flagged).await;

    let primary = s.resolver.primary("div-1").await.unwrap();
    assert_eq!(primary.id.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_concurrent_resolution_of_distinct_entities() {
    let s = stack();
    let resolver = Arc::new(s.resolver);
    let handles: Vec<_> = ["div-1", "oceanography", "unknown"]
        .into_iter()
        .map(|entity| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(entity).await })
        })
        .collect();

    for handle in handles {
        let resolution = handle.await.unwrap();
        assert_eq!(resolution.tier, Tier::StaticFallback);
    }
    assert_eq!(resolver.stats().resolutions, 3);
}
