//! content-tiers - Tiered content and media resolution
//!
//! Decides which images and text a portal page shows when content can live
//! in three places of differing authority and reliability.
//!
//! # Architecture
//!
//! - **Local**: sled cache, fast and durable, self-contained payloads only
//! - **Remote**: authoritative store, may reject reads at any time
//! - **StaticFallback**: bundled catalog, always available but generic
//!
//! The [`Resolver`] asks each tier in that order and takes the first
//! non-empty answer. The [`BackfillController`] is the only writer of the
//! Local tier and never stores a fetchable locator. Raw page documents pass
//! through [`normalize`] before anything reads them.
//!
//! # Example
//!
//! ```rust,ignore
//! use content_tiers::{LocalCache, MemoryRemote, RemoteTier, Resolver, StaticCatalog};
//! use std::sync::Arc;
//!
//! let resolver = Resolver::standard(
//!     Arc::new(LocalCache::open("/tmp/cache.sled")?),
//!     Arc::new(RemoteTier::new(Arc::new(MemoryRemote::new()))),
//!     Arc::new(StaticCatalog::bundled()?),
//! );
//!
//! let (resolution, _) = resolver.resolve_and_backfill("oceanography").await;
//! println!("{} image(s), {:?}", resolution.media.len(), resolution.provenance());
//! ```

// Configuration
pub mod config;

// Error types
pub mod error;

// Tiers, media references and content records
pub mod model;

// Legacy document migration
pub mod normalize;

// Tier store adapters
pub mod tiers;

// Tiered lookup
pub mod resolver;

// Local tier writes
pub mod sync;

// Carousel timing
pub mod rotation;

// Page load/save
pub mod editor;

// Re-export configuration
pub use config::{Config, LanguageSet, OptimizeConfig};

// Re-export error types
pub use error::{ContentError, Result};

// Re-export model types
pub use model::{
    ContentRecord, DataUri, GeneratorMetadata, MediaReference, MediaSet, MediaSource, Provenance,
    Tier,
};

pub use normalize::normalize;

// Re-export tier adapters
pub use tiers::{
    HttpRemote, HttpRemoteConfig, LocalCache, MediaTier, MemoryRemote, OfflineRemote, RemoteStore,
    RemoteTier, StaticCatalog,
};

pub use resolver::{Resolution, Resolver, ResolverStats};

pub use sync::{
    BackfillController, BackfillOutcome, GeneratedImage, GenerationPipeline, GenerationReport,
    ImageGenerator, PayloadOptimizer, PurgeReport,
};

pub use rotation::Rotation;

pub use editor::ContentEditor;
