//! Writes into the Local tier
//!
//! - [`BackfillController`] - backfill, additive records, operator actions
//! - [`GenerationPipeline`] - partial-success generator batches
//! - [`PayloadOptimizer`] - inline payload shrinking for Local writes

mod backfill;
mod generation;
mod optimize;

pub use backfill::{BackfillController, BackfillOutcome, PurgeReport, SkipReason};
pub use generation::{
    GeneratedImage, GenerationPipeline, GenerationReport, GeneratorResult, ImageGenerator,
};
pub use optimize::PayloadOptimizer;
