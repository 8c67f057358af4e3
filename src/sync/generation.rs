//! Generated image ingestion
//!
//! A generator batch can partially fail. The successful subset is saved to
//! the Remote store as inline payloads at full size and appended to Local
//! after shrinking; failures are counted in the [`GenerationReport`].

use super::BackfillController;
use crate::error::Result;
use crate::model::{DataUri, GeneratorMetadata, MediaReference, Tier};
use crate::tiers::{GenerationMeta, RemoteStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Raw output of an image generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub prompt: String,
    pub model: String,
}

/// One generator result: an image or the reason it failed
pub type GeneratorResult = std::result::Result<GeneratedImage, String>;

/// Image generation back end.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image per prompt. `label` names the entity for the
    /// back end's own bookkeeping.
    async fn generate(&self, prompts: &[String], label: &str) -> Vec<GeneratorResult>;
}

/// Outcome of one generation batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Prompts submitted
    pub requested: usize,
    /// Images the generator produced
    pub succeeded: usize,
    /// Prompts with no image
    pub failed: usize,
    /// Produced images the Remote store did not accept
    pub remote_failures: usize,
    /// Remote id of the image marked primary
    pub primary: Option<String>,
    /// Local set length after the append
    pub local_total: usize,
    pub failures: Vec<String>,
}

/// Generator -> Remote + Local ingestion.
pub struct GenerationPipeline {
    generator: Arc<dyn ImageGenerator>,
    remote: Arc<dyn RemoteStore>,
    backfill: BackfillController,
}

impl GenerationPipeline {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        remote: Arc<dyn RemoteStore>,
        backfill: BackfillController,
    ) -> Self {
        Self {
            generator,
            remote,
            backfill,
        }
    }

    /// Generate images for an entity and record the successful ones.
    ///
    /// Remote failures are counted; the Local append still happens. Only a
    /// failed Local write is returned as an error.
    pub async fn run(&self, entity_id: &str, prompts: &[String]) -> Result<GenerationReport> {
        let results = self.generator.generate(prompts, entity_id).await;
        let mut report = GenerationReport {
            requested: prompts.len(),
            ..Default::default()
        };

        let mut references = Vec::new();
        for result in results {
            let image = match result {
                Ok(image) => image,
                Err(reason) => {
                    report.failed += 1;
                    report.failures.push(reason);
                    continue;
                }
            };
            report.succeeded += 1;

            let generator = GeneratorMetadata {
                prompt: image.prompt.clone(),
                model: image.model.clone(),
                generated_at: Utc::now(),
            };
            let reference = MediaReference::inline(
                DataUri::from_bytes(image.mime_type.as_str(), &image.bytes),
                Tier::Local,
            )
            .with_created_at(generator.generated_at)
            .with_generator(generator.clone());

            match self
                .remote
                .save_generated_image(entity_id, &reference.source, &GenerationMeta::from(&generator))
                .await
            {
                Ok(saved) => {
                    if report.primary.is_none() {
                        self.mark_primary(entity_id, &saved.id, &mut report).await;
                    }
                }
                Err(e) => {
                    warn!(entity = %entity_id, error = %e, "Remote rejected generated image");
                    report.remote_failures += 1;
                    report.failures.push(format!("remote save: {}", e));
                }
            }
            references.push(reference);
        }

        // Prompts the generator silently dropped
        let answered = report.succeeded + report.failed;
        if answered < report.requested {
            let missing = report.requested - answered;
            report.failed += missing;
            report
                .failures
                .extend(std::iter::repeat("no result from generator".to_string()).take(missing));
        }

        report.local_total = if references.is_empty() {
            self.backfill.local().get(entity_id).len()
        } else {
            self.backfill.record_generated(entity_id, references)?
        };

        info!(
            entity = %entity_id,
            requested = report.requested,
            succeeded = report.succeeded,
            failed = report.failed,
            remote_failures = report.remote_failures,
            "Generation batch recorded"
        );
        Ok(report)
    }

    async fn mark_primary(&self, entity_id: &str, image_id: &str, report: &mut GenerationReport) {
        match self.remote.set_primary(image_id, entity_id).await {
            Ok(()) => report.primary = Some(image_id.to_string()),
            Err(e) => warn!(entity = %entity_id, image = %image_id, error = %e, "Could not mark primary image"),
        }
    }
}
