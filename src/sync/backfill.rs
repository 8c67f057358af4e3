//! Backfill Controller - the only writer of the Local tier
//!
//! Two write paths:
//! - **backfill**: a self-contained Remote resolution replaces the Local
//!   entry in full
//! - **record**: uploads and generated images are appended to whatever Local
//!   already holds
//!
//! Neither path ever stores an indirection. Locators already in Local (legacy
//! data) are only removed by the operator actions [`BackfillController::clear`],
//! [`BackfillController::clear_all`] and
//! [`BackfillController::purge_indirections`]. Inline payloads pass through the
//! [`PayloadOptimizer`] on every write.
//!
//! Append is read-modify-write with no compare-and-swap: two concurrent
//! appends to the same entity can lose one of the writes.

use super::PayloadOptimizer;
use crate::error::{ContentError, Result};
use crate::model::{MediaReference, MediaSet, Tier};
use crate::resolver::Resolution;
use crate::tiers::LocalCache;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Why a resolution was not written into Local
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Only Remote results are backfilled
    NotRemote(Tier),
    /// The Remote result contains this many indirections
    HasIndirections(usize),
    /// Nothing to write
    Empty,
    /// No Local tier is configured
    NoLocalTier,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotRemote(tier) => write!(f, "result came from {}", tier),
            SkipReason::HasIndirections(n) => write!(f, "result holds {} indirection(s)", n),
            SkipReason::Empty => f.write_str("result is empty"),
            SkipReason::NoLocalTier => f.write_str("no local tier configured"),
        }
    }
}

/// Result of a backfill attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// Local entry replaced with this many references
    Replaced(usize),
    Skipped(SkipReason),
}

impl BackfillOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, BackfillOutcome::Replaced(_))
    }
}

/// Result of an indirection sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// References removed across all entities
    pub removed: usize,
    /// Entities that lost at least one reference
    pub entities_affected: Vec<String>,
}

/// Writes into the Local tier under the no-propagation rule.
#[derive(Clone)]
pub struct BackfillController {
    local: Arc<LocalCache>,
    optimizer: PayloadOptimizer,
}

impl BackfillController {
    pub fn new(local: Arc<LocalCache>) -> Self {
        Self {
            local,
            optimizer: PayloadOptimizer::default(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: PayloadOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn local(&self) -> &Arc<LocalCache> {
        &self.local
    }

    /// Replace Local with a self-contained Remote result; skip anything else.
    pub fn backfill(&self, entity_id: &str, resolution: &Resolution) -> Result<BackfillOutcome> {
        let reason = if resolution.tier != Tier::Remote {
            Some(SkipReason::NotRemote(resolution.tier))
        } else if resolution.media.is_empty() {
            Some(SkipReason::Empty)
        } else if !resolution.may_propagate() {
            Some(SkipReason::HasIndirections(resolution.media.indirections().count()))
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(entity = %entity_id, reason = %reason, "Skipping backfill");
            return Ok(BackfillOutcome::Skipped(reason));
        }

        let media = self.prepare(resolution.media.iter().cloned());
        self.local.replace_all(entity_id, &media).map_err(|e| {
            error!(entity = %entity_id, error = %e, "Backfill write failed");
            e
        })?;
        Ok(BackfillOutcome::Replaced(media.len()))
    }

    /// Append uploaded images, returning the new Local length.
    pub fn record_upload(&self, entity_id: &str, references: Vec<MediaReference>) -> Result<usize> {
        self.append(entity_id, references, "upload")
    }

    /// Append generated images, returning the new Local length.
    pub fn record_generated(
        &self,
        entity_id: &str,
        references: Vec<MediaReference>,
    ) -> Result<usize> {
        self.append(entity_id, references, "generated")
    }

    /// Stamp references as Local and shrink their inline payloads.
    fn prepare(&self, references: impl IntoIterator<Item = MediaReference>) -> MediaSet {
        references
            .into_iter()
            .map(|r| self.optimizer.optimize_reference(r.with_tier(Tier::Local)))
            .collect()
    }

    fn append(&self, entity_id: &str, references: Vec<MediaReference>, kind: &str) -> Result<usize> {
        ensure_self_contained(entity_id, &references)?;
        if references.is_empty() {
            return Ok(self.local.get(entity_id).len());
        }
        let added = references.len();
        let references: Vec<_> = self.prepare(references).into_iter().collect();
        let total = self.local.append(entity_id, &references).map_err(|e| {
            error!(entity = %entity_id, kind, error = %e, "Local append failed");
            e
        })?;
        info!(entity = %entity_id, kind, added, total, "Recorded media in local cache");
        Ok(total)
    }

    /// Operator action: drop the entity's Local entry.
    pub fn clear(&self, entity_id: &str) -> Result<()> {
        self.local.clear(entity_id)?;
        info!(entity = %entity_id, "Cleared local cache entry");
        Ok(())
    }

    /// Operator action: drop every Local entry, returning how many there were.
    pub fn clear_all(&self) -> Result<usize> {
        let cleared = self.local.clear_all()?;
        info!(entities = cleared, "Cleared all local cache entries");
        Ok(cleared)
    }

    /// Operator action: remove one Local reference by position.
    pub fn remove_at(&self, entity_id: &str, index: usize) -> Result<MediaReference> {
        let removed = self.local.remove_at(entity_id, index)?;
        info!(entity = %entity_id, index, "Removed local cache reference");
        Ok(removed)
    }

    /// Operator action: keep only self-contained references in every entry.
    pub fn purge_indirections(&self) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        for entity_id in self.local.entities()? {
            let mut media = match self.local.try_get(&entity_id) {
                Ok(media) => media,
                Err(e) => {
                    // Undecodable entries render as nothing; drop them too.
                    error!(entity = %entity_id, error = %e, "Dropping unreadable local entry");
                    self.local.clear(&entity_id)?;
                    report.entities_affected.push(entity_id);
                    continue;
                }
            };
            let removed = media.retain_self_contained();
            if removed > 0 {
                self.local.replace_all(&entity_id, &media)?;
                report.removed += removed;
                report.entities_affected.push(entity_id);
            }
        }
        info!(
            removed = report.removed,
            entities = report.entities_affected.len(),
            "Purged indirections from local cache"
        );
        Ok(report)
    }

    /// Operator action: replace the Local entry with the given references.
    ///
    /// Refuses the whole batch if any reference is an indirection.
    pub fn sync_to_local(&self, entity_id: &str, references: Vec<MediaReference>) -> Result<usize> {
        ensure_self_contained(entity_id, &references)?;
        let media = self.prepare(references);
        self.local.clear(entity_id)?;
        self.local.replace_all(entity_id, &media)?;
        info!(entity = %entity_id, count = media.len(), "Synced media to local cache");
        Ok(media.len())
    }
}

fn ensure_self_contained(entity_id: &str, references: &[MediaReference]) -> Result<()> {
    match references.iter().find(|r| !r.is_self_contained()) {
        Some(r) => Err(ContentError::NotSelfContained {
            entity: entity_id.to_string(),
            locator: r.source.to_string(),
        }),
        None => Ok(()),
    }
}
