use futures::StreamExt;
use pail_core::diff::{diff, diff_full};
use pail_core::{Classification, DiffEntry, Direction, Snapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::sync::{
    ConflictPolicy, FileCollection, Outcome, PathOutcome, SyncError, SyncOptions, SyncReport,
    SyncStats,
};

/// Coordinates one reconciliation pass: snapshot both collections, diff,
/// then apply each decision. All state is scoped to the pass; nothing is
/// persisted between runs.
pub struct SyncEngine {
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(options: SyncOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub async fn snapshot_pair(
        &self,
        left: &dyn FileCollection,
        right: &dyn FileCollection,
    ) -> Result<(Snapshot, Snapshot), SyncError> {
        let (l, r) = tokio::join!(
            left.snapshot(self.options.workers),
            right.snapshot(self.options.workers)
        );
        Ok((l?, r?))
    }

    /// Dry-run surface: classify every path without touching either side.
    pub async fn plan(
        &self,
        left: &dyn FileCollection,
        right: &dyn FileCollection,
    ) -> Result<Vec<DiffEntry>, SyncError> {
        let (l, r) = self.snapshot_pair(left, right).await?;
        Ok(diff(&l, &r, self.options.conflict_window_secs))
    }

    /// Unfiltered variant of [`plan`](Self::plan), equals included.
    pub async fn plan_full(
        &self,
        left: &dyn FileCollection,
        right: &dyn FileCollection,
    ) -> Result<Vec<DiffEntry>, SyncError> {
        let (l, r) = self.snapshot_pair(left, right).await?;
        Ok(diff_full(&l, &r, self.options.conflict_window_secs))
    }

    /// Apply a batch of decisions. Every entry is attempted; a failure is
    /// recorded against its path and never aborts the rest. The cancel
    /// flag is honored between transfers: entries not yet started are
    /// reported skipped, and no transfer is ever left half-written.
    pub async fn reconcile(
        &self,
        entries: &[DiffEntry],
        left: &dyn FileCollection,
        right: &dyn FileCollection,
        cancel: Option<Arc<AtomicBool>>,
    ) -> SyncReport {
        info!(
            "reconciling {} entries between {} and {}",
            entries.len(),
            left.name(),
            right.name()
        );

        let mut outcomes: Vec<PathOutcome> = futures::stream::iter(entries.iter())
            .map(|entry| {
                let cancel = cancel.clone();
                async move {
                    if cancel
                        .as_ref()
                        .map(|c| c.load(Ordering::Relaxed))
                        .unwrap_or(false)
                    {
                        return PathOutcome {
                            path: entry.path.clone(),
                            outcome: Outcome::Skipped,
                        };
                    }
                    self.apply_entry(entry, left, right).await
                }
            })
            .buffer_unordered(self.options.workers.max(1))
            .collect()
            .await;

        // Completion order is nondeterministic; reports are not.
        outcomes.sort_by(|a, b| a.path.cmp(&b.path));

        let stats = tally(&outcomes);
        SyncReport { outcomes, stats }
    }

    /// One full pass: plan, then reconcile.
    pub async fn run(
        &self,
        left: &dyn FileCollection,
        right: &dyn FileCollection,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SyncReport, SyncError> {
        let entries = self.plan(left, right).await?;
        if entries.is_empty() {
            info!("collections already reconciled");
            return Ok(SyncReport::default());
        }
        Ok(self.reconcile(&entries, left, right, cancel).await)
    }

    async fn apply_entry(
        &self,
        entry: &DiffEntry,
        left: &dyn FileCollection,
        right: &dyn FileCollection,
    ) -> PathOutcome {
        let direction = match entry.classification {
            Classification::Equal => {
                return PathOutcome {
                    path: entry.path.clone(),
                    outcome: Outcome::Skipped,
                }
            }
            Classification::Conflict => match self.options.policy {
                ConflictPolicy::Skip => {
                    debug!("conflict on {} left for manual resolution", entry.path);
                    return PathOutcome {
                        path: entry.path.clone(),
                        outcome: Outcome::Conflict,
                    };
                }
                ConflictPolicy::PreferLeft => Direction::ToRight,
                ConflictPolicy::PreferRight => Direction::ToLeft,
            },
            Classification::RightOnly | Classification::LeftNewer => Direction::ToRight,
            Classification::LeftOnly | Classification::RightNewer => Direction::ToLeft,
        };

        let (src, dst, modified) = match direction {
            Direction::ToRight => (left, right, entry.left_modified),
            Direction::ToLeft => (right, left, entry.right_modified),
        };

        match copy_path(&entry.path, src, dst, modified).await {
            Ok(bytes) => {
                debug!("applied {} ({:?}, {} bytes)", entry.path, direction, bytes);
                PathOutcome {
                    path: entry.path.clone(),
                    outcome: Outcome::Applied { direction, bytes },
                }
            }
            Err(e) => {
                warn!("transfer failed for {}: {e}", entry.path);
                PathOutcome {
                    path: entry.path.clone(),
                    outcome: Outcome::Failed {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }
}

/// Copy one path from `src` to `dst`, preserving the source's
/// modification time on the destination.
async fn copy_path(
    path: &str,
    src: &dyn FileCollection,
    dst: &dyn FileCollection,
    modified: Option<u64>,
) -> Result<u64, SyncError> {
    let content = src.fetch(path).await?;
    let modified = match modified {
        Some(m) => m,
        None => src.lookup(path).await?.modified,
    };
    dst.store(path, &content, modified).await?;
    Ok(content.len() as u64)
}

fn tally(outcomes: &[PathOutcome]) -> SyncStats {
    let mut stats = SyncStats::default();
    for o in outcomes {
        match &o.outcome {
            Outcome::Applied { bytes, .. } => {
                stats.files_transferred += 1;
                stats.bytes_transferred += bytes;
            }
            Outcome::Failed { .. } => stats.failures += 1,
            Outcome::Conflict => stats.conflicts += 1,
            Outcome::Skipped => stats.skipped += 1,
        }
    }
    stats
}
