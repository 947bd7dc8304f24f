use pail_core::Direction;
use serde::{Deserialize, Serialize};

pub mod collection;
pub mod engine;
pub mod local;
pub mod remote;

pub use collection::FileCollection;
pub use engine::SyncEngine;
pub use local::LocalTree;
pub use remote::RemoteStore;

/// How the coordinator treats entries the diff marked ambiguous.
/// The default is safety over liveness: leave them alone and report them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictPolicy {
    #[default]
    Skip,
    PreferLeft,
    PreferRight,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub conflict_window_secs: u64,
    pub workers: usize,
    pub policy: ConflictPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            conflict_window_secs: pail_config::DEFAULT_CONFLICT_WINDOW_SECS,
            workers: pail_config::DEFAULT_WORKERS,
            policy: ConflictPolicy::default(),
        }
    }
}

/// High-level error type for sync operations.
///
/// `NotFound` is expected and drives the only-side classifications.
/// `Unavailable` means a collection cannot even be listed, which is fatal
/// for the pass. `Transfer` failures are caught per path and recorded in
/// the report instead of aborting the batch.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("transfer error: {0}")]
    Transfer(String),
    #[error("local I/O error: {0}")]
    Local(String),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Applied { direction: Direction, bytes: u64 },
    Failed { reason: String },
    Conflict,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathOutcome {
    pub path: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub files_transferred: u64,
    pub bytes_transferred: u64,
    pub conflicts: u64,
    pub failures: u64,
    pub skipped: u64,
}

/// Per-path outcomes of one reconciliation pass, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<PathOutcome>,
    pub stats: SyncStats,
}

impl SyncReport {
    /// A pass is clean when nothing failed. Conflicts alone do not make
    /// it dirty; they are surfaced separately.
    pub fn is_clean(&self) -> bool {
        self.stats.failures == 0
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &PathOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Conflict))
    }

    pub fn failures(&self) -> impl Iterator<Item = &PathOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. }))
    }
}
