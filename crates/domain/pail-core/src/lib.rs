use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod diff;
pub mod path_utils;
pub mod tree;

use path_utils::PailPath;

pub type Md5Digest = String;

/// Immutable snapshot of one file's identity at lookup time.
///
/// Staleness is handled by re-fetching, never by mutating a live record.
/// A record for an absent path still carries path identity so the diff
/// can classify it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub digest: Md5Digest,
    /// Modification time in whole unix seconds. Sub-second precision is
    /// discarded to match the coarser precision of store metadata.
    pub modified: u64,
    pub exists: bool,
}

impl FileRecord {
    pub fn present(path: impl Into<String>, digest: impl Into<Md5Digest>, modified: u64) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
            modified,
            exists: true,
        }
    }

    pub fn absent(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            digest: Md5Digest::new(),
            modified: 0,
            exists: false,
        }
    }
}

/// Materialized state of one collection for a single pass, keyed by
/// normalized path. Never persisted; recomputed on every pass.
pub type Snapshot = BTreeMap<String, FileRecord>;

/// Build a snapshot from records, keying each by its normalized path.
pub fn snapshot_from_records(records: impl IntoIterator<Item = FileRecord>) -> Snapshot {
    records
        .into_iter()
        .map(|r| (PailPath::normalize(&r.path), r))
        .collect()
}

/// One path's classified comparison outcome between two collections.
///
/// `RightOnly` means the right side is missing the file (it exists only
/// on the left), so the transfer direction is left-to-right; `LeftOnly`
/// is the mirror image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Classification {
    Equal,
    LeftOnly,
    RightOnly,
    Conflict,
    LeftNewer,
    RightNewer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    ToRight,
    ToLeft,
}

impl Classification {
    /// Transfer direction implied by the classification, if any.
    /// `Equal` needs no transfer and `Conflict` must not be auto-resolved.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Classification::RightOnly | Classification::LeftNewer => Some(Direction::ToRight),
            Classification::LeftOnly | Classification::RightNewer => Some(Direction::ToLeft),
            Classification::Equal | Classification::Conflict => None,
        }
    }
}

/// Derived comparison result for one path. Recomputed on every pass,
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: String,
    pub left_digest: Option<Md5Digest>,
    pub right_digest: Option<Md5Digest>,
    pub left_modified: Option<u64>,
    pub right_modified: Option<u64>,
    pub classification: Classification,
}
