use crate::path_utils::PailPath;
use crate::{Classification, DiffEntry, FileRecord, Snapshot};
use std::collections::{HashMap, HashSet};

/// Compare two snapshots and return the decisions that require attention,
/// sorted by canonical path. `Equal` entries are excluded; callers that
/// want full symmetric diagnostics use [`diff_full`].
pub fn diff(left: &Snapshot, right: &Snapshot, conflict_window_secs: u64) -> Vec<DiffEntry> {
    let mut entries = diff_full(left, right, conflict_window_secs);
    entries.retain(|e| e.classification != Classification::Equal);
    entries
}

/// Unfiltered variant of [`diff`]: one entry per path on either side,
/// including paths whose content already matches.
pub fn diff_full(left: &Snapshot, right: &Snapshot, conflict_window_secs: u64) -> Vec<DiffEntry> {
    let right_by_key: HashMap<String, &FileRecord> = right
        .values()
        .filter(|r| r.exists)
        .map(|r| (PailPath::canonicalize(&r.path), r))
        .collect();

    let mut visited: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(left.len() + right.len());

    for l in left.values().filter(|l| l.exists) {
        let key = PailPath::canonicalize(&l.path);
        visited.insert(key.clone());

        match right_by_key.get(&key) {
            Some(r) => entries.push(DiffEntry {
                path: PailPath::normalize(&l.path),
                left_digest: Some(l.digest.clone()),
                right_digest: Some(r.digest.clone()),
                left_modified: Some(l.modified),
                right_modified: Some(r.modified),
                classification: classify(l, r, conflict_window_secs),
            }),
            None => entries.push(DiffEntry {
                path: PailPath::normalize(&l.path),
                left_digest: Some(l.digest.clone()),
                right_digest: None,
                left_modified: Some(l.modified),
                right_modified: None,
                classification: Classification::RightOnly,
            }),
        }
    }

    for r in right.values().filter(|r| r.exists) {
        let key = PailPath::canonicalize(&r.path);
        if !visited.contains(&key) {
            entries.push(DiffEntry {
                path: PailPath::normalize(&r.path),
                left_digest: None,
                right_digest: Some(r.digest.clone()),
                left_modified: None,
                right_modified: Some(r.modified),
                classification: Classification::LeftOnly,
            });
        }
    }

    entries.sort_by(|a, b| PailPath::canonicalize(&a.path).cmp(&PailPath::canonicalize(&b.path)));
    entries
}

/// Classify a path present on both sides.
///
/// Content is authoritative for equality: identical digests are `Equal`
/// no matter how far the timestamps drift, which stops metadata-only
/// changes and clock skew from causing spurious transfers. Timestamps
/// only break the tie once the digests are known to differ, and only
/// outside the conflict window. Equal timestamps can never be resolved
/// directionally, so they conflict even at a zero window.
fn classify(l: &FileRecord, r: &FileRecord, conflict_window_secs: u64) -> Classification {
    if l.digest == r.digest {
        return Classification::Equal;
    }

    let delta = l.modified.abs_diff(r.modified);
    if delta == 0 || delta < conflict_window_secs {
        Classification::Conflict
    } else if l.modified > r.modified {
        Classification::LeftNewer
    } else {
        Classification::RightNewer
    }
}
