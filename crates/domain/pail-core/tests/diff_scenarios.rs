use pail_core::diff::{diff, diff_full};
use pail_core::{snapshot_from_records, Classification, Direction, FileRecord, Snapshot};

// --- Helpers to build snapshots easily ---

fn rec(path: &str, digest: &str, modified: u64) -> FileRecord {
    FileRecord::present(path, digest, modified)
}

fn snap(records: Vec<FileRecord>) -> Snapshot {
    snapshot_from_records(records)
}

fn classification_of(entries: &[pail_core::DiffEntry], path: &str) -> Classification {
    entries
        .iter()
        .find(|e| e.path == path)
        .unwrap_or_else(|| panic!("no entry for {path}"))
        .classification
}

// --- Tests ---

#[test]
fn mixed_pair_classifies_each_path() {
    let left = snap(vec![rec("a", "H1", 100), rec("b", "H2", 200)]);
    let right = snap(vec![rec("b", "H3", 205), rec("c", "H4", 50)]);

    let entries = diff(&left, &right, 10);
    assert_eq!(entries.len(), 3);

    // `a` exists only on the left: the right side must receive it.
    assert_eq!(classification_of(&entries, "a"), Classification::RightOnly);
    assert_eq!(
        Classification::RightOnly.direction(),
        Some(Direction::ToRight)
    );

    // `b` differs on both sides, 5s apart, inside the 10s window.
    assert_eq!(classification_of(&entries, "b"), Classification::Conflict);
    assert_eq!(Classification::Conflict.direction(), None);

    // `c` exists only on the right: copy right-to-left.
    assert_eq!(classification_of(&entries, "c"), Classification::LeftOnly);
    assert_eq!(Classification::LeftOnly.direction(), Some(Direction::ToLeft));
}

#[test]
fn equal_digests_win_over_any_timestamp_skew() {
    let left = snap(vec![rec("file.txt", "SAME", 100)]);
    let right = snap(vec![rec("file.txt", "SAME", 999_999)]);

    assert!(diff(&left, &right, 10).is_empty());

    let full = diff_full(&left, &right, 10);
    assert_eq!(full.len(), 1);
    assert_eq!(full[0].classification, Classification::Equal);
}

#[test]
fn window_boundary_is_exclusive() {
    let newer = |delta: u64| {
        let left = snap(vec![rec("f", "A", 1000 + delta)]);
        let right = snap(vec![rec("f", "B", 1000)]);
        diff(&left, &right, 10)[0].classification
    };

    // Exactly the window apart resolves directionally.
    assert_eq!(newer(10), Classification::LeftNewer);
    // One second less is ambiguous.
    assert_eq!(newer(9), Classification::Conflict);
}

#[test]
fn equal_timestamps_with_differing_digests_always_conflict() {
    let left = snap(vec![rec("f", "A", 500)]);
    let right = snap(vec![rec("f", "B", 500)]);

    assert_eq!(
        diff(&left, &right, 10)[0].classification,
        Classification::Conflict
    );
    // Even the strict zero-tolerance window cannot pick a side.
    assert_eq!(
        diff(&left, &right, 0)[0].classification,
        Classification::Conflict
    );
}

#[test]
fn zero_window_resolves_any_nonzero_skew() {
    let left = snap(vec![rec("f", "A", 501)]);
    let right = snap(vec![rec("f", "B", 500)]);

    assert_eq!(
        diff(&left, &right, 0)[0].classification,
        Classification::LeftNewer
    );
}

#[test]
fn swapping_sides_mirrors_every_direction() {
    let a = snap(vec![
        rec("only-a", "H1", 100),
        rec("newer-on-a", "H2", 500),
        rec("clash", "H3", 300),
        rec("same", "H9", 10),
    ]);
    let b = snap(vec![
        rec("only-b", "H4", 100),
        rec("newer-on-a", "H5", 100),
        rec("clash", "H6", 301),
        rec("same", "H9", 9999),
    ]);

    let ab = diff_full(&a, &b, 10);
    let ba = diff_full(&b, &a, 10);
    assert_eq!(ab.len(), ba.len());

    let mirrored = |c: Classification| match c {
        Classification::LeftOnly => Classification::RightOnly,
        Classification::RightOnly => Classification::LeftOnly,
        Classification::LeftNewer => Classification::RightNewer,
        Classification::RightNewer => Classification::LeftNewer,
        other => other,
    };

    for entry in &ab {
        let twin = classification_of(&ba, &entry.path);
        assert_eq!(
            twin,
            mirrored(entry.classification),
            "path {} does not mirror",
            entry.path
        );
    }
}

#[test]
fn results_are_sorted_by_canonical_path() {
    let left = snap(vec![
        rec("zeta.txt", "A", 1),
        rec("Alpha.txt", "B", 1),
        rec("mid/inner.txt", "C", 1),
    ]);
    let right = snap(vec![]);

    let paths: Vec<String> = diff(&left, &right, 10).into_iter().map(|e| e.path).collect();
    assert_eq!(paths, vec!["Alpha.txt", "mid/inner.txt", "zeta.txt"]);
}

#[test]
fn join_is_case_and_separator_insensitive() {
    let left = snap(vec![rec("Docs\\Guide.md", "SAME", 100)]);
    let right = snap(vec![rec("docs/guide.md", "SAME", 200)]);

    assert!(diff(&left, &right, 10).is_empty());
}

#[test]
fn absent_records_count_as_missing() {
    let left = snap(vec![rec("kept.txt", "H1", 100)]);
    let mut right = snap(vec![rec("kept.txt", "H1", 100)]);
    right.insert("gone.txt".into(), FileRecord::absent("gone.txt"));

    let entries = diff(&left, &right, 10);
    assert!(
        entries.is_empty(),
        "an absent record must not produce a transfer"
    );
}

#[test]
fn only_side_entries_carry_one_sided_metadata() {
    let left = snap(vec![rec("a", "H1", 100)]);
    let right = snap(vec![]);

    let entries = diff(&left, &right, 10);
    let e = &entries[0];
    assert_eq!(e.left_digest.as_deref(), Some("H1"));
    assert_eq!(e.left_modified, Some(100));
    assert!(e.right_digest.is_none());
    assert!(e.right_modified.is_none());
}
