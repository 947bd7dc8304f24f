use camino::{Utf8Path, Utf8PathBuf};
use filetime::FileTime;
use pail_core::path_utils::PailPath;
use pail_core::{FileRecord, Snapshot};
use pail_infra::hashing;
use rayon::prelude::*;
use std::fs;
use std::time::{Duration, UNIX_EPOCH};
use walkdir::{DirEntry, WalkDir};

use crate::sync::{FileCollection, SyncError};

/// Local directory backend. Hidden files and directories (dot-prefixed)
/// are excluded from every walk.
pub struct LocalTree {
    root: Utf8PathBuf,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|n| n.starts_with('.'))
            .unwrap_or(true)
}

impl LocalTree {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Filesystem mtime truncated to whole seconds. Sub-second precision
    /// is discarded to match what store metadata can represent.
    pub fn mtime(meta: &fs::Metadata) -> u64 {
        meta.modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn walk(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SyncError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e)) {
            let entry =
                entry.map_err(|e| SyncError::Unavailable(format!("walk failed under {root}: {e}")))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(entry.into_path())
                .map_err(|p| SyncError::Local(format!("non-utf8 path: {}", p.display())))?;
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    fn rel_of(root: &Utf8Path, fs_path: &Utf8Path) -> Result<String, SyncError> {
        let rel = fs_path
            .strip_prefix(root)
            .map_err(|e| SyncError::Local(format!("path {fs_path} outside root {root}: {e}")))?;
        Ok(PailPath::normalize(rel.as_str()))
    }

    fn abs_of(&self, rel_path: &str) -> Result<Utf8PathBuf, SyncError> {
        if !PailPath::verify_safe(rel_path) {
            return Err(SyncError::Local(format!("unsafe relative path: {rel_path}")));
        }
        Ok(self.root.join(PailPath::normalize(rel_path)))
    }

    fn read_record(fs_path: &Utf8Path, rel_path: String) -> Result<FileRecord, SyncError> {
        let meta = fs::metadata(fs_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::NotFound(rel_path.clone())
            } else {
                SyncError::Local(format!("stat {fs_path} failed: {e}"))
            }
        })?;
        let digest = hashing::hash_file(fs_path).map_err(|e| {
            SyncError::Local(format!("hashing {fs_path} failed: {e}"))
        })?;
        Ok(FileRecord::present(rel_path, digest, Self::mtime(&meta)))
    }
}

/// Retry renames briefly: on some platforms a scanner or indexer can hold
/// the target open for a moment.
async fn rename_with_retry(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    let mut attempt = 0u32;
    let mut backoff = Duration::from_millis(50);

    loop {
        match tokio::fs::rename(from.as_std_path(), to.as_std_path()).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                attempt += 1;
                if attempt >= 5 {
                    return Err(e);
                }
                tokio::time::sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, Duration::from_millis(800));
            }
        }
    }
}

#[async_trait::async_trait]
impl FileCollection for LocalTree {
    fn name(&self) -> String {
        format!("local:{}", self.root)
    }

    async fn enumerate(&self) -> Result<Vec<String>, SyncError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let files = Self::walk(&root)?;
            files
                .iter()
                .map(|p| Self::rel_of(&root, p))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| SyncError::Local(format!("walk join failed: {e}")))?
    }

    async fn lookup(&self, path: &str) -> Result<FileRecord, SyncError> {
        let fs_path = self.abs_of(path)?;
        let rel = PailPath::normalize(path);
        tokio::task::spawn_blocking(move || Self::read_record(&fs_path, rel))
            .await
            .map_err(|e| SyncError::Local(format!("lookup join failed: {e}")))?
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SyncError> {
        let fs_path = self.abs_of(path)?;
        tokio::fs::read(fs_path.as_std_path()).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::NotFound(path.to_string())
            } else {
                SyncError::Transfer(format!("read {fs_path} failed: {e}"))
            }
        })
    }

    async fn store(&self, path: &str, content: &[u8], modified: u64) -> Result<(), SyncError> {
        let target = self.abs_of(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent.as_std_path())
                .await
                .map_err(|e| SyncError::Transfer(format!("mkdir {parent} failed: {e}")))?;
        }

        // Stage next to the target, then rename into place: a failed or
        // cancelled transfer never leaves a half-written destination.
        let staged = target.with_file_name(format!(
            ".{}.pail-partial",
            target.file_name().unwrap_or("object")
        ));
        tokio::fs::write(staged.as_std_path(), content)
            .await
            .map_err(|e| SyncError::Transfer(format!("write {staged} failed: {e}")))?;

        if let Err(e) = rename_with_retry(&staged, &target).await {
            let _ = tokio::fs::remove_file(staged.as_std_path()).await;
            return Err(SyncError::Transfer(format!(
                "rename into {target} failed: {e}"
            )));
        }

        filetime::set_file_mtime(
            target.as_std_path(),
            FileTime::from_unix_time(modified as i64, 0),
        )
        .map_err(|e| SyncError::Transfer(format!("set mtime on {target} failed: {e}")))
    }

    /// One walk, then parallel hashing. Equivalent to the default
    /// enumerate-plus-lookups, minus one stat round per path.
    async fn snapshot(&self, _workers: usize) -> Result<Snapshot, SyncError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let files = Self::walk(&root)?;
            let records: Vec<Result<FileRecord, SyncError>> = files
                .par_iter()
                .map(|fs_path| {
                    let rel = Self::rel_of(&root, fs_path)?;
                    Self::read_record(fs_path, rel)
                })
                .collect();

            let mut snapshot = Snapshot::new();
            for res in records {
                match res {
                    Ok(record) => {
                        snapshot.insert(PailPath::normalize(&record.path), record);
                    }
                    // Deleted mid-walk; the next pass will see the truth.
                    Err(SyncError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(snapshot)
        })
        .await
        .map_err(|e| SyncError::Local(format!("scan join failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn utf8_root(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn enumerate_skips_hidden_and_sorts() {
        let dir = tempdir().unwrap();
        let root = utf8_root(&dir);
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("zeta.txt"), b"z").unwrap();
        std::fs::write(root.join("sub/alpha.txt"), b"a").unwrap();
        std::fs::write(root.join(".hidden"), b"h").unwrap();
        std::fs::write(root.join(".git/config"), b"c").unwrap();

        let tree = LocalTree::new(root);
        let paths = tree.enumerate().await.unwrap();
        assert_eq!(paths, vec!["sub/alpha.txt", "zeta.txt"]);
    }

    #[tokio::test]
    async fn lookup_truncates_mtime_to_seconds() {
        let dir = tempdir().unwrap();
        let root = utf8_root(&dir);
        let file = root.join("file.txt");
        std::fs::write(&file, b"hello").unwrap();
        filetime::set_file_mtime(
            file.as_std_path(),
            FileTime::from_unix_time(1_700_000_123, 456_789_000),
        )
        .unwrap();

        let tree = LocalTree::new(root);
        let record = tree.lookup("file.txt").await.unwrap();
        assert_eq!(record.modified, 1_700_000_123);
        assert_eq!(record.digest, pail_infra::hashing::hash_bytes(b"hello"));
        assert!(record.exists);
    }

    #[tokio::test]
    async fn lookup_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let tree = LocalTree::new(utf8_root(&dir));

        let err = tree.lookup("nope.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn store_applies_explicit_mtime_and_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let root = utf8_root(&dir);
        let tree = LocalTree::new(root.clone());

        tree.store("nested/out.bin", b"payload", 1_600_000_000)
            .await
            .unwrap();

        let record = tree.lookup("nested/out.bin").await.unwrap();
        assert_eq!(record.modified, 1_600_000_000);
        assert_eq!(tree.fetch("nested/out.bin").await.unwrap(), b"payload");

        let leftovers: Vec<_> = std::fs::read_dir(root.join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers, vec!["out.bin"]);
    }

    #[tokio::test]
    async fn store_rejects_traversal() {
        let dir = tempdir().unwrap();
        let tree = LocalTree::new(utf8_root(&dir));

        assert!(tree.store("../escape.txt", b"x", 0).await.is_err());
    }

    #[tokio::test]
    async fn snapshot_agrees_with_individual_lookups() {
        let dir = tempdir().unwrap();
        let root = utf8_root(&dir);
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("a/one.txt"), b"one").unwrap();
        std::fs::write(root.join("two.txt"), b"two").unwrap();

        let tree = LocalTree::new(root);
        let snapshot = tree.snapshot(4).await.unwrap();
        assert_eq!(snapshot.len(), 2);

        for (path, record) in &snapshot {
            let looked_up = tree.lookup(path).await.unwrap();
            assert_eq!(&looked_up, record);
        }
    }
}
