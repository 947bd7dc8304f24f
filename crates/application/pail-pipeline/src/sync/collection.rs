use crate::sync::SyncError;
use futures::StreamExt;
use pail_core::path_utils::PailPath;
use pail_core::{FileRecord, Snapshot};
use tracing::debug;

/// Capability contract implemented by both sides of a reconciliation
/// pass. The engine consumes only this interface; how a backend walks a
/// disk or talks to its store stays behind it.
#[async_trait::async_trait]
pub trait FileCollection: Send + Sync {
    /// Label used in logs and reports.
    fn name(&self) -> String;

    /// List every path in the collection as normalized relative paths.
    /// Finite and restartable: each call re-walks the backing store.
    /// Ordering is backend-defined but stable within one pass.
    async fn enumerate(&self) -> Result<Vec<String>, SyncError>;

    /// Resolve one path to a record. Digest and timestamp are observed
    /// together; a record is never partially populated.
    async fn lookup(&self, path: &str) -> Result<FileRecord, SyncError>;

    /// Read the full content of one path.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SyncError>;

    /// Write content and record `modified` (unix seconds) as the file's
    /// modification time, distinct from the time of the write itself.
    async fn store(&self, path: &str, content: &[u8], modified: u64) -> Result<(), SyncError>;

    /// Materialize the collection as path -> record.
    ///
    /// The default resolves every enumerated path over a bounded
    /// concurrent fan-out. Backends override it when the underlying
    /// protocol can batch, e.g. a listing that already carries metadata.
    /// A path that vanishes between enumerate and lookup is dropped;
    /// any other error aborts the snapshot.
    async fn snapshot(&self, workers: usize) -> Result<Snapshot, SyncError> {
        let paths = self.enumerate().await?;

        let results: Vec<Result<FileRecord, SyncError>> = futures::stream::iter(paths)
            .map(|path| async move { self.lookup(&path).await })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;

        let mut snapshot = Snapshot::new();
        for res in results {
            match res {
                Ok(record) => {
                    snapshot.insert(PailPath::normalize(&record.path), record);
                }
                Err(SyncError::NotFound(path)) => {
                    debug!("{}: {path} vanished during snapshot", self.name());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(snapshot)
    }
}
