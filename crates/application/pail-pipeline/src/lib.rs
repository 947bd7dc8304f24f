pub mod sync;

pub use sync::{
    ConflictPolicy, FileCollection, LocalTree, RemoteStore, SyncEngine, SyncError, SyncOptions,
    SyncReport,
};
