//! Storage error types.

use basalt_primitives::CodecError;

/// Top-level error type for the storage crate.
///
/// `NotFound` is the sentinel distinguishing missing keys from real
/// backend failures; callers match on it to map lookups to their own
/// not-found taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("key not found")]
    NotFound,

    /// Backend (sled) failure.
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    /// Filesystem failure outside the backend (snapshot file handling).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value failed to decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The store was closed and can no longer serve requests.
    #[error("store is closed")]
    Closed,

    /// This store has no snapshot capability.
    #[error("store does not support snapshots")]
    SnapshotsNotSupported,

    /// Snapshot manager failure (manifest, tag, or revision handling).
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// `commit_block` targeted a height that already holds a block.
    #[error("a block is already committed at height {0}")]
    BlockAlreadyExists(u64),

    /// `commit_block` was called with mismatched transaction/result counts.
    #[error("transactions count ({transactions}) does not match result count ({results})")]
    ResultCountMismatch {
        transactions: usize,
        results: usize,
    },

    /// A changelist was stored under a key that does not parse as a
    /// register id.
    #[error("found changelist for invalid register id")]
    InvalidChangelogKey,
}

impl StoreError {
    /// Returns true if this is the not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
