//! The storage capability set.
//!
//! `Store` is the seam between the emulator and its persistence: the
//! in-memory store and the sled-backed store are two variants of the same
//! capability. Snapshot operations default to unsupported so only stores
//! with an on-disk representation opt in.

use basalt_primitives::{Block, Collection, Delta, Event, Identifier, Transaction, TransactionResult};

use crate::error::StoreError;
use crate::ledger::LedgerView;

/// Committed chain state: blocks, collections, transactions, results,
/// registers, and events.
pub trait Store: Send + Sync {
    /// The block at the latest committed height.
    fn latest_block(&self) -> Result<Block, StoreError>;

    fn block_by_id(&self, id: &Identifier) -> Result<Block, StoreError>;

    fn block_by_height(&self, height: u64) -> Result<Block, StoreError>;

    /// Persist a block and its id index; the latest-height pointer moves
    /// only when `block.header.height` is at or above the current latest.
    fn store_block(&self, block: &Block) -> Result<(), StoreError>;

    /// Atomically persist a sealed block with everything it carries.
    ///
    /// `results[i]` is the outcome of `transactions[i]`; mismatched
    /// lengths are rejected. All inserts land in one backend write, and
    /// stores with snapshot support capture a checkpoint afterwards.
    fn commit_block(
        &self,
        block: &Block,
        collections: &[Collection],
        transactions: &[Transaction],
        results: &[TransactionResult],
        delta: &Delta,
        events: &[Event],
    ) -> Result<(), StoreError>;

    fn collection_by_id(&self, id: &Identifier) -> Result<Collection, StoreError>;

    fn insert_collection(&self, collection: &Collection) -> Result<(), StoreError>;

    fn transaction_by_id(&self, id: &Identifier) -> Result<Transaction, StoreError>;

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError>;

    fn transaction_result_by_id(&self, id: &Identifier)
        -> Result<TransactionResult, StoreError>;

    fn insert_transaction_result(
        &self,
        id: &Identifier,
        result: &TransactionResult,
    ) -> Result<(), StoreError>;

    /// A read-through ledger view at the given block height.
    fn ledger_view_at(&self, height: u64) -> Result<LedgerView, StoreError>;

    /// Apply a block delta at `height`: write values, extend changelists.
    fn insert_ledger_delta(&self, height: u64, delta: &Delta) -> Result<(), StoreError>;

    /// All events in the block at `height`, in `(tx_index, event_index)`
    /// order, optionally filtered by exact type (empty filter matches
    /// everything).
    fn events_by_height(&self, height: u64, event_type: &str)
        -> Result<Vec<Event>, StoreError>;

    fn insert_events(&self, height: u64, events: &[Event]) -> Result<(), StoreError>;

    /// Flush buffered writes to durable storage.
    fn sync(&self) -> Result<(), StoreError>;

    /// Release the backend. The store serves no requests afterwards.
    fn close(&mut self) -> Result<(), StoreError>;

    /// Returns true if this store can checkpoint and jump.
    fn supports_snapshots(&self) -> bool {
        false
    }

    /// Capture the current on-disk state as a new revision.
    fn checkpoint(&self, message: &str) -> Result<(), StoreError> {
        let _ = message;
        Err(StoreError::SnapshotsNotSupported)
    }

    /// Switch to the named snapshot, creating it from the current state
    /// if it does not exist yet.
    fn jump_to(&mut self, name: &str) -> Result<(), StoreError> {
        let _ = name;
        Err(StoreError::SnapshotsNotSupported)
    }
}
