//! Versioned ledger views.
//!
//! A [`LedgerView`] is a read-through snapshot of the register store at a
//! block height. It is not a copy: reads resolve lazily through a
//! [`RegisterRead`] base (changelog + backend). During execution the view
//! also buffers uncommitted writes in two overlay layers: `committed`
//! holds the writes of earlier transactions in the same block, `pending`
//! holds the transaction currently executing. Reads check pending, then
//! committed, then the base.

use std::sync::Arc;

use basalt_primitives::{Delta, LedgerOverlay, OverlayResult, RegisterId};

use crate::error::StoreError;

/// Resolves a register to its committed value at a fixed height.
pub trait RegisterRead: Send + Sync {
    /// The register's committed value, or `None` if it was never written
    /// at or below the view height, or was cleared.
    fn get_register(&self, id: &RegisterId) -> Result<Option<Vec<u8>>, StoreError>;
}

/// A read-through ledger snapshot with an uncommitted write overlay.
pub struct LedgerView {
    base: Arc<dyn RegisterRead>,
    committed: LedgerOverlay,
    pending: LedgerOverlay,
}

impl LedgerView {
    pub fn new(base: Arc<dyn RegisterRead>) -> Self {
        Self {
            base,
            committed: LedgerOverlay::new(),
            pending: LedgerOverlay::new(),
        }
    }

    /// Read a register through the overlay layers.
    ///
    /// Empty values read as not-found: an empty write is how a deletion
    /// appears at the storage layer.
    pub fn get(&self, id: &RegisterId) -> Result<Option<Vec<u8>>, StoreError> {
        for overlay in [&self.pending, &self.committed] {
            match overlay.get(id) {
                OverlayResult::Found(value) => {
                    return Ok(if value.is_empty() { None } else { Some(value) });
                }
                OverlayResult::Deleted => return Ok(None),
                OverlayResult::NotInOverlay => {}
            }
        }
        match self.base.get_register(id)? {
            Some(value) if value.is_empty() => Ok(None),
            other => Ok(other),
        }
    }

    /// Buffer a register write for the transaction currently executing.
    pub fn set(&mut self, id: RegisterId, value: Vec<u8>) {
        self.pending.set(id, value);
    }

    /// Buffer a register deletion for the transaction currently executing.
    pub fn delete(&mut self, id: RegisterId) {
        self.pending.delete(id);
    }

    /// Flush the current transaction's writes on its boundary.
    ///
    /// Drains the pending overlay into a delta (the per-transaction
    /// sub-delta), merges those writes into the committed layer so later
    /// transactions in the block observe them, and returns the delta.
    pub fn collapse(&mut self) -> Delta {
        let delta = self.pending.drain_into_delta();
        self.committed.apply_delta(&delta);
        delta
    }

    /// Discard the current transaction's buffered writes.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Returns true if the current transaction has buffered writes.
    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl std::fmt::Debug for LedgerView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerView")
            .field("committed", &self.committed.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
