//! In-memory changelog index: per-register ordered lists of the block
//! heights at which the register was written.
//!
//! The map is authoritative at runtime; a persisted copy under the
//! `ledger_clog/` prefix allows full rebuild after reopening or jumping
//! the backend. Entries are strictly ascending; commit order guarantees
//! callers only ever append at or above the last height.

use std::collections::HashMap;

use basalt_primitives::RegisterId;
use parking_lot::RwLock;

/// Per-register write-height index, guarded by a reader/writer lock.
///
/// View reads take the lock in read mode; delta inserts take it in write
/// mode. The emulator's exclusive facade lock already serializes writers,
/// so the inner write lock only guards against concurrent readers.
#[derive(Debug, Default)]
pub struct Changelog {
    registers: RwLock<HashMap<RegisterId, Vec<u64>>>,
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent write height at or below `height`, if any.
    ///
    /// Binary search over the ascending changelist.
    pub fn most_recent_change(&self, id: &RegisterId, height: u64) -> Option<u64> {
        let registers = self.registers.read();
        let changelist = registers.get(id)?;
        let idx = changelist.partition_point(|&h| h <= height);
        if idx == 0 {
            None
        } else {
            Some(changelist[idx - 1])
        }
    }

    /// Record a write to `id` at `height`.
    ///
    /// Appending the current tail height again is a no-op, so replaying a
    /// delta is harmless.
    pub fn add_change(&self, id: &RegisterId, height: u64) {
        let mut registers = self.registers.write();
        let changelist = registers.entry(id.clone()).or_default();
        if changelist.last() != Some(&height) {
            debug_assert!(changelist.last().map_or(true, |&last| last < height));
            changelist.push(height);
        }
    }

    /// Replace the changelist for `id` (used by the rebuild scan).
    pub fn set_changelist(&self, id: RegisterId, changelist: Vec<u64>) {
        self.registers.write().insert(id, changelist);
    }

    /// A copy of the changelist for `id`, for persisting.
    pub fn changelist(&self, id: &RegisterId) -> Vec<u64> {
        self.registers.read().get(id).cloned().unwrap_or_default()
    }

    /// Drop every entry (precedes a rebuild).
    pub fn clear(&self) {
        self.registers.write().clear();
    }

    /// Number of registers with at least one recorded write.
    pub fn len(&self) -> usize {
        self.registers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(name: &str) -> RegisterId {
        RegisterId::new(name.as_bytes().to_vec(), b"".to_vec(), b"k".to_vec())
    }

    #[test]
    fn test_most_recent_change_binary_search() {
        let clog = Changelog::new();
        for h in [1u64, 4, 9] {
            clog.add_change(&reg("a"), h);
        }

        assert_eq!(clog.most_recent_change(&reg("a"), 0), None);
        assert_eq!(clog.most_recent_change(&reg("a"), 1), Some(1));
        assert_eq!(clog.most_recent_change(&reg("a"), 3), Some(1));
        assert_eq!(clog.most_recent_change(&reg("a"), 4), Some(4));
        assert_eq!(clog.most_recent_change(&reg("a"), 100), Some(9));
        assert_eq!(clog.most_recent_change(&reg("b"), 100), None);
    }

    #[test]
    fn test_add_change_is_idempotent_at_tail() {
        let clog = Changelog::new();
        clog.add_change(&reg("a"), 2);
        clog.add_change(&reg("a"), 2);
        assert_eq!(clog.changelist(&reg("a")), vec![2]);
    }

    #[test]
    fn test_set_changelist_and_clear() {
        let clog = Changelog::new();
        clog.set_changelist(reg("a"), vec![1, 2, 3]);
        assert_eq!(clog.len(), 1);
        assert_eq!(clog.most_recent_change(&reg("a"), 2), Some(2));

        clog.clear();
        assert!(clog.is_empty());
        assert_eq!(clog.most_recent_change(&reg("a"), 2), None);
    }
}
