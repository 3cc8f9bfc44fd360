//! In-memory store, the default backend when no path is configured.
//!
//! Holds the same logical structures as the persistent store in plain
//! maps behind one reader/writer lock; `commit_block` is atomic by virtue
//! of holding the write guard for the whole commit. No snapshot support.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use basalt_primitives::{
    Block, Collection, Delta, Event, Identifier, RegisterId, Transaction, TransactionResult,
};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::ledger::{LedgerView, RegisterRead};
use crate::store::Store;

#[derive(Debug, Default)]
struct Inner {
    blocks: HashMap<u64, Block>,
    block_heights: HashMap<Identifier, u64>,
    latest_height: Option<u64>,
    collections: HashMap<Identifier, Collection>,
    transactions: HashMap<Identifier, Transaction>,
    results: HashMap<Identifier, TransactionResult>,
    /// Register → write height → value. A changelist entry with no value
    /// at that height means the register was cleared there.
    ledger_values: HashMap<RegisterId, BTreeMap<u64, Vec<u8>>>,
    changelists: HashMap<RegisterId, Vec<u64>>,
    /// Keyed by `(height, tx_index, event_index)` so iteration yields
    /// block order.
    events: BTreeMap<(u64, u32, u32), Event>,
}

impl Inner {
    fn store_block(&mut self, block: &Block) {
        let height = block.header.height;
        self.block_heights.insert(block.id(), height);
        self.blocks.insert(height, block.clone());
        if self.latest_height.map_or(true, |latest| height >= latest) {
            self.latest_height = Some(height);
        }
    }

    fn apply_delta(&mut self, height: u64, delta: &Delta) {
        for (id, value) in delta.updates() {
            if let Some(value) = value {
                self.ledger_values
                    .entry(id.clone())
                    .or_default()
                    .insert(height, value.clone());
            }
            let changelist = self.changelists.entry(id.clone()).or_default();
            if changelist.last() != Some(&height) {
                changelist.push(height);
            }
        }
    }

    fn insert_events(&mut self, height: u64, events: &[Event]) {
        for event in events {
            self.events
                .insert((height, event.tx_index, event.event_index), event.clone());
        }
    }
}

/// In-memory implementation of [`Store`].
#[derive(Debug, Default)]
pub struct MemStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn latest_block(&self) -> Result<Block, StoreError> {
        let inner = self.inner.read();
        let height = inner.latest_height.ok_or(StoreError::NotFound)?;
        inner.blocks.get(&height).cloned().ok_or(StoreError::NotFound)
    }

    fn block_by_id(&self, id: &Identifier) -> Result<Block, StoreError> {
        let inner = self.inner.read();
        let height = inner.block_heights.get(id).ok_or(StoreError::NotFound)?;
        inner.blocks.get(height).cloned().ok_or(StoreError::NotFound)
    }

    fn block_by_height(&self, height: u64) -> Result<Block, StoreError> {
        self.inner
            .read()
            .blocks
            .get(&height)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn store_block(&self, block: &Block) -> Result<(), StoreError> {
        self.inner.write().store_block(block);
        Ok(())
    }

    fn commit_block(
        &self,
        block: &Block,
        collections: &[Collection],
        transactions: &[Transaction],
        results: &[TransactionResult],
        delta: &Delta,
        events: &[Event],
    ) -> Result<(), StoreError> {
        if transactions.len() != results.len() {
            return Err(StoreError::ResultCountMismatch {
                transactions: transactions.len(),
                results: results.len(),
            });
        }

        let mut inner = self.inner.write();
        if inner.blocks.contains_key(&block.header.height) {
            return Err(StoreError::BlockAlreadyExists(block.header.height));
        }
        inner.store_block(block);
        for collection in collections {
            inner.collections.insert(collection.id(), collection.clone());
        }
        for (transaction, result) in transactions.iter().zip(results) {
            let id = transaction.id();
            inner.transactions.insert(id, transaction.clone());
            inner.results.insert(id, result.clone());
        }
        inner.apply_delta(block.header.height, delta);
        inner.insert_events(block.header.height, events);
        Ok(())
    }

    fn collection_by_id(&self, id: &Identifier) -> Result<Collection, StoreError> {
        self.inner
            .read()
            .collections
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn insert_collection(&self, collection: &Collection) -> Result<(), StoreError> {
        self.inner
            .write()
            .collections
            .insert(collection.id(), collection.clone());
        Ok(())
    }

    fn transaction_by_id(&self, id: &Identifier) -> Result<Transaction, StoreError> {
        self.inner
            .read()
            .transactions
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        self.inner
            .write()
            .transactions
            .insert(transaction.id(), transaction.clone());
        Ok(())
    }

    fn transaction_result_by_id(
        &self,
        id: &Identifier,
    ) -> Result<TransactionResult, StoreError> {
        self.inner
            .read()
            .results
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn insert_transaction_result(
        &self,
        id: &Identifier,
        result: &TransactionResult,
    ) -> Result<(), StoreError> {
        self.inner.write().results.insert(*id, result.clone());
        Ok(())
    }

    fn ledger_view_at(&self, height: u64) -> Result<LedgerView, StoreError> {
        let reader = MemRegisterReader {
            inner: Arc::clone(&self.inner),
            height,
        };
        Ok(LedgerView::new(Arc::new(reader)))
    }

    fn insert_ledger_delta(&self, height: u64, delta: &Delta) -> Result<(), StoreError> {
        self.inner.write().apply_delta(height, delta);
        Ok(())
    }

    fn events_by_height(
        &self,
        height: u64,
        event_type: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read();
        let events = inner
            .events
            .range((height, 0, 0)..=(height, u32::MAX, u32::MAX))
            .map(|(_, event)| event)
            .filter(|event| event_type.is_empty() || event.event_type == event_type)
            .cloned()
            .collect();
        Ok(events)
    }

    fn insert_events(&self, height: u64, events: &[Event]) -> Result<(), StoreError> {
        self.inner.write().insert_events(height, events);
        Ok(())
    }

    fn sync(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Committed-state reader bound to one height.
struct MemRegisterReader {
    inner: Arc<RwLock<Inner>>,
    height: u64,
}

impl RegisterRead for MemRegisterReader {
    fn get_register(&self, id: &RegisterId) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.read();
        let Some(changelist) = inner.changelists.get(id) else {
            return Ok(None);
        };
        let idx = changelist.partition_point(|&h| h <= self.height);
        if idx == 0 {
            return Ok(None);
        }
        let written_at = changelist[idx - 1];
        Ok(inner
            .ledger_values
            .get(id)
            .and_then(|values| values.get(&written_at))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_primitives::ChainId;

    fn reg(key: &str) -> RegisterId {
        RegisterId::new(b"acct".to_vec(), b"".to_vec(), key.as_bytes().to_vec())
    }

    #[test]
    fn test_empty_store_has_no_latest_block() {
        let store = MemStore::new();
        assert!(matches!(store.latest_block(), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_store_block_updates_latest_monotonically() {
        let store = MemStore::new();
        let genesis = Block::genesis(ChainId::Emulator);
        store.store_block(&genesis).unwrap();

        let mut later = genesis.clone();
        later.header.height = 5;
        store.store_block(&later).unwrap();
        assert_eq!(store.latest_block().unwrap().header.height, 5);

        // Storing an older block does not move the pointer back.
        let mut older = genesis.clone();
        older.header.height = 2;
        store.store_block(&older).unwrap();
        assert_eq!(store.latest_block().unwrap().header.height, 5);
    }

    #[test]
    fn test_ledger_versions_resolve_by_height() {
        let store = MemStore::new();

        let mut delta1 = Delta::new();
        delta1.set(reg("balance"), b"10".to_vec());
        store.insert_ledger_delta(1, &delta1).unwrap();

        let mut delta3 = Delta::new();
        delta3.set(reg("balance"), b"30".to_vec());
        store.insert_ledger_delta(3, &delta3).unwrap();

        let at = |h: u64| {
            store
                .ledger_view_at(h)
                .unwrap()
                .get(&reg("balance"))
                .unwrap()
        };
        assert_eq!(at(0), None);
        assert_eq!(at(1), Some(b"10".to_vec()));
        assert_eq!(at(2), Some(b"10".to_vec()));
        assert_eq!(at(3), Some(b"30".to_vec()));
        assert_eq!(at(9), Some(b"30".to_vec()));
    }

    #[test]
    fn test_deletion_reads_as_not_found_after_its_height() {
        let store = MemStore::new();

        let mut delta1 = Delta::new();
        delta1.set(reg("balance"), b"10".to_vec());
        store.insert_ledger_delta(1, &delta1).unwrap();

        let mut delta2 = Delta::new();
        delta2.delete(reg("balance"));
        store.insert_ledger_delta(2, &delta2).unwrap();

        let view1 = store.ledger_view_at(1).unwrap();
        let view2 = store.ledger_view_at(2).unwrap();
        assert_eq!(view1.get(&reg("balance")).unwrap(), Some(b"10".to_vec()));
        assert_eq!(view2.get(&reg("balance")).unwrap(), None);
    }

    #[test]
    fn test_commit_block_rejects_count_mismatch() {
        let store = MemStore::new();
        let block = Block::genesis(ChainId::Emulator);
        let tx = Transaction::new(b"log x".to_vec());

        let err = store
            .commit_block(&block, &[], &[tx], &[], &Delta::new(), &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::ResultCountMismatch { .. }));
    }

    #[test]
    fn test_second_commit_to_same_height_rejected() {
        let store = MemStore::new();
        let block = Block::genesis(ChainId::Emulator);
        store
            .commit_block(&block, &[], &[], &[], &Delta::new(), &[])
            .unwrap();

        let err = store
            .commit_block(&block, &[], &[], &[], &Delta::new(), &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::BlockAlreadyExists(0)));
    }

    #[test]
    fn test_events_by_height_orders_and_filters() {
        let store = MemStore::new();
        let mut e1 = Event::new("a.One", vec![]);
        e1.tx_index = 1;
        let mut e2 = Event::new("a.Two", vec![]);
        e2.tx_index = 0;
        let mut e3 = Event::new("a.One", vec![]);
        e3.tx_index = 0;
        e3.event_index = 1;
        store.insert_events(4, &[e1, e2, e3]).unwrap();

        let all = store.events_by_height(4, "").unwrap();
        let order: Vec<(u32, u32)> = all.iter().map(|e| (e.tx_index, e.event_index)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0)]);

        let ones = store.events_by_height(4, "a.One").unwrap();
        assert_eq!(ones.len(), 2);
        assert!(store.events_by_height(5, "").unwrap().is_empty());
    }
}
