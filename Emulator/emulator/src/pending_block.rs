//! The pending block: the single in-flight, mutable block being
//! assembled.
//!
//! Lifecycle: transactions are appended while the block is open; once
//! execution starts no further transactions may be added; once every
//! transaction has run the block is complete and can be committed. The
//! facade enforces those transitions — this type exposes the predicates
//! and keeps the bookkeeping consistent.
//!
//! The wall-clock timestamp is captured once at construction and is the
//! only wall-clock input to ledger state.

use std::collections::HashSet;

use basalt_primitives::{
    Block, BlockHeader, Collection, CollectionGuarantee, Delta, Event, Identifier, Transaction,
    TransactionResult,
};
use basalt_storage::LedgerView;
use basalt_vmapi::{TransactionProcedure, VmError};

/// The block currently being assembled, plus the ledger view its
/// transactions execute against.
pub struct PendingBlock {
    header: BlockHeader,
    view: LedgerView,
    transactions: Vec<Transaction>,
    transaction_ids: HashSet<Identifier>,
    results: Vec<TransactionResult>,
    events: Vec<Event>,
    delta: Delta,
    /// Index of the next transaction to execute.
    index: usize,
}

impl PendingBlock {
    /// A new empty pending block anchored on `parent`.
    pub fn new(parent: &Block, view: LedgerView, timestamp_ms: u64) -> Self {
        Self {
            header: BlockHeader {
                height: parent.header.height + 1,
                parent_id: parent.id(),
                timestamp_ms,
                view: parent.header.view + 1,
            },
            view,
            transactions: Vec::new(),
            transaction_ids: HashSet::new(),
            results: Vec::new(),
            events: Vec::new(),
            delta: Delta::new(),
            index: 0,
        }
    }

    /// The id the block will seal under.
    pub fn id(&self) -> Identifier {
        self.header.id()
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn view_number(&self) -> u64 {
        self.header.view
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.header.timestamp_ms
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn size(&self) -> usize {
        self.transactions.len()
    }

    pub fn contains_transaction(&self, id: &Identifier) -> bool {
        self.transaction_ids.contains(id)
    }

    pub fn get_transaction(&self, id: &Identifier) -> Option<&Transaction> {
        if !self.transaction_ids.contains(id) {
            return None;
        }
        self.transactions.iter().find(|tx| tx.id() == *id)
    }

    /// Append a transaction. The facade has already rejected duplicates
    /// and mid-execution additions.
    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transaction_ids.insert(transaction.id());
        self.transactions.push(transaction);
    }

    /// The transaction the next execution step will run, if any remain.
    pub fn next_transaction(&self) -> Option<&Transaction> {
        self.transactions.get(self.index)
    }

    /// True once any transaction has executed.
    pub fn execution_started(&self) -> bool {
        self.index > 0
    }

    /// True once every appended transaction has executed.
    pub fn execution_complete(&self) -> bool {
        self.index >= self.transactions.len()
    }

    /// Execute the next transaction through `execute`.
    ///
    /// The callback runs the VM over this block's view. On success the
    /// view's transaction overlay is collapsed into the block delta, the
    /// result and its events are recorded (stamped with this
    /// transaction's block position), and the execution index advances.
    /// A fatal VM error propagates without advancing, leaving the block
    /// in its current state for the facade to reset.
    pub fn execute_next_transaction<F>(
        &mut self,
        execute: F,
    ) -> Result<TransactionResult, VmError>
    where
        F: FnOnce(&mut LedgerView, u32, &Transaction) -> Result<TransactionProcedure, VmError>,
    {
        let tx_index = self.index as u32;
        let transaction = self.transactions[self.index].clone();

        let procedure = execute(&mut self.view, tx_index, &transaction)?;

        let sub_delta = self.view.collapse();
        self.delta.merge(sub_delta);

        let mut result = procedure.to_result();
        for (event_index, event) in result.events.iter_mut().enumerate() {
            event.tx_index = tx_index;
            event.event_index = event_index as u32;
        }
        self.events.extend(result.events.iter().cloned());
        self.results.push(result.clone());
        self.index += 1;
        Ok(result)
    }

    /// The single collection grouping this block's transactions.
    pub fn collection(&self) -> Collection {
        Collection::new(self.transactions.iter().map(Transaction::id).collect())
    }

    /// Seal the header and collections into a block.
    pub fn build(&self) -> Block {
        let collection_guarantees = if self.transactions.is_empty() {
            Vec::new()
        } else {
            vec![CollectionGuarantee {
                collection_id: self.collection().id(),
            }]
        };
        Block {
            header: self.header.clone(),
            collection_guarantees,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn results(&self) -> &[TransactionResult] {
        &self.results
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn ledger_delta(&self) -> &Delta {
        &self.delta
    }
}

impl std::fmt::Debug for PendingBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingBlock")
            .field("height", &self.header.height)
            .field("transactions", &self.transactions.len())
            .field("executed", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_primitives::{ChainId, RegisterId};
    use basalt_storage::{RegisterRead, StoreError};
    use basalt_vmapi::TransactionProcedure;
    use std::sync::Arc;

    struct EmptyBase;

    impl RegisterRead for EmptyBase {
        fn get_register(&self, _id: &RegisterId) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }
    }

    fn pending() -> PendingBlock {
        let genesis = Block::genesis(ChainId::Emulator);
        PendingBlock::new(&genesis, LedgerView::new(Arc::new(EmptyBase)), 1_000)
    }

    fn tx(tag: &str) -> Transaction {
        Transaction::new(format!("log {tag}").into_bytes())
    }

    #[test]
    fn test_new_block_anchors_on_parent() {
        let genesis = Block::genesis(ChainId::Emulator);
        let block = pending();
        assert_eq!(block.height(), 1);
        assert_eq!(block.header().parent_id, genesis.id());
        assert_eq!(block.view_number(), 1);
        assert_eq!(block.timestamp_ms(), 1_000);
        assert!(block.is_empty());
        assert!(!block.execution_started());
        assert!(block.execution_complete());
    }

    #[test]
    fn test_add_and_contains() {
        let mut block = pending();
        let t = tx("a");
        block.add_transaction(t.clone());
        assert!(block.contains_transaction(&t.id()));
        assert_eq!(block.get_transaction(&t.id()), Some(&t));
        assert!(!block.contains_transaction(&tx("b").id()));
        assert_eq!(block.size(), 1);
    }

    #[test]
    fn test_execute_collects_results_in_order() {
        let mut block = pending();
        block.add_transaction(tx("a"));
        block.add_transaction(tx("b"));
        assert!(!block.execution_complete());

        for expected_index in 0..2u32 {
            let result = block
                .execute_next_transaction(|view, tx_index, transaction| {
                    assert_eq!(tx_index, expected_index);
                    view.set(
                        RegisterId::new(b"o".to_vec(), vec![], transaction.script.clone()),
                        b"1".to_vec(),
                    );
                    let mut proc = TransactionProcedure::new(transaction.clone(), tx_index);
                    proc.events.push(basalt_primitives::Event::new("t.E", vec![]));
                    Ok(proc)
                })
                .unwrap();
            assert!(result.is_success());
        }

        assert!(block.execution_started());
        assert!(block.execution_complete());
        assert_eq!(block.results().len(), 2);
        assert_eq!(block.ledger_delta().len(), 2);

        // Events got stamped with their block positions.
        let stamps: Vec<(u32, u32)> = block
            .events()
            .iter()
            .map(|e| (e.tx_index, e.event_index))
            .collect();
        assert_eq!(stamps, vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_fatal_error_leaves_index_unchanged() {
        let mut block = pending();
        block.add_transaction(tx("a"));

        let err = block
            .execute_next_transaction(|_, _, _| Err(VmError::Internal("engine exploded".into())))
            .unwrap_err();
        assert!(matches!(err, VmError::Internal(_)));
        assert!(!block.execution_started());
        assert!(block.results().is_empty());
    }

    #[test]
    fn test_build_empty_block_has_no_guarantees() {
        let block = pending();
        let built = block.build();
        assert!(built.collection_guarantees.is_empty());
        assert_eq!(built.header.height, 1);
    }

    #[test]
    fn test_build_groups_transactions_into_one_collection() {
        let mut block = pending();
        let (a, b) = (tx("a"), tx("b"));
        block.add_transaction(a.clone());
        block.add_transaction(b.clone());

        let collection = block.collection();
        assert_eq!(collection.transaction_ids, vec![a.id(), b.id()]);

        let built = block.build();
        assert_eq!(built.collection_guarantees.len(), 1);
        assert_eq!(built.collection_guarantees[0].collection_id, collection.id());
    }
}
