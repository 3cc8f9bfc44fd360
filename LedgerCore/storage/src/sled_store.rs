//! Persistent store backed by sled.
//!
//! A single keyspace holds every entity under the schema prefixes of
//! [`crate::keys`]. Block commits land in one `sled::Batch`, so a commit
//! is all-or-nothing; after the batch applies, the snapshot manager
//! captures a checkpoint describing the block. The in-memory changelog
//! is rebuilt from the `ledger_clog/` prefix at open and after every
//! jump, so a restored snapshot is immediately consistent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use basalt_primitives::codec;
use basalt_primitives::types::id_to_hex;
use basalt_primitives::{
    Block, Collection, Delta, Event, Identifier, RegisterId, Transaction, TransactionResult,
};
use tracing::debug;

use crate::changelog::Changelog;
use crate::error::StoreError;
use crate::keys;
use crate::ledger::{LedgerView, RegisterRead};
use crate::snapshot::SnapshotManager;
use crate::store::Store;

/// Embedded persistent storage with branchable snapshots.
pub struct SledStore {
    db: Option<sled::Db>,
    path: PathBuf,
    changelog: Arc<Changelog>,
    snapshots: SnapshotManager,
}

impl SledStore {
    /// Open (or create) a store at the given directory.
    ///
    /// Rebuilds the changelog from disk and captures a session-start
    /// checkpoint.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)?;
        db.flush()?;
        let snapshots = SnapshotManager::open(&path)?;

        let store = Self {
            db: Some(db),
            path,
            changelog: Arc::new(Changelog::new()),
            snapshots,
        };
        store.rebuild_changelog()?;
        store.flush_and_checkpoint("emulator session started")?;
        Ok(store)
    }

    fn db(&self) -> Result<&sled::Db, StoreError> {
        self.db.as_ref().ok_or(StoreError::Closed)
    }

    /// Point read returning an owned copy; missing keys surface as the
    /// `NotFound` sentinel.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.db()?.get(key)? {
            Some(value) => Ok(value.to_vec()),
            None => Err(StoreError::NotFound),
        }
    }

    fn latest_height(&self) -> Result<u64, StoreError> {
        decode_be_height(&self.get(keys::latest_block_key())?)
    }

    /// Queue the block writes: block by height, id index, and the
    /// latest-height pointer when this height is at or above it.
    fn store_block_writes(
        &self,
        batch: &mut sled::Batch,
        block: &Block,
    ) -> Result<(), StoreError> {
        let height = block.header.height;
        batch.insert(keys::block_key(height), codec::encode_block(block));
        batch.insert(
            keys::block_id_index_key(&block.id()),
            height.to_be_bytes().to_vec(),
        );

        let is_latest = match self.latest_height() {
            Ok(latest) => height >= latest,
            Err(StoreError::NotFound) => true,
            Err(err) => return Err(err),
        };
        if is_latest {
            batch.insert(keys::latest_block_key().to_vec(), height.to_be_bytes().to_vec());
        }
        Ok(())
    }

    /// Queue a block delta: value writes plus updated changelists. The
    /// in-memory changelog is extended as the batch is built; deletions
    /// claim a changelog entry with no value write.
    fn ledger_delta_writes(&self, batch: &mut sled::Batch, height: u64, delta: &Delta) {
        for (id, value) in delta.updates() {
            if let Some(value) = value {
                batch.insert(keys::ledger_value_key(id, height), value.clone());
            }
            self.changelog.add_change(id, height);
            batch.insert(
                keys::ledger_changelog_key(id),
                codec::encode_changelist(&self.changelog.changelist(id)),
            );
        }
    }

    fn event_writes(&self, batch: &mut sled::Batch, height: u64, events: &[Event]) {
        for event in events {
            batch.insert(
                keys::event_key(height, event.tx_index, event.event_index, &event.event_type),
                codec::encode_event(event),
            );
        }
    }

    fn rebuild_changelog(&self) -> Result<(), StoreError> {
        self.changelog.clear();
        for item in self.db()?.scan_prefix(keys::ledger_changelog_prefix()) {
            let (key, value) = item?;
            let id = keys::register_id_from_changelog_key(&key)?;
            let changelist = codec::decode_changelist(&value)?;
            self.changelog.set_changelist(id, changelist);
        }
        Ok(())
    }

    fn flush_and_checkpoint(&self, message: &str) -> Result<(), StoreError> {
        self.db()?.flush()?;
        self.snapshots.checkpoint(message)?;
        Ok(())
    }
}

impl Store for SledStore {
    fn latest_block(&self) -> Result<Block, StoreError> {
        self.block_by_height(self.latest_height()?)
    }

    fn block_by_id(&self, id: &Identifier) -> Result<Block, StoreError> {
        let height = decode_be_height(&self.get(&keys::block_id_index_key(id))?)?;
        self.block_by_height(height)
    }

    fn block_by_height(&self, height: u64) -> Result<Block, StoreError> {
        Ok(codec::decode_block(&self.get(&keys::block_key(height))?)?)
    }

    fn store_block(&self, block: &Block) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        self.store_block_writes(&mut batch, block)?;
        self.db()?.apply_batch(batch)?;
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
        match self.get(&keys::block_key(block.header.height)) {
            Ok(_) => return Err(StoreError::BlockAlreadyExists(block.header.height)),
            Err(StoreError::NotFound) => {}
            Err(err) => return Err(err),
        }

        let mut batch = sled::Batch::default();
        self.store_block_writes(&mut batch, block)?;
        for collection in collections {
            batch.insert(
                keys::collection_key(&collection.id()),
                codec::encode_collection(collection),
            );
        }
        for (transaction, result) in transactions.iter().zip(results) {
            let id = transaction.id();
            batch.insert(keys::transaction_key(&id), codec::encode_transaction(transaction));
            batch.insert(
                keys::transaction_result_key(&id),
                codec::encode_transaction_result(result),
            );
        }
        self.ledger_delta_writes(&mut batch, block.header.height, delta);
        self.event_writes(&mut batch, block.header.height, events);

        self.db()?.apply_batch(batch)?;
        debug!(
            block_id = %id_to_hex(&block.id()),
            height = block.header.height,
            transactions = transactions.len(),
            "committed block"
        );

        self.flush_and_checkpoint(&commit_message(block, transactions, results))
    }

    fn collection_by_id(&self, id: &Identifier) -> Result<Collection, StoreError> {
        Ok(codec::decode_collection(&self.get(&keys::collection_key(id))?)?)
    }

    fn insert_collection(&self, collection: &Collection) -> Result<(), StoreError> {
        self.db()?.insert(
            keys::collection_key(&collection.id()),
            codec::encode_collection(collection),
        )?;
        Ok(())
    }

    fn transaction_by_id(&self, id: &Identifier) -> Result<Transaction, StoreError> {
        Ok(codec::decode_transaction(&self.get(&keys::transaction_key(id))?)?)
    }

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        self.db()?.insert(
            keys::transaction_key(&transaction.id()),
            codec::encode_transaction(transaction),
        )?;
        Ok(())
    }

    fn transaction_result_by_id(
        &self,
        id: &Identifier,
    ) -> Result<TransactionResult, StoreError> {
        Ok(codec::decode_transaction_result(
            &self.get(&keys::transaction_result_key(id))?,
        )?)
    }

    fn insert_transaction_result(
        &self,
        id: &Identifier,
        result: &TransactionResult,
    ) -> Result<(), StoreError> {
        self.db()?.insert(
            keys::transaction_result_key(id),
            codec::encode_transaction_result(result),
        )?;
        Ok(())
    }

    fn ledger_view_at(&self, height: u64) -> Result<LedgerView, StoreError> {
        let reader = SledRegisterReader {
            db: self.db()?.clone(),
            changelog: Arc::clone(&self.changelog),
            height,
        };
        Ok(LedgerView::new(Arc::new(reader)))
    }

    fn insert_ledger_delta(&self, height: u64, delta: &Delta) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        self.ledger_delta_writes(&mut batch, height, delta);
        self.db()?.apply_batch(batch)?;
        Ok(())
    }

    fn events_by_height(
        &self,
        height: u64,
        event_type: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let mut events = Vec::new();
        for item in self.db()?.scan_prefix(keys::event_key_block_prefix(height)) {
            let (key, value) = item?;
            if !event_type.is_empty() && !keys::event_key_has_type(&key, event_type.as_bytes())
            {
                continue;
            }
            events.push(codec::decode_event(&value)?);
        }
        Ok(events)
    }

    fn insert_events(&self, height: u64, events: &[Event]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        self.event_writes(&mut batch, height, events);
        self.db()?.apply_batch(batch)?;
        Ok(())
    }

    fn sync(&self) -> Result<(), StoreError> {
        self.db()?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let result = match self.db.take() {
            Some(db) => {
                let flushed = db.flush().map(|_| ()).map_err(StoreError::from);
                drop(db);
                flushed.and_then(|()| {
                    self.snapshots
                        .checkpoint("emulator session ended")
                        .map(|_| ())
                })
            }
            None => Ok(()),
        };
        self.snapshots.release();
        result
    }

    fn supports_snapshots(&self) -> bool {
        true
    }

    fn checkpoint(&self, message: &str) -> Result<(), StoreError> {
        self.flush_and_checkpoint(message)
    }

    fn jump_to(&mut self, name: &str) -> Result<(), StoreError> {
        let db = self.db.take().ok_or(StoreError::Closed)?;
        db.flush()?;
        drop(db);

        let jump_result = self.snapshots.jump(name);

        // Reopen and rebuild even when the jump failed, so the store
        // stays usable at whatever state the files are in.
        self.db = Some(sled::open(&self.path)?);
        self.rebuild_changelog()?;
        jump_result
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("path", &self.path)
            .field("open", &self.db.is_some())
            .field("tracked_registers", &self.changelog.len())
            .finish_non_exhaustive()
    }
}

/// Committed-state reader bound to one height.
struct SledRegisterReader {
    db: sled::Db,
    changelog: Arc<Changelog>,
    height: u64,
}

impl RegisterRead for SledRegisterReader {
    fn get_register(&self, id: &RegisterId) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(written_at) = self.changelog.most_recent_change(id, self.height) else {
            return Ok(None);
        };
        // No value at the changelog height means the register was cleared
        // there.
        match self.db.get(keys::ledger_value_key(id, written_at))? {
            Some(value) => Ok(Some(value.to_vec())),
            None => Ok(None),
        }
    }
}

fn decode_be_height(raw: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = raw
        .try_into()
        .map_err(|_| StoreError::Codec(basalt_primitives::CodecError::UnexpectedEnd))?;
    Ok(u64::from_be_bytes(bytes))
}

/// The human-readable checkpoint message describing a committed block.
fn commit_message(
    block: &Block,
    transactions: &[Transaction],
    results: &[TransactionResult],
) -> String {
    use std::fmt::Write;

    let mut message = format!("committed block {}\n", id_to_hex(&block.id()));
    for (transaction, result) in transactions.iter().zip(results) {
        let _ = writeln!(message, "transaction {}", id_to_hex(&transaction.id()));
        let _ = writeln!(message, "  arguments ({}):", transaction.arguments.len());
        for (index, argument) in transaction.arguments.iter().enumerate() {
            let _ = writeln!(message, "    - {index}: {}", String::from_utf8_lossy(argument));
        }
        let _ = writeln!(
            message,
            "  script:\n{}",
            String::from_utf8_lossy(&transaction.script)
        );
        let _ = writeln!(
            message,
            "  result: [{}] {}",
            result.error_code, result.error_message
        );
        let _ = writeln!(message, "  logs ({}):", result.logs.len());
        for log in &result.logs {
            let _ = writeln!(message, "    + {log}");
        }
        let _ = writeln!(message, "  events ({}):", result.events.len());
        for event in &result.events {
            let _ = writeln!(message, "    + {} - {}", event.event_index, event.event_type);
        }
    }
    message
}
