//! The blockchain facade.
//!
//! `Blockchain` orchestrates storage, the pending-block pipeline, the
//! virtual machine, and the validator behind a coarse-grained API. One
//! reader/writer lock guards the mutable state (storage handle, pending
//! block, cached service key): every mutating operation — including
//! commit and snapshot jumps — runs under the exclusive lock, while
//! queries share the read lock. The VM, its base context, and the
//! validator are immutable and live outside the lock.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tracing::{debug, info};

use basalt_primitives::crypto::hash_sha256;
use basalt_primitives::event::ACCOUNT_CREATED_EVENT;
use basalt_primitives::result::ERROR_CODE_INVALID_PROPOSAL_SIGNATURE;
use basalt_primitives::types::{address_to_hex, id_to_hex};
use basalt_primitives::{
    Address, Block, ChainId, Collection, Event, Identifier, ProposalKey, Transaction,
    TransactionResult, Ufix64,
};
use basalt_storage::{MemStore, Store, StoreError};
use basalt_vmapi::account::{encode_account_keys, encode_contracts};
use basalt_vmapi::mock::CREATE_ACCOUNT_SCRIPT;
use basalt_vmapi::{
    Account, AccountKey, BootstrapProcedure, Contract, MockVm, Procedure, ProgramsCache,
    VirtualMachine, VmContext, VmError,
};

use crate::config::EmulatorConfig;
use crate::diagnostics::{debug_signature_error, TransactionResultDebug};
use crate::errors::EmulatorError;
use crate::pending_block::PendingBlock;
use crate::results::{ExecutedTransaction, ScriptResult, TransactionResultQuery};
use crate::service_key::ServiceKey;
use crate::validator::{TransactionValidator, ValidationOptions};

/// Mutable emulator state, guarded by the facade lock.
struct State {
    storage: Box<dyn Store>,
    pending_block: PendingBlock,
    service_key: ServiceKey,
}

/// An emulated blockchain.
pub struct Blockchain {
    state: RwLock<State>,
    vm: Arc<dyn VirtualMachine>,
    vm_ctx: VmContext,
    validator: TransactionValidator,
    chain: ChainId,
    transaction_max_gas_limit: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

impl Blockchain {
    /// Build an emulator from configuration, with the reference VM.
    pub fn new(config: EmulatorConfig) -> Result<Self, EmulatorError> {
        let chain = config.chain_id();
        Self::new_with_vm(config, Arc::new(MockVm::new(chain)))
    }

    /// Build an emulator driving the given virtual machine.
    ///
    /// When storage is empty, the genesis ledger is bootstrapped and the
    /// genesis block committed before the first pending block is opened.
    pub fn new_with_vm(
        config: EmulatorConfig,
        vm: Arc<dyn VirtualMachine>,
    ) -> Result<Self, EmulatorError> {
        let chain = config.chain_id();

        let mut service_key = match config.service_key {
            Some(key) => key,
            None => ServiceKey::default_key()?,
        };
        service_key.address = chain.service_address();

        let storage: Box<dyn Store> = match config.store {
            Some(store) => store,
            None => Box::new(MemStore::new()),
        };

        let mut vm_ctx = VmContext::new(chain);
        vm_ctx.script_gas_limit = config.script_gas_limit;
        vm_ctx.storage_limit_enabled = config.storage_limit_enabled;
        vm_ctx.transaction_fees_enabled = config.transaction_fees_enabled;
        vm_ctx.minimum_storage_reservation = config.minimum_storage_reservation;
        vm_ctx.storage_mb_per_unit = config.storage_mb_per_unit;

        let latest_block = match storage.latest_block() {
            Ok(block) => block,
            Err(StoreError::NotFound) => bootstrap_ledger(
                &*storage,
                &*vm,
                &vm_ctx,
                &service_key,
                config.genesis_token_supply,
                chain,
            )?,
            Err(err) => return Err(err.into()),
        };

        let view = storage.ledger_view_at(latest_block.header.height)?;
        let pending_block = PendingBlock::new(&latest_block, view, now_ms());
        let validator = TransactionValidator::new(ValidationOptions::new(
            config.transaction_max_gas_limit,
            config.transaction_expiry,
        ));

        Ok(Self {
            state: RwLock::new(State {
                storage,
                pending_block,
                service_key,
            }),
            vm,
            vm_ctx,
            validator,
            chain,
            transaction_max_gas_limit: config.transaction_max_gas_limit,
        })
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain
    }

    /// The service key with its sequence number refreshed from the
    /// service account's first key; the cached copy when the account
    /// cannot be read.
    pub fn service_key(&self) -> ServiceKey {
        let mut state = self.state.write();
        let address = state.service_key.address;
        if let Ok(Some(account)) = self.account_at_latest(&*state.storage, &address) {
            if let Some(key) = account.keys.first() {
                state.service_key.key_index = key.index;
                state.service_key.sequence_number = key.sequence_number;
                state.service_key.weight = key.weight;
            }
        }
        state.service_key.clone()
    }

    // ── Pending block introspection ──

    pub fn pending_block_id(&self) -> Identifier {
        self.state.read().pending_block.id()
    }

    pub fn pending_block_view(&self) -> u64 {
        self.state.read().pending_block.view_number()
    }

    pub fn pending_block_timestamp_ms(&self) -> u64 {
        self.state.read().pending_block.timestamp_ms()
    }

    // ── Queries ──

    pub fn get_latest_block(&self) -> Result<Block, EmulatorError> {
        let state = self.state.read();
        Ok(state.storage.latest_block()?)
    }

    pub fn get_block_by_id(&self, id: &Identifier) -> Result<Block, EmulatorError> {
        let state = self.state.read();
        match state.storage.block_by_id(id) {
            Ok(block) => Ok(block),
            Err(StoreError::NotFound) => Err(EmulatorError::BlockNotFoundById(id_to_hex(id))),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_block_by_height(&self, height: u64) -> Result<Block, EmulatorError> {
        let state = self.state.read();
        block_by_height(&*state.storage, height)
    }

    pub fn get_collection(&self, id: &Identifier) -> Result<Collection, EmulatorError> {
        let state = self.state.read();
        match state.storage.collection_by_id(id) {
            Ok(collection) => Ok(collection),
            Err(StoreError::NotFound) => Err(EmulatorError::CollectionNotFound(id_to_hex(id))),
            Err(err) => Err(err.into()),
        }
    }

    /// Look a transaction up in the pending block first, then in
    /// committed storage.
    pub fn get_transaction(&self, id: &Identifier) -> Result<Transaction, EmulatorError> {
        let state = self.state.read();
        if let Some(transaction) = state.pending_block.get_transaction(id) {
            return Ok(transaction.clone());
        }
        match state.storage.transaction_by_id(id) {
            Ok(transaction) => Ok(transaction),
            Err(StoreError::NotFound) => {
                Err(EmulatorError::TransactionNotFound(id_to_hex(id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// `Pending` while the transaction sits in the pending block,
    /// `Unknown` when the emulator has never seen it, `Sealed` with the
    /// stored outcome (and optional signature diagnosis) once committed.
    pub fn get_transaction_result(
        &self,
        id: &Identifier,
    ) -> Result<TransactionResultQuery, EmulatorError> {
        let state = self.state.read();
        if state.pending_block.contains_transaction(id) {
            return Ok(TransactionResultQuery::pending());
        }
        let result = match state.storage.transaction_result_by_id(id) {
            Ok(result) => result,
            Err(StoreError::NotFound) => return Ok(TransactionResultQuery::unknown()),
            Err(err) => return Err(err.into()),
        };
        let debug = if result.error_code == ERROR_CODE_INVALID_PROPOSAL_SIGNATURE {
            match state.storage.transaction_by_id(id) {
                Ok(transaction) => {
                    self.diagnose_signature(&*state.storage, &result, &transaction)
                }
                Err(_) => None,
            }
        } else {
            None
        };
        Ok(TransactionResultQuery::sealed(result, debug))
    }

    pub fn get_account(&self, address: &Address) -> Result<Account, EmulatorError> {
        let state = self.state.read();
        self.account_at_latest(&*state.storage, address)?
            .ok_or_else(|| EmulatorError::AccountNotFound(address_to_hex(address)))
    }

    pub fn get_account_at_block(
        &self,
        address: &Address,
        height: u64,
    ) -> Result<Account, EmulatorError> {
        let state = self.state.read();
        let view = state.storage.ledger_view_at(height)?;
        let mut programs = ProgramsCache::new();
        self.vm
            .get_account(&self.vm_ctx, address, &view, &mut programs)?
            .ok_or_else(|| EmulatorError::AccountNotFound(address_to_hex(address)))
    }

    /// Events in the block at `height`, optionally filtered by exact
    /// type (empty filter matches everything).
    pub fn get_events_by_height(
        &self,
        height: u64,
        event_type: &str,
    ) -> Result<Vec<Event>, EmulatorError> {
        let state = self.state.read();
        Ok(state.storage.events_by_height(height, event_type)?)
    }

    // ── Mutations ──

    /// Validate a transaction and append it to the pending block.
    pub fn add_transaction(&self, transaction: Transaction) -> Result<(), EmulatorError> {
        let mut state = self.state.write();
        self.add_transaction_locked(&mut state, transaction)
    }

    /// Execute every remaining transaction in the pending block.
    ///
    /// An empty pending block needs no execution and yields no results.
    pub fn execute_block(&self) -> Result<Vec<ExecutedTransaction>, EmulatorError> {
        let mut state = self.state.write();
        self.execute_block_locked(&mut state)
    }

    /// Execute the next pending transaction.
    pub fn execute_next_transaction(&self) -> Result<ExecutedTransaction, EmulatorError> {
        let mut state = self.state.write();
        self.execute_next_locked(&mut state)
    }

    /// Seal the pending block, persist it, and open a fresh pending
    /// block anchored on it.
    pub fn commit_block(&self) -> Result<Block, EmulatorError> {
        let mut state = self.state.write();
        self.commit_block_locked(&mut state)
    }

    /// `execute_block` followed by `commit_block` under one lock hold.
    pub fn execute_and_commit_block(
        &self,
    ) -> Result<(Block, Vec<ExecutedTransaction>), EmulatorError> {
        let mut state = self.state.write();
        let executed = self.execute_block_locked(&mut state)?;
        let block = self.commit_block_locked(&mut state)?;
        Ok((block, executed))
    }

    /// Drop the pending block, replacing it with a fresh one anchored on
    /// the latest committed block.
    pub fn reset_pending_block(&self) -> Result<(), EmulatorError> {
        let mut state = self.state.write();
        self.reset_pending_locked(&mut state)
    }

    /// Switch storage to the named snapshot (creating it from the
    /// current state when new) and re-anchor the pending block.
    pub fn jump_to_snapshot(&self, name: &str) -> Result<(), EmulatorError> {
        let mut state = self.state.write();
        state.storage.jump_to(name)?;
        self.reset_pending_locked(&mut state)?;
        info!(snapshot = name, "switched emulator state");
        Ok(())
    }

    // ── Scripts ──

    /// Evaluate a read-only script against the latest committed state.
    pub fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptResult, EmulatorError> {
        let state = self.state.read();
        let latest = state.storage.latest_block()?;
        self.execute_script_with(&*state.storage, script, arguments, latest.header.height)
    }

    /// Evaluate a read-only script against the state at `height`.
    pub fn execute_script_at_block(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
        height: u64,
    ) -> Result<ScriptResult, EmulatorError> {
        let state = self.state.read();
        self.execute_script_with(&*state.storage, script, arguments, height)
    }

    // ── Account creation ──

    /// Submit, execute, and commit the templated account-creation
    /// transaction, paid and signed by the service account. Returns the
    /// created address, extracted from the account-created event.
    pub fn create_account(
        &self,
        public_keys: &[AccountKey],
        contracts: &[Contract],
    ) -> Result<Address, EmulatorError> {
        let mut state = self.state.write();

        let service_address = state.service_key.address;
        if let Some(account) = self.account_at_latest(&*state.storage, &service_address)? {
            if let Some(key) = account.keys.first() {
                state.service_key.sequence_number = key.sequence_number;
            }
        }
        let service_key = state.service_key.clone();
        let latest = state.storage.latest_block()?;

        let mut transaction = Transaction::new(CREATE_ACCOUNT_SCRIPT.to_vec());
        transaction.arguments = vec![
            encode_account_keys(public_keys),
            encode_contracts(contracts),
        ];
        transaction.reference_block_id = latest.id();
        transaction.gas_limit = self.transaction_max_gas_limit;
        transaction.proposal_key = ProposalKey {
            address: service_address,
            key_index: service_key.key_index,
            sequence_number: service_key.sequence_number,
        };
        transaction.payer = service_address;
        transaction.authorizers = vec![service_address];
        if !service_key.sign_envelope(&mut transaction) {
            return Err(EmulatorError::AccountCreationFailed(
                "service key has no signing half".into(),
            ));
        }

        self.add_transaction_locked(&mut state, transaction)?;
        let executed = self.execute_block_locked(&mut state)?;
        self.commit_block_locked(&mut state)?;

        let last = executed.last().ok_or_else(|| {
            EmulatorError::AccountCreationFailed("no transaction executed".into())
        })?;
        if !last.result.is_success() {
            return Err(EmulatorError::AccountCreationFailed(
                last.result.error_message.clone(),
            ));
        }

        for event in &last.result.events {
            if event.event_type == ACCOUNT_CREATED_EVENT {
                if let Ok(address) = <Address>::try_from(event.payload.as_slice()) {
                    return Ok(address);
                }
            }
        }
        Err(EmulatorError::AccountCreationFailed(
            "account-created event not found".into(),
        ))
    }

    // ── Locked helpers ──

    fn add_transaction_locked(
        &self,
        state: &mut State,
        transaction: Transaction,
    ) -> Result<(), EmulatorError> {
        let id = transaction.id();

        // Once the pending block has begun execution, no more
        // transactions may be appended.
        if state.pending_block.execution_started() {
            return Err(EmulatorError::PendingBlockMidExecution(id_to_hex(
                &state.pending_block.id(),
            )));
        }
        if state.pending_block.contains_transaction(&id) {
            return Err(EmulatorError::DuplicateTransaction(id_to_hex(&id)));
        }
        match state.storage.transaction_by_id(&id) {
            Ok(_) => return Err(EmulatorError::DuplicateTransaction(id_to_hex(&id))),
            Err(StoreError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        self.validator.validate(&transaction, &*state.storage)?;
        state.pending_block.add_transaction(transaction);
        Ok(())
    }

    fn execute_block_locked(
        &self,
        state: &mut State,
    ) -> Result<Vec<ExecutedTransaction>, EmulatorError> {
        let mut executed = Vec::new();
        if state.pending_block.is_empty() {
            return Ok(executed);
        }
        if state.pending_block.execution_complete() {
            return Err(EmulatorError::PendingBlockTransactionsExhausted(id_to_hex(
                &state.pending_block.id(),
            )));
        }
        while !state.pending_block.execution_complete() {
            executed.push(self.execute_next_locked(state)?);
        }
        Ok(executed)
    }

    fn execute_next_locked(
        &self,
        state: &mut State,
    ) -> Result<ExecutedTransaction, EmulatorError> {
        let Some(transaction) = state.pending_block.next_transaction().cloned() else {
            return Err(EmulatorError::PendingBlockTransactionsExhausted(id_to_hex(
                &state.pending_block.id(),
            )));
        };

        let ctx = self.vm_ctx.with_block_header(state.pending_block.header().clone());
        let vm = Arc::clone(&self.vm);
        let mut programs = ProgramsCache::new();

        let result: TransactionResult =
            state
                .pending_block
                .execute_next_transaction(|view, tx_index, tx| {
                    let mut procedure = Procedure::transaction(tx.clone(), tx_index);
                    vm.run(&ctx, &mut procedure, view, &mut programs)?;
                    match procedure {
                        Procedure::Transaction(proc) => Ok(proc),
                        _ => Err(VmError::Internal(
                            "virtual machine returned a non-transaction procedure".into(),
                        )),
                    }
                })?;

        let debug = if result.error_code == ERROR_CODE_INVALID_PROPOSAL_SIGNATURE {
            self.diagnose_signature(&*state.storage, &result, &transaction)
        } else {
            None
        };

        Ok(ExecutedTransaction {
            tx_id: transaction.id(),
            result,
            debug,
        })
    }

    fn commit_block_locked(&self, state: &mut State) -> Result<Block, EmulatorError> {
        let pending = &state.pending_block;
        let block_id_hex = id_to_hex(&pending.id());

        // An untouched, non-empty pending block must execute first; a
        // partially-executed one must finish.
        if !pending.execution_started() && !pending.is_empty() {
            return Err(EmulatorError::PendingBlockCommitBeforeExecution(block_id_hex));
        }
        if pending.execution_started() && !pending.execution_complete() {
            return Err(EmulatorError::PendingBlockMidExecution(block_id_hex));
        }

        let block = pending.build();
        let collections = if pending.is_empty() {
            Vec::new()
        } else {
            vec![pending.collection()]
        };
        let transactions = pending.transactions().to_vec();
        let results = pending.results().to_vec();
        let delta = pending.ledger_delta().clone();
        let events = pending.events().to_vec();

        state
            .storage
            .commit_block(&block, &collections, &transactions, &results, &delta, &events)?;

        debug!(
            block_id = %id_to_hex(&block.id()),
            height = block.header.height,
            transactions = transactions.len(),
            "sealed pending block"
        );

        let view = state.storage.ledger_view_at(block.header.height)?;
        state.pending_block = PendingBlock::new(&block, view, now_ms());
        Ok(block)
    }

    fn reset_pending_locked(&self, state: &mut State) -> Result<(), EmulatorError> {
        let latest = state.storage.latest_block()?;
        let view = state.storage.ledger_view_at(latest.header.height)?;
        state.pending_block = PendingBlock::new(&latest, view, now_ms());
        Ok(())
    }

    fn execute_script_with(
        &self,
        storage: &dyn Store,
        script: &[u8],
        arguments: &[Vec<u8>],
        height: u64,
    ) -> Result<ScriptResult, EmulatorError> {
        let block = block_by_height(storage, height)?;
        let mut view = storage.ledger_view_at(height)?;
        let ctx = self.vm_ctx.with_block_header(block.header.clone());

        let mut procedure = Procedure::script(script.to_vec(), arguments.to_vec());
        let mut programs = ProgramsCache::new();
        self.vm.run(&ctx, &mut procedure, &mut view, &mut programs)?;

        let Procedure::Script(proc) = procedure else {
            return Err(VmError::Internal(
                "virtual machine returned a non-script procedure".into(),
            )
            .into());
        };
        Ok(ScriptResult {
            script_id: hash_sha256(script),
            value: proc.value,
            error_code: proc.error_code,
            error_message: proc.error_message,
            logs: proc.logs,
            events: proc.events,
        })
    }

    fn account_at_latest(
        &self,
        storage: &dyn Store,
        address: &Address,
    ) -> Result<Option<Account>, EmulatorError> {
        let latest = storage.latest_block()?;
        let view = storage.ledger_view_at(latest.header.height)?;
        let mut programs = ProgramsCache::new();
        Ok(self
            .vm
            .get_account(&self.vm_ctx, address, &view, &mut programs)?)
    }

    /// Probe a signature failure for the wrong-hash-algorithm case,
    /// looking keys up in committed state. Lookup failures just skip the
    /// diagnosis.
    fn diagnose_signature(
        &self,
        storage: &dyn Store,
        result: &TransactionResult,
        transaction: &Transaction,
    ) -> Option<TransactionResultDebug> {
        let latest = storage.latest_block().ok()?;
        let view = storage.ledger_view_at(latest.header.height).ok()?;
        let mut programs = ProgramsCache::new();
        debug_signature_error(result, transaction, |address, key_index| {
            self.vm
                .get_account(&self.vm_ctx, address, &view, &mut programs)
                .ok()
                .flatten()
                .and_then(|account| account.keys.into_iter().find(|k| k.index == key_index))
        })
    }
}

fn block_by_height(storage: &dyn Store, height: u64) -> Result<Block, EmulatorError> {
    match storage.block_by_height(height) {
        Ok(block) => Ok(block),
        Err(StoreError::NotFound) => Err(EmulatorError::BlockNotFoundByHeight(height)),
        Err(err) => Err(err.into()),
    }
}

/// Seed a fresh ledger: run the bootstrap procedure at height 0 and
/// commit its delta with the genesis block.
fn bootstrap_ledger(
    storage: &dyn Store,
    vm: &dyn VirtualMachine,
    ctx: &VmContext,
    service_key: &ServiceKey,
    genesis_token_supply: Ufix64,
    chain: ChainId,
) -> Result<Block, EmulatorError> {
    let mut view = storage.ledger_view_at(0)?;
    let mut procedure = Procedure::Bootstrap(BootstrapProcedure::new(
        service_key.account_key(),
        genesis_token_supply,
    ));
    let mut programs = ProgramsCache::new();
    vm.run(ctx, &mut procedure, &mut view, &mut programs)?;
    let delta = view.collapse();

    let genesis = Block::genesis(chain);
    storage.commit_block(&genesis, &[], &[], &[], &delta, &[])?;
    Ok(genesis)
}
