//! Procedures: the units of work a virtual machine runs.
//!
//! A procedure is either a transaction (writes through the view, produces
//! a result), a script (read-only, produces a return value), or the
//! bootstrap that seeds the genesis state. The VM fills in the output
//! fields; a non-zero error code is an execution-level failure carried on
//! the procedure, never a call-level error.

use basalt_primitives::{Event, Transaction, TransactionResult, Ufix64};

use crate::account::AccountKey;

/// A transaction being executed at a position within a block.
#[derive(Debug, Clone)]
pub struct TransactionProcedure {
    pub transaction: Transaction,
    pub tx_index: u32,

    // Outputs, filled by the VM.
    pub logs: Vec<String>,
    pub events: Vec<Event>,
    pub error_code: u16,
    pub error_message: String,
    pub computation_used: u64,
}

impl TransactionProcedure {
    pub fn new(transaction: Transaction, tx_index: u32) -> Self {
        Self {
            transaction,
            tx_index,
            logs: Vec::new(),
            events: Vec::new(),
            error_code: 0,
            error_message: String::new(),
            computation_used: 0,
        }
    }

    /// The storable result of this execution.
    pub fn to_result(&self) -> TransactionResult {
        TransactionResult {
            error_code: self.error_code,
            error_message: self.error_message.clone(),
            logs: self.logs.clone(),
            events: self.events.clone(),
            computation_used: self.computation_used,
        }
    }
}

/// A read-only script evaluated against a ledger view.
#[derive(Debug, Clone)]
pub struct ScriptProcedure {
    pub script: Vec<u8>,
    pub arguments: Vec<Vec<u8>>,

    // Outputs, filled by the VM.
    pub logs: Vec<String>,
    pub events: Vec<Event>,
    pub value: Option<Vec<u8>>,
    pub error_code: u16,
    pub error_message: String,
    pub computation_used: u64,
}

impl ScriptProcedure {
    pub fn new(script: Vec<u8>, arguments: Vec<Vec<u8>>) -> Self {
        Self {
            script,
            arguments,
            logs: Vec::new(),
            events: Vec::new(),
            value: None,
            error_code: 0,
            error_message: String::new(),
            computation_used: 0,
        }
    }
}

/// The genesis bootstrap: seeds the service account and token supply.
///
/// Inputs and outputs are fixed; the emulator treats this as a black box
/// produced by [`BootstrapProcedure::new`].
#[derive(Debug, Clone)]
pub struct BootstrapProcedure {
    pub service_key: AccountKey,
    pub initial_token_supply: Ufix64,

    // Outputs, filled by the VM.
    pub events: Vec<Event>,
}

impl BootstrapProcedure {
    pub fn new(service_key: AccountKey, initial_token_supply: Ufix64) -> Self {
        Self {
            service_key,
            initial_token_supply,
            events: Vec::new(),
        }
    }
}

/// The unit of work handed to [`crate::VirtualMachine::run`].
#[derive(Debug, Clone)]
pub enum Procedure {
    Transaction(TransactionProcedure),
    Script(ScriptProcedure),
    Bootstrap(BootstrapProcedure),
}

impl Procedure {
    pub fn transaction(transaction: Transaction, tx_index: u32) -> Self {
        Self::Transaction(TransactionProcedure::new(transaction, tx_index))
    }

    pub fn script(script: Vec<u8>, arguments: Vec<Vec<u8>>) -> Self {
        Self::Script(ScriptProcedure::new(script, arguments))
    }
}
