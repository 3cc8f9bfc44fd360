//! `MockVm` — the deterministic reference virtual machine.
//!
//! Interprets a line-oriented script language against the ledger view:
//!
//! ```text
//! set <owner> <key> <value...>     write a register
//! del <owner> <key>                delete a register
//! get <owner> <key>                read a register; the last read is the
//!                                  script return value
//! emit <type> <payload...>         emit an event
//! log <message...>                 append a log line
//! fail <code> <message...>         abort with an execution error
//! create_account                   allocate an account from the
//!                                  procedure's encoded arguments
//! ```
//!
//! `<owner>` is a hex account address or the literal `global` for the
//! unowned register space. Accounts are plain register groups (existence
//! flag, balance, keys, contracts), so everything the VM does is visible
//! to the versioned store. Each interpreted operation costs one
//! computation unit.
//!
//! Transactions with envelope signatures get their proposal signature
//! verified against the proposer's stored key; a mismatch produces the
//! invalid-proposal-signature error code that the emulator's diagnostic
//! probe looks for. Successful or failed, a signed transaction bumps the
//! proposer's sequence number.

use std::sync::Arc;

use basalt_primitives::crypto::{verify_message, TRANSACTION_DOMAIN_TAG};
use basalt_primitives::event::ACCOUNT_CREATED_EVENT;
use basalt_primitives::result::ERROR_CODE_INVALID_PROPOSAL_SIGNATURE;
use basalt_primitives::types::{u32_from_le_bytes, u64_from_le_bytes};
use basalt_primitives::{Address, ChainId, Event, RegisterId, Transaction};
use basalt_storage::LedgerView;

use crate::account::{
    decode_account_key, decode_account_keys, decode_contracts, encode_account_key, Account,
    AccountKey,
};
use crate::context::VmContext;
use crate::error::VmError;
use crate::procedure::{BootstrapProcedure, Procedure, ScriptProcedure, TransactionProcedure};
use crate::programs::ProgramsCache;
use crate::vm::VirtualMachine;

/// Script used by the account-creation transaction template.
pub const CREATE_ACCOUNT_SCRIPT: &[u8] = b"create_account";

/// Execution error: malformed script or unknown operation.
pub const ERROR_CODE_PARSE: u16 = 100;
/// Execution error: malformed operand or argument.
pub const ERROR_CODE_INVALID_ARGUMENT: u16 = 101;
/// Execution error: a script attempted to mutate ledger state.
pub const ERROR_CODE_READ_ONLY_VIOLATION: u16 = 102;

const EXISTS_KEY: &str = "exists";
const BALANCE_KEY: &str = "balance";
const KEY_COUNT_KEY: &str = "key_count";
const CONTRACT_NAMES_KEY: &str = "contract_names";
const ACCOUNT_COUNTER_KEY: &str = "account_counter";

fn account_register(address: &Address, key: impl Into<String>) -> RegisterId {
    RegisterId::new(address.to_vec(), Vec::new(), key.into().into_bytes())
}

fn global_register(key: &str) -> RegisterId {
    RegisterId::new(Vec::new(), Vec::new(), key.as_bytes().to_vec())
}

fn public_key_register(address: &Address, index: u32) -> RegisterId {
    account_register(address, format!("public_key_{index}"))
}

fn contract_register(address: &Address, name: &str) -> RegisterId {
    account_register(address, format!("code.{name}"))
}

fn encode_name_list(names: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(names.len() as u32).to_le_bytes());
    for name in names {
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
    }
    buf
}

fn decode_name_list(data: &[u8]) -> Option<Vec<String>> {
    let count = u32_from_le_bytes(data)?;
    let mut pos = 4usize;
    let mut names = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = u32_from_le_bytes(data.get(pos..)?)? as usize;
        pos += 4;
        let name = String::from_utf8(data.get(pos..pos + len)?.to_vec()).ok()?;
        pos += len;
        names.push(name);
    }
    Some(names)
}

/// Deterministic reference implementation of [`VirtualMachine`].
#[derive(Debug, Clone)]
pub struct MockVm {
    chain: ChainId,
}

impl MockVm {
    pub fn new(chain: ChainId) -> Self {
        Self { chain }
    }

    fn parsed_lines(
        &self,
        script: &[u8],
        programs: &mut ProgramsCache,
    ) -> Result<Arc<Vec<String>>, (u16, String)> {
        let key = ProgramsCache::key_for(script);
        if let Some(lines) = programs.get(&key) {
            return Ok(lines);
        }
        let text = std::str::from_utf8(script)
            .map_err(|_| (ERROR_CODE_PARSE, "script is not valid UTF-8".to_string()))?;
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        let lines = Arc::new(lines);
        programs.insert(key, Arc::clone(&lines));
        Ok(lines)
    }

    fn read_account_key(
        &self,
        view: &LedgerView,
        address: &Address,
        index: u32,
    ) -> Result<Option<AccountKey>, VmError> {
        let Some(raw) = view.get(&public_key_register(address, index))? else {
            return Ok(None);
        };
        let key = decode_account_key(index, &raw)
            .map_err(|e| VmError::Internal(format!("corrupt account key register: {e}")))?;
        Ok(Some(key))
    }

    /// Verify the envelope signature matching the proposal key. Returns a
    /// description of the failure, or `None` when the signature checks
    /// out.
    fn check_proposal_signature(
        &self,
        transaction: &Transaction,
        view: &LedgerView,
    ) -> Result<Option<String>, VmError> {
        let proposal = &transaction.proposal_key;
        let Some(signature) = transaction
            .envelope_signatures
            .iter()
            .find(|sig| sig.address == proposal.address && sig.key_index == proposal.key_index)
        else {
            return Ok(Some(
                "invalid proposal signature: no envelope signature from the proposal key"
                    .to_string(),
            ));
        };

        let Some(key) = self.read_account_key(view, &proposal.address, proposal.key_index)?
        else {
            return Ok(Some(
                "invalid proposal signature: proposal key does not exist".to_string(),
            ));
        };

        let message = transaction.envelope_message();
        if verify_message(
            &key.public_key,
            key.hash_algo,
            TRANSACTION_DOMAIN_TAG,
            &message,
            &signature.signature,
        ) {
            Ok(None)
        } else {
            Ok(Some("invalid proposal signature".to_string()))
        }
    }

    /// Bump the proposer's stored sequence number. Returns the register
    /// write so it can be re-applied when a failed transaction reverts.
    fn bump_sequence_number(
        &self,
        view: &mut LedgerView,
        address: &Address,
        index: u32,
    ) -> Result<Option<(RegisterId, Vec<u8>)>, VmError> {
        let Some(mut key) = self.read_account_key(view, address, index)? else {
            return Ok(None);
        };
        key.sequence_number += 1;
        let register = public_key_register(address, index);
        let encoded = encode_account_key(&key);
        view.set(register.clone(), encoded.clone());
        Ok(Some((register, encoded)))
    }

    fn run_transaction(
        &self,
        ctx: &VmContext,
        proc: &mut TransactionProcedure,
        view: &mut LedgerView,
        programs: &mut ProgramsCache,
    ) -> Result<(), VmError> {
        let transaction = proc.transaction.clone();

        let lines = match self.parsed_lines(&transaction.script, programs) {
            Ok(lines) => lines,
            Err((code, message)) => {
                proc.error_code = code;
                proc.error_message = message;
                return Ok(());
            }
        };

        if !transaction.envelope_signatures.is_empty() {
            if let Some(message) = self.check_proposal_signature(&transaction, view)? {
                proc.error_code = ERROR_CODE_INVALID_PROPOSAL_SIGNATURE;
                proc.error_message = message;
                return Ok(());
            }
        }

        let sequence_write = self.bump_sequence_number(
            view,
            &transaction.proposal_key.address,
            transaction.proposal_key.key_index,
        )?;

        let mut interp = Interpreter {
            chain: self.chain,
            view: &mut *view,
            arguments: &transaction.arguments,
            tx_index: proc.tx_index,
            read_only: false,
            logging_enabled: ctx.logging_enabled,
            logs: Vec::new(),
            events: Vec::new(),
            computation: 0,
            last_read: None,
            error: None,
        };
        interp.run(&lines)?;

        proc.logs = interp.logs;
        proc.computation_used = interp.computation;
        match interp.error {
            Some((code, message)) => {
                proc.error_code = code;
                proc.error_message = message;
                // A failed transaction keeps no writes and emits no
                // events, but still consumes its sequence number.
                view.discard_pending();
                if let Some((register, encoded)) = sequence_write {
                    view.set(register, encoded);
                }
            }
            None => {
                proc.events = interp.events;
            }
        }
        Ok(())
    }

    fn run_script(
        &self,
        ctx: &VmContext,
        proc: &mut ScriptProcedure,
        view: &mut LedgerView,
        programs: &mut ProgramsCache,
    ) -> Result<(), VmError> {
        let lines = match self.parsed_lines(&proc.script, programs) {
            Ok(lines) => lines,
            Err((code, message)) => {
                proc.error_code = code;
                proc.error_message = message;
                return Ok(());
            }
        };

        let mut interp = Interpreter {
            chain: self.chain,
            view: &mut *view,
            arguments: &proc.arguments,
            tx_index: 0,
            read_only: true,
            logging_enabled: ctx.logging_enabled,
            logs: Vec::new(),
            events: Vec::new(),
            computation: 0,
            last_read: None,
            error: None,
        };
        interp.run(&lines)?;

        proc.logs = interp.logs;
        proc.computation_used = interp.computation;
        match interp.error {
            Some((code, message)) => {
                proc.error_code = code;
                proc.error_message = message;
            }
            None => {
                proc.value = interp.last_read;
                proc.events = interp.events;
            }
        }
        Ok(())
    }

    fn run_bootstrap(
        &self,
        _ctx: &VmContext,
        proc: &mut BootstrapProcedure,
        view: &mut LedgerView,
    ) -> Result<(), VmError> {
        let address = self.chain.service_address();

        view.set(global_register(ACCOUNT_COUNTER_KEY), 1u64.to_le_bytes().to_vec());
        view.set(account_register(&address, EXISTS_KEY), vec![1]);
        view.set(
            account_register(&address, BALANCE_KEY),
            proc.initial_token_supply.raw().to_le_bytes().to_vec(),
        );
        view.set(
            account_register(&address, KEY_COUNT_KEY),
            1u32.to_le_bytes().to_vec(),
        );
        let service_key = AccountKey {
            index: 0,
            ..proc.service_key.clone()
        };
        view.set(
            public_key_register(&address, 0),
            encode_account_key(&service_key),
        );

        proc.events.push(Event {
            tx_index: 0,
            event_index: 0,
            event_type: ACCOUNT_CREATED_EVENT.to_string(),
            payload: address.to_vec(),
        });
        Ok(())
    }
}

impl VirtualMachine for MockVm {
    fn run(
        &self,
        ctx: &VmContext,
        procedure: &mut Procedure,
        view: &mut LedgerView,
        programs: &mut ProgramsCache,
    ) -> Result<(), VmError> {
        match procedure {
            Procedure::Transaction(proc) => self.run_transaction(ctx, proc, view, programs),
            Procedure::Script(proc) => self.run_script(ctx, proc, view, programs),
            Procedure::Bootstrap(proc) => self.run_bootstrap(ctx, proc, view),
        }
    }

    fn get_account(
        &self,
        _ctx: &VmContext,
        address: &Address,
        view: &LedgerView,
        _programs: &mut ProgramsCache,
    ) -> Result<Option<Account>, VmError> {
        if view.get(&account_register(address, EXISTS_KEY))?.is_none() {
            return Ok(None);
        }

        let balance = view
            .get(&account_register(address, BALANCE_KEY))?
            .and_then(|raw| u64_from_le_bytes(&raw))
            .unwrap_or(0);

        let key_count = view
            .get(&account_register(address, KEY_COUNT_KEY))?
            .and_then(|raw| u32_from_le_bytes(&raw))
            .unwrap_or(0);
        let mut keys = Vec::with_capacity(key_count as usize);
        for index in 0..key_count {
            if let Some(key) = self.read_account_key(view, address, index)? {
                keys.push(key);
            }
        }

        let mut contracts = std::collections::BTreeMap::new();
        if let Some(raw) = view.get(&account_register(address, CONTRACT_NAMES_KEY))? {
            let names = decode_name_list(&raw).ok_or_else(|| {
                VmError::Internal("corrupt contract name register".to_string())
            })?;
            for name in names {
                if let Some(source) = view.get(&contract_register(address, &name))? {
                    contracts.insert(name, source);
                }
            }
        }

        Ok(Some(Account {
            address: *address,
            balance,
            keys,
            contracts,
        }))
    }
}

/// One execution of the script language over a view.
struct Interpreter<'a> {
    chain: ChainId,
    view: &'a mut LedgerView,
    arguments: &'a [Vec<u8>],
    tx_index: u32,
    read_only: bool,
    logging_enabled: bool,
    logs: Vec<String>,
    events: Vec<Event>,
    computation: u64,
    last_read: Option<Vec<u8>>,
    error: Option<(u16, String)>,
}

impl Interpreter<'_> {
    fn run(&mut self, lines: &[String]) -> Result<(), VmError> {
        for line in lines {
            self.computation += 1;
            if self.step(line)? {
                break;
            }
        }
        Ok(())
    }

    /// Execute one line; returns true when execution must stop.
    fn step(&mut self, line: &str) -> Result<bool, VmError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let op = tokens[0];
        match op {
            "log" => {
                if self.logging_enabled {
                    self.logs.push(tokens[1..].join(" "));
                }
            }
            "set" => {
                if self.deny_write() {
                    return Ok(true);
                }
                let Some((owner, key)) = self.operand_pair(&tokens) else {
                    return Ok(true);
                };
                let value = tokens[3..].join(" ").into_bytes();
                self.view.set(RegisterId::new(owner, Vec::new(), key), value);
            }
            "del" => {
                if self.deny_write() {
                    return Ok(true);
                }
                let Some((owner, key)) = self.operand_pair(&tokens) else {
                    return Ok(true);
                };
                self.view.delete(RegisterId::new(owner, Vec::new(), key));
            }
            "get" => {
                let Some((owner, key)) = self.operand_pair(&tokens) else {
                    return Ok(true);
                };
                let value = self.view.get(&RegisterId::new(owner, Vec::new(), key))?;
                if self.logging_enabled {
                    let rendered = value
                        .as_deref()
                        .map(|v| String::from_utf8_lossy(v).into_owned())
                        .unwrap_or_else(|| "nil".to_string());
                    self.logs.push(format!("{} => {rendered}", tokens[2]));
                }
                self.last_read = value;
            }
            "emit" => {
                if tokens.len() < 2 {
                    self.error = Some((
                        ERROR_CODE_INVALID_ARGUMENT,
                        "emit requires an event type".to_string(),
                    ));
                    return Ok(true);
                }
                self.events.push(Event {
                    tx_index: self.tx_index,
                    event_index: self.events.len() as u32,
                    event_type: tokens[1].to_string(),
                    payload: tokens[2..].join(" ").into_bytes(),
                });
            }
            "fail" => {
                let code = tokens
                    .get(1)
                    .and_then(|t| t.parse::<u16>().ok())
                    .unwrap_or(ERROR_CODE_INVALID_ARGUMENT);
                let message = if tokens.len() > 2 {
                    tokens[2..].join(" ")
                } else {
                    "execution failed".to_string()
                };
                self.error = Some((code, message));
                return Ok(true);
            }
            "create_account" => {
                if self.deny_write() {
                    return Ok(true);
                }
                self.create_account()?;
                if self.error.is_some() {
                    return Ok(true);
                }
            }
            other => {
                self.error = Some((
                    ERROR_CODE_PARSE,
                    format!("unknown operation: {other}"),
                ));
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn deny_write(&mut self) -> bool {
        if self.read_only {
            self.error = Some((
                ERROR_CODE_READ_ONLY_VIOLATION,
                "scripts may not mutate ledger state".to_string(),
            ));
            true
        } else {
            false
        }
    }

    /// Parse the `<owner> <key>` operands shared by set/del/get.
    fn operand_pair(&mut self, tokens: &[&str]) -> Option<(Vec<u8>, Vec<u8>)> {
        if tokens.len() < 3 {
            self.error = Some((
                ERROR_CODE_INVALID_ARGUMENT,
                format!("{} requires owner and key operands", tokens[0]),
            ));
            return None;
        }
        let owner = if tokens[1] == "global" {
            Vec::new()
        } else {
            let literal = tokens[1].strip_prefix("0x").unwrap_or(tokens[1]);
            match hex::decode(literal) {
                Ok(bytes) if bytes.len() == 8 => bytes,
                _ => {
                    self.error = Some((
                        ERROR_CODE_INVALID_ARGUMENT,
                        format!("invalid account address: {}", tokens[1]),
                    ));
                    return None;
                }
            }
        };
        Some((owner, tokens[2].as_bytes().to_vec()))
    }

    fn create_account(&mut self) -> Result<(), VmError> {
        let keys = match self.arguments.first() {
            Some(raw) => match decode_account_keys(raw) {
                Ok(keys) => keys,
                Err(e) => {
                    self.error = Some((
                        ERROR_CODE_INVALID_ARGUMENT,
                        format!("malformed account key argument: {e}"),
                    ));
                    return Ok(());
                }
            },
            None => Vec::new(),
        };
        let contracts = match self.arguments.get(1) {
            Some(raw) => match decode_contracts(raw) {
                Ok(contracts) => contracts,
                Err(e) => {
                    self.error = Some((
                        ERROR_CODE_INVALID_ARGUMENT,
                        format!("malformed contract argument: {e}"),
                    ));
                    return Ok(());
                }
            },
            None => Vec::new(),
        };

        let counter_register = global_register(ACCOUNT_COUNTER_KEY);
        let counter = self
            .view
            .get(&counter_register)?
            .and_then(|raw| u64_from_le_bytes(&raw))
            .unwrap_or(0);
        let next = counter + 1;
        let address = self.chain.address_at(next);
        self.view
            .set(counter_register, next.to_le_bytes().to_vec());

        self.view.set(account_register(&address, EXISTS_KEY), vec![1]);
        self.view.set(
            account_register(&address, BALANCE_KEY),
            0u64.to_le_bytes().to_vec(),
        );
        self.view.set(
            account_register(&address, KEY_COUNT_KEY),
            (keys.len() as u32).to_le_bytes().to_vec(),
        );
        for (index, key) in keys.iter().enumerate() {
            let stored = AccountKey {
                index: index as u32,
                sequence_number: 0,
                ..key.clone()
            };
            self.view.set(
                public_key_register(&address, index as u32),
                encode_account_key(&stored),
            );
        }

        if !contracts.is_empty() {
            let names: Vec<String> = contracts.iter().map(|c| c.name.clone()).collect();
            self.view.set(
                account_register(&address, CONTRACT_NAMES_KEY),
                encode_name_list(&names),
            );
            for contract in &contracts {
                self.view.set(
                    contract_register(&address, &contract.name),
                    contract.source.clone(),
                );
            }
        }

        self.events.push(Event {
            tx_index: self.tx_index,
            event_index: self.events.len() as u32,
            event_type: ACCOUNT_CREATED_EVENT.to_string(),
            payload: address.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_primitives::crypto::{generate_keypair, sign_message};
    use basalt_primitives::{HashAlgorithm, Ufix64};
    use basalt_storage::{RegisterRead, StoreError};

    struct EmptyBase;

    impl RegisterRead for EmptyBase {
        fn get_register(&self, _id: &RegisterId) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }
    }

    fn empty_view() -> LedgerView {
        LedgerView::new(Arc::new(EmptyBase))
    }

    fn vm() -> MockVm {
        MockVm::new(ChainId::MonotonicEmulator)
    }

    fn ctx() -> VmContext {
        VmContext::new(ChainId::MonotonicEmulator)
    }

    fn service_key(public_key: Vec<u8>) -> AccountKey {
        AccountKey {
            index: 0,
            public_key,
            hash_algo: HashAlgorithm::Sha3_256,
            weight: crate::account::KEY_WEIGHT_THRESHOLD,
            sequence_number: 0,
        }
    }

    fn bootstrapped_view(vm: &MockVm, public_key: Vec<u8>) -> LedgerView {
        let mut view = empty_view();
        let mut procedure = Procedure::Bootstrap(BootstrapProcedure::new(
            service_key(public_key),
            Ufix64::from_integer(1_000).unwrap(),
        ));
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();
        view.collapse();
        view
    }

    #[test]
    fn test_bootstrap_seeds_service_account() {
        let vm = vm();
        let view = bootstrapped_view(&vm, vec![0xee; 32]);

        let address = ChainId::MonotonicEmulator.service_address();
        let account = vm
            .get_account(&ctx(), &address, &view, &mut ProgramsCache::new())
            .unwrap()
            .expect("service account exists");
        assert_eq!(account.balance, Ufix64::from_integer(1_000).unwrap().raw());
        assert_eq!(account.keys.len(), 1);
        assert_eq!(account.keys[0].sequence_number, 0);
    }

    #[test]
    fn test_transaction_writes_and_events() {
        let vm = vm();
        let mut view = empty_view();

        let mut tx = Transaction::new(
            b"set 0000000000000005 balance 10\nemit basalt.Transfer ten\nlog done".to_vec(),
        );
        tx.gas_limit = 100;
        let mut procedure = Procedure::transaction(tx, 3);
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();

        let Procedure::Transaction(proc) = procedure else {
            unreachable!()
        };
        assert_eq!(proc.error_code, 0);
        assert_eq!(proc.logs, vec!["done"]);
        assert_eq!(proc.events.len(), 1);
        assert_eq!(proc.events[0].tx_index, 3);
        assert_eq!(proc.events[0].event_index, 0);
        assert_eq!(proc.computation_used, 3);

        let balance = RegisterId::new(
            vec![0, 0, 0, 0, 0, 0, 0, 5],
            Vec::new(),
            b"balance".to_vec(),
        );
        assert_eq!(view.get(&balance).unwrap(), Some(b"10".to_vec()));
    }

    #[test]
    fn test_failed_transaction_reverts_writes_and_events() {
        let vm = vm();
        let mut view = empty_view();

        let tx = Transaction::new(
            b"set 0000000000000005 balance 10\nemit basalt.Transfer ten\nfail 7 broken".to_vec(),
        );
        let mut procedure = Procedure::transaction(tx, 0);
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();

        let Procedure::Transaction(proc) = procedure else {
            unreachable!()
        };
        assert_eq!(proc.error_code, 7);
        assert_eq!(proc.error_message, "broken");
        assert!(proc.events.is_empty());
        assert!(!view.has_pending_writes());
    }

    #[test]
    fn test_unknown_operation_fails_parse() {
        let vm = vm();
        let mut view = empty_view();
        let mut procedure = Procedure::transaction(Transaction::new(b"frobnicate".to_vec()), 0);
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();

        let Procedure::Transaction(proc) = procedure else {
            unreachable!()
        };
        assert_eq!(proc.error_code, ERROR_CODE_PARSE);
        assert!(proc.error_message.contains("frobnicate"));
    }

    #[test]
    fn test_script_reads_and_returns_value() {
        let vm = vm();
        let mut view = empty_view();
        view.set(
            RegisterId::new(vec![0, 0, 0, 0, 0, 0, 0, 5], Vec::new(), b"balance".to_vec()),
            b"42".to_vec(),
        );
        view.collapse();

        let mut procedure =
            Procedure::script(b"get 0000000000000005 balance".to_vec(), Vec::new());
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();

        let Procedure::Script(proc) = procedure else {
            unreachable!()
        };
        assert_eq!(proc.error_code, 0);
        assert_eq!(proc.value, Some(b"42".to_vec()));
    }

    #[test]
    fn test_script_write_is_rejected() {
        let vm = vm();
        let mut view = empty_view();
        let mut procedure =
            Procedure::script(b"set 0000000000000005 balance 1".to_vec(), Vec::new());
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();

        let Procedure::Script(proc) = procedure else {
            unreachable!()
        };
        assert_eq!(proc.error_code, ERROR_CODE_READ_ONLY_VIOLATION);
        assert!(!view.has_pending_writes());
    }

    #[test]
    fn test_create_account_allocates_sequential_addresses() {
        let vm = vm();
        let mut view = bootstrapped_view(&vm, vec![0xee; 32]);

        for expected in [2u64, 3] {
            let mut procedure =
                Procedure::transaction(Transaction::new(CREATE_ACCOUNT_SCRIPT.to_vec()), 0);
            vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
                .unwrap();
            view.collapse();

            let Procedure::Transaction(proc) = procedure else {
                unreachable!()
            };
            assert_eq!(proc.error_code, 0);
            assert_eq!(proc.events.len(), 1);
            assert_eq!(proc.events[0].event_type, ACCOUNT_CREATED_EVENT);
            assert_eq!(
                proc.events[0].payload,
                ChainId::MonotonicEmulator.address_at(expected).to_vec()
            );
        }
    }

    #[test]
    fn test_wrong_hash_algorithm_fails_proposal_signature() {
        let (vk, sk) = generate_keypair();
        let vm = vm();
        let mut view = bootstrapped_view(&vm, vk.as_bytes().to_vec());
        let address = ChainId::MonotonicEmulator.service_address();

        // The stored key uses SHA3-256; sign with SHA2-256 instead.
        let mut tx = Transaction::new(b"log hello".to_vec());
        tx.proposal_key.address = address;
        tx.payer = address;
        let message = tx.envelope_message();
        let signature =
            sign_message(&sk, HashAlgorithm::Sha2_256, TRANSACTION_DOMAIN_TAG, &message);
        tx.envelope_signatures.push(basalt_primitives::TransactionSignature {
            address,
            key_index: 0,
            signature: signature.to_vec(),
        });

        let mut procedure = Procedure::transaction(tx, 0);
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();

        let Procedure::Transaction(proc) = procedure else {
            unreachable!()
        };
        assert_eq!(proc.error_code, ERROR_CODE_INVALID_PROPOSAL_SIGNATURE);
    }

    #[test]
    fn test_signed_transaction_bumps_sequence_number() {
        let (vk, sk) = generate_keypair();
        let vm = vm();
        let mut view = bootstrapped_view(&vm, vk.as_bytes().to_vec());
        let address = ChainId::MonotonicEmulator.service_address();

        let mut tx = Transaction::new(b"log hello".to_vec());
        tx.proposal_key.address = address;
        tx.payer = address;
        tx.sign_envelope(address, 0, &sk, HashAlgorithm::Sha3_256);

        let mut procedure = Procedure::transaction(tx, 0);
        vm.run(&ctx(), &mut procedure, &mut view, &mut ProgramsCache::new())
            .unwrap();
        view.collapse();

        let Procedure::Transaction(proc) = procedure else {
            unreachable!()
        };
        assert_eq!(proc.error_code, 0);

        let account = vm
            .get_account(&ctx(), &address, &view, &mut ProgramsCache::new())
            .unwrap()
            .unwrap();
        assert_eq!(account.keys[0].sequence_number, 1);
    }
}
