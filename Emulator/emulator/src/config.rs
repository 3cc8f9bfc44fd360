//! Emulator configuration.

use basalt_primitives::{ChainId, Ufix64};
use basalt_storage::Store;

use crate::service_key::ServiceKey;

/// Default genesis token supply: 1,000,000,000.0.
const DEFAULT_GENESIS_TOKEN_SUPPLY_RAW: u64 = 100_000_000_000_000_000;
/// Default minimum storage reservation: 0.0001.
const DEFAULT_MINIMUM_STORAGE_RESERVATION_RAW: u64 = 10_000;
/// Default storage purchased per token unit: 100.0 MB.
const DEFAULT_STORAGE_MB_PER_UNIT_RAW: u64 = 10_000_000_000;
/// Default cap on per-transaction gas limits.
const DEFAULT_TRANSACTION_MAX_GAS_LIMIT: u64 = 9999;
/// Default gas limit for script evaluation.
const DEFAULT_SCRIPT_GAS_LIMIT: u64 = 100_000;

/// Configuration for an emulated blockchain.
///
/// Construct with `Default` and refine with the `with_*` methods.
pub struct EmulatorConfig {
    /// Service account key; the deterministic default key when `None`.
    pub service_key: Option<ServiceKey>,
    /// Storage backend; a fresh in-memory store when `None`.
    pub store: Option<Box<dyn Store>>,
    /// Use sequential addresses starting at 0x01.
    pub simple_addresses: bool,
    pub genesis_token_supply: Ufix64,
    /// Ceiling on the gas limit any transaction may declare.
    pub transaction_max_gas_limit: u64,
    /// Gas limit applied to script evaluation.
    pub script_gas_limit: u64,
    /// Transaction expiry measured in blocks; 0 disables expiry and
    /// makes the reference block id optional.
    pub transaction_expiry: u32,
    pub storage_limit_enabled: bool,
    pub transaction_fees_enabled: bool,
    pub minimum_storage_reservation: Ufix64,
    pub storage_mb_per_unit: Ufix64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            service_key: None,
            store: None,
            simple_addresses: false,
            genesis_token_supply: Ufix64::from_raw(DEFAULT_GENESIS_TOKEN_SUPPLY_RAW),
            transaction_max_gas_limit: DEFAULT_TRANSACTION_MAX_GAS_LIMIT,
            script_gas_limit: DEFAULT_SCRIPT_GAS_LIMIT,
            transaction_expiry: 0,
            storage_limit_enabled: true,
            transaction_fees_enabled: false,
            minimum_storage_reservation: Ufix64::from_raw(
                DEFAULT_MINIMUM_STORAGE_RESERVATION_RAW,
            ),
            storage_mb_per_unit: Ufix64::from_raw(DEFAULT_STORAGE_MB_PER_UNIT_RAW),
        }
    }
}

impl EmulatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain this configuration selects.
    pub fn chain_id(&self) -> ChainId {
        if self.simple_addresses {
            ChainId::MonotonicEmulator
        } else {
            ChainId::Emulator
        }
    }

    pub fn with_service_key(mut self, service_key: ServiceKey) -> Self {
        self.service_key = Some(service_key);
        self
    }

    pub fn with_store(mut self, store: Box<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_simple_addresses(mut self) -> Self {
        self.simple_addresses = true;
        self
    }

    pub fn with_genesis_token_supply(mut self, supply: Ufix64) -> Self {
        self.genesis_token_supply = supply;
        self
    }

    /// Individual transactions are still bounded by the limit they
    /// declare; this caps what they may declare.
    pub fn with_transaction_max_gas_limit(mut self, maximum: u64) -> Self {
        self.transaction_max_gas_limit = maximum;
        self
    }

    /// Scripts do not declare their own limit; this sets it.
    pub fn with_script_gas_limit(mut self, limit: u64) -> Self {
        self.script_gas_limit = limit;
        self
    }

    pub fn with_transaction_expiry(mut self, expiry: u32) -> Self {
        self.transaction_expiry = expiry;
        self
    }

    pub fn with_storage_limit_enabled(mut self, enabled: bool) -> Self {
        self.storage_limit_enabled = enabled;
        self
    }

    pub fn with_transaction_fees_enabled(mut self, enabled: bool) -> Self {
        self.transaction_fees_enabled = enabled;
        self
    }

    pub fn with_minimum_storage_reservation(mut self, reservation: Ufix64) -> Self {
        self.minimum_storage_reservation = reservation;
        self
    }

    pub fn with_storage_mb_per_unit(mut self, storage_mb: Ufix64) -> Self {
        self.storage_mb_per_unit = storage_mb;
        self
    }
}

impl std::fmt::Debug for EmulatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatorConfig")
            .field("chain", &self.chain_id())
            .field("has_store", &self.store.is_some())
            .field("genesis_token_supply", &self.genesis_token_supply)
            .field("transaction_max_gas_limit", &self.transaction_max_gas_limit)
            .field("script_gas_limit", &self.script_gas_limit)
            .field("transaction_expiry", &self.transaction_expiry)
            .finish_non_exhaustive()
    }
}
