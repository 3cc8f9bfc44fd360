//! Transaction validation ahead of the pending block.

use basalt_primitives::{codec, Transaction, ZERO_IDENTIFIER};
use basalt_primitives::types::id_to_hex;
use basalt_storage::{Store, StoreError};

use crate::errors::{EmulatorError, ValidationError};

/// Default cap on a transaction's canonical encoding.
const DEFAULT_MAX_TRANSACTION_SIZE: usize = 1_500_000;

/// Knobs for [`TransactionValidator`].
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Ceiling on declared gas limits.
    pub max_gas_limit: u64,
    /// Expiry window in blocks; 0 disables the check.
    pub expiry: u32,
    /// Whether a zero reference block id is acceptable.
    pub allow_empty_reference_block_id: bool,
    /// Ceiling on the canonical encoding size.
    pub max_transaction_size: usize,
}

impl ValidationOptions {
    pub fn new(max_gas_limit: u64, expiry: u32) -> Self {
        Self {
            max_gas_limit,
            expiry,
            allow_empty_reference_block_id: expiry == 0,
            max_transaction_size: DEFAULT_MAX_TRANSACTION_SIZE,
        }
    }
}

/// Stateless validator; block lookups go through the store handed in per
/// call, so the validator never holds a storage reference of its own.
#[derive(Debug, Clone)]
pub struct TransactionValidator {
    options: ValidationOptions,
}

impl TransactionValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn validate(
        &self,
        transaction: &Transaction,
        store: &dyn Store,
    ) -> Result<(), EmulatorError> {
        if transaction.script.is_empty() {
            return Err(ValidationError::MissingScript.into());
        }

        let size = codec::encode_transaction(transaction).len();
        if size > self.options.max_transaction_size {
            return Err(ValidationError::OversizedTransaction {
                size,
                maximum: self.options.max_transaction_size,
            }
            .into());
        }

        if transaction.gas_limit > self.options.max_gas_limit {
            return Err(ValidationError::GasLimitExceedsMaximum {
                limit: transaction.gas_limit,
                maximum: self.options.max_gas_limit,
            }
            .into());
        }

        self.check_reference_block(transaction, store)
    }

    fn check_reference_block(
        &self,
        transaction: &Transaction,
        store: &dyn Store,
    ) -> Result<(), EmulatorError> {
        if transaction.reference_block_id == ZERO_IDENTIFIER {
            if self.options.allow_empty_reference_block_id {
                return Ok(());
            }
            return Err(ValidationError::MissingReferenceBlockId.into());
        }

        let reference = match store.block_by_id(&transaction.reference_block_id) {
            Ok(block) => block,
            Err(StoreError::NotFound) => {
                return Err(ValidationError::UnknownReferenceBlock(id_to_hex(
                    &transaction.reference_block_id,
                ))
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        if self.options.expiry > 0 {
            let latest = store.latest_block()?;
            let reference_height = reference.header.height;
            let latest_height = latest.header.height;
            if reference_height + u64::from(self.options.expiry) < latest_height {
                return Err(ValidationError::Expired {
                    reference_height,
                    latest_height,
                    expiry: self.options.expiry,
                }
                .into());
            }
        }
        Ok(())
    }
}
