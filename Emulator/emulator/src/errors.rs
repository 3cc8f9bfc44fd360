//! Error taxonomy of the emulator facade.
//!
//! Not-found and pending-block state errors are recoverable and typed so
//! a protocol server can map them to semantic status codes. Storage
//! failures are fatal and bubble up as-is. Execution-level failures never
//! appear here: they ride inside transaction results.

use basalt_primitives::CryptoError;
use basalt_storage::StoreError;
use basalt_vmapi::VmError;

/// Transaction validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("transaction script is empty")]
    MissingScript,

    #[error("transaction gas limit {limit} exceeds maximum {maximum}")]
    GasLimitExceedsMaximum { limit: u64, maximum: u64 },

    #[error("transaction reference block id is missing")]
    MissingReferenceBlockId,

    #[error("reference block {0} is unknown")]
    UnknownReferenceBlock(String),

    #[error(
        "transaction is expired: reference height {reference_height}, \
         latest height {latest_height}, expiry {expiry}"
    )]
    Expired {
        reference_height: u64,
        latest_height: u64,
        expiry: u32,
    },

    #[error("transaction size {size} exceeds maximum {maximum}")]
    OversizedTransaction { size: usize, maximum: usize },
}

/// Top-level error type of the blockchain facade.
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("block {0} not found")]
    BlockNotFoundById(String),

    #[error("block at height {0} not found")]
    BlockNotFoundByHeight(u64),

    #[error("collection {0} not found")]
    CollectionNotFound(String),

    #[error("transaction {0} not found")]
    TransactionNotFound(String),

    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("transaction {0} has already been submitted")]
    DuplicateTransaction(String),

    #[error("pending block {0} is mid-execution")]
    PendingBlockMidExecution(String),

    #[error("pending block {0} cannot be committed before execution")]
    PendingBlockCommitBeforeExecution(String),

    #[error("pending block {0} has no transactions left to execute")]
    PendingBlockTransactionsExhausted(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("service key construction failed: {0}")]
    ServiceKey(#[from] CryptoError),

    #[error("account creation failed: {0}")]
    AccountCreationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_wraps_transparently() {
        let err: EmulatorError = ValidationError::MissingScript.into();
        assert_eq!(format!("{err}"), "transaction script is empty");
    }

    #[test]
    fn test_storage_error_is_prefixed() {
        let err: EmulatorError = StoreError::NotFound.into();
        assert!(format!("{err}").starts_with("storage failure"));
    }
}
