//! Storable transaction results.

use crate::event::Event;

/// Execution error code meaning "no error".
pub const ERROR_CODE_OK: u16 = 0;

/// Execution error code for an invalid proposal signature.
///
/// Results carrying this code are candidates for the wrong-hash-algorithm
/// diagnostic.
pub const ERROR_CODE_INVALID_PROPOSAL_SIGNATURE: u16 = 1009;

/// The sealed outcome of one executed transaction.
///
/// `error_code == 0` means the transaction succeeded; a non-zero code
/// carries the execution-level failure, which is data rather than a
/// call-level error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionResult {
    pub error_code: u16,
    pub error_message: String,
    pub logs: Vec<String>,
    pub events: Vec<Event>,
    pub computation_used: u64,
}

impl TransactionResult {
    /// Returns true if the transaction executed without error.
    pub fn is_success(&self) -> bool {
        self.error_code == ERROR_CODE_OK
    }
}
