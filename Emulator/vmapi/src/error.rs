//! VM-boundary error types.

use basalt_storage::StoreError;

/// Fatal virtual machine failure.
///
/// These abort the pipeline; a transaction-level failure (revert, bad
/// signature, script error) is never a `VmError` — it is recorded on the
/// procedure instead.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// The ledger view failed underneath the VM.
    #[error("ledger access failed: {0}")]
    Ledger(#[from] StoreError),

    /// Internal engine failure.
    #[error("virtual machine failure: {0}")]
    Internal(String),
}
