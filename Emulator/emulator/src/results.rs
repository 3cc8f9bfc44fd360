//! Query-facing result types.

use basalt_primitives::{Event, Identifier, TransactionResult};

use crate::diagnostics::TransactionResultDebug;

/// Lifecycle status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Present in the pending block, not yet sealed.
    Pending,
    /// Never seen by this emulator.
    Unknown,
    /// Committed with its block; the carried result is final.
    Sealed,
}

/// Answer to a transaction-result query.
#[derive(Debug, Clone)]
pub struct TransactionResultQuery {
    pub status: TransactionStatus,
    pub error_code: u16,
    pub error_message: String,
    pub logs: Vec<String>,
    pub events: Vec<Event>,
    pub debug: Option<TransactionResultDebug>,
}

impl TransactionResultQuery {
    pub fn pending() -> Self {
        Self::without_result(TransactionStatus::Pending)
    }

    pub fn unknown() -> Self {
        Self::without_result(TransactionStatus::Unknown)
    }

    pub fn sealed(result: TransactionResult, debug: Option<TransactionResultDebug>) -> Self {
        Self {
            status: TransactionStatus::Sealed,
            error_code: result.error_code,
            error_message: result.error_message,
            logs: result.logs,
            events: result.events,
            debug,
        }
    }

    fn without_result(status: TransactionStatus) -> Self {
        Self {
            status,
            error_code: 0,
            error_message: String::new(),
            logs: Vec::new(),
            events: Vec::new(),
            debug: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

/// Outcome of executing one pending-block transaction, as returned by the
/// execution entry points. The debug field is advisory diagnosis and is
/// not persisted with the storable result.
#[derive(Debug, Clone)]
pub struct ExecutedTransaction {
    pub tx_id: Identifier,
    pub result: TransactionResult,
    pub debug: Option<TransactionResultDebug>,
}

/// Outcome of a script evaluation.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// Digest of the script source.
    pub script_id: Identifier,
    /// Return value, when the script succeeded and read something.
    pub value: Option<Vec<u8>>,
    pub error_code: u16,
    pub error_message: String,
    pub logs: Vec<String>,
    pub events: Vec<Event>,
}

impl ScriptResult {
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_constructors() {
        assert_eq!(TransactionResultQuery::pending().status, TransactionStatus::Pending);
        assert_eq!(TransactionResultQuery::unknown().status, TransactionStatus::Unknown);

        let sealed = TransactionResultQuery::sealed(
            TransactionResult {
                error_code: 5,
                error_message: "boom".into(),
                ..Default::default()
            },
            None,
        );
        assert_eq!(sealed.status, TransactionStatus::Sealed);
        assert!(!sealed.is_success());
    }
}
