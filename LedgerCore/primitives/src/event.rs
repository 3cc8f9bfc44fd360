//! Events emitted during transaction execution.

/// Event type emitted when a new account is created.
pub const ACCOUNT_CREATED_EVENT: &str = "basalt.AccountCreated";

/// A single event emitted by a transaction.
///
/// Within a block, events are totally ordered by `(tx_index, event_index)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Position of the emitting transaction within its block.
    pub tx_index: u32,
    /// Position of this event within the emitting transaction, contiguous
    /// from 0.
    pub event_index: u32,
    /// Fully-qualified event type.
    pub event_type: String,
    /// Opaque event payload.
    pub payload: Vec<u8>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            tx_index: 0,
            event_index: 0,
            event_type: event_type.into(),
            payload,
        }
    }
}
