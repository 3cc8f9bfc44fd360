//! `basalt-primitives` — foundational types for the Basalt emulated blockchain.
//!
//! This crate provides the canonical entities (blocks, collections,
//! transactions, results, events), the register model (register ids, deltas,
//! the transactional overlay), deterministic serialization, cryptographic
//! operations, and the chain/address model shared by the storage layer and
//! the emulator.

pub mod block;
pub mod chain;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod event;
pub mod fixed;
pub mod register;
pub mod result;
pub mod transaction;
pub mod types;

// Re-export commonly used types at the crate root for convenience.
pub use block::{Block, BlockHeader, Collection, CollectionGuarantee};
pub use chain::{AddressGenerator, ChainId};
pub use crypto::HashAlgorithm;
pub use error::{CodecError, CryptoError};
pub use event::Event;
pub use fixed::Ufix64;
pub use register::{Delta, LedgerOverlay, OverlayResult, RegisterId};
pub use result::TransactionResult;
pub use transaction::{ProposalKey, Transaction, TransactionSignature};
pub use types::{Address, BlockHeight, Identifier, ZERO_ADDRESS, ZERO_IDENTIFIER};
