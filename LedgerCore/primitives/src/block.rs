//! Block and collection types for the Basalt emulated blockchain.
//!
//! A block groups zero or more collections, each an ordered list of
//! transaction ids. Block identity is a SHA-256 digest of the canonical
//! header encoding, so equal headers always produce equal ids.

use crate::chain::ChainId;
use crate::codec;
use crate::crypto::hash_sha256;
use crate::types::{Identifier, ZERO_IDENTIFIER};

/// Timestamp stamped on the genesis block, milliseconds since the Unix
/// epoch. Fixed so genesis is identical across runs.
pub const GENESIS_TIMESTAMP_MS: u64 = 1_577_836_800_000;

/// Block header.
///
/// Contains all metadata needed to identify a block. The block id is
/// computed over the canonical serialization of this header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block height (dense and monotone from genesis).
    pub height: u64,
    /// Id of the parent block's header.
    pub parent_id: Identifier,
    /// Wall-clock capture at pending-block construction, milliseconds
    /// since the Unix epoch. The only wall-clock input to ledger state.
    pub timestamp_ms: u64,
    /// Logical view number.
    pub view: u64,
}

impl BlockHeader {
    /// Compute the header digest identifying this block.
    pub fn id(&self) -> Identifier {
        hash_sha256(&codec::encode_block_header(self))
    }
}

/// Reference to a collection included in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionGuarantee {
    pub collection_id: Identifier,
}

/// Full block with collection guarantees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub collection_guarantees: Vec<CollectionGuarantee>,
}

impl Block {
    /// The genesis block of a chain: height 0, zero parent, fixed
    /// timestamp.
    pub fn genesis(_chain: ChainId) -> Self {
        Self {
            header: BlockHeader {
                height: 0,
                parent_id: ZERO_IDENTIFIER,
                timestamp_ms: GENESIS_TIMESTAMP_MS,
                view: 0,
            },
            collection_guarantees: Vec::new(),
        }
    }

    /// The block id (digest of the header).
    pub fn id(&self) -> Identifier {
        self.header.id()
    }

    /// Returns true if this block guarantees no collections.
    pub fn is_empty(&self) -> bool {
        self.collection_guarantees.is_empty()
    }
}

/// An ordered list of transaction ids grouped inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Collection {
    pub transaction_ids: Vec<Identifier>,
}

impl Collection {
    pub fn new(transaction_ids: Vec<Identifier>) -> Self {
        Self { transaction_ids }
    }

    /// The collection id (digest of the canonical encoding).
    pub fn id(&self) -> Identifier {
        hash_sha256(&codec::encode_collection(self))
    }

    pub fn len(&self) -> usize {
        self.transaction_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            height: 1,
            parent_id: [7u8; 32],
            timestamp_ms: 1_700_000_000_000,
            view: 1,
        }
    }

    #[test]
    fn test_header_id_is_deterministic() {
        let a = sample_header();
        let b = sample_header();
        assert_eq!(a.id(), b.id());

        let mut c = sample_header();
        c.height = 2;
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_genesis_is_fixed() {
        let g1 = Block::genesis(ChainId::Emulator);
        let g2 = Block::genesis(ChainId::Emulator);
        assert_eq!(g1.id(), g2.id());
        assert_eq!(g1.header.height, 0);
        assert_eq!(g1.header.parent_id, ZERO_IDENTIFIER);
        assert!(g1.is_empty());
    }

    #[test]
    fn test_collection_id_covers_order() {
        let a = Collection::new(vec![[1u8; 32], [2u8; 32]]);
        let b = Collection::new(vec![[2u8; 32], [1u8; 32]]);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.len(), 2);
    }
}
