//! Execution context handed to the virtual machine.

use basalt_primitives::{BlockHeader, ChainId, Ufix64};

/// Static execution parameters plus the optional block binding.
///
/// A context is built once from the emulator configuration; per-block
/// execution derives a child context with the pending block's header
/// bound in.
#[derive(Debug, Clone)]
pub struct VmContext {
    pub chain: ChainId,
    /// Header of the block the procedure executes inside, if any.
    pub block_header: Option<BlockHeader>,
    /// Gas limit applied to scripts (transactions carry their own).
    pub script_gas_limit: u64,
    /// Whether procedure log statements are collected.
    pub logging_enabled: bool,
    pub storage_limit_enabled: bool,
    pub transaction_fees_enabled: bool,
    pub minimum_storage_reservation: Ufix64,
    pub storage_mb_per_unit: Ufix64,
}

impl VmContext {
    pub fn new(chain: ChainId) -> Self {
        Self {
            chain,
            block_header: None,
            script_gas_limit: 100_000,
            logging_enabled: true,
            storage_limit_enabled: true,
            transaction_fees_enabled: false,
            minimum_storage_reservation: Ufix64::ZERO,
            storage_mb_per_unit: Ufix64::ZERO,
        }
    }

    /// Derive a context with the given block header bound in.
    pub fn with_block_header(&self, header: BlockHeader) -> Self {
        let mut ctx = self.clone();
        ctx.block_header = Some(header);
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_block_header_derives_child() {
        let base = VmContext::new(ChainId::Emulator);
        assert!(base.block_header.is_none());

        let header = BlockHeader {
            height: 3,
            parent_id: [1u8; 32],
            timestamp_ms: 1,
            view: 3,
        };
        let child = base.with_block_header(header.clone());
        assert_eq!(child.block_header, Some(header));
        assert!(base.block_header.is_none());
    }
}
