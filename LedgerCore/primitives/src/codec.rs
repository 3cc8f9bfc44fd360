//! Deterministic serialization for persisted entities.
//!
//! Encoding format:
//! - Fixed-size fields (identifiers, addresses, integers) are written
//!   directly, little-endian.
//! - Variable-length fields (byte strings, UTF-8 strings) are
//!   length-prefixed (u32 LE).
//! - Repeated fields are count-prefixed (u32 LE) then concatenated.
//!
//! Every `decode_*` entry point consumes its input fully; trailing bytes
//! are an error. Encoding the decoded value reproduces the input
//! byte-for-byte.

use crate::block::{Block, BlockHeader, Collection, CollectionGuarantee};
use crate::error::CodecError;
use crate::event::Event;
use crate::result::TransactionResult;
use crate::transaction::{ProposalKey, Transaction, TransactionSignature};
use crate::types::{Address, Identifier};

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEnd);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_identifier(&mut self) -> Result<Identifier, CodecError> {
        let bytes = self.read_bytes(32)?;
        let mut id = [0u8; 32];
        id.copy_from_slice(bytes);
        Ok(id)
    }

    fn read_address(&mut self) -> Result<Address, CodecError> {
        let bytes = self.read_bytes(8)?;
        let mut addr = [0u8; 8];
        addr.copy_from_slice(bytes);
        Ok(addr)
    }

    fn read_var_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32()? as usize;
        if len > self.remaining() {
            return Err(CodecError::LengthOutOfBounds(len as u64));
        }
        Ok(self.read_bytes(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    fn finish(self) -> Result<(), CodecError> {
        if self.remaining() != 0 {
            return Err(CodecError::TrailingBytes);
        }
        Ok(())
    }
}

// ── Encoding helpers ──

fn write_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_var_bytes(buf: &mut Vec<u8>, v: &[u8]) {
    write_u32(buf, v.len() as u32);
    buf.extend_from_slice(v);
}

fn write_string(buf: &mut Vec<u8>, v: &str) {
    write_var_bytes(buf, v.as_bytes());
}

// ── Block ──

/// Encode a block header (the digest input for block ids).
pub fn encode_block_header(header: &BlockHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(56);
    write_u64(&mut buf, header.height);
    buf.extend_from_slice(&header.parent_id);
    write_u64(&mut buf, header.timestamp_ms);
    write_u64(&mut buf, header.view);
    buf
}

fn read_block_header(r: &mut Reader<'_>) -> Result<BlockHeader, CodecError> {
    Ok(BlockHeader {
        height: r.read_u64()?,
        parent_id: r.read_identifier()?,
        timestamp_ms: r.read_u64()?,
        view: r.read_u64()?,
    })
}

pub fn encode_block(block: &Block) -> Vec<u8> {
    let mut buf = encode_block_header(&block.header);
    write_u32(&mut buf, block.collection_guarantees.len() as u32);
    for guarantee in &block.collection_guarantees {
        buf.extend_from_slice(&guarantee.collection_id);
    }
    buf
}

pub fn decode_block(data: &[u8]) -> Result<Block, CodecError> {
    let mut r = Reader::new(data);
    let header = read_block_header(&mut r)?;
    let count = r.read_u32()?;
    let mut collection_guarantees = Vec::with_capacity(count as usize);
    for _ in 0..count {
        collection_guarantees.push(CollectionGuarantee {
            collection_id: r.read_identifier()?,
        });
    }
    r.finish()?;
    Ok(Block {
        header,
        collection_guarantees,
    })
}

// ── Collection ──

pub fn encode_collection(collection: &Collection) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + collection.transaction_ids.len() * 32);
    write_u32(&mut buf, collection.transaction_ids.len() as u32);
    for id in &collection.transaction_ids {
        buf.extend_from_slice(id);
    }
    buf
}

pub fn decode_collection(data: &[u8]) -> Result<Collection, CodecError> {
    let mut r = Reader::new(data);
    let count = r.read_u32()?;
    let mut transaction_ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        transaction_ids.push(r.read_identifier()?);
    }
    r.finish()?;
    Ok(Collection { transaction_ids })
}

// ── Transaction ──

fn write_proposal_key(buf: &mut Vec<u8>, key: &ProposalKey) {
    buf.extend_from_slice(&key.address);
    write_u32(buf, key.key_index);
    write_u64(buf, key.sequence_number);
}

fn read_proposal_key(r: &mut Reader<'_>) -> Result<ProposalKey, CodecError> {
    Ok(ProposalKey {
        address: r.read_address()?,
        key_index: r.read_u32()?,
        sequence_number: r.read_u64()?,
    })
}

fn write_signature(buf: &mut Vec<u8>, sig: &TransactionSignature) {
    buf.extend_from_slice(&sig.address);
    write_u32(buf, sig.key_index);
    write_var_bytes(buf, &sig.signature);
}

fn read_signature(r: &mut Reader<'_>) -> Result<TransactionSignature, CodecError> {
    Ok(TransactionSignature {
        address: r.read_address()?,
        key_index: r.read_u32()?,
        signature: r.read_var_bytes()?,
    })
}

fn write_signatures(buf: &mut Vec<u8>, sigs: &[TransactionSignature]) {
    write_u32(buf, sigs.len() as u32);
    for sig in sigs {
        write_signature(buf, sig);
    }
}

fn read_signatures(r: &mut Reader<'_>) -> Result<Vec<TransactionSignature>, CodecError> {
    let count = r.read_u32()?;
    let mut sigs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        sigs.push(read_signature(r)?);
    }
    Ok(sigs)
}

/// Encode the signable payload message of a transaction.
pub fn encode_transaction_payload(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::new();
    write_var_bytes(&mut buf, &tx.script);
    write_u32(&mut buf, tx.arguments.len() as u32);
    for arg in &tx.arguments {
        write_var_bytes(&mut buf, arg);
    }
    buf.extend_from_slice(&tx.reference_block_id);
    write_u64(&mut buf, tx.gas_limit);
    write_proposal_key(&mut buf, &tx.proposal_key);
    buf.extend_from_slice(&tx.payer);
    write_u32(&mut buf, tx.authorizers.len() as u32);
    for addr in &tx.authorizers {
        buf.extend_from_slice(addr);
    }
    buf
}

/// Encode the signable envelope message (payload plus payload signatures).
pub fn encode_transaction_envelope(tx: &Transaction) -> Vec<u8> {
    let mut buf = encode_transaction_payload(tx);
    write_signatures(&mut buf, &tx.payload_signatures);
    buf
}

/// Encode the full transaction (the digest input for transaction ids).
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let mut buf = encode_transaction_envelope(tx);
    write_signatures(&mut buf, &tx.envelope_signatures);
    buf
}

pub fn decode_transaction(data: &[u8]) -> Result<Transaction, CodecError> {
    let mut r = Reader::new(data);

    let script = r.read_var_bytes()?;
    let argc = r.read_u32()?;
    let mut arguments = Vec::with_capacity(argc as usize);
    for _ in 0..argc {
        arguments.push(r.read_var_bytes()?);
    }
    let reference_block_id = r.read_identifier()?;
    let gas_limit = r.read_u64()?;
    let proposal_key = read_proposal_key(&mut r)?;
    let payer = r.read_address()?;
    let authc = r.read_u32()?;
    let mut authorizers = Vec::with_capacity(authc as usize);
    for _ in 0..authc {
        authorizers.push(r.read_address()?);
    }
    let payload_signatures = read_signatures(&mut r)?;
    let envelope_signatures = read_signatures(&mut r)?;
    r.finish()?;

    Ok(Transaction {
        script,
        arguments,
        reference_block_id,
        gas_limit,
        proposal_key,
        payer,
        authorizers,
        payload_signatures,
        envelope_signatures,
    })
}

// ── Event ──

fn write_event(buf: &mut Vec<u8>, event: &Event) {
    write_u32(buf, event.tx_index);
    write_u32(buf, event.event_index);
    write_string(buf, &event.event_type);
    write_var_bytes(buf, &event.payload);
}

fn read_event(r: &mut Reader<'_>) -> Result<Event, CodecError> {
    Ok(Event {
        tx_index: r.read_u32()?,
        event_index: r.read_u32()?,
        event_type: r.read_string()?,
        payload: r.read_var_bytes()?,
    })
}

pub fn encode_event(event: &Event) -> Vec<u8> {
    let mut buf = Vec::new();
    write_event(&mut buf, event);
    buf
}

pub fn decode_event(data: &[u8]) -> Result<Event, CodecError> {
    let mut r = Reader::new(data);
    let event = read_event(&mut r)?;
    r.finish()?;
    Ok(event)
}

// ── Transaction result ──

pub fn encode_transaction_result(result: &TransactionResult) -> Vec<u8> {
    let mut buf = Vec::new();
    write_u16(&mut buf, result.error_code);
    write_string(&mut buf, &result.error_message);
    write_u32(&mut buf, result.logs.len() as u32);
    for log in &result.logs {
        write_string(&mut buf, log);
    }
    write_u32(&mut buf, result.events.len() as u32);
    for event in &result.events {
        write_event(&mut buf, event);
    }
    write_u64(&mut buf, result.computation_used);
    buf
}

pub fn decode_transaction_result(data: &[u8]) -> Result<TransactionResult, CodecError> {
    let mut r = Reader::new(data);
    let error_code = r.read_u16()?;
    let error_message = r.read_string()?;
    let logc = r.read_u32()?;
    let mut logs = Vec::with_capacity(logc as usize);
    for _ in 0..logc {
        logs.push(r.read_string()?);
    }
    let evc = r.read_u32()?;
    let mut events = Vec::with_capacity(evc as usize);
    for _ in 0..evc {
        events.push(read_event(&mut r)?);
    }
    let computation_used = r.read_u64()?;
    r.finish()?;

    Ok(TransactionResult {
        error_code,
        error_message,
        logs,
        events,
        computation_used,
    })
}

// ── Changelist ──

/// Encode a register's changelist: count-prefixed ascending heights.
pub fn encode_changelist(heights: &[u64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + heights.len() * 8);
    write_u32(&mut buf, heights.len() as u32);
    for h in heights {
        write_u64(&mut buf, *h);
    }
    buf
}

pub fn decode_changelist(data: &[u8]) -> Result<Vec<u64>, CodecError> {
    let mut r = Reader::new(data);
    let count = r.read_u32()?;
    let mut heights = Vec::with_capacity(count.min(1 << 20) as usize);
    for _ in 0..count {
        heights.push(r.read_u64()?);
    }
    r.finish()?;
    Ok(heights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;

    fn sample_block() -> Block {
        Block {
            header: BlockHeader {
                height: 42,
                parent_id: [3u8; 32],
                timestamp_ms: 1_700_000_000_123,
                view: 43,
            },
            collection_guarantees: vec![
                CollectionGuarantee { collection_id: [5u8; 32] },
                CollectionGuarantee { collection_id: [6u8; 32] },
            ],
        }
    }

    fn sample_transaction() -> Transaction {
        let mut tx = Transaction::new(b"set 01 balance 10".to_vec());
        tx.arguments = vec![b"arg0".to_vec(), b"".to_vec()];
        tx.reference_block_id = [9u8; 32];
        tx.gas_limit = 9999;
        tx.proposal_key = ProposalKey {
            address: [0, 0, 0, 0, 0, 0, 0, 1],
            key_index: 2,
            sequence_number: 77,
        };
        tx.payer = [0, 0, 0, 0, 0, 0, 0, 1];
        tx.authorizers = vec![[0, 0, 0, 0, 0, 0, 0, 1], [0, 0, 0, 0, 0, 0, 0, 2]];
        tx.payload_signatures = vec![TransactionSignature {
            address: [0, 0, 0, 0, 0, 0, 0, 2],
            key_index: 0,
            signature: vec![0xaa; 64],
        }];
        tx.envelope_signatures = vec![TransactionSignature {
            address: [0, 0, 0, 0, 0, 0, 0, 1],
            key_index: 2,
            signature: vec![0xbb; 64],
        }];
        tx
    }

    fn sample_event() -> Event {
        Event {
            tx_index: 1,
            event_index: 3,
            event_type: "basalt.AccountCreated".into(),
            payload: vec![0, 0, 0, 0, 0, 0, 0, 9],
        }
    }

    #[test]
    fn test_block_roundtrip_is_byte_identical() {
        let block = sample_block();
        let encoded = encode_block(&block);
        let decoded = decode_block(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(encode_block(&decoded), encoded);
    }

    #[test]
    fn test_genesis_block_roundtrip() {
        let genesis = Block::genesis(ChainId::Emulator);
        let decoded = decode_block(&encode_block(&genesis)).unwrap();
        assert_eq!(decoded.id(), genesis.id());
    }

    #[test]
    fn test_collection_roundtrip_is_byte_identical() {
        let collection = Collection::new(vec![[1u8; 32], [2u8; 32]]);
        let encoded = encode_collection(&collection);
        let decoded = decode_collection(&encoded).unwrap();
        assert_eq!(decoded, collection);
        assert_eq!(encode_collection(&decoded), encoded);
    }

    #[test]
    fn test_transaction_roundtrip_is_byte_identical() {
        let tx = sample_transaction();
        let encoded = encode_transaction(&tx);
        let decoded = decode_transaction(&encoded).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(encode_transaction(&decoded), encoded);
        assert_eq!(decoded.id(), tx.id());
    }

    #[test]
    fn test_event_roundtrip_is_byte_identical() {
        let event = sample_event();
        let encoded = encode_event(&event);
        let decoded = decode_event(&encoded).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(encode_event(&decoded), encoded);
    }

    #[test]
    fn test_result_roundtrip_is_byte_identical() {
        let result = TransactionResult {
            error_code: 1009,
            error_message: "invalid proposal signature".into(),
            logs: vec!["first".into(), "second".into()],
            events: vec![sample_event()],
            computation_used: 12,
        };
        let encoded = encode_transaction_result(&result);
        let decoded = decode_transaction_result(&encoded).unwrap();
        assert_eq!(decoded, result);
        assert_eq!(encode_transaction_result(&decoded), encoded);
    }

    #[test]
    fn test_changelist_roundtrip_is_byte_identical() {
        let heights = vec![0u64, 1, 5, 1_000_000];
        let encoded = encode_changelist(&heights);
        let decoded = decode_changelist(&encoded).unwrap();
        assert_eq!(decoded, heights);
        assert_eq!(encode_changelist(&decoded), encoded);
    }

    #[test]
    fn test_truncated_input_errors() {
        let encoded = encode_block(&sample_block());
        assert_eq!(
            decode_block(&encoded[..encoded.len() - 1]),
            Err(CodecError::UnexpectedEnd)
        );
    }

    #[test]
    fn test_trailing_bytes_error() {
        let mut encoded = encode_event(&sample_event());
        encoded.push(0);
        assert_eq!(decode_event(&encoded), Err(CodecError::TrailingBytes));
    }

    #[test]
    fn test_var_bytes_length_guard() {
        // A u32 length prefix far beyond the remaining input.
        let mut data = Vec::new();
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        let mut r = Reader::new(&data);
        assert_eq!(
            r.read_var_bytes(),
            Err(CodecError::LengthOutOfBounds(u32::MAX as u64))
        );
    }
}
