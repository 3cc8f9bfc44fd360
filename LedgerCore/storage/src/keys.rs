//! Key schema for the persistent keyspace.
//!
//! Heights and event indices are big-endian inside keys so lexicographic
//! byte order equals numeric order; that makes "all events in block h"
//! and the changelog rebuild plain prefix scans. Value payloads use the
//! little-endian canonical codec. Register ids embedded in keys are
//! length-prefixed per component so the three opaque byte strings parse
//! back unambiguously.

use basalt_primitives::{Identifier, RegisterId};

use crate::error::StoreError;

const BLOCK_PREFIX: &[u8] = b"block/";
const BLOCK_ID_PREFIX: &[u8] = b"block_id/";
const LATEST_BLOCK_KEY: &[u8] = b"latest_block";
const COLLECTION_PREFIX: &[u8] = b"collection/";
const TRANSACTION_PREFIX: &[u8] = b"tx/";
const TRANSACTION_RESULT_PREFIX: &[u8] = b"tx_result/";
const LEDGER_VALUE_PREFIX: &[u8] = b"ledger_val/";
const LEDGER_CHANGELOG_PREFIX: &[u8] = b"ledger_clog/";
const EVENT_PREFIX: &[u8] = b"event/";

/// `block/<be height>` → encoded block
pub fn block_key(height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(BLOCK_PREFIX.len() + 8);
    key.extend_from_slice(BLOCK_PREFIX);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// `block_id/<id>` → `<be height>`
pub fn block_id_index_key(id: &Identifier) -> Vec<u8> {
    let mut key = Vec::with_capacity(BLOCK_ID_PREFIX.len() + 32);
    key.extend_from_slice(BLOCK_ID_PREFIX);
    key.extend_from_slice(id);
    key
}

/// `latest_block` → `<be height>`
pub fn latest_block_key() -> &'static [u8] {
    LATEST_BLOCK_KEY
}

/// `collection/<id>` → encoded collection
pub fn collection_key(id: &Identifier) -> Vec<u8> {
    let mut key = Vec::with_capacity(COLLECTION_PREFIX.len() + 32);
    key.extend_from_slice(COLLECTION_PREFIX);
    key.extend_from_slice(id);
    key
}

/// `tx/<id>` → encoded transaction
pub fn transaction_key(id: &Identifier) -> Vec<u8> {
    let mut key = Vec::with_capacity(TRANSACTION_PREFIX.len() + 32);
    key.extend_from_slice(TRANSACTION_PREFIX);
    key.extend_from_slice(id);
    key
}

/// `tx_result/<id>` → encoded result
pub fn transaction_result_key(id: &Identifier) -> Vec<u8> {
    let mut key = Vec::with_capacity(TRANSACTION_RESULT_PREFIX.len() + 32);
    key.extend_from_slice(TRANSACTION_RESULT_PREFIX);
    key.extend_from_slice(id);
    key
}

fn write_register_id(key: &mut Vec<u8>, id: &RegisterId) {
    for part in [&id.owner, &id.controller, &id.key] {
        key.extend_from_slice(&(part.len() as u32).to_le_bytes());
        key.extend_from_slice(part);
    }
}

/// `ledger_val/<register>/<be height>` → raw value bytes
pub fn ledger_value_key(id: &RegisterId, height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(LEDGER_VALUE_PREFIX.len() + 32);
    key.extend_from_slice(LEDGER_VALUE_PREFIX);
    write_register_id(&mut key, id);
    key.push(b'/');
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// `ledger_clog/<register>` → encoded changelist
pub fn ledger_changelog_key(id: &RegisterId) -> Vec<u8> {
    let mut key = Vec::with_capacity(LEDGER_CHANGELOG_PREFIX.len() + 32);
    key.extend_from_slice(LEDGER_CHANGELOG_PREFIX);
    write_register_id(&mut key, id);
    key
}

/// Prefix under which all changelists live.
pub fn ledger_changelog_prefix() -> &'static [u8] {
    LEDGER_CHANGELOG_PREFIX
}

/// Recover the register id from a changelog key.
pub fn register_id_from_changelog_key(key: &[u8]) -> Result<RegisterId, StoreError> {
    let body = key
        .strip_prefix(LEDGER_CHANGELOG_PREFIX)
        .ok_or(StoreError::InvalidChangelogKey)?;

    let mut parts = Vec::with_capacity(3);
    let mut pos = 0;
    for _ in 0..3 {
        if body.len() < pos + 4 {
            return Err(StoreError::InvalidChangelogKey);
        }
        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(&body[pos..pos + 4]);
        let len = u32::from_le_bytes(len_buf) as usize;
        pos += 4;
        if body.len() < pos + len {
            return Err(StoreError::InvalidChangelogKey);
        }
        parts.push(body[pos..pos + len].to_vec());
        pos += len;
    }
    if pos != body.len() {
        return Err(StoreError::InvalidChangelogKey);
    }

    let key_part = parts.pop().unwrap_or_default();
    let controller = parts.pop().unwrap_or_default();
    let owner = parts.pop().unwrap_or_default();
    Ok(RegisterId::new(owner, controller, key_part))
}

/// `event/<be height>/<be tx_idx>/<be evt_idx>/<type>` → encoded event
pub fn event_key(height: u64, tx_index: u32, event_index: u32, event_type: &str) -> Vec<u8> {
    let mut key = event_key_block_prefix(height);
    key.extend_from_slice(&tx_index.to_be_bytes());
    key.push(b'/');
    key.extend_from_slice(&event_index.to_be_bytes());
    key.push(b'/');
    key.extend_from_slice(event_type.as_bytes());
    key
}

/// Prefix under which all events of one block live, in
/// `(tx_index, event_index)` order.
pub fn event_key_block_prefix(height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(EVENT_PREFIX.len() + 9);
    key.extend_from_slice(EVENT_PREFIX);
    key.extend_from_slice(&height.to_be_bytes());
    key.push(b'/');
    key
}

/// Returns true if an event key's trailing type component equals
/// `event_type`.
pub fn event_key_has_type(key: &[u8], event_type: &[u8]) -> bool {
    // event/ + height(8) + / + tx(4) + / + evt(4) + /
    let fixed = EVENT_PREFIX.len() + 8 + 1 + 4 + 1 + 4 + 1;
    key.len() >= fixed && &key[fixed..] == event_type
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_keys_sort_numerically() {
        assert!(block_key(1) < block_key(2));
        assert!(block_key(255) < block_key(256));
        assert!(block_key(256) < block_key(1 << 40));
    }

    #[test]
    fn test_changelog_key_roundtrip() {
        let id = RegisterId::new(b"owner".to_vec(), b"".to_vec(), b"balance".to_vec());
        let key = ledger_changelog_key(&id);
        assert!(key.starts_with(ledger_changelog_prefix()));
        assert_eq!(register_id_from_changelog_key(&key).unwrap(), id);
    }

    #[test]
    fn test_changelog_key_rejects_garbage() {
        assert!(register_id_from_changelog_key(b"ledger_clog/xyz").is_err());
        assert!(register_id_from_changelog_key(b"other/prefix").is_err());
    }

    #[test]
    fn test_register_components_do_not_collide() {
        // ("ab", "c") and ("a", "bc") must produce different keys.
        let a = RegisterId::new(b"ab".to_vec(), b"c".to_vec(), b"k".to_vec());
        let b = RegisterId::new(b"a".to_vec(), b"bc".to_vec(), b"k".to_vec());
        assert_ne!(ledger_changelog_key(&a), ledger_changelog_key(&b));
        assert_ne!(ledger_value_key(&a, 1), ledger_value_key(&b, 1));
    }

    #[test]
    fn test_event_keys_sort_by_tx_then_event_index() {
        let k00 = event_key(5, 0, 0, "a.B");
        let k01 = event_key(5, 0, 1, "a.B");
        let k10 = event_key(5, 1, 0, "a.B");
        assert!(k00 < k01);
        assert!(k01 < k10);
        assert!(k00.starts_with(&event_key_block_prefix(5)));
    }

    #[test]
    fn test_event_key_type_filter() {
        let key = event_key(5, 0, 0, "basalt.AccountCreated");
        assert!(event_key_has_type(&key, b"basalt.AccountCreated"));
        assert!(!event_key_has_type(&key, b"basalt.Other"));
    }
}
