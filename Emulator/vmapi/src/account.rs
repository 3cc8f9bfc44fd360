//! Accounts, account keys, and contracts as the emulator sees them.

use basalt_primitives::types::{u32_from_le_bytes, u64_from_le_bytes};
use basalt_primitives::{Address, CodecError, HashAlgorithm};
use std::collections::BTreeMap;

/// Combined key weight required to authorize on behalf of an account.
pub const KEY_WEIGHT_THRESHOLD: u32 = 1000;

/// One public key attached to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub index: u32,
    pub public_key: Vec<u8>,
    pub hash_algo: HashAlgorithm,
    pub weight: u32,
    pub sequence_number: u64,
}

/// A deployed contract: name plus source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub name: String,
    pub source: Vec<u8>,
}

/// An account materialized from ledger registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub balance: u64,
    pub keys: Vec<AccountKey>,
    pub contracts: BTreeMap<String, Vec<u8>>,
}

fn hash_algo_tag(algo: HashAlgorithm) -> u8 {
    match algo {
        HashAlgorithm::Sha2_256 => 0,
        HashAlgorithm::Sha3_256 => 1,
    }
}

fn hash_algo_from_tag(tag: u8) -> Result<HashAlgorithm, CodecError> {
    match tag {
        0 => Ok(HashAlgorithm::Sha2_256),
        1 => Ok(HashAlgorithm::Sha3_256),
        other => Err(CodecError::InvalidFlag(other)),
    }
}

/// Encode an account key for its ledger register. The key index is not
/// stored; it is derived from the register name.
pub fn encode_account_key(key: &AccountKey) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + key.public_key.len() + 1 + 4 + 8);
    buf.extend_from_slice(&(key.public_key.len() as u32).to_le_bytes());
    buf.extend_from_slice(&key.public_key);
    buf.push(hash_algo_tag(key.hash_algo));
    buf.extend_from_slice(&key.weight.to_le_bytes());
    buf.extend_from_slice(&key.sequence_number.to_le_bytes());
    buf
}

/// Decode an account key register; `index` is supplied by the caller.
pub fn decode_account_key(index: u32, data: &[u8]) -> Result<AccountKey, CodecError> {
    let len = u32_from_le_bytes(data).ok_or(CodecError::UnexpectedEnd)? as usize;
    let rest = &data[4..];
    if rest.len() != len + 1 + 4 + 8 {
        return Err(CodecError::UnexpectedEnd);
    }
    let public_key = rest[..len].to_vec();
    let hash_algo = hash_algo_from_tag(rest[len])?;
    let weight = u32_from_le_bytes(&rest[len + 1..]).ok_or(CodecError::UnexpectedEnd)?;
    let sequence_number =
        u64_from_le_bytes(&rest[len + 5..]).ok_or(CodecError::UnexpectedEnd)?;
    Ok(AccountKey {
        index,
        public_key,
        hash_algo,
        weight,
        sequence_number,
    })
}

/// Encode a list of account keys as a transaction argument.
pub fn encode_account_keys(keys: &[AccountKey]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(keys.len() as u32).to_le_bytes());
    for key in keys {
        let encoded = encode_account_key(key);
        buf.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        buf.extend_from_slice(&encoded);
    }
    buf
}

/// Decode a list of account keys from a transaction argument.
pub fn decode_account_keys(data: &[u8]) -> Result<Vec<AccountKey>, CodecError> {
    let count = u32_from_le_bytes(data).ok_or(CodecError::UnexpectedEnd)?;
    let mut pos = 4usize;
    let mut keys = Vec::with_capacity(count as usize);
    for index in 0..count {
        let len = u32_from_le_bytes(data.get(pos..).ok_or(CodecError::UnexpectedEnd)?)
            .ok_or(CodecError::UnexpectedEnd)? as usize;
        pos += 4;
        let slice = data
            .get(pos..pos + len)
            .ok_or(CodecError::LengthOutOfBounds(len as u64))?;
        keys.push(decode_account_key(index, slice)?);
        pos += len;
    }
    if pos != data.len() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(keys)
}

/// Encode a list of contracts as a transaction argument.
pub fn encode_contracts(contracts: &[Contract]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(contracts.len() as u32).to_le_bytes());
    for contract in contracts {
        buf.extend_from_slice(&(contract.name.len() as u32).to_le_bytes());
        buf.extend_from_slice(contract.name.as_bytes());
        buf.extend_from_slice(&(contract.source.len() as u32).to_le_bytes());
        buf.extend_from_slice(&contract.source);
    }
    buf
}

/// Decode a list of contracts from a transaction argument.
pub fn decode_contracts(data: &[u8]) -> Result<Vec<Contract>, CodecError> {
    fn segment<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], CodecError> {
        let len = u32_from_le_bytes(data.get(*pos..).ok_or(CodecError::UnexpectedEnd)?)
            .ok_or(CodecError::UnexpectedEnd)? as usize;
        *pos += 4;
        let slice = data
            .get(*pos..*pos + len)
            .ok_or(CodecError::LengthOutOfBounds(len as u64))?;
        *pos += len;
        Ok(slice)
    }

    let count = u32_from_le_bytes(data).ok_or(CodecError::UnexpectedEnd)?;
    let mut pos = 4usize;
    let mut contracts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = String::from_utf8(segment(data, &mut pos)?.to_vec())
            .map_err(|_| CodecError::InvalidUtf8)?;
        let source = segment(data, &mut pos)?.to_vec();
        contracts.push(Contract { name, source });
    }
    if pos != data.len() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(contracts)
}
