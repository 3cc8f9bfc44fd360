//! Core type aliases and constants for the Basalt emulated blockchain.

/// 32-byte digest identifying blocks, collections, and transactions.
pub type Identifier = [u8; 32];

/// 8-byte account address.
pub type Address = [u8; 8];

/// Block height (dense and monotone from genesis at height 0).
pub type BlockHeight = u64;

/// A zero-valued identifier (32 zero bytes).
pub const ZERO_IDENTIFIER: Identifier = [0u8; 32];

/// A zero-valued address (8 zero bytes).
pub const ZERO_ADDRESS: Address = [0u8; 8];

/// Convert an `Identifier` to a hex string for display purposes.
pub fn id_to_hex(id: &Identifier) -> String {
    let mut s = String::with_capacity(66);
    s.push_str("0x");
    s.push_str(&hex::encode(id));
    s
}

/// Convert an `Address` to a hex string for display purposes.
pub fn address_to_hex(addr: &Address) -> String {
    let mut s = String::with_capacity(18);
    s.push_str("0x");
    s.push_str(&hex::encode(addr));
    s
}

/// Encode an address from its numeric form, big-endian.
pub fn address_from_u64(v: u64) -> Address {
    v.to_be_bytes()
}

/// Decode an address into its numeric form, big-endian.
pub fn address_to_u64(addr: &Address) -> u64 {
    u64::from_be_bytes(*addr)
}

/// Decode a u64 from little-endian bytes.
pub fn u64_from_le_bytes(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(buf))
}

/// Decode a u32 from little-endian bytes.
pub fn u32_from_le_bytes(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 4 {
        return None;
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    Some(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_to_hex() {
        let id = [0xab; 32];
        let hex = id_to_hex(&id);
        assert_eq!(hex.len(), 66); // "0x" + 64 hex chars
        assert!(hex.starts_with("0x"));
        assert!(hex[2..].chars().all(|c| c == 'a' || c == 'b'));
    }

    #[test]
    fn test_address_numeric_roundtrip() {
        let addr = address_from_u64(0x0102_0304_0506_0708);
        assert_eq!(addr, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(address_to_u64(&addr), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_u64_le_roundtrip() {
        let val = 0xDEAD_BEEF_CAFE_BABE_u64;
        assert_eq!(u64_from_le_bytes(&val.to_le_bytes()), Some(val));
        assert_eq!(u64_from_le_bytes(&[0, 1, 2]), None);
    }

    #[test]
    fn test_u32_le_roundtrip() {
        let val = 0xDEAD_BEEF_u32;
        assert_eq!(u32_from_le_bytes(&val.to_le_bytes()), Some(val));
        assert_eq!(u32_from_le_bytes(&[7]), None);
    }
}
