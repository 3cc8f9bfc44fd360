//! Error types shared by the primitive layers.

/// Serialization / deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The input ended before the expected field could be read.
    #[error("unexpected end of data")]
    UnexpectedEnd,

    /// A boolean or flag byte held a value other than 0 or 1.
    #[error("invalid flag value: {0}")]
    InvalidFlag(u8),

    /// A string field held non-UTF-8 bytes.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// Decoding finished with unconsumed input.
    #[error("trailing bytes after decoded value")]
    TrailingBytes,

    /// A length or count prefix exceeded the remaining input.
    #[error("length prefix {0} exceeds remaining input")]
    LengthOutOfBounds(u64),
}

/// Cryptographic construction failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// A signing key could not be derived from the given seed.
    #[error("invalid signing key seed")]
    InvalidSeed,

    /// A public key was malformed.
    #[error("invalid public key bytes")]
    InvalidPublicKey,

    /// A signature had the wrong length or structure.
    #[error("invalid signature bytes")]
    InvalidSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CodecError::LengthOutOfBounds(900);
        assert!(format!("{err}").contains("900"));

        let err = CryptoError::InvalidPublicKey;
        assert!(format!("{err}").contains("public key"));
    }
}
