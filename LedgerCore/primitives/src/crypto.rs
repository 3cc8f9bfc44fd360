//! Cryptographic operations for the Basalt emulated blockchain.
//!
//! Entity identities (block, collection, transaction ids) are SHA-256
//! digests over canonical encodings. Account keys sign Ed25519 over a
//! tagged pre-hash of the signable message; the pre-hash algorithm is a
//! per-key property (SHA2-256 or SHA3-256), which is what the emulator's
//! wrong-hash-algorithm diagnostic probes.

use crate::error::CryptoError;
use crate::types::Identifier;

/// Domain tag mixed into every transaction signature pre-hash.
pub const TRANSACTION_DOMAIN_TAG: &[u8; 32] = b"basalt-v0-transaction\0\0\0\0\0\0\0\0\0\0\0";

/// Pre-hash algorithm applied to a tagged message before Ed25519 signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha2_256,
    Sha3_256,
}

impl HashAlgorithm {
    /// The algorithm a misconfigured signer most plausibly used instead.
    pub fn alternative(self) -> Self {
        match self {
            Self::Sha2_256 => Self::Sha3_256,
            Self::Sha3_256 => Self::Sha2_256,
        }
    }
}

impl core::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Sha2_256 => write!(f, "SHA2-256"),
            Self::Sha3_256 => write!(f, "SHA3-256"),
        }
    }
}

/// Compute the SHA-256 digest of the input data.
///
/// Used for all entity identities.
pub fn hash_sha256(data: &[u8]) -> Identifier {
    use sha2::Digest;
    let result = sha2::Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Compute the tagged pre-hash of a signable message under the given
/// algorithm.
pub fn prefixed_hash(algo: HashAlgorithm, tag: &[u8; 32], message: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    match algo {
        HashAlgorithm::Sha2_256 => {
            use sha2::Digest;
            let mut hasher = sha2::Sha256::new();
            hasher.update(tag);
            hasher.update(message);
            out.copy_from_slice(&hasher.finalize());
        }
        HashAlgorithm::Sha3_256 => {
            use sha3::Digest;
            let mut hasher = sha3::Sha3_256::new();
            hasher.update(tag);
            hasher.update(message);
            out.copy_from_slice(&hasher.finalize());
        }
    }
    out
}

/// Sign a tagged message: Ed25519 over the pre-hash.
pub fn sign_message(
    signing_key: &ed25519_dalek::SigningKey,
    algo: HashAlgorithm,
    tag: &[u8; 32],
    message: &[u8],
) -> [u8; 64] {
    use ed25519_dalek::Signer;
    let digest = prefixed_hash(algo, tag, message);
    signing_key.sign(&digest).to_bytes()
}

/// Verify a tagged-message signature under the given pre-hash algorithm.
///
/// Returns `true` if the signature is valid for the message, key, and
/// algorithm, `false` otherwise. Malformed keys or signatures verify as
/// `false`.
pub fn verify_message(
    public_key: &[u8],
    algo: HashAlgorithm,
    tag: &[u8; 32],
    message: &[u8],
    signature: &[u8],
) -> bool {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let sig = Signature::from_bytes(&sig_bytes);
    let digest = prefixed_hash(algo, tag, message);
    verifying_key.verify(&digest, &sig).is_ok()
}

/// Derive a signing key deterministically from a seed phrase.
///
/// The seed is hashed to 32 bytes; the same seed always yields the same
/// keypair. Used for the default service key.
pub fn keypair_from_seed(
    seed: &[u8],
) -> Result<(ed25519_dalek::VerifyingKey, ed25519_dalek::SigningKey), CryptoError> {
    if seed.is_empty() {
        return Err(CryptoError::InvalidSeed);
    }
    let digest = hash_sha256(seed);
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&digest);
    let verifying_key = signing_key.verifying_key();
    Ok((verifying_key, signing_key))
}

/// Generate an Ed25519 keypair from OS randomness.
///
/// Never used on any ledger-state path (determinism); intended for tests
/// and client-side account keys.
pub fn generate_keypair() -> (ed25519_dalek::VerifyingKey, ed25519_dalek::SigningKey) {
    use ed25519_dalek::SigningKey;
    let mut rng = rand::rngs::OsRng;
    let signing_key = SigningKey::generate(&mut rng);
    let verifying_key = signing_key.verifying_key();
    (verifying_key, signing_key)
}
