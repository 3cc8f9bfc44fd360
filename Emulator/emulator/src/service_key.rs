//! The service account's key.

use basalt_primitives::crypto::keypair_from_seed;
use basalt_primitives::{Address, CryptoError, HashAlgorithm, Transaction, ZERO_ADDRESS};
use basalt_vmapi::{AccountKey, KEY_WEIGHT_THRESHOLD};

/// Seed for the deterministic default service key. The derived keypair is
/// identical across runs, which keeps a fresh emulator reproducible.
const DEFAULT_SERVICE_KEY_SEED: &[u8] =
    b"granite seams under quiet rivers carry the first account key";

/// Pre-hash algorithm of the default service key.
pub const DEFAULT_SERVICE_KEY_HASH_ALGO: HashAlgorithm = HashAlgorithm::Sha3_256;

/// The key the emulator signs service-account transactions with.
///
/// Holds the public half always, and the signing half when the emulator
/// owns the key (the default). The address is assigned by the emulator
/// from the configured chain.
#[derive(Clone)]
pub struct ServiceKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
    pub weight: u32,
    pub hash_algo: HashAlgorithm,
    pub public_key: Vec<u8>,
    pub signing_key: Option<ed25519_dalek::SigningKey>,
}

impl ServiceKey {
    /// The deterministic default key.
    ///
    /// Failure to derive it is a typed error at construction time.
    pub fn default_key() -> Result<Self, CryptoError> {
        let (verifying_key, signing_key) = keypair_from_seed(DEFAULT_SERVICE_KEY_SEED)?;
        Ok(Self {
            address: ZERO_ADDRESS,
            key_index: 0,
            sequence_number: 0,
            weight: KEY_WEIGHT_THRESHOLD,
            hash_algo: DEFAULT_SERVICE_KEY_HASH_ALGO,
            public_key: verifying_key.as_bytes().to_vec(),
            signing_key: Some(signing_key),
        })
    }

    /// A verification-only service key (the emulator cannot sign).
    pub fn from_public_key(public_key: Vec<u8>, hash_algo: HashAlgorithm) -> Self {
        Self {
            address: ZERO_ADDRESS,
            key_index: 0,
            sequence_number: 0,
            weight: KEY_WEIGHT_THRESHOLD,
            hash_algo,
            public_key,
            signing_key: None,
        }
    }

    /// A service key from a caller-provided signing key.
    pub fn from_signing_key(
        signing_key: ed25519_dalek::SigningKey,
        hash_algo: HashAlgorithm,
    ) -> Self {
        let public_key = signing_key.verifying_key().as_bytes().to_vec();
        Self {
            address: ZERO_ADDRESS,
            key_index: 0,
            sequence_number: 0,
            weight: KEY_WEIGHT_THRESHOLD,
            hash_algo,
            public_key,
            signing_key: Some(signing_key),
        }
    }

    /// The account-key form stored on the service account.
    pub fn account_key(&self) -> AccountKey {
        AccountKey {
            index: self.key_index,
            public_key: self.public_key.clone(),
            hash_algo: self.hash_algo,
            weight: self.weight,
            sequence_number: self.sequence_number,
        }
    }

    /// Envelope-sign a transaction with this key, when it can sign.
    pub fn sign_envelope(&self, transaction: &mut Transaction) -> bool {
        match &self.signing_key {
            Some(signing_key) => {
                transaction.sign_envelope(self.address, self.key_index, signing_key, self.hash_algo);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceKey")
            .field("address", &hex::encode(self.address))
            .field("key_index", &self.key_index)
            .field("sequence_number", &self.sequence_number)
            .field("hash_algo", &self.hash_algo)
            .field("can_sign", &self.signing_key.is_some())
            .finish_non_exhaustive()
    }
}
