//! Transactions and their signatures.
//!
//! A transaction carries a script, arguments, a reference block anchor,
//! gas limit, the proposal key, payer, authorizers, and two signature
//! sets. Payload signatures cover the payload message; envelope signatures
//! cover the payload plus the payload signatures. The transaction id is a
//! SHA-256 digest of the full canonical encoding.

use crate::codec;
use crate::crypto::{self, HashAlgorithm, TRANSACTION_DOMAIN_TAG};
use crate::types::{Address, Identifier, ZERO_ADDRESS, ZERO_IDENTIFIER};

/// The key a transaction proposer offers a sequence number for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

/// One signature over a transaction's payload or envelope message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: Address,
    pub key_index: u32,
    pub signature: Vec<u8>,
}

/// A transaction submitted to the emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub script: Vec<u8>,
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: Identifier,
    pub gas_limit: u64,
    pub proposal_key: ProposalKey,
    pub payer: Address,
    pub authorizers: Vec<Address>,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// A transaction with the given script and no other fields set.
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: script.into(),
            arguments: Vec::new(),
            reference_block_id: ZERO_IDENTIFIER,
            gas_limit: 0,
            proposal_key: ProposalKey {
                address: ZERO_ADDRESS,
                key_index: 0,
                sequence_number: 0,
            },
            payer: ZERO_ADDRESS,
            authorizers: Vec::new(),
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        }
    }

    /// The transaction id (digest of the full canonical encoding).
    pub fn id(&self) -> Identifier {
        crypto::hash_sha256(&codec::encode_transaction(self))
    }

    /// The signable payload message.
    pub fn payload_message(&self) -> Vec<u8> {
        codec::encode_transaction_payload(self)
    }

    /// The signable envelope message (payload plus payload signatures).
    pub fn envelope_message(&self) -> Vec<u8> {
        codec::encode_transaction_envelope(self)
    }

    /// Sign the payload message and append a payload signature.
    pub fn sign_payload(
        &mut self,
        address: Address,
        key_index: u32,
        signing_key: &ed25519_dalek::SigningKey,
        hash_algo: HashAlgorithm,
    ) {
        let message = self.payload_message();
        let signature =
            crypto::sign_message(signing_key, hash_algo, TRANSACTION_DOMAIN_TAG, &message);
        self.payload_signatures.push(TransactionSignature {
            address,
            key_index,
            signature: signature.to_vec(),
        });
    }

    /// Sign the envelope message and append an envelope signature.
    pub fn sign_envelope(
        &mut self,
        address: Address,
        key_index: u32,
        signing_key: &ed25519_dalek::SigningKey,
        hash_algo: HashAlgorithm,
    ) {
        let message = self.envelope_message();
        let signature =
            crypto::sign_message(signing_key, hash_algo, TRANSACTION_DOMAIN_TAG, &message);
        self.envelope_signatures.push(TransactionSignature {
            address,
            key_index,
            signature: signature.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_keypair;

    fn sample_tx() -> Transaction {
        let mut tx = Transaction::new(b"log ready".to_vec());
        tx.arguments = vec![b"1".to_vec(), b"2".to_vec()];
        tx.gas_limit = 100;
        tx.proposal_key = ProposalKey {
            address: [0, 0, 0, 0, 0, 0, 0, 1],
            key_index: 0,
            sequence_number: 4,
        };
        tx.payer = [0, 0, 0, 0, 0, 0, 0, 1];
        tx.authorizers = vec![[0, 0, 0, 0, 0, 0, 0, 1]];
        tx
    }

    #[test]
    fn test_id_is_deterministic() {
        assert_eq!(sample_tx().id(), sample_tx().id());

        let mut other = sample_tx();
        other.gas_limit = 101;
        assert_ne!(sample_tx().id(), other.id());
    }

    #[test]
    fn test_envelope_covers_payload_signatures() {
        let (_, sk) = generate_keypair();
        let mut tx = sample_tx();
        let before = tx.envelope_message();

        tx.sign_payload([0u8; 8], 0, &sk, HashAlgorithm::Sha3_256);
        let after = tx.envelope_message();
        assert_ne!(before, after);
    }

    #[test]
    fn test_envelope_signature_verifies() {
        let (vk, sk) = generate_keypair();
        let mut tx = sample_tx();
        tx.sign_envelope(tx.proposal_key.address, 0, &sk, HashAlgorithm::Sha3_256);

        let sig = &tx.envelope_signatures[0];
        assert!(crypto::verify_message(
            vk.as_bytes(),
            HashAlgorithm::Sha3_256,
            TRANSACTION_DOMAIN_TAG,
            &tx.envelope_message(),
            &sig.signature,
        ));
    }
}
