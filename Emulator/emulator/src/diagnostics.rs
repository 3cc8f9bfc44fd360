//! Wrong-hash-algorithm signature diagnostics.
//!
//! When a transaction fails with the invalid-proposal-signature code, the
//! facade re-verifies each signature under the alternative pre-hash
//! algorithm. A signature that verifies under the other algorithm almost
//! certainly means the signer hashed with the wrong algorithm for that
//! key, so the diagnostic names the key and the algorithm it actually
//! used. Advisory metadata only; nothing is retried.

use basalt_primitives::crypto::{verify_message, TRANSACTION_DOMAIN_TAG};
use basalt_primitives::result::ERROR_CODE_INVALID_PROPOSAL_SIGNATURE;
use basalt_primitives::types::address_to_hex;
use basalt_primitives::{Address, HashAlgorithm, Transaction, TransactionResult};
use basalt_vmapi::AccountKey;

/// Advisory diagnosis attached to a failed transaction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionResultDebug {
    /// A signature verified under the other pre-hash algorithm: the
    /// signer hashed with `used_algorithm` but the key expects its own.
    WrongHashAlgorithm {
        address: Address,
        key_index: u32,
        used_algorithm: HashAlgorithm,
        message: String,
    },
    /// No alternative-algorithm match; the signature is simply invalid.
    InvalidSignature { message: String },
}

/// Diagnose a failed result, looking keys up through `lookup_key`.
///
/// Returns `None` for results whose failure is not signature-related.
pub fn debug_signature_error(
    result: &TransactionResult,
    transaction: &Transaction,
    mut lookup_key: impl FnMut(&Address, u32) -> Option<AccountKey>,
) -> Option<TransactionResultDebug> {
    if result.error_code != ERROR_CODE_INVALID_PROPOSAL_SIGNATURE {
        return None;
    }

    let envelope_message = transaction.envelope_message();
    let payload_message = transaction.payload_message();
    let signature_sets = [
        (&transaction.envelope_signatures, &envelope_message),
        (&transaction.payload_signatures, &payload_message),
    ];

    for (signatures, message) in signature_sets {
        for signature in signatures.iter() {
            let Some(key) = lookup_key(&signature.address, signature.key_index) else {
                continue;
            };
            let alternative = key.hash_algo.alternative();
            if verify_message(
                &key.public_key,
                alternative,
                TRANSACTION_DOMAIN_TAG,
                message,
                &signature.signature,
            ) {
                return Some(TransactionResultDebug::WrongHashAlgorithm {
                    address: signature.address,
                    key_index: signature.key_index,
                    used_algorithm: alternative,
                    message: format!(
                        "signature from key {} of account {} was hashed with {}, \
                         but the key expects {}",
                        signature.key_index,
                        address_to_hex(&signature.address),
                        alternative,
                        key.hash_algo,
                    ),
                });
            }
        }
    }

    Some(TransactionResultDebug::InvalidSignature {
        message: "transaction signature is not valid for any account key".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_primitives::crypto::{generate_keypair, sign_message};
    use basalt_primitives::TransactionSignature;
    use basalt_vmapi::KEY_WEIGHT_THRESHOLD;

    fn failed_result() -> TransactionResult {
        TransactionResult {
            error_code: ERROR_CODE_INVALID_PROPOSAL_SIGNATURE,
            error_message: "invalid proposal signature".into(),
            ..Default::default()
        }
    }

    fn key_with(public_key: Vec<u8>) -> AccountKey {
        AccountKey {
            index: 0,
            public_key,
            hash_algo: HashAlgorithm::Sha3_256,
            weight: KEY_WEIGHT_THRESHOLD,
            sequence_number: 0,
        }
    }

    #[test]
    fn test_non_signature_failures_are_skipped() {
        let tx = Transaction::new(b"log x".to_vec());
        let result = TransactionResult {
            error_code: 7,
            ..Default::default()
        };
        assert_eq!(debug_signature_error(&result, &tx, |_, _| None), None);
    }

    #[test]
    fn test_wrong_algorithm_is_named() {
        let (vk, sk) = generate_keypair();
        let address = [0, 0, 0, 0, 0, 0, 0, 1];

        let mut tx = Transaction::new(b"log x".to_vec());
        tx.proposal_key.address = address;
        // Sign under SHA2-256 although the stored key expects SHA3-256.
        let message = tx.envelope_message();
        let signature =
            sign_message(&sk, HashAlgorithm::Sha2_256, TRANSACTION_DOMAIN_TAG, &message);
        tx.envelope_signatures.push(TransactionSignature {
            address,
            key_index: 0,
            signature: signature.to_vec(),
        });

        let debug = debug_signature_error(&failed_result(), &tx, |_, _| {
            Some(key_with(vk.as_bytes().to_vec()))
        })
        .unwrap();

        match debug {
            TransactionResultDebug::WrongHashAlgorithm {
                used_algorithm, ..
            } => assert_eq!(used_algorithm, HashAlgorithm::Sha2_256),
            other => panic!("expected wrong-hash-algorithm diagnosis, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_signature_is_generic() {
        let (vk, _) = generate_keypair();
        let address = [0, 0, 0, 0, 0, 0, 0, 1];

        let mut tx = Transaction::new(b"log x".to_vec());
        tx.envelope_signatures.push(TransactionSignature {
            address,
            key_index: 0,
            signature: vec![0u8; 64],
        });

        let debug = debug_signature_error(&failed_result(), &tx, |_, _| {
            Some(key_with(vk.as_bytes().to_vec()))
        })
        .unwrap();
        assert!(matches!(debug, TransactionResultDebug::InvalidSignature { .. }));
    }
}
