//! Signature Authorization Gate
//!
//! Operators sign `keccak256("\x19Ethereum Signed Message:\n32" || keccak256(payload))`
//! with their Ethereum key. The gate recovers the signer from the 65-byte
//! `r || s || v` signature and compares it with the operator on record.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, SECP256K1};
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::types::EthAddress;

/// Prefix for a personal-sign over a 32-byte digest
pub const ETHEREUM_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// `r || s || v`
pub const SIGNATURE_LEN: usize = 65;

/// Signature check errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("signature must be {SIGNATURE_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("signature s value is not in the lower half order")]
    HighS,

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("signer recovery failed: {0}")]
    Recovery(String),

    #[error("signature recovered to {recovered}, expected {expected}")]
    UnauthorizedSigner {
        expected: EthAddress,
        recovered: EthAddress,
    },
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Digest an Ethereum wallet signs when asked to sign the 32-byte `digest`
pub fn eth_signed_message_hash(digest: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(ETHEREUM_MESSAGE_PREFIX);
    hasher.update(digest);

    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Turns a canonical payload into the 32-byte digest that was signed
pub trait MessageHasher: Send + Sync {
    fn hash(&self, payload: &[u8]) -> [u8; 32];
}

/// `eth_signed_message_hash(keccak256(payload))`
#[derive(Debug, Default, Clone, Copy)]
pub struct EthSignedMessageHasher;

impl MessageHasher for EthSignedMessageHasher {
    fn hash(&self, payload: &[u8]) -> [u8; 32] {
        eth_signed_message_hash(&keccak256(payload))
    }
}

/// Recover the Ethereum address that produced `signature` over `message_hash`
pub fn recover_signer(message_hash: &[u8; 32], signature: &[u8]) -> Result<EthAddress, AuthError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(AuthError::InvalidLength(signature.len()));
    }

    let v = signature[64];
    let recovery_id = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(AuthError::InvalidRecoveryId(other)),
    };
    let recovery_id = RecoveryId::from_i32(recovery_id as i32)
        .map_err(|_| AuthError::InvalidRecoveryId(v))?;

    let compact = &signature[..64];

    // EIP-2: only the lower-s form is accepted
    let standard =
        Signature::from_compact(compact).map_err(|e| AuthError::Malformed(e.to_string()))?;
    let mut normalized = standard;
    normalized.normalize_s();
    if normalized != standard {
        return Err(AuthError::HighS);
    }

    let recoverable = RecoverableSignature::from_compact(compact, recovery_id)
        .map_err(|e| AuthError::Malformed(e.to_string()))?;

    let message = Message::from_digest(*message_hash);
    let public_key = SECP256K1
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| AuthError::Recovery(e.to_string()))?;

    Ok(EthAddress::from_public_key(&public_key))
}

/// Accept iff `signature` over `payload` recovers to `expected_signer`
pub fn authorize_with(
    hasher: &dyn MessageHasher,
    payload: &[u8],
    signature: &[u8],
    expected_signer: &EthAddress,
) -> Result<(), AuthError> {
    let message_hash = hasher.hash(payload);
    let recovered = recover_signer(&message_hash, signature)?;

    if recovered != *expected_signer {
        return Err(AuthError::UnauthorizedSigner {
            expected: *expected_signer,
            recovered,
        });
    }
    Ok(())
}

/// [`authorize_with`] using the Ethereum signed-message hash
pub fn authorize(
    payload: &[u8],
    signature: &[u8],
    expected_signer: &EthAddress,
) -> Result<(), AuthError> {
    authorize_with(&EthSignedMessageHasher, payload, signature, expected_signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CanonicalPayload, OperatorKey};

    fn operator() -> OperatorKey {
        OperatorKey::from_hex("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
            .unwrap()
    }

    fn deposit_payload(pod: EthAddress, operator: EthAddress, amount: u64, txid: &[u8; 32]) -> Vec<u8> {
        CanonicalPayload::DepositConfirm {
            pod,
            operator,
            amount_sats: amount,
            transaction_id: txid,
        }
        .encode()
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_authorize_accepts_exact_payload() {
        let key = operator();
        let payload = deposit_payload(EthAddress::new([1; 20]), key.address(), 5000, &[9; 32]);
        let signature = key.sign_payload(&payload);

        assert_eq!(authorize(&payload, &signature, &key.address()), Ok(()));

        // v in {0, 1} is accepted as well as {27, 28}
        let mut raw_v = signature;
        raw_v[64] -= 27;
        assert_eq!(authorize(&payload, &raw_v, &key.address()), Ok(()));
    }

    #[test]
    fn test_mutated_fields_invalidate() {
        let key = operator();
        let pod = EthAddress::new([1; 20]);
        let txid = [9u8; 32];
        let signature = key.sign_payload(&deposit_payload(pod, key.address(), 5000, &txid));

        let mutations = [
            deposit_payload(EthAddress::new([2; 20]), key.address(), 5000, &txid),
            deposit_payload(pod, EthAddress::new([3; 20]), 5000, &txid),
            deposit_payload(pod, key.address(), 5001, &txid),
            deposit_payload(pod, key.address(), 5000, &[8; 32]),
        ];

        for payload in mutations {
            assert!(matches!(
                authorize(&payload, &signature, &key.address()),
                Err(AuthError::UnauthorizedSigner { .. })
            ));
        }
    }

    #[test]
    fn test_wrong_expected_signer() {
        let key = operator();
        let other = OperatorKey::generate();
        let signature = key.sign_payload(b"payload");

        assert_eq!(
            authorize(b"payload", &signature, &other.address()),
            Err(AuthError::UnauthorizedSigner {
                expected: other.address(),
                recovered: key.address(),
            })
        );
    }

    #[test]
    fn test_structural_failures() {
        let key = operator();
        let signature = key.sign_payload(b"payload");
        let expected = key.address();

        assert_eq!(
            authorize(b"payload", &signature[..64], &expected),
            Err(AuthError::InvalidLength(64))
        );

        let mut bad_v = signature;
        bad_v[64] = 29;
        assert_eq!(
            authorize(b"payload", &bad_v, &expected),
            Err(AuthError::InvalidRecoveryId(29))
        );
    }

    #[test]
    fn test_high_s_rejected() {
        let key = operator();
        let signature = key.sign_payload(b"payload");

        // s' = n - s, the malleated twin of a valid signature
        let order: [u8; 32] =
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
                .unwrap()
                .try_into()
                .unwrap();
        let mut high_s = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = order[i] as i16 - signature[32 + i] as i16 - borrow;
            borrow = if diff < 0 { 1 } else { 0 };
            high_s[i] = diff.rem_euclid(256) as u8;
        }

        let mut malleated = signature;
        malleated[32..64].copy_from_slice(&high_s);
        malleated[64] = if signature[64] == 27 { 28 } else { 27 };

        assert_eq!(
            authorize(b"payload", &malleated, &key.address()),
            Err(AuthError::HighS)
        );
    }

    #[test]
    fn test_custom_hasher() {
        struct PlainKeccak;
        impl MessageHasher for PlainKeccak {
            fn hash(&self, payload: &[u8]) -> [u8; 32] {
                keccak256(payload)
            }
        }

        let key = operator();
        let signature = key.sign_digest(&keccak256(b"payload"));

        assert_eq!(
            authorize_with(&PlainKeccak, b"payload", &signature, &key.address()),
            Ok(())
        );
        assert!(authorize(b"payload", &signature, &key.address()).is_err());
    }
}
