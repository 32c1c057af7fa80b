//! Operator Signing Key
//!
//! Produces signatures in the gate's wire format. Used by tests and the CLI;
//! operators in production sign with their own wallets.

use bitcoin::CompressedPublicKey;
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use thiserror::Error;

use super::gate::{EthSignedMessageHasher, MessageHasher, SIGNATURE_LEN};
use crate::types::EthAddress;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// secp256k1 key an operator signs custody payloads with
pub struct OperatorKey {
    secret_key: SecretKey,
}

impl OperatorKey {
    /// Create from secret key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, SignerError> {
        let secret_key =
            SecretKey::from_slice(bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { secret_key })
    }

    /// Create from hex string, `0x` prefix optional
    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let trimmed = hex_key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|e| SignerError::InvalidKey(e.to_string()))?;

        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignerError::InvalidKey("key must be 32 bytes".to_string()))?;
        Self::from_bytes(&arr)
    }

    /// Generate a new random key
    pub fn generate() -> Self {
        Self {
            secret_key: SecretKey::new(&mut rand::thread_rng()),
        }
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret_key.public_key(SECP256K1)
    }

    /// Ethereum address of the key
    pub fn address(&self) -> EthAddress {
        EthAddress::from_public_key(&self.public_key())
    }

    /// The same key as a Bitcoin multisig participant
    pub fn btc_public_key(&self) -> CompressedPublicKey {
        CompressedPublicKey(self.public_key())
    }

    /// Sign a 32-byte digest, returning `r || s || v` with `v` in {27, 28}
    pub fn sign_digest(&self, digest: &[u8; 32]) -> [u8; SIGNATURE_LEN] {
        let message = Message::from_digest(*digest);
        let signature = SECP256K1.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&compact);
        out[64] = 27 + recovery_id.to_i32() as u8;
        out
    }

    /// Personal-sign a canonical payload
    pub fn sign_payload(&self, payload: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.sign_digest(&EthSignedMessageHasher.hash(payload))
    }
}

impl std::fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorKey")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
