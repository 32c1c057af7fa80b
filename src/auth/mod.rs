//! Operator Authorization Module
//!
//! Canonical payloads, Ethereum signed-message hashing, and signer recovery.

pub mod gate;
pub mod payload;
pub mod signer;

pub use gate::{
    authorize, authorize_with, eth_signed_message_hash, keccak256, recover_signer, AuthError,
    EthSignedMessageHasher, MessageHasher, ETHEREUM_MESSAGE_PREFIX, SIGNATURE_LEN,
};
pub use payload::CanonicalPayload;
pub use signer::{OperatorKey, SignerError};
