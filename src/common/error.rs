//! Common Error Types for the BitDSM custody core
//!
//! Component modules keep their own error enums; everything surfaces to callers
//! of the custody service as a [`CustodyError`].

use thiserror::Error;

use crate::auth::AuthError;
use crate::btc::{AddressError, PsbtError, ScriptError, TransactionError};
use crate::storage::StorageError;
use crate::types::EthAddress;

/// Root error type for custody operations
#[derive(Debug, Error)]
pub enum CustodyError {
    /// Witness script does not match the multisig template
    #[error("invalid script format: {0}")]
    InvalidScriptFormat(#[from] ScriptError),

    /// PSBT magic or map structure is broken
    #[error("malformed PSBT: {0}")]
    MalformedPsbt(#[from] PsbtError),

    /// Signature is structurally broken or unrecoverable
    #[error("invalid signature: {0}")]
    InvalidSignature(#[source] AuthError),

    /// Signature recovered to someone other than the expected operator
    #[error("unauthorized signer: expected {expected}, recovered {recovered}")]
    UnauthorizedSigner {
        expected: EthAddress,
        recovered: EthAddress,
    },

    /// Caller is not the operator registered for the pod
    #[error("unauthorized operator {caller} for pod {pod}")]
    UnauthorizedOperator { caller: EthAddress, pod: EthAddress },

    /// Empty or undecodable Bitcoin transaction
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),

    /// No matching request, or it was already resolved
    #[error("no pending {kind} request for pod {pod}")]
    RequestNotPending { kind: &'static str, pod: EthAddress },

    /// Output (or request) value differs from the expected amount
    #[error("amount mismatch: expected {expected} sats, found {actual} sats")]
    AmountMismatch { expected: u64, actual: u64 },

    /// No output pays the expected address
    #[error("no output pays {address}")]
    OutputNotFound { address: String },

    /// Address derived from the witness script differs from the claim
    #[error("address mismatch: derived {derived}, claimed {claimed}")]
    AddressMismatch { derived: String, claimed: String },

    /// Operator's registered Bitcoin key is not a signer of the script
    #[error("operator {0} public key is not part of the witness script")]
    OperatorKeyNotInScript(EthAddress),

    /// Pod has no registered operator
    #[error("pod not found: {0}")]
    PodNotFound(EthAddress),

    /// Address encoding/decoding errors
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Collaborator storage errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl From<AuthError> for CustodyError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnauthorizedSigner {
                expected,
                recovered,
            } => Self::UnauthorizedSigner {
                expected,
                recovered,
            },
            other => Self::InvalidSignature(other),
        }
    }
}

impl CustodyError {
    /// Get error code for client diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            CustodyError::InvalidScriptFormat(_) => "INVALID_SCRIPT_FORMAT",
            CustodyError::MalformedPsbt(_) => "MALFORMED_PSBT",
            CustodyError::InvalidSignature(_) => "INVALID_SIGNATURE",
            CustodyError::UnauthorizedSigner { .. } => "UNAUTHORIZED_SIGNER",
            CustodyError::UnauthorizedOperator { .. } => "UNAUTHORIZED_OPERATOR",
            CustodyError::InvalidTransaction(_) => "INVALID_TRANSACTION",
            CustodyError::RequestNotPending { .. } => "REQUEST_NOT_PENDING",
            CustodyError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            CustodyError::OutputNotFound { .. } => "OUTPUT_NOT_FOUND",
            CustodyError::AddressMismatch { .. } => "ADDRESS_MISMATCH",
            CustodyError::OperatorKeyNotInScript(_) => "OPERATOR_KEY_NOT_IN_SCRIPT",
            CustodyError::PodNotFound(_) => "POD_NOT_FOUND",
            CustodyError::Address(_) => "ADDRESS_ERROR",
            CustodyError::Storage(_) => "STORAGE_ERROR",
            CustodyError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// True for failures of the authorization gate
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            CustodyError::InvalidSignature(_)
                | CustodyError::UnauthorizedSigner { .. }
                | CustodyError::UnauthorizedOperator { .. }
        )
    }
}

/// Result type alias using CustodyError
pub type Result<T> = std::result::Result<T, CustodyError>;
