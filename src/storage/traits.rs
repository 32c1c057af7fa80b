//! Collaborator Trait Definitions
//!
//! The custody core never owns pod state. It reads pods and requests through a
//! [`PodManager`] and hands back a batch of [`PodMutation`]s that the manager
//! applies all-or-nothing. Events go to an [`EventSink`].

use thiserror::Error;

use crate::types::{CustodyEvent, DepositRequest, EthAddress, WithdrawalRequest};

/// Storage errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One state change to a pod, applied as part of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodMutation {
    /// Overwrite the pod's Bitcoin balance
    SetBalance(u64),
    /// Mark the pending deposit confirmed
    ConfirmDeposit,
    /// Withdrawal approved with this PSBT
    RecordSignedPsbt(Vec<u8>),
    /// Withdrawal approved with this complete transaction
    RecordCompleteTransaction(Vec<u8>),
    /// Withdrawal finalized
    CompleteWithdrawal,
}

/// Pod registry and request bookkeeping
///
/// Implementations:
/// - `MemoryPodManager` - In-memory, deterministic
#[cfg_attr(test, mockall::automock)]
pub trait PodManager: Send + Sync {
    /// Operator registered for the pod, `None` if the pod is unknown
    fn operator_for_pod(&self, pod: &EthAddress) -> StorageResult<Option<EthAddress>>;

    /// Compressed Bitcoin public key the operator registered
    fn operator_btc_public_key(&self, operator: &EthAddress) -> StorageResult<Option<Vec<u8>>>;

    /// Current pod balance in satoshis
    fn bitcoin_balance(&self, pod: &EthAddress) -> StorageResult<u64>;

    /// Latest deposit request of the pod
    fn deposit_request(&self, pod: &EthAddress) -> StorageResult<Option<DepositRequest>>;

    /// Latest withdrawal request of the pod
    fn withdrawal_request(&self, pod: &EthAddress) -> StorageResult<Option<WithdrawalRequest>>;

    /// Apply every mutation or none of them
    fn commit(&self, pod: &EthAddress, mutations: &[PodMutation]) -> StorageResult<()>;
}

/// Destination for custody events
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CustodyEvent);
}
