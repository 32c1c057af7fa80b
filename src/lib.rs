//! BitDSM Custody Core
//!
//! Operator-facing custody logic for Bitcoin pods: staked operators attest to
//! deposits into and withdrawals out of pods with Ethereum-style signatures,
//! and the core checks every attestation against the Bitcoin data it names.
//!
//! ## Modules
//!
//! 1. **btc** - Multisig witness scripts, P2WSH/bech32 addresses, PSBT and raw
//!    transaction output checks
//! 2. **auth** - Canonical payloads and Ethereum signed-message recovery
//! 3. **custody** - The custody calls composing the above
//! 4. **storage** - Pod manager and event sink interfaces, in-memory versions
//!
//! Configuration, logging and the error type live in `common`.

pub mod auth;
pub mod btc;
pub mod common;
pub mod custody;
pub mod storage;
pub mod types;

// Re-exports: configuration, errors
pub use common::{ConfigError, CustodyConfig, CustodyError, Network, Result, CONFIG_VERSION};

// Re-exports: custody service
pub use custody::{
    AddressVerification, CustodyService, DepositConfirmation, WithdrawalApproval,
    WithdrawalCompletion,
};

// Re-exports: collaborators
pub use storage::{
    EventSink, MemoryEventLog, MemoryPodManager, PodManager, PodMutation, StorageError,
    TracingEventSink,
};

// Re-exports: signatures
pub use auth::{authorize, CanonicalPayload, MessageHasher, OperatorKey};

// Re-exports: Bitcoin checks
pub use btc::{
    extract_public_keys, get_script_pub_key, to_bech32_address, verify_outputs, MultisigTemplate,
};

// Re-exports: shared types
pub use types::{CustodyEvent, DepositRequest, EthAddress, WithdrawalRequest, WithdrawalStatus};
