//! Shared Types Module
//!
//! Data types shared across the custody core.

pub mod address;
pub mod events;
pub mod pod;

// Re-exports for convenience
pub use address::{EthAddress, EthAddressError};
pub use events::CustodyEvent;
pub use pod::{DepositRequest, DepositStatus, WithdrawalRequest, WithdrawalStatus};
