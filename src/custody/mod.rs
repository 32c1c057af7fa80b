//! Custody Orchestration Module
//!
//! Composes script parsing, address derivation, PSBT/transaction checks and
//! the signature gate into the operator-facing custody calls.

pub mod service;

pub use service::{
    AddressVerification, CustodyService, DepositConfirmation, WithdrawalApproval,
    WithdrawalCompletion,
};
