//! Raw Transaction Verification
//!
//! The complete-transaction withdrawal path: a consensus-encoded transaction is
//! decoded and its outputs matched the same way PSBT outputs are.

use bitcoin::bech32::Hrp;
use bitcoin::consensus::deserialize;
use bitcoin::Transaction;
use thiserror::Error;

use super::payment::{check_payment, PaymentCheck};

/// Raw transaction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction is empty")]
    Empty,

    #[error("transaction decode failed: {0}")]
    Decode(String),

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("transaction does not match the signed PSBT")]
    PsbtMismatch,
}

/// Decode a consensus-encoded transaction, rejecting empty or trailing data
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, TransactionError> {
    if bytes.is_empty() {
        return Err(TransactionError::Empty);
    }

    let tx: Transaction =
        deserialize(bytes).map_err(|e| TransactionError::Decode(e.to_string()))?;

    if tx.output.is_empty() {
        return Err(TransactionError::NoOutputs);
    }
    Ok(tx)
}

/// Match a decoded transaction's outputs against an address and amount
pub fn check_transaction_payment(
    tx: &Transaction,
    expected_address: &str,
    expected_amount: u64,
    hrp: &Hrp,
) -> PaymentCheck {
    check_payment(
        tx.output
            .iter()
            .map(|out| (out.value.to_sat(), out.script_pubkey.as_bytes())),
        expected_address,
        expected_amount,
        hrp,
    )
}

/// True iff the transaction pays `expected_address` exactly `expected_amount`
pub fn verify_transaction_outputs(
    bytes: &[u8],
    expected_address: &str,
    expected_amount: u64,
    hrp: &Hrp,
) -> Result<bool, TransactionError> {
    let tx = decode_transaction(bytes)?;
    Ok(check_transaction_payment(&tx, expected_address, expected_amount, hrp).is_paid())
}
