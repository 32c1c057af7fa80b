//! Pod Request Types
//!
//! Pending deposit and withdrawal records owned by the pod manager. The custody
//! core only reads them and advances their status after every check passes.

use serde::{Deserialize, Serialize};

/// Status of a deposit request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Waiting for operator confirmation
    #[default]
    Pending,
    /// Confirmed, pod balance updated
    Confirmed,
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// A Bitcoin deposit into a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Bitcoin transaction id of the deposit
    #[serde(with = "hex::serde")]
    pub transaction_id: [u8; 32],
    /// Amount in satoshis
    pub amount_sats: u64,
    /// Current status
    pub status: DepositStatus,
}

impl DepositRequest {
    /// Create a pending deposit request
    pub fn new(transaction_id: [u8; 32], amount_sats: u64) -> Self {
        Self {
            transaction_id,
            amount_sats,
            status: DepositStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DepositStatus::Pending
    }

    pub fn mark_confirmed(&mut self) {
        self.status = DepositStatus::Confirmed;
    }
}

/// Status of a withdrawal request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum WithdrawalStatus {
    /// Requested by the pod owner, nothing signed yet
    #[default]
    Pending,
    /// Operator approved a PSBT paying the withdrawal address
    PsbtSigned {
        #[serde(with = "hex::serde")]
        psbt: Vec<u8>,
    },
    /// Operator submitted the fully-formed transaction
    TransactionSubmitted {
        #[serde(with = "hex::serde")]
        transaction: Vec<u8>,
    },
    /// Withdrawal finalized, pod balance zeroed
    Completed,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::PsbtSigned { .. } => write!(f, "psbt_signed"),
            Self::TransactionSubmitted { .. } => write!(f, "transaction_submitted"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A Bitcoin withdrawal out of a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Amount in satoshis
    pub amount_sats: u64,
    /// Destination bech32 address
    pub withdraw_address: String,
    /// Current status
    pub status: WithdrawalStatus,
}

impl WithdrawalRequest {
    /// Create a pending withdrawal request
    pub fn new(amount_sats: u64, withdraw_address: impl Into<String>) -> Self {
        Self {
            amount_sats,
            withdraw_address: withdraw_address.into(),
            status: WithdrawalStatus::Pending,
        }
    }

    /// Nothing signed yet
    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    /// Can an operator still sign a PSBT or complete transaction for it
    pub fn accepts_signing(&self) -> bool {
        matches!(
            self.status,
            WithdrawalStatus::Pending | WithdrawalStatus::PsbtSigned { .. }
        )
    }

    /// Transaction awaiting final confirmation, if any
    pub fn submitted_transaction(&self) -> Option<&[u8]> {
        match &self.status {
            WithdrawalStatus::TransactionSubmitted { transaction } => Some(transaction),
            _ => None,
        }
    }

    pub fn mark_psbt_signed(&mut self, psbt: Vec<u8>) {
        self.status = WithdrawalStatus::PsbtSigned { psbt };
    }

    pub fn mark_transaction_submitted(&mut self, transaction: Vec<u8>) {
        self.status = WithdrawalStatus::TransactionSubmitted { transaction };
    }

    pub fn mark_completed(&mut self) {
        self.status = WithdrawalStatus::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_lifecycle() {
        let mut request = DepositRequest::new([7u8; 32], 100_000);
        assert!(request.is_pending());

        request.mark_confirmed();
        assert!(!request.is_pending());
        assert_eq!(request.status.to_string(), "confirmed");
    }

    #[test]
    fn test_withdrawal_lifecycle() {
        let mut request = WithdrawalRequest::new(9599, "tb1qexample");
        assert!(request.accepts_signing());
        assert!(request.submitted_transaction().is_none());

        request.mark_psbt_signed(vec![0x70, 0x73]);
        assert!(request.accepts_signing());

        request.mark_transaction_submitted(vec![1, 2, 3]);
        assert!(!request.accepts_signing());
        assert_eq!(request.submitted_transaction(), Some(&[1u8, 2, 3][..]));

        request.mark_completed();
        assert_eq!(request.status, WithdrawalStatus::Completed);
    }

    #[test]
    fn test_withdrawal_status_serialization() {
        let status = WithdrawalStatus::TransactionSubmitted {
            transaction: vec![0xde, 0xad],
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"state":"transaction_submitted","transaction":"dead"}"#);
    }
}
