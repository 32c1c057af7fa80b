//! Custody Events
//!
//! Observable records consumed by off-chain indexers. Exactly one is emitted per
//! successful custody call and none on failure.

use serde::{Deserialize, Serialize};

use super::EthAddress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum CustodyEvent {
    /// Deposit confirmed and credited to the pod
    BitcoinDepositConfirmed {
        pod: EthAddress,
        operator: EthAddress,
        amount_sats: u64,
    },

    /// Operator approved a PSBT or complete transaction for a withdrawal
    BitcoinWithdrawalTransactionSigned {
        pod: EthAddress,
        operator: EthAddress,
        amount_sats: u64,
    },

    /// Withdrawal finalized and pod balance zeroed
    BitcoinWithdrawalConfirmed {
        pod: EthAddress,
        operator: EthAddress,
        amount_sats: u64,
    },

    /// Operator's multisig script verified against a claimed address
    #[serde(rename = "BTCAddressVerified")]
    BtcAddressVerified {
        operator: EthAddress,
        btc_address: String,
    },
}

impl CustodyEvent {
    /// Event name as indexers know it
    pub fn name(&self) -> &'static str {
        match self {
            Self::BitcoinDepositConfirmed { .. } => "BitcoinDepositConfirmed",
            Self::BitcoinWithdrawalTransactionSigned { .. } => {
                "BitcoinWithdrawalTransactionSigned"
            }
            Self::BitcoinWithdrawalConfirmed { .. } => "BitcoinWithdrawalConfirmed",
            Self::BtcAddressVerified { .. } => "BTCAddressVerified",
        }
    }

    /// Pod the event concerns, when it concerns one
    pub fn pod(&self) -> Option<EthAddress> {
        match self {
            Self::BitcoinDepositConfirmed { pod, .. }
            | Self::BitcoinWithdrawalTransactionSigned { pod, .. }
            | Self::BitcoinWithdrawalConfirmed { pod, .. } => Some(*pod),
            Self::BtcAddressVerified { .. } => None,
        }
    }
}
