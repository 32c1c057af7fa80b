//! Canonical Signing Payloads
//!
//! Each custody operation has exactly one byte layout an operator signs. Fields
//! are packed back to back with no length prefixes, the way Solidity's
//! `abi.encodePacked` lays them out: addresses as 20 bytes, amounts as 32-byte
//! big-endian words, byte strings and addresses-as-text verbatim.

use crate::types::EthAddress;

/// Payload an operator signs for one custody operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalPayload<'a> {
    /// `pod || operator || amount || txid || true`
    DepositConfirm {
        pod: EthAddress,
        operator: EthAddress,
        amount_sats: u64,
        transaction_id: &'a [u8; 32],
    },

    /// `pod || amount || psbt || withdraw_address`
    PsbtWithdrawal {
        pod: EthAddress,
        amount_sats: u64,
        psbt: &'a [u8],
        withdraw_address: &'a str,
    },

    /// `pod || amount || transaction || withdraw_address`
    CompleteTxWithdrawal {
        pod: EthAddress,
        amount_sats: u64,
        transaction: &'a [u8],
        withdraw_address: &'a str,
    },

    /// `pod || transaction || withdraw_address`
    WithdrawalConfirm {
        pod: EthAddress,
        transaction: &'a [u8],
        withdraw_address: &'a str,
    },

    /// `pod || operator || script || btc_address`
    AddressVerify {
        pod: EthAddress,
        operator: EthAddress,
        script: &'a [u8],
        btc_address: &'a str,
    },
}

impl CanonicalPayload<'_> {
    /// Operation name used in logs
    pub fn operation(&self) -> &'static str {
        match self {
            Self::DepositConfirm { .. } => "deposit_confirm",
            Self::PsbtWithdrawal { .. } => "psbt_withdrawal",
            Self::CompleteTxWithdrawal { .. } => "complete_tx_withdrawal",
            Self::WithdrawalConfirm { .. } => "withdrawal_confirm",
            Self::AddressVerify { .. } => "address_verify",
        }
    }

    /// Packed bytes to hash and sign
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);

        match self {
            Self::DepositConfirm {
                pod,
                operator,
                amount_sats,
                transaction_id,
            } => {
                buf.extend_from_slice(pod.as_bytes());
                buf.extend_from_slice(operator.as_bytes());
                push_u256(&mut buf, *amount_sats);
                buf.extend_from_slice(&transaction_id[..]);
                buf.push(0x01);
            }
            Self::PsbtWithdrawal {
                pod,
                amount_sats,
                psbt: body,
                withdraw_address,
            }
            | Self::CompleteTxWithdrawal {
                pod,
                amount_sats,
                transaction: body,
                withdraw_address,
            } => {
                buf.extend_from_slice(pod.as_bytes());
                push_u256(&mut buf, *amount_sats);
                buf.extend_from_slice(body);
                buf.extend_from_slice(withdraw_address.as_bytes());
            }
            Self::WithdrawalConfirm {
                pod,
                transaction,
                withdraw_address,
            } => {
                buf.extend_from_slice(pod.as_bytes());
                buf.extend_from_slice(transaction);
                buf.extend_from_slice(withdraw_address.as_bytes());
            }
            Self::AddressVerify {
                pod,
                operator,
                script,
                btc_address,
            } => {
                buf.extend_from_slice(pod.as_bytes());
                buf.extend_from_slice(operator.as_bytes());
                buf.extend_from_slice(script);
                buf.extend_from_slice(btc_address.as_bytes());
            }
        }

        buf
    }
}

/// uint256 big-endian word
fn push_u256(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&[0u8; 24]);
    buf.extend_from_slice(&value.to_be_bytes());
}
