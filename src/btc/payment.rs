//! Output Payment Matching
//!
//! Shared by the PSBT decoder and the raw transaction verifier: find the output
//! paying an address and compare its value.

use bitcoin::bech32::Hrp;

use super::address::decode_bech32_address;

/// Outcome of looking for a payment among transaction outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCheck {
    /// Output `vout` pays the address the exact amount
    Paid { vout: usize },
    /// Address is paid, but not the expected amount (first such output)
    AmountMismatch { vout: usize, actual: u64 },
    /// No output pays the address
    AddressNotFound,
}

impl PaymentCheck {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentCheck::Paid { .. })
    }
}

/// Match `(value, script_pubkey)` outputs against an address and amount.
///
/// The address is decoded against `hrp` and compared by output script. An address
/// that does not decode (bad checksum, mixed case, wrong prefix) is never paid.
pub fn check_payment<'a, I>(
    outputs: I,
    expected_address: &str,
    expected_amount: u64,
    hrp: &Hrp,
) -> PaymentCheck
where
    I: IntoIterator<Item = (u64, &'a [u8])>,
{
    let Ok(expected) = decode_bech32_address(expected_address.trim(), hrp) else {
        return PaymentCheck::AddressNotFound;
    };
    let mut mismatch = None;

    for (vout, (value, script_pubkey)) in outputs.into_iter().enumerate() {
        if script_pubkey != expected.as_bytes() {
            continue;
        }

        if value == expected_amount {
            return PaymentCheck::Paid { vout };
        }
        mismatch.get_or_insert(PaymentCheck::AmountMismatch { vout, actual: value });
    }

    mismatch.unwrap_or(PaymentCheck::AddressNotFound)
}
