//! Bitcoin Verification Module
//!
//! Witness script parsing, P2WSH address derivation, and output checks over
//! PSBTs and raw transactions. Everything here is pure.

pub mod address;
pub mod payment;
pub mod psbt;
pub mod script;
pub mod transaction;

pub use address::{
    decode_bech32_address, get_script_pub_key, to_bech32_address, witness_script_address,
    AddressError,
};
pub use payment::PaymentCheck;
pub use psbt::{verify_outputs, DecodedPsbt, PsbtError, PsbtInput, PsbtOutput};
pub use script::{extract_public_keys, MultisigScript, MultisigTemplate, ScriptError};
pub use transaction::{
    check_transaction_payment, decode_transaction, verify_transaction_outputs, TransactionError,
};
