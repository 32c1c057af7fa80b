//! Witness Address Derivation
//!
//! P2WSH scriptPubKey = `OP_0 OP_PUSHBYTES_32 sha256(witness_script)` (BIP-141),
//! rendered as bech32 (v0, BIP-173) or bech32m (v1+, BIP-350). The human-readable
//! prefix always comes from configuration.

use bitcoin::bech32::{segwit, Fe32, Hrp};
use bitcoin::opcodes::all::{OP_PUSHBYTES_32, OP_PUSHNUM_1};
use bitcoin::opcodes::OP_0;
use bitcoin::ScriptBuf;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a P2WSH output script
pub const P2WSH_SCRIPT_PUBKEY_LEN: usize = 34;

/// Address derivation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("script is not a witness program")]
    NotWitnessProgram,

    #[error("bech32 encoding failed: {0}")]
    Encoding(String),

    #[error("invalid bech32 address: {0}")]
    Decoding(String),

    #[error("address prefix '{found}' does not match network prefix '{expected}'")]
    NetworkMismatch { expected: String, found: String },
}

/// P2WSH output script paying to `witness_script`
pub fn get_script_pub_key(witness_script: &[u8]) -> ScriptBuf {
    let script_hash = Sha256::digest(witness_script);

    let mut bytes = Vec::with_capacity(P2WSH_SCRIPT_PUBKEY_LEN);
    bytes.push(OP_0.to_u8());
    bytes.push(OP_PUSHBYTES_32.to_u8());
    bytes.extend_from_slice(&script_hash);
    ScriptBuf::from_bytes(bytes)
}

/// Witness version and program of a witness output script
pub fn witness_program(script_pubkey: &[u8]) -> Option<(u8, &[u8])> {
    if script_pubkey.len() < 4 || script_pubkey.len() > 42 {
        return None;
    }

    let version = match script_pubkey[0] {
        0x00 => 0,
        op if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_1.to_u8() + 15).contains(&op) => {
            op - OP_PUSHNUM_1.to_u8() + 1
        }
        _ => return None,
    };

    let push_len = script_pubkey[1] as usize;
    if !(2..=40).contains(&push_len) || script_pubkey.len() != push_len + 2 {
        return None;
    }

    Some((version, &script_pubkey[2..]))
}

/// Bech32/bech32m address of a witness output script
pub fn to_bech32_address(script_pubkey: &[u8], hrp: &Hrp) -> Result<String, AddressError> {
    let (version, program) =
        witness_program(script_pubkey).ok_or(AddressError::NotWitnessProgram)?;

    let version = Fe32::try_from(version).map_err(|e| AddressError::Encoding(e.to_string()))?;

    segwit::encode(*hrp, version, program).map_err(|e| AddressError::Encoding(e.to_string()))
}

/// Output script of a bech32/bech32m address, which must carry `hrp`
pub fn decode_bech32_address(address: &str, hrp: &Hrp) -> Result<ScriptBuf, AddressError> {
    let (found, version, program) =
        segwit::decode(address).map_err(|e| AddressError::Decoding(e.to_string()))?;

    if found.to_lowercase() != hrp.to_lowercase() {
        return Err(AddressError::NetworkMismatch {
            expected: hrp.to_lowercase(),
            found: found.to_lowercase(),
        });
    }

    let version_op = match version.to_u8() {
        0 => OP_0.to_u8(),
        v => OP_PUSHNUM_1.to_u8() + v - 1,
    };

    let mut bytes = Vec::with_capacity(program.len() + 2);
    bytes.push(version_op);
    bytes.push(program.len() as u8);
    bytes.extend_from_slice(&program);
    Ok(ScriptBuf::from_bytes(bytes))
}

/// P2WSH address of a witness script
pub fn witness_script_address(witness_script: &[u8], hrp: &Hrp) -> Result<String, AddressError> {
    to_bech32_address(get_script_pub_key(witness_script).as_bytes(), hrp)
}
