//! Multisig Witness Script Parsing
//!
//! Pods hold their coins in a P2WSH output whose witness script is a bare
//! M-of-N multisig:
//!
//! ```text
//! OP_M  <0x21> <pubkey 1> ... <0x21> <pubkey N>  OP_N  OP_CHECKMULTISIG
//! ```
//!
//! Only this exact shape is accepted. Keys are returned in push order.

use bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_PUSHBYTES_33, OP_PUSHNUM_1};
use bitcoin::script::Builder as ScriptBuilder;
use bitcoin::{CompressedPublicKey, PublicKey, ScriptBuf};
use thiserror::Error;

/// Compressed public key length
pub const PUBKEY_LEN: usize = 33;

/// Push byte plus key
const KEY_SLOT_LEN: usize = 1 + PUBKEY_LEN;

/// Script parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unexpected byte 0x{found:02x} at offset {offset}, expected 0x{expected:02x}")]
    UnexpectedOpcode {
        offset: usize,
        expected: u8,
        found: u8,
    },

    #[error("invalid public key at offset {offset}: {reason}")]
    InvalidPublicKey { offset: usize, reason: String },

    #[error("expected {expected} public keys, got {actual}")]
    KeyCount { expected: usize, actual: usize },
}

/// Shape of the multisig scripts pods are expected to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultisigTemplate {
    threshold: u8,
    total: u8,
}

impl Default for MultisigTemplate {
    fn default() -> Self {
        Self::TWO_OF_TWO
    }
}

impl MultisigTemplate {
    /// The pod template: user key plus operator key, both required
    pub const TWO_OF_TWO: Self = Self {
        threshold: 2,
        total: 2,
    };

    /// `None` unless `1 <= threshold <= total <= 16`
    pub fn new(threshold: u8, total: u8) -> Option<Self> {
        if threshold == 0 || threshold > total || total > 16 {
            return None;
        }
        Some(Self { threshold, total })
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn total(&self) -> u8 {
        self.total
    }

    /// Exact byte length of a matching script
    pub fn script_len(&self) -> usize {
        3 + KEY_SLOT_LEN * self.total as usize
    }

    /// Parse a witness script against this template
    pub fn parse(&self, script: &[u8]) -> Result<MultisigScript, ScriptError> {
        let expected_len = self.script_len();
        if script.len() != expected_len {
            return Err(ScriptError::InvalidLength {
                expected: expected_len,
                actual: script.len(),
            });
        }

        expect_byte(script, 0, pushnum(self.threshold))?;

        let mut keys = Vec::with_capacity(self.total as usize);
        for slot in 0..self.total as usize {
            let offset = 1 + slot * KEY_SLOT_LEN;
            expect_byte(script, offset, OP_PUSHBYTES_33.to_u8())?;

            let key_bytes = &script[offset + 1..offset + KEY_SLOT_LEN];
            let key = CompressedPublicKey::from_slice(key_bytes).map_err(|e| {
                ScriptError::InvalidPublicKey {
                    offset: offset + 1,
                    reason: e.to_string(),
                }
            })?;
            keys.push(key);
        }

        expect_byte(script, expected_len - 2, pushnum(self.total))?;
        expect_byte(script, expected_len - 1, OP_CHECKMULTISIG.to_u8())?;

        Ok(MultisigScript {
            threshold: self.threshold,
            keys,
        })
    }

    /// Build the witness script for `keys`, kept in the given order
    pub fn build_script(&self, keys: &[CompressedPublicKey]) -> Result<ScriptBuf, ScriptError> {
        if keys.len() != self.total as usize {
            return Err(ScriptError::KeyCount {
                expected: self.total as usize,
                actual: keys.len(),
            });
        }

        let builder = keys.iter().fold(
            ScriptBuilder::new().push_int(self.threshold as i64),
            |builder, key| builder.push_key(&PublicKey::from(*key)),
        );

        Ok(builder
            .push_int(self.total as i64)
            .push_opcode(OP_CHECKMULTISIG)
            .into_script())
    }
}

/// A parsed multisig witness script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigScript {
    threshold: u8,
    keys: Vec<CompressedPublicKey>,
}

impl MultisigScript {
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Keys in push order
    pub fn keys(&self) -> &[CompressedPublicKey] {
        &self.keys
    }

    /// Whether `key` (33-byte compressed encoding) is one of the signers
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.keys.iter().any(|k| k.to_bytes().as_slice() == key)
    }
}

/// Extract both keys of a 2-of-2 pod script
pub fn extract_public_keys(
    script: &[u8],
) -> Result<(CompressedPublicKey, CompressedPublicKey), ScriptError> {
    let parsed = MultisigTemplate::TWO_OF_TWO.parse(script)?;
    Ok((parsed.keys[0], parsed.keys[1]))
}

fn pushnum(n: u8) -> u8 {
    debug_assert!((1..=16).contains(&n));
    OP_PUSHNUM_1.to_u8() + (n - 1)
}

fn expect_byte(script: &[u8], offset: usize, expected: u8) -> Result<(), ScriptError> {
    let found = script[offset];
    if found != expected {
        return Err(ScriptError::UnexpectedOpcode {
            offset,
            expected,
            found,
        });
    }
    Ok(())
}
