//! PSBT Output Decoder
//!
//! Walks the BIP-174 key/value maps far enough to recover every output's value
//! and scriptPubKey, plus witness metadata from the input maps. Both PSBTv0
//! (outputs taken from the global unsigned transaction) and PSBTv2 (BIP-370,
//! per-output amount and script fields) are understood.
//!
//! Unknown and proprietary keys are skipped by their declared length. Input
//! outpoints are kept so a later signed transaction can be tied back to the PSBT
//! it came from.

use std::collections::BTreeSet;

use bitcoin::bech32::Hrp;
use bitcoin::consensus::deserialize;
use bitcoin::hashes::Hash;
use bitcoin::{OutPoint, ScriptBuf, Transaction, TxOut, Txid};
use thiserror::Error;

use super::payment::{check_payment, PaymentCheck};

/// `psbt` followed by 0xff
pub const PSBT_MAGIC: [u8; 5] = [0x70, 0x73, 0x62, 0x74, 0xff];

const PSBT_GLOBAL_UNSIGNED_TX: u8 = 0x00;
const PSBT_GLOBAL_INPUT_COUNT: u8 = 0x04;
const PSBT_GLOBAL_OUTPUT_COUNT: u8 = 0x05;
const PSBT_GLOBAL_VERSION: u8 = 0xfb;

const PSBT_IN_WITNESS_UTXO: u8 = 0x01;
const PSBT_IN_WITNESS_SCRIPT: u8 = 0x05;
const PSBT_IN_PREVIOUS_TXID: u8 = 0x0e;
const PSBT_IN_OUTPUT_INDEX: u8 = 0x0f;

const PSBT_OUT_AMOUNT: u8 = 0x03;
const PSBT_OUT_SCRIPT: u8 = 0x04;

/// PSBT decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PsbtError {
    #[error("missing PSBT magic bytes")]
    InvalidMagic,

    #[error("unexpected end of data at offset {offset}: needed {needed} more bytes")]
    UnexpectedEnd { offset: usize, needed: u64 },

    #[error("non-canonical compact size at offset {offset}")]
    NonCanonicalCompactSize { offset: usize },

    #[error("duplicate key {key} in {map} map")]
    DuplicateKey { map: &'static str, key: String },

    #[error("{map} map is missing {field}")]
    MissingField {
        map: &'static str,
        field: &'static str,
    },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unsupported PSBT version {0}")]
    UnsupportedVersion(u32),

    #[error("{count} trailing bytes after last output map")]
    TrailingBytes { count: usize },
}

/// Per-input metadata kept from the input maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PsbtInput {
    /// Outpoint spent; absent only in PSBTv2 maps that omit it
    pub previous_output: Option<OutPoint>,
    pub witness_utxo: Option<TxOut>,
    pub witness_script: Option<ScriptBuf>,
}

/// One output's value and locking script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsbtOutput {
    pub value_sats: u64,
    pub script_pubkey: ScriptBuf,
}

/// The parts of a PSBT the custody checks look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPsbt {
    version: u32,
    /// Txid of the PSBTv0 unsigned transaction
    unsigned_txid: Option<Txid>,
    inputs: Vec<PsbtInput>,
    outputs: Vec<PsbtOutput>,
}

impl DecodedPsbt {
    /// Decode a serialized PSBT
    pub fn parse(bytes: &[u8]) -> Result<Self, PsbtError> {
        if !bytes.starts_with(&PSBT_MAGIC) {
            return Err(PsbtError::InvalidMagic);
        }

        let mut reader = MapReader::new(bytes, PSBT_MAGIC.len());
        let global = reader.read_map("global")?;

        let version = match global.value(PSBT_GLOBAL_VERSION) {
            Some(value) => u32::from_le_bytes(fixed::<4>(value, "PSBT version")?),
            None => 0,
        };

        let (input_count, output_count, unsigned_tx) = match version {
            0 => {
                let raw_tx = global.value(PSBT_GLOBAL_UNSIGNED_TX).ok_or(
                    PsbtError::MissingField {
                        map: "global",
                        field: "unsigned transaction",
                    },
                )?;
                let tx = decode_unsigned_tx(raw_tx)?;
                (tx.input.len(), tx.output.len(), Some(tx))
            }
            2 => {
                if global.value(PSBT_GLOBAL_UNSIGNED_TX).is_some() {
                    return Err(PsbtError::InvalidField {
                        field: "unsigned transaction",
                        reason: "not allowed in PSBTv2".to_string(),
                    });
                }
                (
                    global.count(PSBT_GLOBAL_INPUT_COUNT, "input count")?,
                    global.count(PSBT_GLOBAL_OUTPUT_COUNT, "output count")?,
                    None,
                )
            }
            other => return Err(PsbtError::UnsupportedVersion(other)),
        };

        let mut inputs = Vec::with_capacity(input_count.min(256));
        for index in 0..input_count {
            let map = reader.read_map("input")?;
            let previous_output = match &unsigned_tx {
                Some(tx) => tx.input.get(index).map(|input| input.previous_output),
                None => v2_previous_output(&map)?,
            };
            inputs.push(PsbtInput {
                previous_output,
                witness_utxo: map
                    .value(PSBT_IN_WITNESS_UTXO)
                    .map(|value| {
                        deserialize::<TxOut>(value).map_err(|e| PsbtError::InvalidField {
                            field: "witness utxo",
                            reason: e.to_string(),
                        })
                    })
                    .transpose()?,
                witness_script: map
                    .value(PSBT_IN_WITNESS_SCRIPT)
                    .map(|value| ScriptBuf::from_bytes(value.to_vec())),
            });
        }

        let mut v2_outputs = Vec::with_capacity(output_count.min(256));
        for _ in 0..output_count {
            let map = reader.read_map("output")?;
            if unsigned_tx.is_none() {
                v2_outputs.push(v2_output(&map)?);
            }
        }

        let unsigned_txid = unsigned_tx.as_ref().map(Transaction::compute_txid);
        let outputs = match unsigned_tx {
            Some(tx) => tx
                .output
                .into_iter()
                .map(|out| PsbtOutput {
                    value_sats: out.value.to_sat(),
                    script_pubkey: out.script_pubkey,
                })
                .collect(),
            None => v2_outputs,
        };

        let remaining = reader.remaining();
        if remaining != 0 {
            return Err(PsbtError::TrailingBytes { count: remaining });
        }

        Ok(Self {
            version,
            unsigned_txid,
            inputs,
            outputs,
        })
    }

    /// 0 or 2
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn inputs(&self) -> &[PsbtInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PsbtOutput] {
        &self.outputs
    }

    /// Whether `tx` is this PSBT with signatures filled in.
    ///
    /// PSBTv0 compares txids, which leave out witness data. PSBTv2 has no
    /// unsigned transaction, so the spent outpoints and the outputs are compared
    /// in order.
    pub fn matches_transaction(&self, tx: &Transaction) -> bool {
        if let Some(txid) = self.unsigned_txid {
            return txid == tx.compute_txid();
        }

        self.inputs.len() == tx.input.len()
            && self.outputs.len() == tx.output.len()
            && self
                .inputs
                .iter()
                .zip(&tx.input)
                .all(|(input, txin)| input.previous_output == Some(txin.previous_output))
            && self.outputs.iter().zip(&tx.output).all(|(out, txout)| {
                out.value_sats == txout.value.to_sat() && out.script_pubkey == txout.script_pubkey
            })
    }

    /// Whether an output pays `expected_address` exactly `expected_amount`
    pub fn check_payment(
        &self,
        expected_address: &str,
        expected_amount: u64,
        hrp: &Hrp,
    ) -> PaymentCheck {
        check_payment(
            self.outputs
                .iter()
                .map(|out| (out.value_sats, out.script_pubkey.as_bytes())),
            expected_address,
            expected_amount,
            hrp,
        )
    }
}

/// True iff some PSBT output pays `expected_address` exactly `expected_amount`
pub fn verify_outputs(
    psbt: &[u8],
    expected_address: &str,
    expected_amount: u64,
    hrp: &Hrp,
) -> Result<bool, PsbtError> {
    let decoded = DecodedPsbt::parse(psbt)?;
    Ok(decoded
        .check_payment(expected_address, expected_amount, hrp)
        .is_paid())
}

fn decode_unsigned_tx(raw_tx: &[u8]) -> Result<Transaction, PsbtError> {
    let tx = deserialize::<Transaction>(raw_tx).map_err(|e| PsbtError::InvalidField {
        field: "unsigned transaction",
        reason: e.to_string(),
    })?;

    if tx
        .input
        .iter()
        .any(|input| !input.script_sig.is_empty() || !input.witness.is_empty())
    {
        return Err(PsbtError::InvalidField {
            field: "unsigned transaction",
            reason: "inputs carry signature data".to_string(),
        });
    }

    Ok(tx)
}

fn v2_previous_output(map: &KeyValueMap<'_>) -> Result<Option<OutPoint>, PsbtError> {
    let (Some(txid), Some(vout)) = (
        map.value(PSBT_IN_PREVIOUS_TXID),
        map.value(PSBT_IN_OUTPUT_INDEX),
    ) else {
        return Ok(None);
    };

    Ok(Some(OutPoint::new(
        Txid::from_byte_array(fixed::<32>(txid, "previous txid")?),
        u32::from_le_bytes(fixed::<4>(vout, "output index")?),
    )))
}

fn v2_output(map: &KeyValueMap<'_>) -> Result<PsbtOutput, PsbtError> {
    let amount = map.value(PSBT_OUT_AMOUNT).ok_or(PsbtError::MissingField {
        map: "output",
        field: "amount",
    })?;
    let amount = i64::from_le_bytes(fixed::<8>(amount, "output amount")?);
    let value_sats = u64::try_from(amount).map_err(|_| PsbtError::InvalidField {
        field: "output amount",
        reason: format!("negative value {}", amount),
    })?;

    let script = map.value(PSBT_OUT_SCRIPT).ok_or(PsbtError::MissingField {
        map: "output",
        field: "script",
    })?;

    Ok(PsbtOutput {
        value_sats,
        script_pubkey: ScriptBuf::from_bytes(script.to_vec()),
    })
}

fn fixed<const N: usize>(value: &[u8], field: &'static str) -> Result<[u8; N], PsbtError> {
    value.try_into().map_err(|_| PsbtError::InvalidField {
        field,
        reason: format!("expected {} bytes, got {}", N, value.len()),
    })
}

/// One decoded key/value map, in wire order
struct KeyValueMap<'a> {
    entries: Vec<(&'a [u8], &'a [u8])>,
}

impl<'a> KeyValueMap<'a> {
    /// Value of the key consisting of `key_type` alone (no key data)
    fn value(&self, key_type: u8) -> Option<&'a [u8]> {
        self.entries
            .iter()
            .find(|(key, _)| key.len() == 1 && key[0] == key_type)
            .map(|(_, value)| *value)
    }

    fn count(&self, key_type: u8, field: &'static str) -> Result<usize, PsbtError> {
        let value = self.value(key_type).ok_or(PsbtError::MissingField {
            map: "global",
            field,
        })?;

        let mut reader = MapReader::new(value, 0);
        let count = reader.read_compact_size()?;
        if reader.remaining() != 0 {
            return Err(PsbtError::InvalidField {
                field,
                reason: "trailing bytes after compact size".to_string(),
            });
        }

        usize::try_from(count).map_err(|_| PsbtError::InvalidField {
            field,
            reason: format!("{} does not fit in memory", count),
        })
    }
}

struct MapReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> MapReader<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_slice(&mut self, len: u64) -> Result<&'a [u8], PsbtError> {
        let available = self.remaining();
        let end = usize::try_from(len)
            .ok()
            .filter(|len| *len <= available)
            .map(|len| self.pos + len)
            .ok_or_else(|| PsbtError::UnexpectedEnd {
                offset: self.pos,
                needed: len - available as u64,
            })?;

        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PsbtError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_slice(N as u64)?);
        Ok(array)
    }

    /// Bitcoin compact size, rejecting non-minimal encodings
    fn read_compact_size(&mut self) -> Result<u64, PsbtError> {
        let offset = self.pos;
        let [prefix] = self.read_array::<1>()?;

        let (value, min) = match prefix {
            0xfd => (u16::from_le_bytes(self.read_array()?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.read_array()?) as u64, 0x1_0000),
            0xff => (u64::from_le_bytes(self.read_array()?), 0x1_0000_0000),
            n => return Ok(n as u64),
        };

        if value < min {
            return Err(PsbtError::NonCanonicalCompactSize { offset });
        }
        Ok(value)
    }

    fn read_map(&mut self, map: &'static str) -> Result<KeyValueMap<'a>, PsbtError> {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();

        loop {
            let key_len = self.read_compact_size()?;
            if key_len == 0 {
                break;
            }
            let key = self.read_slice(key_len)?;
            let value_len = self.read_compact_size()?;
            let value = self.read_slice(value_len)?;

            if !seen.insert(key) {
                return Err(PsbtError::DuplicateKey {
                    map,
                    key: hex::encode(key),
                });
            }
            entries.push((key, value));
        }

        Ok(KeyValueMap { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::bech32::hrp;
    use bitcoin::hashes::Hash;
    use bitcoin::psbt::raw;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, OutPoint, Psbt, Sequence, TxIn, Txid, Witness};

    const DEST: &str = "tb1qhlx2vgesz00s4gr6jqqhparezuhtryrkpnd7tm";
    const DEST_SCRIPT: &str = "0014bfcca6233013df0aa07a900170f479172eb19076";
    const POD_SCRIPT: &str = "0020ab38e9a92e1bdabd59bb4095f6e0a16f9e1e95c71b47465e86f480a80c536813";

    fn script(hex_script: &str) -> ScriptBuf {
        ScriptBuf::from_bytes(hex::decode(hex_script).unwrap())
    }

    fn withdrawal_tx(amount: u64) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([7u8; 32]), 1),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            }],
            output: vec![
                TxOut {
                    value: Amount::from_sat(amount),
                    script_pubkey: script(DEST_SCRIPT),
                },
                TxOut {
                    value: Amount::from_sat(400),
                    script_pubkey: script(POD_SCRIPT),
                },
            ],
        }
    }

    fn psbt_paying(amount: u64) -> Psbt {
        Psbt::from_unsigned_tx(withdrawal_tx(amount)).unwrap()
    }

    fn kv(key: &[u8], value: &[u8]) -> Vec<u8> {
        let mut out = vec![key.len() as u8];
        out.extend_from_slice(key);
        out.push(value.len() as u8);
        out.extend_from_slice(value);
        out
    }

    fn psbt_v2(amount: i64) -> Vec<u8> {
        let mut bytes = PSBT_MAGIC.to_vec();
        bytes.extend(kv(&[PSBT_GLOBAL_VERSION], &2u32.to_le_bytes()));
        bytes.extend(kv(&[PSBT_GLOBAL_INPUT_COUNT], &[1]));
        bytes.extend(kv(&[PSBT_GLOBAL_OUTPUT_COUNT], &[1]));
        bytes.push(0x00);
        bytes.extend(kv(&[PSBT_IN_PREVIOUS_TXID], &[7u8; 32]));
        bytes.extend(kv(&[PSBT_IN_OUTPUT_INDEX], &1u32.to_le_bytes()));
        bytes.extend(kv(&[0xfc, 0x01, 0x02], &[0xaa, 0xbb]));
        bytes.push(0x00);
        bytes.extend(kv(&[PSBT_OUT_AMOUNT], &amount.to_le_bytes()));
        bytes.extend(kv(&[PSBT_OUT_SCRIPT], &hex::decode(DEST_SCRIPT).unwrap()));
        bytes.push(0x00);
        bytes
    }

    #[test]
    fn test_psbt_paying_9599_sats_verifies() {
        let bytes = psbt_paying(9599).serialize();

        assert!(verify_outputs(&bytes, DEST, 9599, &hrp::TB).unwrap());
        assert!(!verify_outputs(&bytes, DEST, 9598, &hrp::TB).unwrap());
        assert!(!verify_outputs(&bytes, DEST, 9600, &hrp::TB).unwrap());
    }

    #[test]
    fn test_other_address_does_not_verify() {
        let bytes = psbt_paying(9599).serialize();
        let other = "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7";

        assert!(!verify_outputs(&bytes, other, 9599, &hrp::TB).unwrap());
        // same program under mainnet prefix is a different address
        assert!(!verify_outputs(&bytes, DEST, 9599, &hrp::BC).unwrap());
    }

    #[test]
    fn test_check_payment_reports_actual_amount() {
        let decoded = DecodedPsbt::parse(&psbt_paying(9000).serialize()).unwrap();

        assert_eq!(decoded.version(), 0);
        assert_eq!(decoded.outputs().len(), 2);
        assert_eq!(
            decoded.check_payment(DEST, 9599, &hrp::TB),
            PaymentCheck::AmountMismatch {
                vout: 0,
                actual: 9000
            }
        );
        assert_eq!(
            decoded.check_payment("tb1qexample", 9000, &hrp::TB),
            PaymentCheck::AddressNotFound
        );
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let mut psbt = psbt_paying(9599);
        psbt.unknown.insert(
            raw::Key {
                type_value: 0xee,
                key: vec![1, 2, 3],
            },
            vec![9u8; 300],
        );
        psbt.outputs[0].unknown.insert(
            raw::Key {
                type_value: 0xef,
                key: vec![],
            },
            vec![7u8; 3],
        );

        let bytes = psbt.serialize();
        assert!(verify_outputs(&bytes, DEST, 9599, &hrp::TB).unwrap());
    }

    #[test]
    fn test_input_witness_metadata_retained() {
        let witness_script = script("5221020202020202020202020202020202020202020202020202020202020202020251ae");
        let mut psbt = psbt_paying(9599);
        psbt.inputs[0].witness_script = Some(witness_script.clone());
        psbt.inputs[0].witness_utxo = Some(TxOut {
            value: Amount::from_sat(10_000),
            script_pubkey: script(POD_SCRIPT),
        });

        let decoded = DecodedPsbt::parse(&psbt.serialize()).unwrap();
        let input = &decoded.inputs()[0];
        assert_eq!(input.witness_script.as_ref(), Some(&witness_script));
        assert_eq!(
            input.witness_utxo.as_ref().map(|utxo| utxo.value.to_sat()),
            Some(10_000)
        );
    }

    #[test]
    fn test_psbt_v2_outputs() {
        let bytes = psbt_v2(9599);
        let decoded = DecodedPsbt::parse(&bytes).unwrap();

        assert_eq!(decoded.version(), 2);
        assert_eq!(decoded.inputs().len(), 1);
        assert!(verify_outputs(&bytes, DEST, 9599, &hrp::TB).unwrap());

        assert!(matches!(
            DecodedPsbt::parse(&psbt_v2(-1)),
            Err(PsbtError::InvalidField {
                field: "output amount",
                ..
            })
        ));
    }

    #[test]
    fn test_signed_transaction_matches_v0_psbt() {
        let decoded = DecodedPsbt::parse(&psbt_paying(9599).serialize()).unwrap();

        let mut signed = withdrawal_tx(9599);
        signed.input[0].witness.push([0x30u8; 71]);
        signed.input[0].witness.push([0x02u8; 33]);
        assert!(decoded.matches_transaction(&signed));

        let mut other_input = signed.clone();
        other_input.input[0].previous_output.vout = 0;
        assert!(!decoded.matches_transaction(&other_input));

        assert!(!decoded.matches_transaction(&withdrawal_tx(9598)));
    }

    #[test]
    fn test_signed_transaction_matches_v2_psbt() {
        let decoded = DecodedPsbt::parse(&psbt_v2(9599)).unwrap();
        assert_eq!(
            decoded.inputs()[0].previous_output,
            Some(OutPoint::new(Txid::from_byte_array([7u8; 32]), 1))
        );

        let mut tx = withdrawal_tx(9599);
        tx.output.truncate(1);
        assert!(decoded.matches_transaction(&tx));

        tx.input[0].previous_output.txid = Txid::from_byte_array([8u8; 32]);
        assert!(!decoded.matches_transaction(&tx));

        assert!(!decoded.matches_transaction(&withdrawal_tx(9599)));
    }

    #[test]
    fn test_psbt_v2_missing_script() {
        let mut bytes = PSBT_MAGIC.to_vec();
        bytes.extend(kv(&[PSBT_GLOBAL_VERSION], &2u32.to_le_bytes()));
        bytes.extend(kv(&[PSBT_GLOBAL_INPUT_COUNT], &[0]));
        bytes.extend(kv(&[PSBT_GLOBAL_OUTPUT_COUNT], &[1]));
        bytes.push(0x00);
        bytes.extend(kv(&[PSBT_OUT_AMOUNT], &9599i64.to_le_bytes()));
        bytes.push(0x00);

        assert_eq!(
            DecodedPsbt::parse(&bytes),
            Err(PsbtError::MissingField {
                map: "output",
                field: "script"
            })
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = psbt_paying(9599).serialize();
        bytes[4] = 0x00;
        assert_eq!(DecodedPsbt::parse(&bytes), Err(PsbtError::InvalidMagic));
        assert_eq!(DecodedPsbt::parse(&[]), Err(PsbtError::InvalidMagic));
    }

    #[test]
    fn test_truncated_and_trailing_data() {
        let bytes = psbt_paying(9599).serialize();

        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            DecodedPsbt::parse(truncated),
            Err(PsbtError::UnexpectedEnd { .. })
        ));

        let mut trailing = bytes.clone();
        trailing.push(0x00);
        assert_eq!(
            DecodedPsbt::parse(&trailing),
            Err(PsbtError::TrailingBytes { count: 1 })
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut bytes = PSBT_MAGIC.to_vec();
        bytes.extend(kv(&[0xee], &[1]));
        bytes.extend(kv(&[0xee], &[2]));
        bytes.push(0x00);

        assert!(matches!(
            DecodedPsbt::parse(&bytes),
            Err(PsbtError::DuplicateKey { map: "global", .. })
        ));
    }

    #[test]
    fn test_missing_unsigned_tx() {
        let mut bytes = PSBT_MAGIC.to_vec();
        bytes.push(0x00);

        assert_eq!(
            DecodedPsbt::parse(&bytes),
            Err(PsbtError::MissingField {
                map: "global",
                field: "unsigned transaction"
            })
        );
    }

    #[test]
    fn test_non_canonical_compact_size() {
        let mut bytes = PSBT_MAGIC.to_vec();
        bytes.extend([0xfd, 0x01, 0x00]);

        assert_eq!(
            DecodedPsbt::parse(&bytes),
            Err(PsbtError::NonCanonicalCompactSize { offset: 5 })
        );
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = PSBT_MAGIC.to_vec();
        bytes.extend(kv(&[PSBT_GLOBAL_VERSION], &1u32.to_le_bytes()));
        bytes.push(0x00);

        assert_eq!(
            DecodedPsbt::parse(&bytes),
            Err(PsbtError::UnsupportedVersion(1))
        );
    }
}
