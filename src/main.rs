//! BitDSM Custody CLI
//!
//! Offline tooling around the custody core: inspect pod scripts, derive
//! addresses, check PSBTs and transactions, and sign or recover operator
//! attestations.

use std::error::Error;
use std::sync::Arc;

use bitdsm::auth::{recover_signer, EthSignedMessageHasher, MessageHasher};
use bitdsm::btc::{
    check_transaction_payment, decode_transaction, witness_script_address, DecodedPsbt,
};
use bitdsm::common::logging::init_from_config;
use bitdsm::{
    CanonicalPayload, CustodyConfig, CustodyService, MemoryPodManager, OperatorKey,
    TracingEventSink,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bitdsm")]
#[command(about = "BitDSM custody core tooling")]
struct Cli {
    /// TOML config file (defaults to BITDSM_* environment variables)
    #[arg(short, long, env = "BITDSM_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the public keys of a multisig witness script
    ExtractKeys {
        /// Witness script (hex)
        #[arg(short, long)]
        script: String,
    },

    /// Derive the P2WSH address of a witness script
    Address {
        /// Witness script (hex)
        #[arg(short, long)]
        script: String,
    },

    /// Check that a PSBT pays an address an exact amount
    VerifyPsbt {
        /// Serialized PSBT (hex)
        #[arg(short, long)]
        psbt: String,

        #[arg(short, long)]
        address: String,

        /// Amount in satoshis
        #[arg(short = 'm', long)]
        amount: u64,
    },

    /// Check that a raw transaction pays an address an exact amount
    VerifyTx {
        /// Consensus-encoded transaction (hex)
        #[arg(short, long)]
        tx: String,

        #[arg(short, long)]
        address: String,

        /// Amount in satoshis
        #[arg(short = 'm', long)]
        amount: u64,
    },

    /// Sign a canonical payload with an operator key
    SignPayload {
        /// Operator secret key (hex)
        #[arg(short, long, env = "BITDSM_OPERATOR_KEY")]
        key: String,

        /// Payload bytes (hex)
        #[arg(short, long)]
        payload: String,
    },

    /// Recover the Ethereum address that signed a payload
    Recover {
        /// Payload bytes (hex)
        #[arg(short, long)]
        payload: String,

        /// 65-byte signature (hex)
        #[arg(short, long)]
        signature: String,
    },

    /// Print the effective configuration
    Config,

    /// Run a deposit and address verification against in-memory pods
    Demo,
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CustodyConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => CustodyConfig::from_env()?,
    };
    init_from_config(&config)?;

    let hrp = config.hrp()?;

    match cli.command {
        Commands::ExtractKeys { script } => {
            let parsed = config.multisig_template()?.parse(&decode_hex(&script)?)?;
            println!("threshold: {}", parsed.threshold());
            for (i, key) in parsed.keys().iter().enumerate() {
                println!("key {}: {}", i, hex::encode(key.to_bytes()));
            }
        }
        Commands::Address { script } => {
            println!("{}", witness_script_address(&decode_hex(&script)?, &hrp)?);
        }
        Commands::VerifyPsbt {
            psbt,
            address,
            amount,
        } => {
            let decoded = DecodedPsbt::parse(&decode_hex(&psbt)?)?;
            println!("{:?}", decoded.check_payment(&address, amount, &hrp));
        }
        Commands::VerifyTx {
            tx,
            address,
            amount,
        } => {
            let tx = decode_transaction(&decode_hex(&tx)?)?;
            println!("txid: {}", tx.compute_txid());
            println!("{:?}", check_transaction_payment(&tx, &address, amount, &hrp));
        }
        Commands::SignPayload { key, payload } => {
            let key = OperatorKey::from_hex(&key)?;
            let signature = key.sign_payload(&decode_hex(&payload)?);
            println!("signer: {}", key.address().to_checksum());
            println!("signature: 0x{}", hex::encode(signature));
        }
        Commands::Recover { payload, signature } => {
            let digest = EthSignedMessageHasher.hash(&decode_hex(&payload)?);
            let signer = recover_signer(&digest, &decode_hex(&signature)?)?;
            println!("{}", signer.to_checksum());
        }
        Commands::Config => {
            println!("{}", config.summary());
        }
        Commands::Demo => run_demo(&config)?,
    }

    Ok(())
}

/// Hex argument, `0x` prefix optional
fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = value.trim();
    hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
}

fn run_demo(config: &CustodyConfig) -> Result<(), Box<dyn Error>> {
    let manager = Arc::new(MemoryPodManager::new());
    let service = CustodyService::new(config, manager.clone(), Arc::new(TracingEventSink))?;

    let operator = OperatorKey::generate();
    let user = OperatorKey::generate();
    let pod = user.address();

    manager.register_pod(pod, operator.address())?;
    manager.set_operator_btc_public_key(
        operator.address(),
        operator.btc_public_key().to_bytes().to_vec(),
    )?;

    let script = service
        .template()
        .build_script(&[user.btc_public_key(), operator.btc_public_key()])?;
    let btc_address = witness_script_address(script.as_bytes(), service.hrp())?;

    let signature = operator.sign_payload(
        &CanonicalPayload::AddressVerify {
            pod,
            operator: operator.address(),
            script: script.as_bytes(),
            btc_address: &btc_address,
        }
        .encode(),
    );
    let verified = service.verify_btc_address(
        &operator.address(),
        &pod,
        script.as_bytes(),
        &btc_address,
        &signature,
    )?;
    println!("verified pod address {}", verified.btc_address);

    let txid = [0x42u8; 32];
    manager.open_deposit_request(&pod, txid, 50_000)?;
    let signature = operator.sign_payload(
        &CanonicalPayload::DepositConfirm {
            pod,
            operator: operator.address(),
            amount_sats: 50_000,
            transaction_id: &txid,
        }
        .encode(),
    );
    let confirmation = service.confirm_deposit(&operator.address(), &pod, &signature)?;
    println!(
        "confirmed deposit of {} sats into pod {}",
        confirmation.amount_sats, confirmation.pod
    );

    Ok(())
}
