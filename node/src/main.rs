// Copyright (c) 2026 Tally Contributors. MIT License.
// See LICENSE for details.

//! # Tally Node
//!
//! Entry point for the `tally-node` binary. Parses CLI arguments, initializes
//! logging, opens the sled store under the data directory, and runs one
//! operator command against it.
//!
//! - `init`    — create the data directory and database
//! - `seed`    — write confirmed transactions into chain state
//! - `submit`  — admit a batch of pending transactions
//! - `status`  — print pool and chain counts
//! - `keygen`  — generate a keypair for authoring transaction files
//! - `version` — print build version information
//!
//! Command output goes to stdout as JSON; logs go to stderr.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tally_protocol::admission::{AdmissionEngine, AdmissionResult};
use tally_protocol::config::{AdmissionConfig, TX_VERSION};
use tally_protocol::crypto::Keypair;
use tally_protocol::metrics::{AdmissionMetrics, Outcome};
use tally_protocol::storage::{SledStore, Store};
use tally_protocol::transaction::{AssetId, Transaction};
use tally_protocol::validation::BasicValidator;

use cli::{Commands, TallyNodeCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TallyNodeCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    match cli.command {
        Commands::Init => init_store(&cli.data_dir),
        Commands::Seed(args) => seed(&cli.data_dir, &args.file),
        Commands::Submit(args) => submit(&cli.data_dir, args).await,
        Commands::Status => status(&cli.data_dir),
        Commands::Keygen => keygen(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("db")
}

/// Opens the store, creating the data directory on first use.
fn open_store(data_dir: &Path) -> Result<SledStore> {
    let path = db_path(data_dir);
    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create database directory: {}", path.display()))?;
    let store = SledStore::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "database opened");
    Ok(store)
}

fn read_transactions(file: &Path) -> Result<Vec<Transaction>> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of transactions", file.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value).context("failed to encode output")?);
    Ok(())
}

fn init_store(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    let stats = store.stats().context("failed to read store stats")?;
    tracing::info!(data_dir = %data_dir.display(), "store initialized");
    print_json(&stats)
}

fn seed(data_dir: &Path, file: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    let txs = read_transactions(file)?;
    for (i, tx) in txs.iter().enumerate() {
        store
            .seed_confirmed(tx)
            .with_context(|| format!("failed to seed transaction #{i} ({})", tx.hash()))?;
    }
    tracing::info!(count = txs.len(), file = %file.display(), "seeded confirmed transactions");
    print_json(&store.stats().context("failed to read store stats")?)
}

/// One line of `submit` output.
#[derive(Debug, Serialize)]
struct SubmitLine {
    hash: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SubmitLine {
    fn new(tx: &Transaction, result: &AdmissionResult) -> Self {
        Self {
            hash: tx.hash().to_hex(),
            outcome: Outcome::of(result).as_str(),
            error: result.as_ref().err().map(|e| e.to_string()),
        }
    }
}

async fn submit(data_dir: &Path, args: cli::SubmitArgs) -> Result<()> {
    let store = open_store(data_dir)?;
    let txs = read_transactions(&args.file)?;
    let metrics = Arc::new(AdmissionMetrics::new().context("failed to register metrics")?);

    let engine = AdmissionEngine::builder(store, BasicValidator::default())
        .config(AdmissionConfig {
            batch_concurrency: args.concurrency,
        })
        .metrics(Arc::clone(&metrics))
        .on_admit(|tx| {
            tracing::info!(
                tx = %tx.hash(),
                inputs = tx.inputs.len(),
                outputs = tx.outputs.len(),
                at = %chrono::Utc::now().to_rfc3339(),
                "transaction entered pool"
            );
        })
        .build();

    let started = std::time::Instant::now();
    let results = engine.admit_batch(txs.clone()).await;
    tracing::info!(
        count = txs.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        admitted = metrics.count(Outcome::Admitted),
        "batch finished"
    );

    for (tx, result) in txs.iter().zip(&results) {
        print_json(&SubmitLine::new(tx, result))?;
    }

    if args.print_metrics {
        eprint!("{}", metrics.encode().context("failed to encode metrics")?);
    }
    Ok(())
}

fn status(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    print_json(&store.stats().context("failed to read store stats")?)
}

#[derive(Debug, Serialize)]
struct KeygenOutput {
    public_key: String,
    secret_key: String,
    asset_id: String,
}

fn keygen() -> Result<()> {
    let keypair = Keypair::generate();
    let public_key = keypair.public_key();
    print_json(&KeygenOutput {
        public_key: public_key.to_hex(),
        secret_key: keypair.secret_key_hex(),
        asset_id: AssetId::from_issuer(&public_key).to_hex(),
    })
}

fn print_version() {
    println!("tally-node {}", env!("CARGO_PKG_VERSION"));
    println!("tx format  v{}", TX_VERSION);
}
