//! # CLI Interface
//!
//! Defines the command-line argument structure for `tally-node` using
//! `clap` derive. Global options pick the data directory and log format;
//! each subcommand is one operator action against the store.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tally_protocol::config::DEFAULT_BATCH_CONCURRENCY;

use crate::logging::LogFormat;

/// Tally admission engine operator tool.
///
/// Opens the node's sled store, seeds confirmed transactions, submits
/// batches of pending transactions through the admission engine, and
/// reports store status.
#[derive(Parser, Debug)]
#[command(
    name = "tally-node",
    about = "Tally admission engine operator tool",
    version,
    propagate_version = true
)]
pub struct TallyNodeCli {
    /// Directory holding the node's sled database.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "TALLY_DATA_DIR",
        default_value = "./tally-data"
    )]
    pub data_dir: PathBuf,

    /// Log output format.
    #[arg(long, global = true, env = "TALLY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Tally node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and the database if missing.
    Init,
    /// Write confirmed transactions straight into chain state.
    Seed(SeedArgs),
    /// Admit a batch of pending transactions.
    Submit(SubmitArgs),
    /// Print pool and chain counts as JSON.
    Status,
    /// Generate a keypair and print it with its asset id.
    Keygen,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `seed` subcommand.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// JSON file holding an array of transactions.
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

/// Arguments for the `submit` subcommand.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// JSON file holding an array of transactions.
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Maximum number of admissions running at once.
    #[arg(long, env = "TALLY_BATCH_CONCURRENCY", default_value_t = DEFAULT_BATCH_CONCURRENCY)]
    pub concurrency: usize,

    /// Print the Prometheus exposition to stderr when done.
    #[arg(long)]
    pub print_metrics: bool,
}
