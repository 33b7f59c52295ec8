//! Sequencer node for the DEX predeploy.
//!
//! Reads an ordered transaction log, executes every call to the DEX predeploy
//! through the in-memory DEX library and prints per-block receipts and state
//! roots.
//!
//! Run with: `cargo run -p dex-node -- replay txs.log`

mod dex;
mod primitives;
mod selectors;
mod sequencer;

use crate::dex::DexHandler;
use crate::primitives::Transaction;
use crate::sequencer::Sequencer;
use ::dex::{whole_tokens, DexConfig, GovernanceConfig, PoolManager, DAY};
use alloy_primitives::{address, Address};
use clap::{Args, Parser, Subcommand};
use eyre::WrapErr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// DEX predeploy address
pub const DEX_PREDEPLOY_ADDRESS: Address = address!("4200000000000000000000000000000000000042");

#[derive(Parser, Debug)]
#[command(version, about = "Sequencer node for the DEX predeploy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a transaction log and print receipts and state roots
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Transaction log: one `<timestamp> <caller> <0x-calldata>` per line
    file: PathBuf,

    /// Swap fee in basis points
    #[arg(long, default_value_t = 30)]
    fee_bps: u32,

    /// Voting period in seconds
    #[arg(long, default_value_t = 3 * DAY)]
    voting_period: u64,

    /// Balance needed to create a proposal, in whole DEXG
    #[arg(long, default_value_t = 1_000)]
    proposal_threshold: u64,

    /// Allow voters to replace an earlier vote
    #[arg(long)]
    allow_vote_change: bool,

    /// Receiver of the initial DEXG supply
    #[arg(long)]
    genesis: Option<Address>,

    /// Transactions per block
    #[arg(long, default_value_t = 100)]
    block_size: usize,
}

fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Command::Replay(args) => replay(args),
    }
}

fn replay(args: ReplayArgs) -> eyre::Result<()> {
    let config = DexConfig::default().with_fee_bps(args.fee_bps);
    config.validate().wrap_err("invalid DEX configuration")?;
    let governance = GovernanceConfig::default()
        .with_voting_period(args.voting_period)
        .with_proposal_threshold(whole_tokens(args.proposal_threshold))
        .with_vote_change(args.allow_vote_change);

    let mut pool_manager = PoolManager::with_config(config, governance);
    if let Some(holder) = args.genesis {
        pool_manager = pool_manager.with_genesis(holder, 0)?;
    }

    let transactions = read_transactions(&args.file)?;
    tracing::info!(count = transactions.len(), file = %args.file.display(), "Loaded transactions");

    let mut sequencer = Sequencer::new(Arc::new(DexHandler::new(pool_manager)), args.block_size);
    let blocks = sequencer.execute_all(transactions);

    for block in &blocks {
        println!(
            "block {} ts={} txs={} failed={} root={}",
            block.number,
            block.timestamp,
            block.transactions.len(),
            block.failed(),
            block.state_root
        );
        for (tx, receipt) in block.transactions.iter().zip(&block.receipts) {
            match &receipt.error {
                None => println!(
                    "  {} ok logs={} return=0x{}",
                    receipt.tx_hash,
                    receipt.logs.len(),
                    hex::encode(&receipt.return_data)
                ),
                Some(error) => {
                    println!("  {} failed caller={}: {}", receipt.tx_hash, tx.caller, error)
                }
            }
        }
    }
    println!("state root {}", sequencer.dex_handler().state_root());

    Ok(())
}

fn read_transactions(path: &Path) -> eyre::Result<Vec<Transaction>> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;

    let mut transactions = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if let Some(tx) = Transaction::parse_line(line)
            .wrap_err_with(|| format!("{}:{}", path.display(), index + 1))?
        {
            transactions.push(tx);
        }
    }
    Ok(transactions)
}
