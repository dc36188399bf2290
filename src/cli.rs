use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::venues::movement::MovementProvider;

/// Coinbine: consolidate one account's token holdings across EVM chains
/// into a single asset on a single chain.
#[derive(Parser)]
#[command(name = "coinbine", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one consolidation: discover balances, swap into the target token, bridge to the target chain
    Run {
        /// Path to the config JSON file (default: ~/.coinbine/config.json, else built-in defaults)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Token every holding should end up as
        #[arg(long, default_value = "USDC")]
        target_token: String,

        /// Chain (name or chain id) every holding should end up on
        #[arg(long, default_value = "base")]
        target_chain: String,

        /// Watch-only account address; implies --dry-run
        #[arg(long)]
        address: Option<String>,

        /// Quote and report without submitting transactions
        #[arg(long)]
        dry_run: bool,

        /// Swap and bridge backend
        #[arg(long, value_enum, default_value = "lifi")]
        provider: MovementProvider,

        /// Slippage tolerance in basis points (overrides the config file)
        #[arg(long)]
        slippage_bps: Option<f64>,

        /// Per-chain RPC timeout in seconds (overrides the config file)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Write the run report as JSON to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show unified and per-chain balances without moving anything
    Balances {
        /// Path to the config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Account address (default: derived from COINBINE_PRIVATE_KEY)
        #[arg(long)]
        address: Option<String>,

        /// Per-chain RPC timeout in seconds (overrides the config file)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// List the configured chains
    Chains {
        /// Path to the config JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a config JSON file
    Validate {
        /// Path to the config JSON file
        file: PathBuf,
    },

    /// Output the JSON schema for the config file
    Schema,

    /// Output the built-in default config as JSON
    Example,
}
