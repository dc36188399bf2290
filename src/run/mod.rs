pub mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::engine::cancel::CancelToken;
use crate::engine::progress::ConsoleSink;
use crate::engine::report::RunReport;
use crate::engine::{Orchestrator, Settings};
use crate::model::amount::format_units;
use crate::model::{LegState, RunStatus, SwapState, WalletConnection};
use crate::venues::movement::{self, MovementProvider};
use crate::venues::{Collaborators, evm};

use config::{RuntimeConfig, WalletSource};

/// CLI-facing config for `run` (before env var resolution).
pub struct RunConfig {
    pub config: Option<PathBuf>,
    pub target_token: String,
    pub target_chain: String,
    pub address: Option<String>,
    pub dry_run: bool,
    pub provider: MovementProvider,
    pub slippage_bps: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub output: Option<PathBuf>,
}

/// CLI-facing config for `balances`.
pub struct BalancesConfig {
    pub config: Option<PathBuf>,
    pub address: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Entry point for the `run` command.
pub fn run(cli_config: &RunConfig) -> Result<()> {
    let config = RuntimeConfig::from_cli(cli_config)?;

    println!("=== coinbine run ===");
    match config.wallet.as_wallet().connection() {
        WalletConnection::Connected(account) => println!("Account:  {account}"),
        WalletConnection::Disconnected => println!("Account:  (none)"),
    }
    println!(
        "Target:   {} on chain {}",
        config.target.target_token, config.target.target_chain_id
    );
    println!("Chains:   {}", config.config.chains.len());
    println!("Tokens:   {}", config.config.tokens.len());
    println!("Provider: {:?}", config.provider);
    println!("Dry run:  {}", config.dry_run);
    println!("Slippage: {} bps", config.config.slippage_bps);
    println!();

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(run_async(config))
}

async fn run_async(config: RuntimeConfig) -> Result<()> {
    // reqwest and alloy's HTTP transport share this TLS provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let (registry, _) = config.config.resolve()?;
    let chains = evm::build_chain_clients(&registry)?;
    let (swaps, bridge) = movement::build(
        config.provider,
        config.wallet.signer(),
        config.config.slippage_bps,
        config.config.simulated_fee_bps,
        config.dry_run,
    )?;
    let orchestrator =
        Orchestrator::from_config(&config.config, Collaborators { chains, swaps, bridge })?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nCancelling: no new transactions will be submitted.");
            cancel.cancel();
        })
        .context("installing Ctrl-C handler")?;
    }

    let report = orchestrator
        .run(
            config.wallet.as_wallet(),
            &config.target,
            Arc::new(ConsoleSink),
            &cancel,
        )
        .await?;

    print_summary(&report);

    if let Some(output) = &config.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(output, json)
            .with_context(|| format!("writing report to {}", output.display()))?;
        println!("Report written to {}", output.display());
    }

    if report.status == RunStatus::Failed {
        bail!(
            "run {} failed: {}",
            report.run_id,
            report.abort_reason.as_deref().unwrap_or("unknown reason")
        );
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("── Summary ──");
    println!("Run:      {}", report.run_id);
    println!("Status:   {}", report.status);
    println!("Duration: {:.1}s", report.duration_secs());

    if !report.swaps.is_empty() {
        println!("Swaps:");
        for swap in &report.swaps {
            let state = match &swap.state {
                SwapState::Skipped { reason } => format!("skipped ({reason:?})"),
                SwapState::Succeeded { amount_out, .. } => format!("ok, received {amount_out}"),
                SwapState::Failed { error } => format!("FAILED: {error}"),
                SwapState::SubmittedUnknown => "submitted, outcome unknown".to_string(),
                SwapState::Cancelled => "cancelled".to_string(),
            };
            println!(
                "  [{}] {} -> {}: {state}",
                swap.chain_id, swap.from_token, swap.to_token
            );
        }
    }

    if let Some(bridge) = &report.bridge {
        if bridge.is_noop() {
            println!("Bridge:   nothing to move");
        } else {
            println!("Bridge legs:");
            for leg in &bridge.legs {
                let state = match &leg.state {
                    LegState::Landed { amount_received, .. } => {
                        format!("landed, received {amount_received}")
                    }
                    LegState::Failed { error } => format!("FAILED: {error}"),
                    LegState::SubmittedUnknown => "submitted, outcome unknown".to_string(),
                    LegState::NotAttempted => "not attempted".to_string(),
                };
                println!(
                    "  [{}] {} {}: {state}",
                    leg.source_chain_id, leg.amount, leg.token
                );
            }
        }
    }

    if !report.failures.is_empty() {
        println!("Isolated failures:");
        for failure in &report.failures {
            println!("  - {failure}");
        }
    }
}

/// Entry point for the `balances` command.
pub fn balances(cli_config: &BalancesConfig) -> Result<()> {
    let mut config = config::load_config(cli_config.config.as_deref())?;
    if let Some(timeout_secs) = cli_config.timeout_secs {
        config.chain_timeout_secs = timeout_secs;
    }
    let wallet = WalletSource::resolve(cli_config.address.as_deref())?;
    let account = match wallet.as_wallet().connection() {
        WalletConnection::Connected(account) => account,
        WalletConnection::Disconnected => {
            println!("No wallet connected.");
            bail!("pass --address or set {}", config::PRIVATE_KEY_ENV);
        }
    };

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(async move {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let (registry, manifest) = config.resolve()?;
        let chains = evm::build_chain_clients(&registry)?;
        let (swaps, bridge) =
            movement::build(MovementProvider::Simulated, None, 0.0, 0, true)?;
        let orchestrator = Orchestrator::new(
            registry,
            manifest,
            Collaborators { chains, swaps, bridge },
            Settings {
                swap_native: true,
                ..Settings::from_config(&config)
            },
        )?;

        let (_, aggregation) = orchestrator
            .discover(&account, &ConsoleSink, &CancelToken::new())
            .await?;

        println!();
        println!("── Balances for {account} ──");
        for group in &aggregation.groups {
            println!("{} ({})", group.chain_name, group.chain_id);
            for entry in &group.entries {
                println!(
                    "  {:<6} {}",
                    entry.token,
                    format_units(entry.raw_amount, entry.decimals)
                );
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
