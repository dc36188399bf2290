use clap::Parser;
use tracing_subscriber::EnvFilter;

use coinbine::{cli, example, list_chains, run, schema, validate};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coinbine=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Schema => schema::run(),
        cli::Command::Example => example::run(),
        cli::Command::Validate { file } => validate::run(&file),
        cli::Command::Chains { config } => list_chains::run(config.as_deref()),
        cli::Command::Balances {
            config,
            address,
            timeout_secs,
        } => run::balances(&run::BalancesConfig {
            config,
            address,
            timeout_secs,
        }),
        cli::Command::Run {
            config,
            target_token,
            target_chain,
            address,
            dry_run,
            provider,
            slippage_bps,
            timeout_secs,
            output,
        } => run::run(&run::RunConfig {
            config,
            target_token,
            target_chain,
            address,
            dry_run,
            provider,
            slippage_bps,
            timeout_secs,
            output,
        }),
    }
}
