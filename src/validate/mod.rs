mod chains;
mod tokens;

use std::path::Path;

use thiserror::Error;

use crate::model::ConsolidationConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No chains configured")]
    NoChains,

    #[error("Unknown built-in chain `{name}`; give a full chain definition instead")]
    UnknownBuiltinChain { name: String },

    #[error("Duplicate chain id {chain_id} (`{first}` and `{second}`)")]
    DuplicateChainId {
        chain_id: u64,
        first: String,
        second: String,
    },

    #[error("Duplicate chain name `{name}`")]
    DuplicateChainName { name: String },

    #[error("Chain `{chain}` has an invalid rpc_url `{url}`")]
    InvalidRpcUrl { chain: String, url: String },

    #[error("Token `{symbol}` is configured more than once")]
    DuplicateToken { symbol: String },

    #[error("Token `{symbol}` has no deployments")]
    TokenWithoutDeployments { symbol: String },

    #[error("Token `{symbol}` references unknown chain `{chain}`")]
    UnknownChain { symbol: String, chain: String },

    #[error("Token `{symbol}` lists chain `{chain}` twice")]
    DuplicateDeployment { symbol: String, chain: String },

    #[error("Token `{symbol}` on `{chain}` has an invalid address `{address}`")]
    InvalidAddress {
        symbol: String,
        chain: String,
        address: String,
    },

    #[error("chain_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("slippage_bps {value} outside valid range 0..=10000")]
    InvalidSlippage { value: f64 },
}

/// Load and fully validate a config from a JSON file.
pub fn load_and_validate(path: &Path) -> Result<ConsolidationConfig, Vec<ValidationError>> {
    let contents = std::fs::read_to_string(path).map_err(|e| vec![ValidationError::Io(e)])?;
    let config: ConsolidationConfig =
        serde_json::from_str(&contents).map_err(|e| vec![ValidationError::Json(e)])?;
    validate(&config)?;
    Ok(config)
}

/// Validate a config, collecting all errors.
pub fn validate(config: &ConsolidationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    errors.extend(chains::check_chains(config));
    errors.extend(tokens::check_tokens(config));

    if config.chain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if !(0.0..=10_000.0).contains(&config.slippage_bps) {
        errors.push(ValidationError::InvalidSlippage {
            value: config.slippage_bps,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Entry point for the `validate` command.
pub fn run(path: &Path) -> anyhow::Result<()> {
    match load_and_validate(path) {
        Ok(config) => {
            println!(
                "Config is valid. {} chains, {} tokens.",
                config.chains.len(),
                config.tokens.len()
            );
            Ok(())
        }
        Err(errors) => {
            eprintln!("Validation failed with {} error(s):", errors.len());
            for (i, e) in errors.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, e);
            }
            std::process::exit(1);
        }
    }
}

/// Join a batch of validation errors into one anyhow error.
pub fn into_anyhow(errors: Vec<ValidationError>) -> anyhow::Error {
    let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    anyhow::anyhow!("Config validation failed:\n  {}", msgs.join("\n  "))
}
