use std::path::{Path, PathBuf};

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use anyhow::{Context, Result};

use crate::model::{ConsolidationConfig, TargetSelection};
use crate::venues::Wallet;
use crate::venues::movement::MovementProvider;
use crate::venues::wallet::{LocalWallet, WatchOnlyWallet};

/// Env var holding the hex private key used to sign swaps and bridges.
pub const PRIVATE_KEY_ENV: &str = "COINBINE_PRIVATE_KEY";

/// Where the account comes from.
pub enum WalletSource {
    Signing(LocalWallet),
    WatchOnly(WatchOnlyWallet),
}

impl WalletSource {
    /// `--address` wins over the env key; neither yields a disconnected
    /// wallet, which the run reports as a failed precondition.
    pub fn resolve(address: Option<&str>) -> Result<Self> {
        if let Some(address) = address {
            let address: Address = address
                .parse()
                .with_context(|| format!("invalid --address '{address}'"))?;
            return Ok(WalletSource::WatchOnly(WatchOnlyWallet::new(address)));
        }
        match std::env::var(PRIVATE_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(WalletSource::Signing(
                LocalWallet::from_private_key(&key)
                    .with_context(|| format!("reading {PRIVATE_KEY_ENV}"))?,
            )),
            _ => Ok(WalletSource::WatchOnly(WatchOnlyWallet::disconnected())),
        }
    }

    pub fn as_wallet(&self) -> &dyn Wallet {
        match self {
            WalletSource::Signing(w) => w,
            WalletSource::WatchOnly(w) => w,
        }
    }

    pub fn signer(&self) -> Option<EthereumWallet> {
        match self {
            WalletSource::Signing(w) => Some(w.ethereum_wallet()),
            WalletSource::WatchOnly(_) => None,
        }
    }

    pub fn can_sign(&self) -> bool {
        matches!(self, WalletSource::Signing(_))
    }
}

/// Runtime configuration for the `run` command.
pub struct RuntimeConfig {
    pub config: ConsolidationConfig,
    pub wallet: WalletSource,
    pub target: TargetSelection,
    pub dry_run: bool,
    pub provider: MovementProvider,
    pub output: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn from_cli(cli: &crate::run::RunConfig) -> Result<Self> {
        let mut config = load_config(cli.config.as_deref())?;
        if let Some(slippage_bps) = cli.slippage_bps {
            config.slippage_bps = slippage_bps;
        }
        if let Some(timeout_secs) = cli.timeout_secs {
            config.chain_timeout_secs = timeout_secs;
        }
        crate::validate::validate(&config).map_err(crate::validate::into_anyhow)?;

        let (registry, _) = config.resolve()?;
        let target_chain = registry.lookup(&cli.target_chain)?;
        let target = TargetSelection::new(cli.target_token.clone(), target_chain.chain_id);

        let wallet = WalletSource::resolve(cli.address.as_deref())?;
        // Without a key nothing can be signed.
        let dry_run = cli.dry_run || !wallet.can_sign();

        Ok(RuntimeConfig {
            config,
            wallet,
            target,
            dry_run,
            provider: cli.provider,
            output: cli.output.clone(),
        })
    }
}

/// Default config location: `~/.coinbine/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".coinbine").join("config.json"))
}

/// Load and validate the config at `path`, falling back to the default
/// location and then to the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<ConsolidationConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };
    match path {
        Some(path) => crate::validate::load_and_validate(&path)
            .map_err(crate::validate::into_anyhow)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ConsolidationConfig::default()),
    }
}
