use std::collections::HashMap;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::chain::{Chain, ChainEntry, ChainRegistry};
use super::token::{TokenManifest, TokenSpec};
use crate::error::ConsolidationError;

/// Process-wide, read-only configuration for the consolidator: which chains
/// exist, which tokens to look for on them, and execution tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConsolidationConfig {
    /// Supported chains, in the order balances and bridge legs are reported.
    /// Built-in chains ("ethereum", "optimism", "base", "polygon",
    /// "arbitrum", "scroll") may be given by name alone.
    pub chains: Vec<ChainEntry>,
    /// Token manifest: symbol plus contract address per chain.
    /// Tokens are reported in this order within each chain.
    pub tokens: Vec<TokenSpec>,
    /// Per-chain RPC timeout in seconds. A chain that does not answer in
    /// time is treated as unreachable for this run.
    #[serde(default = "default_chain_timeout_secs")]
    pub chain_timeout_secs: u64,
    /// Slippage tolerance for swap and bridge quotes, in basis points.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: f64,
    /// Also convert native gas balances into the target asset.
    #[serde(default)]
    pub swap_native: bool,
    /// Fee charged by the offline simulator for swaps and bridges, in bps.
    #[serde(default = "default_simulated_fee_bps")]
    pub simulated_fee_bps: u32,
}

fn default_chain_timeout_secs() -> u64 {
    10
}

fn default_slippage_bps() -> f64 {
    50.0
}

fn default_simulated_fee_bps() -> u32 {
    10
}

impl ConsolidationConfig {
    pub fn chain_timeout(&self) -> Duration {
        Duration::from_secs(self.chain_timeout_secs)
    }

    /// Expand `chains` into full definitions, in file order.
    pub fn chain_list(&self) -> Result<Vec<Chain>, ConsolidationError> {
        self.chains.iter().map(ChainEntry::resolve).collect()
    }

    /// Build the immutable registry + manifest pair the engine runs on.
    pub fn resolve(&self) -> Result<(ChainRegistry, TokenManifest), ConsolidationError> {
        let registry = ChainRegistry::new(self.chain_list()?)?;
        let manifest = TokenManifest::from_specs(&self.tokens, &registry)?;
        Ok((registry, manifest))
    }
}

impl Default for ConsolidationConfig {
    /// Optimism, Base, Polygon, Arbitrum and Scroll with native USDC plus
    /// the common bridged stablecoins.
    fn default() -> Self {
        ConsolidationConfig {
            chains: ["optimism", "base", "polygon", "arbitrum", "scroll"]
                .into_iter()
                .map(ChainEntry::known)
                .collect(),
            tokens: vec![
                token(
                    "USDC",
                    &[
                        ("optimism", "0x0b2c639c533813f4aa9d7837caf62653d097ff85"),
                        ("base", "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
                        ("arbitrum", "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
                        ("polygon", "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359"),
                        ("scroll", "0x06eFdBFf2a14a7c8E15944D1F4A48F9F95F663A4"),
                    ],
                ),
                token(
                    "DAI",
                    &[
                        ("optimism", "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
                        ("base", "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb"),
                        ("arbitrum", "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
                        ("polygon", "0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"),
                    ],
                ),
                token(
                    "USDT",
                    &[
                        ("optimism", "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58"),
                        ("arbitrum", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"),
                        ("polygon", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F"),
                    ],
                ),
            ],
            chain_timeout_secs: default_chain_timeout_secs(),
            slippage_bps: default_slippage_bps(),
            swap_native: false,
            simulated_fee_bps: default_simulated_fee_bps(),
        }
    }
}

fn token(symbol: &str, deployments: &[(&str, &str)]) -> TokenSpec {
    TokenSpec {
        symbol: symbol.into(),
        deployments: deployments
            .iter()
            .map(|(chain, addr)| (chain.to_string(), addr.to_string()))
            .collect::<HashMap<_, _>>(),
    }
}
