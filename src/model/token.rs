use std::collections::HashMap;

use alloy::primitives::Address;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::chain::ChainRegistry;
use crate::error::ConsolidationError;

/// A token as written in the config file: symbol plus contract address per
/// chain. Chains are keyed by name (or numeric chain id).
///
/// `{"symbol": "USDC", "deployments": {"base": "0x8335...", "optimism": "0x0b2c..."}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TokenSpec {
    pub symbol: String,
    pub deployments: HashMap<String, String>,
}

/// One contract deployment of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDeployment {
    pub chain_id: u64,
    pub address: Address,
}

/// A token identity: symbol mapped to at most one deployment per chain.
/// Deployments are kept in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIdentity {
    pub symbol: String,
    pub deployments: Vec<TokenDeployment>,
}

impl TokenIdentity {
    pub fn deployment(&self, chain_id: u64) -> Option<&TokenDeployment> {
        self.deployments.iter().find(|d| d.chain_id == chain_id)
    }

    pub fn is(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }
}

/// Ordered token manifest. Iteration order is the order tokens were
/// configured in, which the aggregator preserves within each chain group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenManifest {
    tokens: Vec<TokenIdentity>,
}

impl TokenManifest {
    /// Resolve config specs against the registry. Unknown chains, bad
    /// addresses and duplicate symbols are configuration errors.
    pub fn from_specs(
        specs: &[TokenSpec],
        registry: &ChainRegistry,
    ) -> Result<Self, ConsolidationError> {
        let mut tokens: Vec<TokenIdentity> = Vec::with_capacity(specs.len());

        for spec in specs {
            if tokens.iter().any(|t| t.is(&spec.symbol)) {
                return Err(ConsolidationError::Configuration(format!(
                    "token '{}' configured twice",
                    spec.symbol
                )));
            }

            let mut deployments = Vec::with_capacity(spec.deployments.len());
            for (chain_key, addr) in &spec.deployments {
                let chain = registry.lookup(chain_key)?;
                if deployments
                    .iter()
                    .any(|d: &TokenDeployment| d.chain_id == chain.chain_id)
                {
                    return Err(ConsolidationError::Configuration(format!(
                        "token '{}' has two deployments on {}",
                        spec.symbol, chain.name
                    )));
                }
                let address: Address = addr.parse().map_err(|e| {
                    ConsolidationError::Configuration(format!(
                        "token '{}' on {}: invalid address '{addr}': {e}",
                        spec.symbol, chain.name
                    ))
                })?;
                deployments.push(TokenDeployment {
                    chain_id: chain.chain_id,
                    address,
                });
            }
            deployments.sort_by_key(|d| registry.position(d.chain_id));

            tokens.push(TokenIdentity {
                symbol: spec.symbol.clone(),
                deployments,
            });
        }

        Ok(TokenManifest { tokens })
    }

    pub fn new(tokens: Vec<TokenIdentity>) -> Self {
        TokenManifest { tokens }
    }

    pub fn get(&self, symbol: &str) -> Option<&TokenIdentity> {
        self.tokens.iter().find(|t| t.is(symbol))
    }

    pub fn require(&self, symbol: &str) -> Result<&TokenIdentity, ConsolidationError> {
        self.get(symbol)
            .ok_or_else(|| ConsolidationError::unknown_token(symbol))
    }

    pub fn address(&self, symbol: &str, chain_id: u64) -> Option<Address> {
        self.get(symbol)?.deployment(chain_id).map(|d| d.address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenIdentity> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
