use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConsolidationError;

/// An EVM network the consolidator can read from and trade on.
///
/// In JSON: `{"name": "base", "chain_id": 8453, "rpc_url": "https://mainnet.base.org"}`.
/// `native_symbol` defaults to "ETH".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Chain {
    /// Human-readable chain name (e.g. "optimism", "base").
    pub name: String,
    /// EVM chain ID. Unique within a registry.
    pub chain_id: u64,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Symbol of the chain's gas currency.
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
}

fn default_native_symbol() -> String {
    "ETH".into()
}

// ── Convenience constructors ─────────────────────────────────────────

impl Chain {
    pub fn ethereum() -> Self {
        Chain::custom("ethereum", 1, "https://eth.llamarpc.com")
    }
    pub fn optimism() -> Self {
        Chain::custom("optimism", 10, "https://mainnet.optimism.io")
    }
    pub fn base() -> Self {
        Chain::custom("base", 8453, "https://mainnet.base.org")
    }
    pub fn polygon() -> Self {
        Chain {
            native_symbol: "POL".into(),
            ..Chain::custom("polygon", 137, "https://polygon-rpc.com")
        }
    }
    pub fn arbitrum() -> Self {
        Chain::custom("arbitrum", 42161, "https://arb1.arbitrum.io/rpc")
    }
    pub fn scroll() -> Self {
        Chain::custom("scroll", 534352, "https://rpc.scroll.io")
    }

    /// Construct a known chain from its name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ethereum" | "mainnet" => Some(Self::ethereum()),
            "optimism" => Some(Self::optimism()),
            "base" => Some(Self::base()),
            "polygon" => Some(Self::polygon()),
            "arbitrum" => Some(Self::arbitrum()),
            "scroll" => Some(Self::scroll()),
            _ => None,
        }
    }

    pub fn custom(name: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Chain {
            name: name.into(),
            chain_id,
            rpc_url: rpc_url.into(),
            native_symbol: default_native_symbol(),
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A `chains` entry in the config file: either a built-in chain by name
/// (`"ethereum"`) or a full definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ChainEntry {
    Known(String),
    Custom(Chain),
}

impl ChainEntry {
    pub fn known(name: &str) -> Self {
        ChainEntry::Known(name.to_string())
    }

    pub fn resolve(&self) -> Result<Chain, ConsolidationError> {
        match self {
            ChainEntry::Known(name) => Chain::from_name(name).ok_or_else(|| {
                ConsolidationError::Configuration(format!("unknown built-in chain '{name}'"))
            }),
            ChainEntry::Custom(chain) => Ok(chain.clone()),
        }
    }
}

impl From<Chain> for ChainEntry {
    fn from(chain: Chain) -> Self {
        ChainEntry::Custom(chain)
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Immutable, ordered set of supported chains. Order is significant:
/// balance groups and bridge legs follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<Chain>) -> Result<Self, ConsolidationError> {
        if chains.is_empty() {
            return Err(ConsolidationError::Configuration(
                "chain registry is empty".into(),
            ));
        }
        for (i, chain) in chains.iter().enumerate() {
            if chains[..i].iter().any(|c| c.chain_id == chain.chain_id) {
                return Err(ConsolidationError::Configuration(format!(
                    "duplicate chain id {} ({})",
                    chain.chain_id, chain.name
                )));
            }
        }
        Ok(ChainRegistry { chains })
    }

    /// Optimism, Base, Polygon, Arbitrum, Scroll.
    pub fn defaults() -> Self {
        ChainRegistry {
            chains: vec![
                Chain::optimism(),
                Chain::base(),
                Chain::polygon(),
                Chain::arbitrum(),
                Chain::scroll(),
            ],
        }
    }

    pub fn resolve(&self, chain_id: u64) -> Result<&Chain, ConsolidationError> {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .ok_or_else(|| ConsolidationError::unknown_chain(chain_id))
    }

    pub fn by_name(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Accepts either a chain name or a numeric chain id.
    pub fn lookup(&self, key: &str) -> Result<&Chain, ConsolidationError> {
        if let Ok(id) = key.parse::<u64>() {
            return self.resolve(id);
        }
        self.by_name(key).ok_or_else(|| {
            ConsolidationError::Configuration(format!("unknown chain '{key}'"))
        })
    }

    pub fn all(&self) -> &[Chain] {
        &self.chains
    }

    /// Registry position of a chain, used for stable ordering.
    pub fn position(&self, chain_id: u64) -> Option<usize> {
        self.chains.iter().position(|c| c.chain_id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_and_unknown() {
        let reg = ChainRegistry::defaults();
        assert_eq!(reg.resolve(8453).map(|c| c.name.as_str()), Ok("base"));
        assert_eq!(
            reg.resolve(1),
            Err(ConsolidationError::unknown_chain(1))
        );
        assert_eq!(reg.lookup("Arbitrum").map(|c| c.chain_id), Ok(42161));
        assert_eq!(reg.lookup("10").map(|c| c.chain_id), Ok(10));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = ChainRegistry::new(vec![Chain::base(), Chain::custom("base2", 8453, "http://x")])
            .unwrap_err();
        assert!(matches!(err, ConsolidationError::Configuration(_)));
    }

    #[test]
    fn builtin_names_resolve() {
        let entries: Vec<ChainEntry> =
            serde_json::from_str(r#"["Ethereum", {"name": "local", "chain_id": 31337, "rpc_url": "http://127.0.0.1:8545"}]"#)
                .unwrap();
        assert_eq!(entries[0].resolve(), Ok(Chain::ethereum()));
        assert_eq!(entries[1].resolve().map(|c| c.chain_id), Ok(31337));
        assert!(matches!(
            ChainEntry::known("solana").resolve(),
            Err(ConsolidationError::Configuration(_))
        ));
    }

    #[test]
    fn defaults_keep_order() {
        let names: Vec<_> = ChainRegistry::defaults()
            .all()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, ["optimism", "base", "polygon", "arbitrum", "scroll"]);
    }
}
