use std::collections::{HashMap, HashSet};

use crate::model::{Chain, ChainEntry, ConsolidationConfig};

use super::ValidationError;

/// The chains a config describes, skipping names that are not built in.
pub fn known_chains(config: &ConsolidationConfig) -> Vec<Chain> {
    config
        .chains
        .iter()
        .filter_map(|entry| entry.resolve().ok())
        .collect()
}

/// Check chain names resolve, ids and names are unique, and every RPC URL
/// parses.
pub fn check_chains(config: &ConsolidationConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.chains.is_empty() {
        errors.push(ValidationError::NoChains);
        return errors;
    }

    for entry in &config.chains {
        if let (ChainEntry::Known(name), Err(_)) = (entry, entry.resolve()) {
            errors.push(ValidationError::UnknownBuiltinChain { name: name.clone() });
        }
    }

    let chains = known_chains(config);
    let mut by_id: HashMap<u64, &str> = HashMap::new();
    let mut names: HashSet<String> = HashSet::new();

    for chain in &chains {
        if let Some(first) = by_id.insert(chain.chain_id, &chain.name) {
            errors.push(ValidationError::DuplicateChainId {
                chain_id: chain.chain_id,
                first: first.to_string(),
                second: chain.name.clone(),
            });
        }
        if !names.insert(chain.name.to_lowercase()) {
            errors.push(ValidationError::DuplicateChainName {
                name: chain.name.clone(),
            });
        }
        if reqwest::Url::parse(&chain.rpc_url).is_err() {
            errors.push(ValidationError::InvalidRpcUrl {
                chain: chain.name.clone(),
                url: chain.rpc_url.clone(),
            });
        }
    }

    errors
}
