use std::collections::HashSet;

use alloy::primitives::Address;

use crate::model::{Chain, ConsolidationConfig};

use super::ValidationError;

/// Check the token manifest: unique symbols, known chains, one deployment
/// per chain, parseable addresses.
pub fn check_tokens(config: &ConsolidationConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let chains = super::chains::known_chains(config);
    let mut symbols: HashSet<String> = HashSet::new();

    for token in &config.tokens {
        if !symbols.insert(token.symbol.to_uppercase()) {
            errors.push(ValidationError::DuplicateToken {
                symbol: token.symbol.clone(),
            });
        }

        if token.deployments.is_empty() {
            errors.push(ValidationError::TokenWithoutDeployments {
                symbol: token.symbol.clone(),
            });
            continue;
        }

        let mut seen: HashSet<u64> = HashSet::new();
        for (chain_key, address) in &token.deployments {
            let chain = match find_chain(&chains, chain_key) {
                Some(c) => c,
                None => {
                    errors.push(ValidationError::UnknownChain {
                        symbol: token.symbol.clone(),
                        chain: chain_key.clone(),
                    });
                    continue;
                }
            };

            if !seen.insert(chain.chain_id) {
                errors.push(ValidationError::DuplicateDeployment {
                    symbol: token.symbol.clone(),
                    chain: chain.name.clone(),
                });
            }

            if address.parse::<Address>().is_err() {
                errors.push(ValidationError::InvalidAddress {
                    symbol: token.symbol.clone(),
                    chain: chain.name.clone(),
                    address: address.clone(),
                });
            }
        }
    }

    errors
}

fn find_chain<'a>(chains: &'a [Chain], key: &str) -> Option<&'a Chain> {
    match key.parse::<u64>() {
        Ok(id) => chains.iter().find(|c| c.chain_id == id),
        Err(_) => chains.iter().find(|c| c.name.eq_ignore_ascii_case(key)),
    }
}
