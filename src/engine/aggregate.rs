use alloy::primitives::Address;
use serde::Serialize;

use super::reader::{Discovery, NATIVE_DECIMALS};
use crate::model::{BalanceEntry, ChainBalanceGroup, ChainRegistry, TokenManifest};

/// The same token symbol reported different decimals on different chains.
/// Each entry is still normalized with its own deployment's decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecimalMismatch {
    pub token: String,
    /// (chain_id, decimals) for every chain that answered.
    pub observed: Vec<(u64, u8)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub groups: Vec<ChainBalanceGroup>,
    pub decimal_mismatches: Vec<DecimalMismatch>,
}

impl Aggregation {
    pub fn group(&self, chain_id: u64) -> Option<&ChainBalanceGroup> {
        self.groups.iter().find(|g| g.chain_id == chain_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BalanceEntry> {
        self.groups.iter().flat_map(|g| g.entries.iter())
    }
}

/// Reshape per-token reads into per-chain groups.
///
/// Chains follow registry order, tokens within a chain follow manifest
/// order, native balances (when `include_native`) come first in their
/// group. Failed reads are absent; zero balances are kept. Chains with no
/// entries are omitted.
pub fn aggregate(
    discovery: &Discovery,
    registry: &ChainRegistry,
    manifest: &TokenManifest,
    include_native: bool,
) -> Aggregation {
    let mut groups = Vec::new();

    for chain in registry.all() {
        let mut entries = Vec::new();

        if include_native {
            if let Some(native) = discovery
                .native
                .per_chain
                .iter()
                .find(|n| n.chain_id == chain.chain_id)
            {
                entries.push(BalanceEntry {
                    chain_id: chain.chain_id,
                    token: chain.native_symbol.clone(),
                    address: Address::ZERO,
                    raw_amount: native.raw,
                    decimals: NATIVE_DECIMALS,
                    native: true,
                });
            }
        }

        for token in manifest.iter() {
            let found = discovery
                .token(&token.symbol)
                .and_then(|r| r.entries.iter().find(|e| e.chain_id == chain.chain_id));
            if let Some(entry) = found {
                entries.push(entry.clone());
            }
        }

        if !entries.is_empty() {
            groups.push(ChainBalanceGroup {
                chain_id: chain.chain_id,
                chain_name: chain.name.clone(),
                entries,
            });
        }
    }

    Aggregation {
        groups,
        decimal_mismatches: decimal_mismatches(discovery, manifest),
    }
}

fn decimal_mismatches(discovery: &Discovery, manifest: &TokenManifest) -> Vec<DecimalMismatch> {
    manifest
        .iter()
        .filter_map(|token| {
            let report = discovery.token(&token.symbol)?;
            let observed: Vec<(u64, u8)> = report
                .entries
                .iter()
                .map(|e| (e.chain_id, e.decimals))
                .collect();
            let first = observed.first()?.1;
            if observed.iter().all(|(_, d)| *d == first) {
                None
            } else {
                Some(DecimalMismatch {
                    token: token.symbol.clone(),
                    observed,
                })
            }
        })
        .collect()
}
