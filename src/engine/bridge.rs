use alloy::primitives::{Address, U256};
use serde::Serialize;
use tracing::{info, warn};

use super::cancel::CancelToken;
use super::progress::ProgressSink;
use crate::error::ConsolidationError;
use crate::model::amount::{format_units, u256_dec};
use crate::model::{
    Account, BridgeLeg, BridgeResult, ChainBalanceGroup, ChainRegistry, LegState, SwapResult,
    TargetSelection, TokenManifest,
};
use crate::venues::{BridgeRequest, BridgeVenue};

/// Target-token funds sitting on a non-target chain after the swap step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Residue {
    pub chain_id: u64,
    pub token: String,
    pub token_address: Address,
    pub decimals: Option<u8>,
    #[serde(with = "u256_dec")]
    pub amount: U256,
}

/// Residue per non-target chain, in registry order: the target-token
/// balance discovered there plus the output of every swap that succeeded
/// there. Chains with nothing to move are left out.
pub fn residues(
    groups: &[ChainBalanceGroup],
    swaps: &[SwapResult],
    target: &TargetSelection,
    manifest: &TokenManifest,
    registry: &ChainRegistry,
) -> Vec<Residue> {
    registry
        .all()
        .iter()
        .filter(|c| c.chain_id != target.target_chain_id)
        .filter_map(|chain| {
            let token_address = manifest.address(&target.target_token, chain.chain_id)?;
            let held = groups
                .iter()
                .find(|g| g.chain_id == chain.chain_id)
                .and_then(|g| g.entries.iter().find(|e| !e.native && target.is_target_token(&e.token)));
            let swapped = swaps
                .iter()
                .filter(|s| s.chain_id == chain.chain_id)
                .filter_map(SwapResult::amount_out)
                .fold(U256::ZERO, |acc, x| acc.saturating_add(x));
            let amount = held
                .map(|e| e.raw_amount)
                .unwrap_or_default()
                .saturating_add(swapped);

            (!amount.is_zero()).then(|| Residue {
                chain_id: chain.chain_id,
                token: target.target_token.clone(),
                token_address,
                decimals: held.map(|e| e.decimals),
                amount,
            })
        })
        .collect()
}

/// Moves residues to the target chain one leg at a time, stopping at the
/// first leg that does not land.
pub struct BridgeExecutor<'a> {
    registry: &'a ChainRegistry,
    venue: &'a dyn BridgeVenue,
    cancel: &'a CancelToken,
    progress: &'a dyn ProgressSink,
}

impl<'a> BridgeExecutor<'a> {
    pub fn new(
        registry: &'a ChainRegistry,
        venue: &'a dyn BridgeVenue,
        cancel: &'a CancelToken,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        BridgeExecutor {
            registry,
            venue,
            cancel,
            progress,
        }
    }

    pub async fn bridge(
        &self,
        account: &Account,
        residues: &[Residue],
        target_chain_id: u64,
        target_token_address: Address,
    ) -> Result<BridgeResult, ConsolidationError> {
        let target = self.registry.resolve(target_chain_id)?;
        let mut legs: Vec<BridgeLeg> = residues
            .iter()
            .map(|r| BridgeLeg {
                source_chain_id: r.chain_id,
                token: r.token.clone(),
                amount: r.amount,
                state: LegState::NotAttempted,
            })
            .collect();

        if residues.is_empty() {
            self.progress
                .append(format!("Nothing to bridge; all funds already on {target}"));
            return Ok(BridgeResult {
                target_chain_id,
                legs,
            });
        }

        for (leg, residue) in legs.iter_mut().zip(residues) {
            if self.cancel.is_cancelled() {
                break;
            }
            let source = self.registry.resolve(residue.chain_id)?;
            let shown = residue
                .decimals
                .map(|d| format_units(residue.amount, d))
                .unwrap_or_else(|| residue.amount.to_string());
            self.progress.append(format!(
                "Bridging {shown} {} from {source} to {target}...",
                residue.token
            ));

            let request = BridgeRequest {
                account: *account,
                source: source.clone(),
                target: target.clone(),
                token: residue.token.clone(),
                source_token: residue.token_address,
                target_token: target_token_address,
                amount: residue.amount,
            };

            let outcome = tokio::select! {
                res = self.venue.bridge(&request) => res,
                _ = self.cancel.cancelled() => {
                    warn!(source = %source, "cancelled with bridge transfer in flight");
                    self.progress.append(format!(
                        "Bridge from {source}: submitted, outcome unknown"
                    ));
                    leg.state = LegState::SubmittedUnknown;
                    break;
                }
            };

            match outcome {
                Ok(outcome) => {
                    info!(source = %source, target = %target, tx = ?outcome.tx_hash, "bridge leg landed");
                    self.progress.append(format!(
                        "Bridged {} from {source} to {target}{}",
                        residue.token,
                        outcome
                            .tx_hash
                            .as_deref()
                            .map(|h| format!(" (tx {h})"))
                            .unwrap_or_default()
                    ));
                    leg.state = LegState::Landed {
                        tx_hash: outcome.tx_hash,
                        amount_received: outcome.amount_out,
                    };
                }
                Err(e) => {
                    let err = ConsolidationError::Execution {
                        chain: source.name.clone(),
                        reason: format!("bridge to {target} failed: {e:#}"),
                    };
                    warn!("{err}");
                    self.progress.append(err.to_string());
                    leg.state = LegState::Failed {
                        error: err.to_string(),
                    };
                    break;
                }
            }
        }

        for (leg, residue) in legs.iter().zip(residues).filter(|(l, _)| !l.landed()) {
            let name = self
                .registry
                .resolve(leg.source_chain_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|_| leg.source_chain_id.to_string());
            let shown = residue
                .decimals
                .map(|d| format_units(leg.amount, d))
                .unwrap_or_else(|| leg.amount.to_string());
            self.progress
                .append(format!("Funds retained on {name}: {shown} {}", leg.token));
        }
        let result = BridgeResult {
            target_chain_id,
            legs,
        };
        Ok(result)
    }
}
