use std::collections::BTreeMap;

use alloy::primitives::U256;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::progress::ProgressSink;
use crate::error::ConsolidationError;
use crate::model::amount::format_units;
use crate::model::{
    Account, Chain, ChainBalanceGroup, ChainRegistry, SkipReason, SwapResult, SwapState,
    TargetSelection, TokenManifest,
};
use crate::venues::{Asset, SwapRequest, SwapVenue};

// ── Planning ────────────────────────────────────────────────────────

/// A balance entry that needs a swap into the target token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSwap {
    /// Position of the entry in the flattened group order.
    pub index: usize,
    pub chain_id: u64,
    pub from: Asset,
    pub to_token: String,
    /// `None` when the target token has no deployment on this chain.
    pub to: Option<Asset>,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwapPlan {
    pub attempts: Vec<PlannedSwap>,
    /// Entries settled without any network call, with their index.
    pub skipped: Vec<(usize, SwapResult)>,
}

impl SwapPlan {
    pub fn len(&self) -> usize {
        self.attempts.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decide, per entry, whether a swap is needed. Zero balances and entries
/// already in the target token are skipped; everything else is attempted,
/// whatever chain it sits on.
pub fn plan(
    groups: &[ChainBalanceGroup],
    target: &TargetSelection,
    manifest: &TokenManifest,
) -> SwapPlan {
    let mut plan = SwapPlan::default();
    let entries = groups.iter().flat_map(|g| g.entries.iter());

    for (index, entry) in entries.enumerate() {
        let skip = if !entry.is_positive() {
            Some(SkipReason::ZeroBalance)
        } else if !entry.native && target.is_target_token(&entry.token) {
            Some(SkipReason::AlreadyTarget)
        } else {
            None
        };

        if let Some(reason) = skip {
            plan.skipped.push((
                index,
                SwapResult {
                    chain_id: entry.chain_id,
                    from_token: entry.token.clone(),
                    to_token: target.target_token.clone(),
                    amount_in: entry.raw_amount,
                    state: SwapState::Skipped { reason },
                },
            ));
            continue;
        }

        let to = manifest
            .address(&target.target_token, entry.chain_id)
            .map(|address| Asset {
                symbol: target.target_token.clone(),
                address,
                decimals: groups
                    .iter()
                    .find(|g| g.chain_id == entry.chain_id)
                    .and_then(|g| g.entry(&target.target_token))
                    .filter(|e| !e.native)
                    .map(|e| e.decimals),
            });

        plan.attempts.push(PlannedSwap {
            index,
            chain_id: entry.chain_id,
            from: Asset {
                symbol: entry.token.clone(),
                address: entry.address,
                decimals: Some(entry.decimals),
            },
            to_token: target.target_token.clone(),
            to,
            amount: entry.raw_amount,
        });
    }

    plan
}

// ── Execution ───────────────────────────────────────────────────────

/// Runs a swap plan: chains concurrently, entries of one chain one at a
/// time in group order.
pub struct SwapExecutor<'a> {
    registry: &'a ChainRegistry,
    venue: &'a dyn SwapVenue,
    cancel: &'a CancelToken,
    progress: &'a dyn ProgressSink,
}

impl<'a> SwapExecutor<'a> {
    pub fn new(
        registry: &'a ChainRegistry,
        venue: &'a dyn SwapVenue,
        cancel: &'a CancelToken,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        SwapExecutor {
            registry,
            venue,
            cancel,
            progress,
        }
    }

    /// Execute every attempt in `plan`. Returns one result per entry, in
    /// the same order as the groups the plan was built from.
    pub async fn execute(&self, account: &Account, plan: SwapPlan) -> Vec<SwapResult> {
        let total = plan.len();
        let mut by_chain: BTreeMap<usize, Vec<PlannedSwap>> = BTreeMap::new();
        for attempt in plan.attempts {
            let pos = self.registry.position(attempt.chain_id).unwrap_or(usize::MAX);
            by_chain.entry(pos).or_default().push(attempt);
        }

        let lanes = join_all(by_chain.into_values().map(|queue| async move {
            let mut done = Vec::with_capacity(queue.len());
            for planned in queue {
                let result = match (self.registry.resolve(planned.chain_id), &planned.to) {
                    (Ok(chain), Some(to)) => {
                        self.swap(account, chain, &planned.from, to, planned.amount).await
                    }
                    (Ok(chain), None) if !self.cancel.is_cancelled() => {
                        let err = ConsolidationError::RouteUnavailable(format!(
                            "{} has no deployment on {chain}",
                            planned.to_token
                        ));
                        self.report_failure(chain, &planned.from, &planned.to_token, &err);
                        unattempted(&planned, SwapState::Failed { error: err.to_string() })
                    }
                    (Ok(_), None) => unattempted(&planned, SwapState::Cancelled),
                    (Err(e), _) => {
                        unattempted(&planned, SwapState::Failed { error: e.to_string() })
                    }
                };
                done.push((planned.index, result));
            }
            done
        }))
        .await;

        let mut slots: Vec<Option<SwapResult>> = vec![None; total];
        for (index, result) in plan.skipped.into_iter().chain(lanes.into_iter().flatten()) {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
            }
        }
        slots.into_iter().flatten().collect()
    }

    /// Quote then execute a single swap on `chain`. Never returns an error:
    /// every outcome is captured in the result's state.
    pub async fn swap(
        &self,
        account: &Account,
        chain: &Chain,
        from: &Asset,
        to: &Asset,
        amount: U256,
    ) -> SwapResult {
        let result = |state: SwapState| SwapResult {
            chain_id: chain.chain_id,
            from_token: from.symbol.clone(),
            to_token: to.symbol.clone(),
            amount_in: amount,
            state,
        };

        if self.cancel.is_cancelled() {
            return result(SwapState::Cancelled);
        }

        let shown = from
            .decimals
            .map(|d| format_units(amount, d))
            .unwrap_or_else(|| amount.to_string());
        self.progress.append(format!(
            "Swapping {shown} {} -> {} on {chain}...",
            from.symbol, to.symbol
        ));

        let request = SwapRequest {
            chain: chain.clone(),
            account: *account,
            from: from.clone(),
            to: to.clone(),
            amount,
        };

        let route = tokio::select! {
            quoted = self.venue.quote(&request) => quoted,
            _ = self.cancel.cancelled() => return result(SwapState::Cancelled),
        };
        let route = match route {
            Ok(Some(route)) => route,
            Ok(None) => {
                let err = ConsolidationError::RouteUnavailable(format!(
                    "{} -> {} on {chain}",
                    from.symbol, to.symbol
                ));
                return self.fail(chain, from, to, result, err);
            }
            Err(e) => {
                let err = ConsolidationError::TransientChain {
                    chain: chain.name.clone(),
                    reason: format!("quote failed: {e:#}"),
                };
                return self.fail(chain, from, to, result, err);
            }
        };
        debug!(chain = %chain, tool = %route.tool, expected = %route.expected_out, "quoted");

        if self.cancel.is_cancelled() {
            return result(SwapState::Cancelled);
        }

        let executed = tokio::select! {
            res = self.venue.execute(&route) => res,
            _ = self.cancel.cancelled() => {
                warn!(chain = %chain, token = %from.symbol, "cancelled with swap in flight");
                self.progress.append(format!(
                    "Swap {} -> {} on {chain}: submitted, outcome unknown",
                    from.symbol, to.symbol
                ));
                return result(SwapState::SubmittedUnknown);
            }
        };

        match executed {
            Ok(outcome) => {
                let received = to
                    .decimals
                    .map(|d| format_units(outcome.amount_out, d))
                    .unwrap_or_else(|| outcome.amount_out.to_string());
                info!(chain = %chain, from = %from.symbol, to = %to.symbol, tx = ?outcome.tx_hash, "swap succeeded");
                self.progress.append(format!(
                    "Swapped {} -> {received} {} on {chain}{}",
                    from.symbol,
                    to.symbol,
                    outcome
                        .tx_hash
                        .as_deref()
                        .map(|h| format!(" (tx {h})"))
                        .unwrap_or_default()
                ));
                result(SwapState::Succeeded {
                    tx_hash: outcome.tx_hash,
                    amount_out: outcome.amount_out,
                })
            }
            Err(e) => {
                let err = ConsolidationError::Execution {
                    chain: chain.name.clone(),
                    reason: format!("{e:#}"),
                };
                self.fail(chain, from, to, result, err)
            }
        }
    }

    fn fail(
        &self,
        chain: &Chain,
        from: &Asset,
        to: &Asset,
        result: impl Fn(SwapState) -> SwapResult,
        err: ConsolidationError,
    ) -> SwapResult {
        self.report_failure(chain, from, &to.symbol, &err);
        result(SwapState::Failed {
            error: err.to_string(),
        })
    }

    fn report_failure(&self, chain: &Chain, from: &Asset, to: &str, err: &ConsolidationError) {
        warn!(chain = %chain, from = %from.symbol, to, "swap failed: {err}");
        self.progress.append(format!(
            "Swap {} -> {to} on {chain} failed: {err}",
            from.symbol
        ));
    }
}

fn unattempted(planned: &PlannedSwap, state: SwapState) -> SwapResult {
    SwapResult {
        chain_id: planned.chain_id,
        from_token: planned.from.symbol.clone(),
        to_token: planned.to_token.clone(),
        amount_in: planned.amount,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BalanceEntry, TokenDeployment, TokenIdentity};
    use alloy::primitives::Address;

    fn entry(chain_id: u64, token: &str, raw: u64) -> BalanceEntry {
        BalanceEntry {
            chain_id,
            token: token.into(),
            address: Address::repeat_byte(1),
            raw_amount: U256::from(raw),
            decimals: 6,
            native: false,
        }
    }

    fn manifest() -> TokenManifest {
        TokenManifest::new(vec![TokenIdentity {
            symbol: "USDC".into(),
            deployments: vec![
                TokenDeployment { chain_id: 10, address: Address::repeat_byte(10) },
                TokenDeployment { chain_id: 8453, address: Address::repeat_byte(0x21) },
            ],
        }])
    }

    #[test]
    fn plan_skips_zero_and_target_entries() {
        let groups = vec![
            ChainBalanceGroup {
                chain_id: 10,
                chain_name: "optimism".into(),
                entries: vec![entry(10, "USDC", 100), entry(10, "DAI", 0)],
            },
            ChainBalanceGroup {
                chain_id: 42161,
                chain_name: "arbitrum".into(),
                entries: vec![entry(42161, "DAI", 50)],
            },
        ];
        let target = TargetSelection::new("usdc", 8453);
        let plan = plan(&groups, &target, &manifest());

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.attempts.len(), 1);
        assert_eq!(plan.attempts[0].index, 2);
        // no USDC deployment on arbitrum in this manifest
        assert!(plan.attempts[0].to.is_none());

        let reasons: Vec<_> = plan
            .skipped
            .iter()
            .map(|(_, r)| r.state.clone())
            .collect();
        assert_eq!(
            reasons,
            [
                SwapState::Skipped { reason: SkipReason::AlreadyTarget },
                SwapState::Skipped { reason: SkipReason::ZeroBalance },
            ]
        );
    }

    #[test]
    fn native_entry_named_like_target_is_still_swapped() {
        let mut native = entry(10, "USDC", 5);
        native.native = true;
        native.address = Address::ZERO;
        let groups = vec![ChainBalanceGroup {
            chain_id: 10,
            chain_name: "optimism".into(),
            entries: vec![native],
        }];
        let plan = plan(&groups, &TargetSelection::new("USDC", 10), &manifest());
        assert_eq!(plan.attempts.len(), 1);
    }
}
