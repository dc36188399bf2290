use alloy::primitives::U256;
use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::model::amount::rescale;
use crate::venues::{BridgeRequest, BridgeVenue, Route, SwapRequest, SwapVenue, TxOutcome};

const BPS: u64 = 10_000;

fn apply_fee(amount: U256, fee_bps: u32) -> U256 {
    let keep = U256::from(BPS.saturating_sub(fee_bps as u64));
    let bps = U256::from(BPS);
    match amount.checked_mul(keep) {
        Some(scaled) => scaled / bps,
        None => amount / bps * keep,
    }
}

/// Offline swap venue with a fixed fee model. Values every pair at par,
/// adjusting only for decimals, so it is meaningful for stablecoin
/// consolidation and dry runs. Nothing is broadcast.
pub struct SwapSimulator {
    fee_bps: u32,
}

impl SwapSimulator {
    pub fn new(fee_bps: u32) -> Self {
        Self { fee_bps }
    }
}

#[async_trait]
impl SwapVenue for SwapSimulator {
    async fn quote(&self, request: &SwapRequest) -> Result<Option<Route>> {
        if request.from.address == request.to.address {
            return Ok(None);
        }
        let from_decimals = request.from.decimals.unwrap_or(18);
        let to_decimals = request.to.decimals.unwrap_or(from_decimals);
        let Some(gross) = rescale(request.amount, from_decimals, to_decimals) else {
            bail!(
                "{} {} does not fit in 256 bits at {to_decimals} decimals",
                request.amount,
                request.from.symbol
            );
        };
        let out = apply_fee(gross, self.fee_bps);

        Ok(Some(Route {
            request: request.clone(),
            expected_out: out,
            min_out: out,
            tool: "simulator".into(),
            payload: None,
        }))
    }

    async fn execute(&self, route: &Route) -> Result<TxOutcome> {
        if route.request.amount.is_zero() {
            bail!("simulated swap with zero input");
        }
        Ok(TxOutcome {
            tx_hash: None,
            amount_out: route.min_out,
        })
    }
}

/// Offline bridge with a fixed fee.
pub struct BridgeSimulator {
    fee_bps: u32,
}

impl BridgeSimulator {
    pub fn new(fee_bps: u32) -> Self {
        Self { fee_bps }
    }
}

#[async_trait]
impl BridgeVenue for BridgeSimulator {
    async fn bridge(&self, request: &BridgeRequest) -> Result<TxOutcome> {
        if request.source.chain_id == request.target.chain_id {
            bail!("bridge source and target are both {}", request.source);
        }
        Ok(TxOutcome {
            tx_hash: None,
            amount_out: apply_fee(request.amount, self.fee_bps),
        })
    }
}
