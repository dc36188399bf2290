pub mod lifi;
pub mod simulator;

use std::sync::Arc;

use alloy::network::EthereumWallet;
use anyhow::Result;
use clap::ValueEnum;

use super::{BridgeVenue, SwapVenue};

/// Which backend quotes and executes swaps and bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MovementProvider {
    /// LiFi aggregator (real quotes, on-chain submission unless dry run).
    #[value(name = "lifi")]
    LiFi,
    /// Offline fixed-fee simulator; never touches the network.
    Simulated,
}

/// Build the swap and bridge venues for a provider.
pub fn build(
    provider: MovementProvider,
    wallet: Option<EthereumWallet>,
    slippage_bps: f64,
    simulated_fee_bps: u32,
    dry_run: bool,
) -> Result<(Arc<dyn SwapVenue>, Arc<dyn BridgeVenue>)> {
    match provider {
        MovementProvider::LiFi => {
            let lifi = Arc::new(lifi::LiFiMovement::new(wallet, slippage_bps, dry_run)?);
            let swaps: Arc<dyn SwapVenue> = lifi.clone();
            let bridge: Arc<dyn BridgeVenue> = lifi;
            Ok((swaps, bridge))
        }
        MovementProvider::Simulated => {
            let swaps: Arc<dyn SwapVenue> =
                Arc::new(simulator::SwapSimulator::new(simulated_fee_bps));
            let bridge: Arc<dyn BridgeVenue> =
                Arc::new(simulator::BridgeSimulator::new(simulated_fee_bps));
            Ok((swaps, bridge))
        }
    }
}
