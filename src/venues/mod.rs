pub mod evm;
pub mod movement;
pub mod wallet;

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Account, Chain, WalletConnection};

// ── Chain reads ─────────────────────────────────────────────────────

/// Read-only access to one chain. Implemented over JSON-RPC for live runs
/// and by in-memory fakes in tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn native_balance(&self, account: Address) -> Result<U256>;

    async fn token_balance(&self, account: Address, token: Address) -> Result<U256>;

    async fn decimals(&self, token: Address) -> Result<u8>;
}

/// One client per registered chain, keyed by chain id.
pub type ChainClients = HashMap<u64, Arc<dyn ChainClient>>;

// ── Swaps and bridges ───────────────────────────────────────────────

/// A token on a specific chain as the movement venues see it.
/// `address` is `Address::ZERO` for the native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub address: Address,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub chain: Chain,
    pub account: Account,
    pub from: Asset,
    pub to: Asset,
    pub amount: U256,
}

/// A quoted path for a swap. `payload` carries whatever the venue needs to
/// execute it (e.g. an aggregator's transaction request).
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub request: SwapRequest,
    pub expected_out: U256,
    pub min_out: U256,
    pub tool: String,
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub account: Account,
    pub source: Chain,
    pub target: Chain,
    pub token: String,
    pub source_token: Address,
    pub target_token: Address,
    pub amount: U256,
}

/// What a venue reports for a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: Option<String>,
    /// Amount credited to the account, in the output token's raw units.
    pub amount_out: U256,
}

/// Quote-then-execute swap capability on a single chain.
#[async_trait]
pub trait SwapVenue: Send + Sync {
    /// `Ok(None)` means no route exists for the pair; `Err` is a transport
    /// or venue failure.
    async fn quote(&self, request: &SwapRequest) -> Result<Option<Route>>;

    async fn execute(&self, route: &Route) -> Result<TxOutcome>;
}

/// Move one token from a source chain to the target chain.
#[async_trait]
pub trait BridgeVenue: Send + Sync {
    async fn bridge(&self, request: &BridgeRequest) -> Result<TxOutcome>;
}

// ── Wallet ──────────────────────────────────────────────────────────

/// Supplies the connected account. Key custody and signing stay behind
/// this boundary.
pub trait Wallet: Send + Sync {
    fn connection(&self) -> WalletConnection;
}

/// Everything the engine talks to, bundled for construction.
#[derive(Clone)]
pub struct Collaborators {
    pub chains: ChainClients,
    pub swaps: Arc<dyn SwapVenue>,
    pub bridge: Arc<dyn BridgeVenue>,
}
