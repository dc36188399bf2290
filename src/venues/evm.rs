use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::model::{Chain, ChainRegistry};

use super::{ChainClient, ChainClients};

// ── ERC20 contract interface ───────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

// ── JSON-RPC chain client ──────────────────────────────────────────

/// Reads balances from one EVM chain over HTTP JSON-RPC.
pub struct EvmChainClient {
    chain: Chain,
    provider: DynProvider,
}

impl EvmChainClient {
    pub fn new(chain: &Chain) -> Result<Self> {
        Ok(EvmChainClient {
            chain: chain.clone(),
            provider: read_provider(&chain.rpc_url)?,
        })
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn native_balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .with_context(|| format!("eth_getBalance on {}", self.chain))
    }

    async fn token_balance(&self, account: Address, token: Address) -> Result<U256> {
        IERC20::new(token, &self.provider)
            .balanceOf(account)
            .call()
            .await
            .with_context(|| format!("balanceOf({}) on {}", short_addr(&token), self.chain))
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        IERC20::new(token, &self.provider)
            .decimals()
            .call()
            .await
            .with_context(|| format!("decimals() of {} on {}", short_addr(&token), self.chain))
    }
}

/// Build one JSON-RPC client per registered chain.
pub fn build_chain_clients(registry: &ChainRegistry) -> Result<ChainClients> {
    let mut clients = ChainClients::new();
    for chain in registry.all() {
        let client: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(chain)?);
        clients.insert(chain.chain_id, client);
    }
    Ok(clients)
}

// ── Utility functions ──────────────────────────────────────────────

/// Read-only HTTP provider with no wallet attached.
pub fn read_provider(rpc_url: &str) -> Result<DynProvider> {
    let url = rpc_url
        .parse()
        .with_context(|| format!("invalid rpc url '{rpc_url}'"))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

pub fn short_addr(addr: &Address) -> String {
    let s = format!("{addr}");
    if s.len() > 10 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}
