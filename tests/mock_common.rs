#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{Result, bail};
use async_trait::async_trait;

use coinbine::engine::{Orchestrator, Settings};
use coinbine::model::amount::{pow10, rescale};
use coinbine::model::{Chain, ChainRegistry, TokenDeployment, TokenIdentity, TokenManifest};
use coinbine::venues::{
    BridgeRequest, BridgeVenue, ChainClient, ChainClients, Collaborators, Route, SwapRequest,
    SwapVenue, TxOutcome,
};

// ── Fixtures ─────────────────────────────────────────────────────────

pub const OPTIMISM: u64 = 10;
pub const BASE: u64 = 8453;
pub const ARBITRUM: u64 = 42161;

pub fn usdc_on(chain_id: u64) -> Address {
    match chain_id {
        OPTIMISM => "0x0b2c639c533813f4aa9d7837caf62653d097ff85".parse().unwrap(),
        BASE => "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap(),
        ARBITRUM => "0xaf88d065e77c8cC2239327C5EDb3A432268e5831".parse().unwrap(),
        other => Address::repeat_byte(other as u8),
    }
}

pub fn dai_on(chain_id: u64) -> Address {
    let _ = chain_id;
    "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1".parse().unwrap()
}

pub fn account() -> Address {
    "0x00000000000000000000000000000000C0FFee00".parse().unwrap()
}

/// Optimism, Base, Arbitrum, in that order.
pub fn registry() -> ChainRegistry {
    ChainRegistry::new(vec![Chain::optimism(), Chain::base(), Chain::arbitrum()]).unwrap()
}

/// USDC on all three chains, DAI on Optimism and Arbitrum.
pub fn manifest() -> TokenManifest {
    TokenManifest::new(vec![
        TokenIdentity {
            symbol: "USDC".into(),
            deployments: [OPTIMISM, BASE, ARBITRUM]
                .into_iter()
                .map(|chain_id| TokenDeployment {
                    chain_id,
                    address: usdc_on(chain_id),
                })
                .collect(),
        },
        TokenIdentity {
            symbol: "DAI".into(),
            deployments: [OPTIMISM, ARBITRUM]
                .into_iter()
                .map(|chain_id| TokenDeployment {
                    chain_id,
                    address: dai_on(chain_id),
                })
                .collect(),
        },
    ])
}

pub fn units(whole: u64, decimals: u8) -> U256 {
    U256::from(whole) * pow10(decimals).unwrap()
}

// ── Mock chain client ────────────────────────────────────────────────

/// In-memory chain: fixed balances, optional outage or latency.
#[derive(Default)]
pub struct MockChain {
    pub native: U256,
    pub tokens: HashMap<Address, (U256, u8)>,
    pub down: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native(mut self, raw: U256) -> Self {
        self.native = raw;
        self
    }

    pub fn with_token(mut self, token: Address, raw: U256, decimals: u8) -> Self {
        self.tokens.insert(token, (raw, decimals));
        self
    }

    pub fn down() -> Self {
        MockChain {
            down: true,
            ..Self::default()
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn touch(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.down {
            bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn native_balance(&self, _account: Address) -> Result<U256> {
        self.touch().await?;
        Ok(self.native)
    }

    async fn token_balance(&self, _account: Address, token: Address) -> Result<U256> {
        self.touch().await?;
        Ok(self.tokens.get(&token).map(|(raw, _)| *raw).unwrap_or_default())
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        self.touch().await?;
        match self.tokens.get(&token) {
            Some((_, d)) => Ok(*d),
            None => Ok(18),
        }
    }
}

pub fn clients(chains: Vec<(u64, Arc<MockChain>)>) -> ChainClients {
    chains
        .into_iter()
        .map(|(id, c)| (id, c as Arc<dyn ChainClient>))
        .collect()
}

// ── Mock swap venue ──────────────────────────────────────────────────

/// Swaps at par, rescaled between the two tokens' decimals.
#[derive(Default)]
pub struct MockSwapVenue {
    pub quotes: AtomicUsize,
    pub executions: AtomicUsize,
    /// (chain_id, from symbol) pairs with no route.
    pub no_route: HashSet<(u64, String)>,
    /// (chain_id, from symbol) pairs whose execution reverts.
    pub reverts: HashSet<(u64, String)>,
    /// Execution never completes.
    pub hang: bool,
    /// Execution takes this long to confirm.
    pub delay: Option<Duration>,
    pub executed: Mutex<Vec<(u64, String)>>,
    /// Executions in flight right now, per chain.
    in_flight: Mutex<HashMap<u64, usize>>,
    /// Most executions ever in flight at once, per chain and overall.
    peaks: Mutex<(HashMap<u64, usize>, usize)>,
}

impl MockSwapVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_route(mut self, chain_id: u64, symbol: &str) -> Self {
        self.no_route.insert((chain_id, symbol.into()));
        self
    }

    pub fn reverting(mut self, chain_id: u64, symbol: &str) -> Self {
        self.reverts.insert((chain_id, symbol.into()));
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn quotes(&self) -> usize {
        self.quotes.load(Ordering::SeqCst)
    }

    pub fn peak_on(&self, chain_id: u64) -> usize {
        self.peaks.lock().unwrap().0.get(&chain_id).copied().unwrap_or(0)
    }

    pub fn peak_overall(&self) -> usize {
        self.peaks.lock().unwrap().1
    }

    fn enter(&self, chain_id: u64) {
        let mut in_flight = self.in_flight.lock().unwrap();
        *in_flight.entry(chain_id).or_default() += 1;
        let here = in_flight[&chain_id];
        let total: usize = in_flight.values().sum();

        let mut peaks = self.peaks.lock().unwrap();
        let chain_peak = peaks.0.entry(chain_id).or_default();
        *chain_peak = (*chain_peak).max(here);
        peaks.1 = peaks.1.max(total);
    }

    fn leave(&self, chain_id: u64) {
        if let Some(n) = self.in_flight.lock().unwrap().get_mut(&chain_id) {
            *n -= 1;
        }
    }
}

#[async_trait]
impl SwapVenue for MockSwapVenue {
    async fn quote(&self, request: &SwapRequest) -> Result<Option<Route>> {
        self.quotes.fetch_add(1, Ordering::SeqCst);
        let key = (request.chain.chain_id, request.from.symbol.clone());
        if self.no_route.contains(&key) {
            return Ok(None);
        }
        let Some(out) = rescale(
            request.amount,
            request.from.decimals.unwrap_or(18),
            request.to.decimals.unwrap_or(6),
        ) else {
            bail!("amount overflows");
        };
        Ok(Some(Route {
            request: request.clone(),
            expected_out: out,
            min_out: out,
            tool: "mock".into(),
            payload: None,
        }))
    }

    async fn execute(&self, route: &Route) -> Result<TxOutcome> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let key = (route.request.chain.chain_id, route.request.from.symbol.clone());
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            self.enter(key.0);
            tokio::time::sleep(delay).await;
            self.leave(key.0);
        }
        if self.reverts.contains(&key) {
            bail!("transaction reverted");
        }
        self.executed.lock().unwrap().push(key);
        Ok(TxOutcome {
            tx_hash: Some(format!("0xswap{}", route.request.chain.chain_id)),
            amount_out: route.min_out,
        })
    }
}

// ── Mock bridge venue ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBridgeVenue {
    /// Source chains whose transfer fails.
    pub failing: HashSet<u64>,
    pub requests: Mutex<Vec<BridgeRequest>>,
}

impl MockBridgeVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_from(mut self, chain_id: u64) -> Self {
        self.failing.insert(chain_id);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl BridgeVenue for MockBridgeVenue {
    async fn bridge(&self, request: &BridgeRequest) -> Result<TxOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.source.chain_id) {
            bail!("bridge relayer rejected transfer");
        }
        Ok(TxOutcome {
            tx_hash: Some(format!("0xbridge{}", request.source.chain_id)),
            amount_out: request.amount,
        })
    }
}

// ── Harness ──────────────────────────────────────────────────────────

pub struct Harness {
    pub chains: Vec<(u64, Arc<MockChain>)>,
    pub swaps: Arc<MockSwapVenue>,
    pub bridge: Arc<MockBridgeVenue>,
}

impl Harness {
    /// Optimism: 100 USDC. Base: 0 USDC. Arbitrum: 50 DAI.
    pub fn scenario() -> Self {
        Harness::with_chains(
            MockChain::new()
                .with_native(units(1, 18))
                .with_token(usdc_on(OPTIMISM), units(100, 6), 6),
            MockChain::new().with_token(usdc_on(BASE), U256::ZERO, 6),
            MockChain::new()
                .with_native(units(2, 18))
                .with_token(usdc_on(ARBITRUM), U256::ZERO, 6)
                .with_token(dai_on(ARBITRUM), units(50, 18), 18),
        )
    }

    pub fn with_chains(optimism: MockChain, base: MockChain, arbitrum: MockChain) -> Self {
        Harness {
            chains: vec![
                (OPTIMISM, Arc::new(optimism)),
                (BASE, Arc::new(base)),
                (ARBITRUM, Arc::new(arbitrum)),
            ],
            swaps: Arc::new(MockSwapVenue::new()),
            bridge: Arc::new(MockBridgeVenue::new()),
        }
    }

    pub fn swaps(mut self, venue: MockSwapVenue) -> Self {
        self.swaps = Arc::new(venue);
        self
    }

    pub fn bridge(mut self, venue: MockBridgeVenue) -> Self {
        self.bridge = Arc::new(venue);
        self
    }

    pub fn chain_calls(&self) -> usize {
        self.chains.iter().map(|(_, c)| c.calls()).sum()
    }

    pub fn orchestrator(&self) -> Orchestrator {
        self.orchestrator_with(Settings::default())
    }

    pub fn orchestrator_with(&self, settings: Settings) -> Orchestrator {
        let swaps: Arc<dyn SwapVenue> = self.swaps.clone();
        let bridge: Arc<dyn BridgeVenue> = self.bridge.clone();
        Orchestrator::new(
            registry(),
            manifest(),
            Collaborators {
                chains: clients(self.chains.clone()),
                swaps,
                bridge,
            },
            settings,
        )
        .unwrap()
    }
}
