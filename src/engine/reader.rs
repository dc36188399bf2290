use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use super::cancel::CancelToken;
use super::progress::ProgressSink;
use crate::error::ConsolidationError;
use crate::model::amount::{MAX_DECIMALS, NormalizedAmount, format_units, u256_dec};
use crate::model::{Account, BalanceEntry, Chain, ChainRegistry, TokenIdentity, TokenManifest};
use crate::venues::{ChainClient, ChainClients};

/// Native currencies on every supported chain use 18 decimals.
pub const NATIVE_DECIMALS: u8 = 18;

// ── Read results ────────────────────────────────────────────────────

/// A balance query that failed for one chain (and token, if any).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadFailure {
    pub chain_id: u64,
    pub chain: String,
    pub token: Option<String>,
    pub reason: String,
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token {
            Some(token) => write!(f, "{}: {token} balance unavailable ({})", self.chain, self.reason),
            None => write!(f, "{}: native balance unavailable ({})", self.chain, self.reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainNative {
    pub chain_id: u64,
    #[serde(with = "u256_dec")]
    pub raw: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeBalanceReport {
    /// Sum over the chains that answered.
    #[serde(with = "u256_dec")]
    pub total: U256,
    pub per_chain: Vec<ChainNative>,
    pub failures: Vec<ReadFailure>,
}

/// One token's per-chain breakdown. `entries` holds every chain that
/// answered (zero balances included), in deployment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBalanceReport {
    pub symbol: String,
    pub entries: Vec<BalanceEntry>,
    pub failures: Vec<ReadFailure>,
}

impl TokenBalanceReport {
    /// Sum across chains, expressed at the widest decimals seen. `None`
    /// when the sum does not fit in 256 bits at that precision.
    pub fn unified(&self) -> Option<NormalizedAmount> {
        let decimals = self.entries.iter().map(|e| e.decimals).max().unwrap_or(0);
        let raw = self.entries.iter().try_fold(U256::ZERO, |acc, e| {
            acc.checked_add(e.normalized().rescale(decimals)?.raw)
        })?;
        Some(NormalizedAmount::new(raw, decimals))
    }
}

/// Everything one discovery pass learned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub native: NativeBalanceReport,
    pub tokens: Vec<TokenBalanceReport>,
}

impl Discovery {
    pub fn failures(&self) -> Vec<&ReadFailure> {
        self.native
            .failures
            .iter()
            .chain(self.tokens.iter().flat_map(|t| t.failures.iter()))
            .collect()
    }

    pub fn successful_reads(&self) -> usize {
        self.native.per_chain.len() + self.tokens.iter().map(|t| t.entries.len()).sum::<usize>()
    }

    pub fn token(&self, symbol: &str) -> Option<&TokenBalanceReport> {
        self.tokens.iter().find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }
}

// ── Reader ──────────────────────────────────────────────────────────

/// Queries every chain concurrently, each call bounded by `timeout`.
/// A failing chain is recorded and reported; it never aborts other reads.
pub struct BalanceReader<'a> {
    registry: &'a ChainRegistry,
    clients: &'a ChainClients,
    timeout: Duration,
    cancel: &'a CancelToken,
    progress: &'a dyn ProgressSink,
}

impl<'a> BalanceReader<'a> {
    pub fn new(
        registry: &'a ChainRegistry,
        clients: &'a ChainClients,
        timeout: Duration,
        cancel: &'a CancelToken,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        BalanceReader {
            registry,
            clients,
            timeout,
            cancel,
            progress,
        }
    }

    /// Sum of native balances over `chains`. Unreachable chains each yield
    /// one failure record and one progress line; if none answer, the
    /// result is a fatal aggregation error.
    pub async fn get_native_balance(
        &self,
        account: &Account,
        chains: &[Chain],
    ) -> Result<NativeBalanceReport, ConsolidationError> {
        let report = self.read_native(account, chains).await;
        if !chains.is_empty() && report.per_chain.is_empty() {
            return Err(ConsolidationError::FatalAggregation {
                failures: report.failures.len(),
            });
        }
        Ok(report)
    }

    /// Per-chain breakdown of one token. Failures are isolated to their
    /// (token, chain) pair.
    pub async fn get_token_balance(
        &self,
        account: &Account,
        token: &TokenIdentity,
    ) -> TokenBalanceReport {
        let reads = join_all(token.deployments.iter().map(|d| async move {
            let chain = self.chain_for(d.chain_id);
            let result = match chain {
                Ok(chain) => {
                    self.guarded(chain, async {
                        let client = self.client(chain.chain_id)?;
                        let (raw, decimals) = tokio::try_join!(
                            client.token_balance(account.address, d.address),
                            client.decimals(d.address),
                        )?;
                        Ok::<_, anyhow::Error>((raw, decimals))
                    })
                    .await
                }
                Err(e) => Err(e),
            };
            (d, result)
        }))
        .await;

        let mut report = TokenBalanceReport {
            symbol: token.symbol.clone(),
            entries: Vec::new(),
            failures: Vec::new(),
        };

        for (deployment, result) in reads {
            match result {
                Ok((_, decimals)) if decimals > MAX_DECIMALS => {
                    let failure = ReadFailure {
                        chain_id: deployment.chain_id,
                        chain: self.chain_name(deployment.chain_id),
                        token: Some(token.symbol.clone()),
                        reason: format!(
                            "contract reports {decimals} decimals, more than {MAX_DECIMALS} cannot be represented"
                        ),
                    };
                    warn!("{failure}");
                    self.progress.append(failure.to_string());
                    report.failures.push(failure);
                }
                Ok((raw, decimals)) => {
                    debug!(token = %token.symbol, chain_id = deployment.chain_id, %raw, decimals, "token balance");
                    report.entries.push(BalanceEntry {
                        chain_id: deployment.chain_id,
                        token: token.symbol.clone(),
                        address: deployment.address,
                        raw_amount: raw,
                        decimals,
                        native: false,
                    });
                }
                Err(e) => {
                    let failure = self.failure(deployment.chain_id, Some(&token.symbol), &e);
                    warn!("{failure}");
                    self.progress.append(failure.to_string());
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// Native plus every manifest token across every registered chain, all
    /// in flight at once. Fails only when no read succeeded anywhere.
    pub async fn discover(
        &self,
        account: &Account,
        manifest: &TokenManifest,
    ) -> Result<Discovery, ConsolidationError> {
        self.progress.append(format!(
            "Fetching native and {} token balances across {} chains...",
            manifest.len(),
            self.registry.all().len()
        ));

        let (native, tokens) = futures::join!(
            self.read_native(account, self.registry.all()),
            join_all(manifest.iter().map(|t| self.get_token_balance(account, t))),
        );
        let discovery = Discovery { native, tokens };

        if self.cancel.is_cancelled() {
            return Err(ConsolidationError::Cancelled);
        }
        if discovery.successful_reads() == 0 {
            return Err(ConsolidationError::FatalAggregation {
                failures: discovery.failures().len(),
            });
        }

        self.progress.append(format!(
            "Unified native balance: {} ({} of {} chains)",
            format_units(discovery.native.total, NATIVE_DECIMALS),
            discovery.native.per_chain.len(),
            self.registry.all().len()
        ));
        for report in &discovery.tokens {
            match report.unified() {
                Some(total) => self
                    .progress
                    .append(format!("Unified {} balance: {total}", report.symbol)),
                None => self.progress.append(format!(
                    "Unified {} balance: too large to sum exactly",
                    report.symbol
                )),
            }
            for entry in &report.entries {
                let chain = self.chain_name(entry.chain_id);
                self.progress.append(format!(
                    "  {chain} ({}): {} {}",
                    entry.chain_id,
                    entry.normalized(),
                    entry.token
                ));
            }
        }

        Ok(discovery)
    }

    async fn read_native(&self, account: &Account, chains: &[Chain]) -> NativeBalanceReport {
        let reads = join_all(chains.iter().map(|chain| async move {
            let result = self
                .guarded(chain, async {
                    self.client(chain.chain_id)?
                        .native_balance(account.address)
                        .await
                })
                .await;
            (chain, result)
        }))
        .await;

        let mut report = NativeBalanceReport {
            total: U256::ZERO,
            per_chain: Vec::new(),
            failures: Vec::new(),
        };

        for (chain, result) in reads {
            match result {
                Ok(raw) => {
                    debug!(chain = %chain, %raw, "native balance");
                    report.total = report.total.saturating_add(raw);
                    report.per_chain.push(ChainNative {
                        chain_id: chain.chain_id,
                        raw,
                    });
                }
                Err(e) => {
                    let failure = self.failure(chain.chain_id, None, &e);
                    warn!("{failure}");
                    self.progress.append(failure.to_string());
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// Run one chain call under the per-chain timeout, racing cancellation.
    async fn guarded<T>(
        &self,
        chain: &Chain,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, ConsolidationError> {
        if self.cancel.is_cancelled() {
            return Err(ConsolidationError::Cancelled);
        }
        tokio::select! {
            res = tokio::time::timeout(self.timeout, fut) => match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(ConsolidationError::TransientChain {
                    chain: chain.name.clone(),
                    reason: format!("{e:#}"),
                }),
                Err(_) => Err(ConsolidationError::TransientChain {
                    chain: chain.name.clone(),
                    reason: format!("timed out after {}s", self.timeout.as_secs_f64()),
                }),
            },
            _ = self.cancel.cancelled() => Err(ConsolidationError::Cancelled),
        }
    }

    fn client(&self, chain_id: u64) -> anyhow::Result<&Arc<dyn ChainClient>> {
        self.clients
            .get(&chain_id)
            .ok_or_else(|| anyhow::anyhow!("no chain client for chain id {chain_id}"))
    }

    fn chain_for(&self, chain_id: u64) -> Result<&Chain, ConsolidationError> {
        self.registry.resolve(chain_id)
    }

    fn chain_name(&self, chain_id: u64) -> String {
        self.registry
            .resolve(chain_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|_| chain_id.to_string())
    }

    fn failure(&self, chain_id: u64, token: Option<&str>, err: &ConsolidationError) -> ReadFailure {
        let reason = match err {
            ConsolidationError::TransientChain { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        ReadFailure {
            chain_id,
            chain: self.chain_name(chain_id),
            token: token.map(str::to_string),
            reason,
        }
    }
}
