use std::time::Duration;

use alloy::hex;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{Account, Chain};
use crate::venues::evm::{self, IERC20};
use crate::venues::{BridgeRequest, BridgeVenue, Route, SwapRequest, SwapVenue, TxOutcome};

const LIFI_API_BASE: &str = "https://li.quest/v1";

// ── LiFi API response types ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    tool: Option<String>,
    estimate: QuoteEstimate,
    #[serde(rename = "transactionRequest")]
    transaction_request: Option<TransactionRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuoteEstimate {
    #[serde(rename = "toAmount")]
    to_amount: String,
    #[serde(rename = "toAmountMin")]
    to_amount_min: Option<String>,
    #[serde(rename = "approvalAddress")]
    approval_address: Option<String>,
    #[serde(rename = "executionDuration")]
    execution_duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionRequest {
    to: String,
    data: String,
    value: String,
    #[serde(rename = "gasLimit")]
    gas_limit: Option<String>,
}

/// Parameters of one `/quote` call.
struct QuoteQuery<'a> {
    from_chain: &'a Chain,
    to_chain: &'a Chain,
    from_token: Address,
    to_token: Address,
    amount: U256,
    account: &'a Account,
}

// ── LiFi Movement ─────────────────────────────────────────────────

/// Swap and bridge venue backed by the LiFi aggregator. Quotes come from
/// the HTTP API; execution signs and sends the returned transaction request
/// from the source chain. In dry-run mode quotes are real but nothing is
/// broadcast.
pub struct LiFiMovement {
    client: reqwest::Client,
    wallet: Option<EthereumWallet>,
    dry_run: bool,
    slippage_bps: f64,
}

impl LiFiMovement {
    pub fn new(wallet: Option<EthereumWallet>, slippage_bps: f64, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("coinbine/0.1")
            .build()
            .context("creating LiFi HTTP client")?;

        if wallet.is_none() && !dry_run {
            bail!("LiFi execution needs a signing wallet unless running dry");
        }

        Ok(LiFiMovement {
            client,
            wallet,
            dry_run,
            slippage_bps,
        })
    }

    /// `Ok(None)` when LiFi reports no available route.
    async fn get_quote(&self, q: &QuoteQuery<'_>) -> Result<Option<QuoteResponse>> {
        let slippage = self.slippage_bps / 10_000.0;
        let url = format!(
            "{LIFI_API_BASE}/quote?\
            fromChain={}&\
            toChain={}&\
            fromToken={:?}&\
            toToken={:?}&\
            fromAmount={}&\
            fromAddress={:?}&\
            slippage={slippage}",
            q.from_chain.chain_id, q.to_chain.chain_id, q.from_token, q.to_token, q.amount,
            q.account.address,
        );
        debug!(%url, "LiFi quote request");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("LiFi quote request failed")?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("LiFi API error {status}: {body}");
        }

        let quote = resp
            .json::<QuoteResponse>()
            .await
            .context("parsing LiFi quote response")?;
        Ok(Some(quote))
    }

    /// Approve the input token if needed, then send LiFi's transaction
    /// request on `chain`. Returns the transaction hash.
    async fn submit_lifi_tx(
        &self,
        chain: &Chain,
        from_token: Address,
        amount: U256,
        quote: &QuoteResponse,
    ) -> Result<String> {
        let wallet = self
            .wallet
            .clone()
            .context("LiFi submission requires a signing wallet")?;
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(chain.rpc_url.parse().context("invalid rpc url")?);

        if from_token != Address::ZERO {
            if let Some(ref approval_addr) = quote.estimate.approval_address {
                let spender: Address = approval_addr
                    .parse()
                    .map_err(|e| anyhow::anyhow!("bad approval address: {e}"))?;
                info!(
                    chain = %chain,
                    token = %evm::short_addr(&from_token),
                    spender = %evm::short_addr(&spender),
                    "LiFi: approving input token"
                );
                IERC20::new(from_token, &provider)
                    .approve(spender, amount)
                    .gas(200_000)
                    .send()
                    .await
                    .context("approve for LiFi")?
                    .get_receipt()
                    .await
                    .context("approve receipt")?;
            }
        }

        let tx_req = quote
            .transaction_request
            .as_ref()
            .context("LiFi missing transactionRequest")?;

        let to_addr: Address = tx_req
            .to
            .parse()
            .map_err(|e| anyhow::anyhow!("bad tx.to: {e}"))?;
        let data = Bytes::from(hex::decode(tx_req.data.trim_start_matches("0x"))?);
        let value = parse_quantity(&tx_req.value).context("bad tx.value")?;
        let gas_limit: u64 = tx_req
            .gas_limit
            .as_deref()
            .and_then(|s| parse_quantity(s).ok())
            .map(|g| g.saturating_to::<u64>())
            .unwrap_or(500_000);

        let tx = alloy::rpc::types::TransactionRequest::default()
            .with_to(to_addr)
            .with_input(data)
            .with_value(value)
            .with_gas_limit(gas_limit);

        let receipt = provider
            .send_transaction(tx)
            .await
            .context("LiFi tx send")?
            .get_receipt()
            .await
            .context("LiFi tx receipt")?;

        if !receipt.status() {
            bail!("transaction {:?} reverted", receipt.transaction_hash);
        }

        info!(chain = %chain, tx = ?receipt.transaction_hash, "LiFi: confirmed");
        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

#[async_trait]
impl SwapVenue for LiFiMovement {
    async fn quote(&self, request: &SwapRequest) -> Result<Option<Route>> {
        let quote = self
            .get_quote(&QuoteQuery {
                from_chain: &request.chain,
                to_chain: &request.chain,
                from_token: request.from.address,
                to_token: request.to.address,
                amount: request.amount,
                account: &request.account,
            })
            .await?;

        let Some(quote) = quote else {
            return Ok(None);
        };

        let expected_out = parse_quantity(&quote.estimate.to_amount).context("bad toAmount")?;
        let min_out = match quote.estimate.to_amount_min.as_deref() {
            Some(s) => parse_quantity(s).context("bad toAmountMin")?,
            None => expected_out,
        };

        info!(
            chain = %request.chain,
            from = %request.from.symbol,
            to = %request.to.symbol,
            amount_in = %request.amount,
            expected_out = %expected_out,
            est_secs = quote.estimate.execution_duration.unwrap_or(0.0),
            "LiFi QUOTE"
        );

        Ok(Some(Route {
            request: request.clone(),
            expected_out,
            min_out,
            tool: quote.tool.clone().unwrap_or_else(|| "lifi".into()),
            payload: Some(serde_json::to_value(&quote)?),
        }))
    }

    async fn execute(&self, route: &Route) -> Result<TxOutcome> {
        if self.dry_run {
            info!(chain = %route.request.chain, "LiFi: [DRY RUN] swap would be executed");
            return Ok(TxOutcome {
                tx_hash: None,
                amount_out: route.min_out,
            });
        }

        let payload = route
            .payload
            .clone()
            .context("route carries no LiFi payload")?;
        let quote: QuoteResponse =
            serde_json::from_value(payload).context("decoding LiFi route payload")?;

        let tx_hash = self
            .submit_lifi_tx(
                &route.request.chain,
                route.request.from.address,
                route.request.amount,
                &quote,
            )
            .await?;

        Ok(TxOutcome {
            tx_hash: Some(tx_hash),
            amount_out: route.min_out,
        })
    }
}

#[async_trait]
impl BridgeVenue for LiFiMovement {
    async fn bridge(&self, request: &BridgeRequest) -> Result<TxOutcome> {
        let quote = self
            .get_quote(&QuoteQuery {
                from_chain: &request.source,
                to_chain: &request.target,
                from_token: request.source_token,
                to_token: request.target_token,
                amount: request.amount,
                account: &request.account,
            })
            .await?
            .with_context(|| {
                format!(
                    "no bridge route for {} {} -> {}",
                    request.token, request.source, request.target
                )
            })?;

        let to_amount = match quote.estimate.to_amount_min.as_deref() {
            Some(s) => parse_quantity(s),
            None => parse_quantity(&quote.estimate.to_amount),
        }
        .context("bad bridge quote amount")?;

        info!(
            token = %request.token,
            source = %request.source,
            target = %request.target,
            amount = %request.amount,
            received = %to_amount,
            "LiFi BRIDGE quote"
        );

        if self.dry_run {
            info!("LiFi: [DRY RUN] bridge would be executed");
            return Ok(TxOutcome {
                tx_hash: None,
                amount_out: to_amount,
            });
        }

        let tx_hash = self
            .submit_lifi_tx(&request.source, request.source_token, request.amount, &quote)
            .await?;

        Ok(TxOutcome {
            tx_hash: Some(tx_hash),
            amount_out: to_amount,
        })
    }
}

/// LiFi returns quantities either as decimal strings or 0x-prefixed hex.
fn parse_quantity(s: &str) -> Result<U256> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x") {
        Some(hex_str) if hex_str.is_empty() => Ok(U256::ZERO),
        Some(hex_str) => U256::from_str_radix(hex_str, 16),
        None => U256::from_str_radix(s, 10),
    };
    parsed.map_err(|e| anyhow::anyhow!("invalid quantity '{s}': {e}"))
}
