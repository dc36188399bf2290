pub mod aggregate;
pub mod bridge;
pub mod cancel;
pub mod progress;
pub mod reader;
pub mod report;
pub mod swap;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::Address;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ConsolidationError;
use crate::model::{
    Account, BridgeResult, ChainRegistry, ConsolidationConfig, LegState, RunStatus, SwapResult,
    SwapState, TargetSelection, TokenManifest, WalletConnection,
};
use crate::venues::{Collaborators, Wallet};

use aggregate::Aggregation;
use cancel::CancelToken;
use progress::{ProgressSink, RunProgress};
use reader::{BalanceReader, Discovery};
use report::RunReport;

/// Knobs the orchestrator reads on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub chain_timeout: Duration,
    /// Treat native balances as swappable entries.
    pub swap_native: bool,
}

impl Settings {
    pub fn from_config(config: &ConsolidationConfig) -> Self {
        Settings {
            chain_timeout: config.chain_timeout(),
            swap_native: config.swap_native,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            chain_timeout: Duration::from_secs(10),
            swap_native: false,
        }
    }
}

/// Drives one consolidation run per trigger: discover, aggregate, swap,
/// bridge, summarize.
///
/// The orchestrator holds no per-run data between runs. At most one run
/// per account is in flight; a second trigger is rejected, not queued.
pub struct Orchestrator {
    registry: ChainRegistry,
    manifest: TokenManifest,
    collaborators: Collaborators,
    settings: Settings,
    in_flight: Mutex<HashSet<Address>>,
    status: watch::Sender<RunStatus>,
}

impl Orchestrator {
    pub fn new(
        registry: ChainRegistry,
        manifest: TokenManifest,
        collaborators: Collaborators,
        settings: Settings,
    ) -> Result<Self, ConsolidationError> {
        if let Some(missing) = registry
            .all()
            .iter()
            .find(|c| !collaborators.chains.contains_key(&c.chain_id))
        {
            return Err(ConsolidationError::Configuration(format!(
                "no chain client for {missing} ({})",
                missing.chain_id
            )));
        }
        let (status, _) = watch::channel(RunStatus::Idle);
        Ok(Orchestrator {
            registry,
            manifest,
            collaborators,
            settings,
            in_flight: Mutex::new(HashSet::new()),
            status,
        })
    }

    pub fn from_config(
        config: &ConsolidationConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ConsolidationError> {
        let (registry, manifest) = config.resolve()?;
        Self::new(registry, manifest, collaborators, Settings::from_config(config))
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn manifest(&self) -> &TokenManifest {
        &self.manifest
    }

    /// Observe run status transitions (Idle → Running → terminal).
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    /// Read and group balances without moving anything.
    pub async fn discover(
        &self,
        account: &Account,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(Discovery, Aggregation), ConsolidationError> {
        let reader = BalanceReader::new(
            &self.registry,
            &self.collaborators.chains,
            self.settings.chain_timeout,
            cancel,
            sink,
        );
        let discovery = reader.discover(account, &self.manifest).await?;
        let aggregation = aggregate::aggregate(
            &discovery,
            &self.registry,
            &self.manifest,
            self.settings.swap_native,
        );
        for mismatch in &aggregation.decimal_mismatches {
            let observed: Vec<String> = mismatch
                .observed
                .iter()
                .map(|(chain_id, d)| format!("{chain_id}={d}"))
                .collect();
            warn!(token = %mismatch.token, "decimals differ across chains");
            sink.append(format!(
                "Warning: {} decimals differ across chains ({})",
                mismatch.token,
                observed.join(", ")
            ));
        }
        Ok((discovery, aggregation))
    }

    /// Run one consolidation for the wallet's account.
    ///
    /// Returns `Err` only when the run never started: no connected account
    /// or a run already in flight for it. Every other outcome, including
    /// configuration problems found at trigger time and fatal discovery,
    /// comes back as a report with a terminal status.
    pub async fn run(
        &self,
        wallet: &dyn Wallet,
        target: &TargetSelection,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancelToken,
    ) -> Result<RunReport, ConsolidationError> {
        let progress = RunProgress::new(sink);

        let account = match wallet.connection() {
            WalletConnection::Connected(account) => account,
            WalletConnection::Disconnected => {
                progress.append("No wallet connected.".to_string());
                return Err(ConsolidationError::Precondition(
                    "no wallet connected".into(),
                ));
            }
        };

        let _guard = self.claim(account)?;
        let mut run = RunState::new(account, target.clone());
        self.status.send_replace(RunStatus::Running);
        info!(run_id = %run.report.run_id, %account, "consolidation run started");
        progress.append(format!(
            "Run {} started for {account}: consolidate into {} on chain {}",
            run.report.run_id, target.target_token, target.target_chain_id
        ));

        if let Err(e) = self.steps(&mut run, target, &progress, cancel).await {
            run.abort(e.to_string());
        }

        let report = run.finish(progress);
        self.status.send_replace(report.status);
        info!(run_id = %report.run_id, status = %report.status, "consolidation run finished");
        Ok(report)
    }

    async fn steps(
        &self,
        run: &mut RunState,
        target: &TargetSelection,
        progress: &RunProgress,
        cancel: &CancelToken,
    ) -> Result<(), ConsolidationError> {
        let account = run.report.account;
        let target_chain = self.registry.resolve(target.target_chain_id)?.clone();
        let target_address = self
            .manifest
            .require(&target.target_token)?
            .deployment(target_chain.chain_id)
            .map(|d| d.address)
            .ok_or_else(|| {
                ConsolidationError::Configuration(format!(
                    "{} has no deployment on {target_chain}",
                    target.target_token
                ))
            })?;

        // ── Discover ──
        let (discovery, aggregation) = self.discover(&account, progress, cancel).await?;
        for failure in discovery.failures() {
            run.report.failures.push(failure.to_string());
        }
        run.report.native = Some(discovery.native);
        run.report.decimal_mismatches = aggregation.decimal_mismatches;
        run.report.groups = aggregation.groups;
        if cancel.is_cancelled() {
            return Err(ConsolidationError::Cancelled);
        }

        // ── Swap ──
        let plan = swap::plan(&run.report.groups, target, &self.manifest);
        progress.append(format!(
            "{} swaps to attempt, {} entries skipped",
            plan.attempts.len(),
            plan.skipped.len()
        ));
        let swaps = swap::SwapExecutor::new(
            &self.registry,
            self.collaborators.swaps.as_ref(),
            cancel,
            progress,
        )
        .execute(&account, plan)
        .await;
        for result in &swaps {
            if let Some(line) = swap_failure(result, &self.registry) {
                run.report.failures.push(line);
            }
        }
        run.report.swaps = swaps;
        if cancel.is_cancelled() {
            return Err(ConsolidationError::Cancelled);
        }

        // ── Bridge ──
        let residues = bridge::residues(
            &run.report.groups,
            &run.report.swaps,
            target,
            &self.manifest,
            &self.registry,
        );
        let result = bridge::BridgeExecutor::new(
            &self.registry,
            self.collaborators.bridge.as_ref(),
            cancel,
            progress,
        )
        .bridge(&account, &residues, target_chain.chain_id, target_address)
        .await?;
        let failed = bridge_failure(&result);
        run.report.bridge = Some(result);
        if let Some(reason) = failed {
            run.abort(reason);
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(ConsolidationError::Cancelled);
        }
        Ok(())
    }

    fn claim(&self, account: Account) -> Result<InFlight<'_>, ConsolidationError> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| ConsolidationError::RunInProgress(account.to_string()))?;
        if !set.insert(account.address) {
            return Err(ConsolidationError::RunInProgress(account.to_string()));
        }
        Ok(InFlight {
            set: &self.in_flight,
            account: account.address,
        })
    }
}

/// Releases the per-account claim when the run ends, however it ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<Address>>,
    account: Address,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.account);
        }
    }
}

// ── Per-run bookkeeping ─────────────────────────────────────────────

struct RunState {
    report: RunReport,
}

impl RunState {
    fn new(account: Account, target: TargetSelection) -> Self {
        let now = Utc::now();
        RunState {
            report: RunReport {
                run_id: Uuid::new_v4(),
                account,
                target,
                started_at: now,
                finished_at: now,
                status: RunStatus::Running,
                abort_reason: None,
                native: None,
                groups: Vec::new(),
                decimal_mismatches: Vec::new(),
                swaps: Vec::new(),
                bridge: None,
                failures: Vec::new(),
                events: Vec::new(),
            },
        }
    }

    fn abort(&mut self, reason: String) {
        warn!(run_id = %self.report.run_id, "run aborted: {reason}");
        self.report.abort_reason = Some(reason);
    }

    /// Settle the terminal status and emit the single summary line.
    fn finish(mut self, progress: RunProgress) -> RunReport {
        let status = if self.report.abort_reason.is_some() {
            RunStatus::Failed
        } else if self.report.failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithPartialFailures
        };

        let mut summary = format!(
            "Run finished: {status} ({} swaps attempted",
            self.report.swap_attempts()
        );
        if let Some(bridge) = &self.report.bridge {
            summary.push_str(&format!(
                ", {} of {} bridge legs landed",
                bridge.landed_legs().count(),
                bridge.legs.len()
            ));
        }
        summary.push(')');
        if let Some(reason) = &self.report.abort_reason {
            summary.push_str(&format!("; aborted: {reason}"));
        }
        if !self.report.failures.is_empty() {
            summary.push_str(&format!(
                "; {} isolated failures: {}",
                self.report.failures.len(),
                self.report.failures.join("; ")
            ));
        }
        progress.append(summary);

        self.report.status = status;
        self.report.finished_at = Utc::now();
        self.report.events = progress.into_events();
        self.report
    }
}

fn swap_failure(result: &SwapResult, registry: &ChainRegistry) -> Option<String> {
    if !matches!(
        result.state,
        SwapState::Failed { .. } | SwapState::SubmittedUnknown
    ) {
        return None;
    }
    let chain = registry
        .resolve(result.chain_id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|_| result.chain_id.to_string());
    Some(format!(
        "{chain}: swap {} -> {} {}",
        result.from_token,
        result.to_token,
        result.error().unwrap_or_default()
    ))
}

fn bridge_failure(result: &BridgeResult) -> Option<String> {
    let leg = result.failed_leg()?;
    Some(match &leg.state {
        LegState::Failed { error } => error.clone(),
        _ => ConsolidationError::Cancelled.to_string(),
    })
}
