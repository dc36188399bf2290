use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::DecimalMismatch;
use super::progress::ProgressEvent;
use super::reader::NativeBalanceReport;
use crate::model::{
    Account, BridgeResult, ChainBalanceGroup, RunStatus, SwapResult, TargetSelection,
};

/// Everything one consolidation run produced. Serialized as-is for
/// `--output`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub account: Account,
    pub target: TargetSelection,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    /// Why the run stopped early, when it did.
    pub abort_reason: Option<String>,
    pub native: Option<NativeBalanceReport>,
    pub groups: Vec<ChainBalanceGroup>,
    pub decimal_mismatches: Vec<DecimalMismatch>,
    pub swaps: Vec<SwapResult>,
    pub bridge: Option<BridgeResult>,
    /// Isolated failures, one line each, in the order they were recorded.
    pub failures: Vec<String>,
    pub events: Vec<ProgressEvent>,
}

impl RunReport {
    /// Swaps for which a quote was requested.
    pub fn swap_attempts(&self) -> usize {
        self.swaps.iter().filter(|s| s.attempted()).count()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
