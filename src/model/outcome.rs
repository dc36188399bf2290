use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::amount::u256_dec;

// ── Run status ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
    CompletedWithPartialFailures,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::CompletedWithPartialFailures
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Idle => "IDLE",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
            RunStatus::CompletedWithPartialFailures => "COMPLETED_WITH_PARTIAL_FAILURES",
        };
        f.write_str(s)
    }
}

// ── Swaps ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ZeroBalance,
    AlreadyTarget,
}

/// Terminal state of one balance entry in the swap plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SwapState {
    Skipped { reason: SkipReason },
    Succeeded {
        tx_hash: Option<String>,
        #[serde(with = "u256_dec")]
        amount_out: U256,
    },
    Failed { error: String },
    /// Cancelled after the transaction was handed to the venue.
    SubmittedUnknown,
    /// Cancelled before any network call for this entry.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub chain_id: u64,
    pub from_token: String,
    pub to_token: String,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(flatten)]
    pub state: SwapState,
}

impl SwapResult {
    pub fn success(&self) -> bool {
        matches!(self.state, SwapState::Succeeded { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SwapState::Failed { error } => Some(error),
            SwapState::SubmittedUnknown => Some("submitted, outcome unknown"),
            SwapState::Cancelled => Some("cancelled before submission"),
            _ => None,
        }
    }

    /// Whether a swap was attempted (a quote was requested) for this entry.
    pub fn attempted(&self) -> bool {
        !matches!(
            self.state,
            SwapState::Skipped { .. } | SwapState::Cancelled
        )
    }

    pub fn amount_out(&self) -> Option<U256> {
        match self.state {
            SwapState::Succeeded { amount_out, .. } => Some(amount_out),
            _ => None,
        }
    }
}

// ── Bridge ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LegState {
    Landed {
        tx_hash: Option<String>,
        #[serde(with = "u256_dec")]
        amount_received: U256,
    },
    Failed { error: String },
    SubmittedUnknown,
    NotAttempted,
}

/// One source chain's transfer to the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeLeg {
    pub source_chain_id: u64,
    pub token: String,
    #[serde(with = "u256_dec")]
    pub amount: U256,
    #[serde(flatten)]
    pub state: LegState,
}

impl BridgeLeg {
    pub fn landed(&self) -> bool {
        matches!(self.state, LegState::Landed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResult {
    pub target_chain_id: u64,
    pub legs: Vec<BridgeLeg>,
}

impl BridgeResult {
    /// Nothing resided off the target chain.
    pub fn is_noop(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn success(&self) -> bool {
        self.legs.iter().all(BridgeLeg::landed)
    }

    pub fn failed_leg(&self) -> Option<&BridgeLeg> {
        self.legs
            .iter()
            .find(|l| matches!(l.state, LegState::Failed { .. } | LegState::SubmittedUnknown))
    }

    /// Legs whose funds arrived on the target chain.
    pub fn landed_legs(&self) -> impl Iterator<Item = &BridgeLeg> {
        self.legs.iter().filter(|l| l.landed())
    }

    /// Chains still holding funds that were meant to move.
    pub fn retained(&self) -> Vec<(u64, U256)> {
        self.legs
            .iter()
            .filter(|l| !l.landed())
            .map(|l| (l.source_chain_id, l.amount))
            .collect()
    }
}
