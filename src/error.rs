use thiserror::Error;

/// Failure taxonomy for a consolidation run.
///
/// Only `Configuration`, `Precondition` and `FatalAggregation` abort a run.
/// Everything else is captured into the affected entry's result and
/// reported through the progress sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsolidationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("chain {chain} unavailable: {reason}")]
    TransientChain { chain: String, reason: String },

    #[error("no route: {0}")]
    RouteUnavailable(String),

    #[error("execution failed on {chain}: {reason}")]
    Execution { chain: String, reason: String },

    #[error("balance discovery failed on every chain ({failures} isolated failures)")]
    FatalAggregation { failures: usize },

    #[error("a consolidation run is already in flight for {0}")]
    RunInProgress(String),

    #[error("run cancelled")]
    Cancelled,
}

impl ConsolidationError {
    pub fn unknown_chain(chain_id: u64) -> Self {
        ConsolidationError::Configuration(format!("unknown chain id {chain_id}"))
    }

    pub fn unknown_token(symbol: &str) -> Self {
        ConsolidationError::Configuration(format!("unknown token '{symbol}'"))
    }
}
