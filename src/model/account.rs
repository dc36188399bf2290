use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// The connected account. Opaque to the engine beyond its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// What the wallet collaborator reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletConnection {
    Connected(Account),
    Disconnected,
}

/// Caller-chosen destination for a run: every holding should end up as
/// `target_token` on `target_chain_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelection {
    pub target_token: String,
    pub target_chain_id: u64,
}

impl TargetSelection {
    pub fn new(target_token: impl Into<String>, target_chain_id: u64) -> Self {
        TargetSelection {
            target_token: target_token.into(),
            target_chain_id,
        }
    }

    pub fn is_target_token(&self, symbol: &str) -> bool {
        self.target_token.eq_ignore_ascii_case(symbol)
    }
}
