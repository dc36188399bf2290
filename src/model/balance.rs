use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::amount::{NormalizedAmount, u256_dec};

/// One (chain, token, amount) observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub chain_id: u64,
    pub token: String,
    /// Contract address; `Address::ZERO` for the chain's native currency.
    pub address: Address,
    #[serde(with = "u256_dec")]
    pub raw_amount: U256,
    pub decimals: u8,
    #[serde(default)]
    pub native: bool,
}

impl BalanceEntry {
    pub fn normalized(&self) -> NormalizedAmount {
        NormalizedAmount::new(self.raw_amount, self.decimals)
    }

    pub fn is_positive(&self) -> bool {
        !self.raw_amount.is_zero()
    }
}

/// All balance entries for one chain, tokens in manifest order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBalanceGroup {
    pub chain_id: u64,
    pub chain_name: String,
    pub entries: Vec<BalanceEntry>,
}

impl ChainBalanceGroup {
    pub fn entry(&self, token: &str) -> Option<&BalanceEntry> {
        self.entries
            .iter()
            .find(|e| e.token.eq_ignore_ascii_case(token))
    }
}
