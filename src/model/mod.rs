pub mod account;
pub mod amount;
pub mod balance;
pub mod chain;
pub mod config;
pub mod outcome;
pub mod token;

pub use account::{Account, TargetSelection, WalletConnection};
pub use amount::NormalizedAmount;
pub use balance::{BalanceEntry, ChainBalanceGroup};
pub use chain::{Chain, ChainEntry, ChainRegistry};
pub use config::ConsolidationConfig;
pub use outcome::{BridgeLeg, BridgeResult, LegState, RunStatus, SkipReason, SwapResult, SwapState};
pub use token::{TokenDeployment, TokenIdentity, TokenManifest, TokenSpec};
