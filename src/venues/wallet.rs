use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Result;

use crate::model::{Account, WalletConnection};

use super::Wallet;

/// Wallet backed by a local private key. The key never leaves this type;
/// venues receive an `EthereumWallet` to sign their own transactions.
pub struct LocalWallet {
    signer: PrivateKeySigner,
}

impl LocalWallet {
    pub fn from_private_key(key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid private key: {e}"))?;
        Ok(LocalWallet { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl Wallet for LocalWallet {
    fn connection(&self) -> WalletConnection {
        WalletConnection::Connected(Account {
            address: self.signer.address(),
        })
    }
}

/// Address-only wallet for dry runs and balance inspection. `None` models a
/// disconnected wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOnlyWallet {
    address: Option<Address>,
}

impl WatchOnlyWallet {
    pub fn new(address: Address) -> Self {
        WatchOnlyWallet {
            address: Some(address),
        }
    }

    pub fn disconnected() -> Self {
        WatchOnlyWallet { address: None }
    }
}

impl Wallet for WatchOnlyWallet {
    fn connection(&self) -> WalletConnection {
        match self.address {
            Some(address) => WalletConnection::Connected(Account { address }),
            None => WalletConnection::Disconnected,
        }
    }
}
