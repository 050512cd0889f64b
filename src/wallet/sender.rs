//! Locally-signed transfers
//!
//! The orchestrator only needs "sign and broadcast this transfer" from the
//! primary account. [`LocalSender`] is that seam; [`WalletSender`] fulfils it
//! with an alloy provider that fills gas, nonce and chain id and signs with
//! the [`SecureWallet`].

use super::SecureWallet;
use crate::rpc::Endpoint;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use secrecy::SecretString;
use url::Url;

#[async_trait]
pub trait LocalSender: Send + Sync {
    /// Address transactions are signed for.
    fn address(&self) -> Address;

    /// Sign and broadcast; returns once the node has accepted the transaction.
    async fn send(&self, to: Address, value: U256, data: Option<Bytes>) -> Result<TxHash>;
}

pub struct WalletSender {
    wallet: SecureWallet,
    rpc_url: Url,
    token: SecretString,
}

impl WalletSender {
    pub fn new(wallet: SecureWallet, endpoint: &Endpoint, token: SecretString) -> Result<Self> {
        let rpc_url = endpoint.url("", Some(&token))?;
        Ok(Self {
            wallet,
            rpc_url,
            token,
        })
    }
}

#[async_trait]
impl LocalSender for WalletSender {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn send(&self, to: Address, value: U256, data: Option<Bytes>) -> Result<TxHash> {
        let provider = ProviderBuilder::new()
            .wallet(self.wallet.wallet().clone())
            .connect_http(self.rpc_url.clone());

        let mut tx = TransactionRequest::default()
            .from(self.wallet.address())
            .to(to)
            .value(value);
        if let Some(data) = data {
            tx = tx.input(data.into());
        }

        let pending = provider.send_transaction(tx).await.map_err(|e| {
            Error::Wallet(format!(
                "Failed to send transaction: {}",
                Endpoint::redact(&e.to_string(), &self.token)
            ))
        })?;

        let hash = *pending.tx_hash();
        tracing::info!(from = %self.wallet.address(), %to, %hash, "Local transaction broadcast");
        Ok(hash)
    }
}

impl std::fmt::Debug for WalletSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSender")
            .field("address", &self.wallet.address())
            .finish()
    }
}
