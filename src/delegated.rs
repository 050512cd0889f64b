//! Delegated (gateway-signed) transactions
//!
//! The session key has no local private key. To move funds out of it we
//! assemble every field the gateway needs and submit `eth_sendTransaction`;
//! the gateway signs for `from` because the request carries a session token
//! bound to it.
//!
//! Each send re-queries gas price, gas estimate and the pending nonce, in that
//! order. Nothing is cached between sends: the pending nonce moves as soon as
//! a previous send is broadcast.

use crate::rpc::{BlockTag, CallRequest, RpcClient};
use crate::units::to_quantity;
use crate::Result;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Gas for a plain value transfer; used when estimation fails.
///
/// Too low for contract calls, so a failed estimate on a token transfer may
/// still produce an out-of-gas transaction.
pub const FALLBACK_GAS_LIMIT: u64 = 21_000;

/// Raw transaction descriptor, built fresh for every send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedTx {
    pub from: Address,
    pub to: Address,
    pub value: Option<U256>,
    pub data: Option<Bytes>,
    pub gas: U256,
    pub gas_price: U256,
    pub nonce: U256,
}

impl DelegatedTx {
    /// Wire form: numeric fields as hex quantities.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut fields = self.call_request().to_json();
        fields.insert("gas".into(), json!(to_quantity(self.gas)));
        fields.insert("gasPrice".into(), json!(to_quantity(self.gas_price)));
        fields.insert("nonce".into(), json!(to_quantity(self.nonce)));
        fields
    }

    fn call_request(&self) -> CallRequest {
        CallRequest {
            from: Some(self.from),
            to: self.to,
            value: self.value,
            data: self.data.clone(),
        }
    }
}

pub struct DelegatedTransactionBuilder<'a> {
    client: &'a RpcClient,
}

impl<'a> DelegatedTransactionBuilder<'a> {
    pub fn new(client: &'a RpcClient) -> Self {
        Self { client }
    }

    /// Query gas price, gas estimate and pending nonce for this exact transfer.
    pub async fn build(
        &self,
        from: Address,
        to: Address,
        value: Option<U256>,
        data: Option<Bytes>,
    ) -> Result<DelegatedTx> {
        let gas_price = self.client.gas_price().await?;

        let request = CallRequest {
            from: Some(from),
            to,
            value,
            data: data.clone(),
        };
        let gas = match self.client.estimate_gas(&request).await {
            Ok(Some(gas)) => gas,
            Ok(None) => {
                warn!(%from, %to, fallback = FALLBACK_GAS_LIMIT, "Gas estimate missing, using fallback");
                U256::from(FALLBACK_GAS_LIMIT)
            }
            Err(e) if e.is_rpc() => {
                warn!(%from, %to, error = %e, fallback = FALLBACK_GAS_LIMIT, "Gas estimation failed, using fallback");
                U256::from(FALLBACK_GAS_LIMIT)
            }
            Err(e) => return Err(e),
        };

        let nonce = self.client.transaction_count(from, BlockTag::Pending).await?;

        let tx = DelegatedTx {
            from,
            to,
            value,
            data,
            gas,
            gas_price,
            nonce,
        };
        debug!(?tx, "Assembled delegated transaction");
        Ok(tx)
    }

    /// Submit an assembled transaction for the gateway to sign and broadcast.
    pub async fn send(&self, tx: &DelegatedTx) -> Result<TxHash> {
        let hash = self.client.send_transaction(tx.to_json()).await?;
        info!(
            from = %tx.from,
            to = %tx.to,
            nonce = %tx.nonce,
            %hash,
            "Delegated transaction submitted"
        );
        Ok(hash)
    }

    pub async fn build_and_send(
        &self,
        from: Address,
        to: Address,
        value: Option<U256>,
        data: Option<Bytes>,
    ) -> Result<TxHash> {
        let tx = self.build(from, to, value, data).await?;
        self.send(&tx).await
    }
}
