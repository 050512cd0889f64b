//! Typed `eth_*` calls on top of [`RpcClient::call`]
//!
//! One method per JSON-RPC method the orchestrator uses. Hex decoding goes
//! through [`crate::units`]; nothing here formats decimals.

use super::client::RpcClient;
use crate::units::{parse_quantity, to_quantity};
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Block parameter for state reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    /// Includes broadcast but unconfirmed transactions
    Pending,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        }
    }
}

/// `{from, to, value, data}` as sent to `eth_call` / `eth_estimateGas`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub value: Option<U256>,
    pub data: Option<Bytes>,
}

impl CallRequest {
    pub fn new(to: Address) -> Self {
        Self {
            from: None,
            to,
            value: None,
            data: None,
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(from) = self.from {
            fields.insert("from".into(), json!(from.to_string()));
        }
        fields.insert("to".into(), json!(self.to.to_string()));
        if let Some(value) = self.value {
            fields.insert("value".into(), json!(to_quantity(value)));
        }
        if let Some(data) = &self.data {
            fields.insert("data".into(), json!(data.to_string()));
        }
        fields
    }
}

/// The parts of a transaction receipt this crate reads
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
}

impl Receipt {
    /// `Some(true)` for status `0x1`, `None` when the endpoint omits status.
    pub fn succeeded(&self) -> Option<bool> {
        let status = self.status.as_deref()?;
        parse_quantity(status).ok().map(|s| s == U256::from(1u8))
    }

    pub fn block(&self) -> Option<U256> {
        parse_quantity(self.block_number.as_deref()?).ok()
    }
}

fn quantity(method: &str, value: &Value) -> Result<U256> {
    let raw = value
        .as_str()
        .ok_or_else(|| Error::decode(method, format!("expected hex quantity, got {}", value)))?;
    parse_quantity(raw).map_err(|e| Error::decode(method, e.to_string()))
}

impl RpcClient {
    pub async fn get_balance(&self, address: Address, tag: BlockTag) -> Result<U256> {
        const METHOD: &str = "eth_getBalance";
        let result = self
            .call(METHOD, vec![json!(address.to_string()), json!(tag.as_str())])
            .await?;
        quantity(METHOD, &result)
    }

    pub async fn gas_price(&self) -> Result<U256> {
        const METHOD: &str = "eth_gasPrice";
        let result = self.call(METHOD, vec![]).await?;
        quantity(METHOD, &result)
    }

    /// `None` when the endpoint answers without a result.
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<Option<U256>> {
        const METHOD: &str = "eth_estimateGas";
        let result = self
            .call(METHOD, vec![Value::Object(request.to_json())])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        quantity(METHOD, &result).map(Some)
    }

    pub async fn transaction_count(&self, address: Address, tag: BlockTag) -> Result<U256> {
        const METHOD: &str = "eth_getTransactionCount";
        let result = self
            .call(METHOD, vec![json!(address.to_string()), json!(tag.as_str())])
            .await?;
        quantity(METHOD, &result)
    }

    /// Submit a transaction for the endpoint to sign and broadcast.
    pub async fn send_transaction(&self, fields: Map<String, Value>) -> Result<TxHash> {
        const METHOD: &str = "eth_sendTransaction";
        let result = self.call(METHOD, vec![Value::Object(fields)]).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| Error::decode(METHOD, format!("expected transaction hash, got {}", result)))?;
        raw.parse::<TxHash>()
            .map_err(|e| Error::decode(METHOD, format!("'{}': {}", raw, e)))
    }

    pub async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>> {
        const METHOD: &str = "eth_getTransactionReceipt";
        let result = self.call(METHOD, vec![json!(hash.to_string())]).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .map_err(|e| Error::decode(METHOD, e.to_string()))
    }

    /// `eth_call` against the latest block; returns the raw return data.
    pub async fn call_contract(&self, request: &CallRequest) -> Result<Bytes> {
        const METHOD: &str = "eth_call";
        let result = self
            .call(
                METHOD,
                vec![Value::Object(request.to_json()), json!(BlockTag::Latest.as_str())],
            )
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| Error::decode(METHOD, format!("expected hex data, got {}", result)))?;
        raw.parse::<Bytes>()
            .map_err(|e| Error::decode(METHOD, format!("'{}': {}", raw, e)))
    }

    /// Raw `eth_getStorageAt`; params are passed through as given.
    pub async fn storage_at(&self, address: &str, slot: &str, block: &str) -> Result<Value> {
        self.call(
            "eth_getStorageAt",
            vec![json!(address), json!(slot), json!(block)],
        )
        .await
    }

    pub async fn chain_id(&self) -> Result<u64> {
        const METHOD: &str = "eth_chainId";
        let result = self.call(METHOD, vec![]).await?;
        let id = quantity(METHOD, &result)?;
        u64::try_from(id).map_err(|_| Error::decode(METHOD, format!("chain id {} out of range", id)))
    }
}
