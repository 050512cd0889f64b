//! Testnet faucet top-up
//!
//! The faucet is its own service, not a gateway route: `POST <faucet>/fund/eth`
//! with `{"address": "0x.."}`, no session token. Balances are read through the
//! gateway before and after the request so the top-up shows on stdout.

use crate::orchestrator::Console;
use crate::rpc::{BlockTag, HttpMethod, HttpRequest, RpcClient, Transport};
use crate::units::NATIVE_DECIMALS;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use url::Url;

const FUND_PATH: &str = "fund/eth";

pub struct Faucet {
    transport: Arc<dyn Transport>,
    base: String,
}

/// Balances around a faucet request
#[derive(Debug, Clone, PartialEq)]
pub struct TopUp {
    pub before: U256,
    pub response: Value,
    pub after: U256,
}

impl Faucet {
    pub fn new(transport: Arc<dyn Transport>, raw: &str) -> Result<Self> {
        let base = raw.trim().trim_end_matches('/').to_string();
        Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid faucet URL '{}': {}", base, e)))?;
        Ok(Self { transport, base })
    }

    /// Ask the faucet to fund `address`. Non-JSON replies come back as a string.
    pub async fn request_funds(&self, address: Address) -> Result<Value> {
        let raw = format!("{}/{}", self.base, FUND_PATH);
        let url =
            Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid URL '{}': {}", raw, e)))?;

        info!(%address, "Requesting faucet funds");
        let reply = self
            .transport
            .send(HttpRequest {
                method: HttpMethod::Post,
                url,
                body: Some(json!({ "address": address.to_string() })),
            })
            .await?;

        if !reply.is_success() {
            return Err(Error::Transport {
                context: "faucet".to_string(),
                status: reply.status,
                body: reply.body,
            });
        }

        let response = serde_json::from_str(&reply.body).unwrap_or(Value::String(reply.body));
        info!(response = %response, "Faucet response");
        Ok(response)
    }

    /// Balance, faucet request, balance again; each step printed as it happens.
    pub async fn top_up<W: Write>(
        &self,
        client: &RpcClient,
        address: Address,
        console: &mut Console<W>,
    ) -> Result<TopUp> {
        let before = client.get_balance(address, BlockTag::Latest).await?;
        console.amount("balance_before_wei", "balance_before_eth", before, NATIVE_DECIMALS)?;

        let response = self.request_funds(address).await?;
        match response.as_str() {
            Some(text) => console.field("faucet_response", text)?,
            None => console.field("faucet_response", &response)?,
        }

        let after = client.get_balance(address, BlockTag::Latest).await?;
        console.amount("balance_after_wei", "balance_after_eth", after, NATIVE_DECIMALS)?;

        Ok(TopUp {
            before,
            response,
            after,
        })
    }
}
