//! Authenticated JSON-RPC client
//!
//! # Responsibilities
//! - Compose `<base>/v1/<path>?token=<token>` URLs
//! - Build JSON-RPC 2.0 envelopes with monotonically increasing ids
//! - Turn non-2xx statuses into `Error::Transport` and `error` bodies into `Error::Rpc`
//! - Return `result` untouched; typed decoding lives in [`super::eth`]

use super::endpoint::Endpoint;
use super::transport::{HttpMethod, HttpReply, HttpRequest, Transport};
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Path of the JSON-RPC endpoint under `/v1/`
const RPC_PATH: &str = "";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    /// Usually `{code, message, data}`, but some gateways send a bare string
    /// or omit the code.
    #[serde(default)]
    error: Option<Value>,
}

fn rpc_error(method: &str, params: &Value, error: Value) -> Error {
    let code = error.get("code").and_then(Value::as_i64);
    let message = match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => match error.as_str() {
            Some(text) => text.to_string(),
            None => error.to_string(),
        },
    };
    Error::Rpc {
        method: method.to_string(),
        params: params.to_string(),
        code,
        message,
        data: error.get("data").cloned(),
    }
}

pub struct RpcClient {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    token: Option<SecretString>,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Client whose requests carry the session token.
    pub fn authenticated(
        transport: Arc<dyn Transport>,
        endpoint: Endpoint,
        token: SecretString,
    ) -> Self {
        Self {
            transport,
            endpoint,
            token: Some(token),
            next_id: AtomicU64::new(1),
        }
    }

    /// Client for the unauthenticated gateway routes (join, chain id).
    pub fn anonymous(transport: Arc<dyn Transport>, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
            token: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue a JSON-RPC call and return its `result` (`Null` when absent).
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let params = Value::Array(params);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(id, method, params = %params, "RPC call");

        let reply = self
            .exchange(HttpMethod::Post, RPC_PATH, Some(payload), method)
            .await?;
        let response: RpcResponse = serde_json::from_str(&reply.body)
            .map_err(|e| Error::decode(method, format!("invalid JSON-RPC body: {}", e)))?;

        if let Some(error) = response.error {
            return Err(rpc_error(method, &params, error));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// GET an informational JSON route such as `network-config/`.
    pub async fn get(&self, path: &str) -> Result<Value> {
        let reply = self.exchange(HttpMethod::Get, path, None, path).await?;
        serde_json::from_str(&reply.body)
            .map_err(|e| Error::decode(path, format!("invalid JSON body: {}", e)))
    }

    /// GET a route that answers with plain text.
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let reply = self.exchange(HttpMethod::Get, path, None, path).await?;
        Ok(reply.body)
    }

    /// POST a JSON body to a route that answers with plain text.
    pub async fn post_text(&self, path: &str, body: Value) -> Result<String> {
        let reply = self
            .exchange(HttpMethod::Post, path, Some(body), path)
            .await?;
        Ok(reply.body)
    }

    async fn exchange(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        context: &str,
    ) -> Result<HttpReply> {
        let url = self.endpoint.url(path, self.token.as_ref())?;
        let reply = self.transport.send(HttpRequest { method, url, body }).await?;

        if !reply.is_success() {
            let body = match &self.token {
                Some(token) => Endpoint::redact(&reply.body, token),
                None => reply.body,
            };
            return Err(Error::Transport {
                context: context.to_string(),
                status: reply.status,
                body,
            });
        }

        Ok(reply)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.endpoint.base())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}
