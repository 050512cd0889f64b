//! Scripted in-memory gateway for tests
//!
//! RPC replies are queued per method; the last queued reply for a method
//! keeps answering once the queue is down to one entry. Unscripted methods
//! answer with a `-32601` error.

use super::client::RpcClient;
use super::endpoint::Endpoint;
use super::transport::{HttpMethod, HttpReply, HttpRequest, Transport};
use crate::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const TEST_BASE: &str = "http://gateway.test";
pub const TEST_TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
enum Scripted {
    Result(Value),
    Error { code: i64, message: String },
    RawError(Value),
}

#[derive(Default)]
pub struct MockGateway {
    rpc: Mutex<HashMap<String, VecDeque<Scripted>>>,
    paths: Mutex<HashMap<String, HttpReply>>,
    rpc_failure: Mutex<Option<HttpReply>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn client(self: &Arc<Self>) -> RpcClient {
        RpcClient::authenticated(
            self.clone(),
            Endpoint::parse(TEST_BASE).unwrap(),
            SecretString::from(TEST_TOKEN),
        )
    }

    pub fn anonymous_client(self: &Arc<Self>) -> RpcClient {
        RpcClient::anonymous(self.clone(), Endpoint::parse(TEST_BASE).unwrap())
    }

    pub fn respond(&self, method: &str, result: Value) {
        self.push(method, Scripted::Result(result));
    }

    pub fn respond_error(&self, method: &str, code: i64, message: &str) {
        self.push(
            method,
            Scripted::Error {
                code,
                message: message.to_string(),
            },
        );
    }

    /// Reply with `value` as the `error` member, whatever its shape.
    pub fn respond_error_value(&self, method: &str, value: Value) {
        self.push(method, Scripted::RawError(value));
    }

    /// Every JSON-RPC POST fails at the HTTP layer.
    pub fn fail_rpc(&self, status: u16, body: &str) {
        *self.rpc_failure.lock().unwrap() = Some(HttpReply {
            status,
            body: body.to_string(),
        });
    }

    /// Reply for a non-RPC route, keyed by the path under `/v1/` (or the
    /// bare path for other services such as the faucet).
    pub fn on_path(&self, path: &str, status: u16, body: &str) {
        self.paths.lock().unwrap().insert(
            path.to_string(),
            HttpReply {
                status,
                body: body.to_string(),
            },
        );
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    /// JSON-RPC methods in the order they were called.
    pub fn rpc_methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.body.as_ref()?.get("method")?.as_str().map(String::from))
            .collect()
    }

    /// Params of every call to `method`, in order.
    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.requests()
            .iter()
            .filter_map(|r| r.body.as_ref())
            .filter(|b| b.get("method").and_then(Value::as_str) == Some(method))
            .map(|b| b["params"].clone())
            .collect()
    }

    fn push(&self, method: &str, reply: Scripted) {
        self.rpc
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    fn next_rpc(&self, method: &str) -> Option<Scripted> {
        let mut rpc = self.rpc.lock().unwrap();
        let queue = rpc.get_mut(method)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// Path under `/v1/` for gateway URLs, the bare path for any other host.
    fn route(url: &url::Url) -> String {
        let path = url.path();
        path.strip_prefix("/v1/")
            .unwrap_or_else(|| path.trim_start_matches('/'))
            .to_string()
    }
}

#[async_trait]
impl Transport for MockGateway {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply> {
        self.log.lock().unwrap().push(request.clone());

        let route = Self::route(&request.url);
        let rpc_method = request
            .body
            .as_ref()
            .and_then(|b| b.get("method"))
            .and_then(Value::as_str)
            .map(String::from);

        let (HttpMethod::Post, true, Some(method)) =
            (request.method, route.is_empty(), rpc_method)
        else {
            let reply = self.paths.lock().unwrap().get(&route).cloned();
            return Ok(reply.unwrap_or(HttpReply {
                status: 404,
                body: "404 page not found".to_string(),
            }));
        };

        if let Some(failure) = self.rpc_failure.lock().unwrap().clone() {
            return Ok(failure);
        }

        let id = request.body.as_ref().map(|b| b["id"].clone());
        let body = match self.next_rpc(&method) {
            Some(Scripted::Result(result)) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Some(Scripted::Error { code, message }) => {
                json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
            }
            Some(Scripted::RawError(error)) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
            None => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("the method {} does not exist", method)}
            }),
        };

        Ok(HttpReply {
            status: 200,
            body: body.to_string(),
        })
    }
}
