//! Error types for the session-key orchestrator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing configuration: {0} is not set")]
    ConfigurationMissing(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The HTTP layer answered with a non-success status.
    #[error("{context} failed with HTTP {status}: {body}")]
    Transport {
        context: String,
        status: u16,
        body: String,
    },

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Network error: {0}")]
    Network(reqwest::Error),

    /// JSON-RPC error, carried verbatim. Gateways do not always send a code.
    #[error("RPC error from {method} {params}: {message}{}", code_suffix(.code))]
    Rpc {
        method: String,
        params: String,
        code: Option<i64>,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unexpected response from {method}: {detail}")]
    Decode { method: String, detail: String },

    #[error("Authentication rejected: {0}")]
    Authentication(String),
}

impl Error {
    /// True for structured JSON-RPC errors returned by the endpoint.
    pub fn is_rpc(&self) -> bool {
        matches!(self, Error::Rpc { .. })
    }

    pub(crate) fn decode(method: &str, detail: impl Into<String>) -> Self {
        Error::Decode {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}

fn code_suffix(code: &Option<i64>) -> String {
    match code {
        Some(code) => format!(" (code {})", code),
        None => String::new(),
    }
}

// reqwest errors carry the request URL, and ours has the session token in its query.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.without_url())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
