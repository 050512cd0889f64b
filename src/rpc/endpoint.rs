//! Gateway endpoint URL composition

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Version segment every gateway path lives under
const API_PREFIX: &str = "v1";

/// Normalized gateway base URL (no trailing slash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let base = raw.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid RPC URL '{}': {}", base, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Invalid RPC URL '{}': expected http or https",
                base
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>/v1/<path>`, with `?token=` appended when a token is given.
    pub fn url(&self, path: &str, token: Option<&SecretString>) -> Result<Url> {
        let raw = format!("{}/{}/{}", self.base, API_PREFIX, path.trim_start_matches('/'));
        let mut url =
            Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid URL '{}': {}", raw, e)))?;
        if let Some(token) = token {
            url.query_pairs_mut()
                .append_pair("token", token.expose_secret());
        }
        Ok(url)
    }

    /// Replace any occurrence of the token in text headed for logs or errors.
    pub fn redact(text: &str, token: &SecretString) -> String {
        let secret = token.expose_secret();
        if secret.is_empty() {
            return text.to_string();
        }
        text.replace(secret, "[REDACTED]")
    }
}
