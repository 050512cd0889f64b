//! Session key discovery
//!
//! The gateway exposes the session key bound to a token through a storage
//! read against a reserved address; the address sits in the low 20 bytes of
//! the packed word.

use crate::rpc::RpcClient;
use crate::Result;
use alloy::primitives::Address;
use serde_json::Value;

/// Reserved address the gateway answers session-key lookups for
pub const SESSION_KEY_STORAGE_ADDRESS: &str = "0x0000000000000000000000000000000000000003";

/// Outcome of a session key lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SessionKeyLookup {
    /// Raw `eth_getStorageAt` result
    pub raw: Value,
    pub address: Option<Address>,
}

/// Last 20 bytes of a `0x`-prefixed packed value; `None` when it is too short.
pub fn address_from_packed(packed: &str) -> Option<Address> {
    let hex = packed.strip_prefix("0x")?;
    if hex.len() < 40 || !hex.is_ascii() {
        return None;
    }
    hex[hex.len() - 40..].parse().ok()
}

pub async fn discover(client: &RpcClient) -> Result<SessionKeyLookup> {
    let raw = client
        .storage_at(SESSION_KEY_STORAGE_ADDRESS, "", "0x0")
        .await?;
    let address = raw.as_str().and_then(address_from_packed);

    match address {
        Some(address) => tracing::info!(%address, "Session key found"),
        None => tracing::warn!(raw = %raw, "No session key in storage result"),
    }

    Ok(SessionKeyLookup { raw, address })
}
