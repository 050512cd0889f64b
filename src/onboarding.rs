//! Gateway onboarding: obtain and authenticate a session token
//!
//! 1. `eth_chainId` (unless given) and `GET join/` without a token
//! 2. Sign the EIP-712 `Authentication` message binding the token to the
//!    primary address
//! 3. `POST authenticate/?token=...` with the signature; the gateway answers
//!    `success`

use crate::rpc::{Endpoint, RpcClient, Transport};
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::hex;
use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::Eip712Domain;
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const DOMAIN_NAME: &str = "Ten";
const DOMAIN_VERSION: &str = "1.0";
const AUTHENTICATION_TYPE: &str = "Authentication(address Encryption Token)";

/// A token the gateway has bound to `address`
pub struct Registration {
    pub token: SecretString,
    pub address: Address,
    pub chain_id: u64,
}

/// EIP-712 digest of `Authentication { "Encryption Token": token }`.
pub fn authentication_digest(chain_id: u64, encryption_token: Address) -> B256 {
    let domain = Eip712Domain::new(
        Some(DOMAIN_NAME.into()),
        Some(DOMAIN_VERSION.into()),
        Some(U256::from(chain_id)),
        Some(Address::ZERO),
        None,
    );

    let mut encoded = Vec::with_capacity(64);
    encoded.extend_from_slice(keccak256(AUTHENTICATION_TYPE.as_bytes()).as_slice());
    encoded.extend_from_slice(encryption_token.into_word().as_slice());
    let struct_hash = keccak256(&encoded);

    let mut message = Vec::with_capacity(66);
    message.extend_from_slice(&[0x19, 0x01]);
    message.extend_from_slice(domain.separator().as_slice());
    message.extend_from_slice(struct_hash.as_slice());
    keccak256(&message)
}

/// The join route returns 20 bytes of hex, without prefix.
fn parse_join_token(body: &str) -> Result<(String, Address)> {
    let token = body.trim().trim_start_matches("0x").to_string();
    let as_address = format!("0x{}", token)
        .parse::<Address>()
        .map_err(|_| Error::Authentication("join returned a malformed token".to_string()))?;
    Ok((token, as_address))
}

pub async fn register(
    transport: Arc<dyn Transport>,
    endpoint: &Endpoint,
    wallet: &SecureWallet,
    chain_id: Option<u64>,
) -> Result<Registration> {
    let anonymous = RpcClient::anonymous(transport.clone(), endpoint.clone());

    let chain_id = match chain_id {
        Some(id) => id,
        None => anonymous.chain_id().await?,
    };
    info!(chain_id, "Joining gateway");

    let (token, encryption_token) = parse_join_token(&anonymous.get_text("join/").await?)?;
    info!("Joined gateway, signing authentication message");

    let digest = authentication_digest(chain_id, encryption_token);
    let signature = wallet.sign_hash(&digest)?;

    let token = SecretString::from(token);
    let authenticated = RpcClient::authenticated(transport, endpoint.clone(), token.clone());
    let reply = authenticated
        .post_text(
            "authenticate/",
            json!({
                "signature": format!("0x{}", hex::encode(signature.as_bytes())),
                "address": wallet.address().to_string(),
            }),
        )
        .await?;

    if reply.trim() != "success" {
        return Err(Error::Authentication(Endpoint::redact(reply.trim(), &token)));
    }
    info!(address = %wallet.address(), "Authentication successful");

    Ok(Registration {
        token,
        address: wallet.address(),
        chain_id,
    })
}
