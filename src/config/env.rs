//! Session configuration from environment variables
//!
//! Required values are fatal when absent; optional legs of the run are modeled
//! as explicit presence/absence variants so the orchestrator can decide
//! skip-vs-abort per stage.
//!
//! # Examples
//!
//! ```bash
//! export TEN_RPC_URL="https://testnet.ten.xyz"
//! export TEN_AUTH_TOKEN="..."
//! export TEN_SESSION_KEY_ADDRESS="0x..."
//! # optional: funding and refunds
//! export TEN_ACCOUNT="0x..."
//! export TEN_PRIVATE_KEY="..."
//! # optional: token legs
//! export TEN_TOKEN_ADDRESS="0x..."
//! export TEN_TOKEN_AMOUNT="100"
//! ```

use crate::rpc::Endpoint;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use secrecy::SecretString;
use std::str::FromStr;

/// Environment variable names
pub mod env_vars {
    pub const RPC_URL: &str = "TEN_RPC_URL";
    pub const AUTH_TOKEN: &str = "TEN_AUTH_TOKEN";
    pub const SESSION_KEY_ADDRESS: &str = "TEN_SESSION_KEY_ADDRESS";
    pub const ACCOUNT: &str = "TEN_ACCOUNT";
    pub const PRIVATE_KEY: &str = "TEN_PRIVATE_KEY";
    pub const TOKEN_ADDRESS: &str = "TEN_TOKEN_ADDRESS";
    pub const TOKEN_AMOUNT_WEI: &str = "TEN_TOKEN_AMOUNT_WEI";
    pub const TOKEN_AMOUNT: &str = "TEN_TOKEN_AMOUNT";
    pub const FAUCET_URL: &str = "FAUCET_URL";
}

/// The primary (locally keyed) account
pub enum PrimaryAccount {
    /// Neither address nor key usable
    Unset,
    /// Address known, no key: can receive refunds but cannot fund
    ReadOnly(Address),
    /// Address and key: can fund the session key
    Signing {
        address: Address,
        private_key: SecretString,
    },
}

impl PrimaryAccount {
    pub fn address(&self) -> Option<Address> {
        match self {
            PrimaryAccount::Unset => None,
            PrimaryAccount::ReadOnly(address) | PrimaryAccount::Signing { address, .. } => {
                Some(*address)
            }
        }
    }

    pub fn private_key(&self) -> Option<&SecretString> {
        match self {
            PrimaryAccount::Signing { private_key, .. } => Some(private_key),
            _ => None,
        }
    }
}

impl std::fmt::Debug for PrimaryAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryAccount::Unset => f.write_str("Unset"),
            PrimaryAccount::ReadOnly(address) => f.debug_tuple("ReadOnly").field(address).finish(),
            PrimaryAccount::Signing { address, .. } => f
                .debug_struct("Signing")
                .field("address", address)
                .field("private_key", &"[REDACTED]")
                .finish(),
        }
    }
}

/// How much of the token to move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAmount {
    /// Human units, scaled by the token's on-chain `decimals()`
    Units(String),
    /// Already in the token's smallest unit
    Smallest(U256),
}

/// ERC20 legs of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLeg {
    pub address: Address,
    pub amount: TokenAmount,
}

/// Everything a run needs to know about endpoint and accounts
#[derive(Debug)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    pub auth_token: SecretString,
    pub session_key: Option<Address>,
    pub primary: PrimaryAccount,
    pub token: Option<TokenLeg>,
}

impl SessionConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup (empty values count as unset).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let endpoint = Endpoint::parse(
            &var(env_vars::RPC_URL).ok_or(Error::ConfigurationMissing(env_vars::RPC_URL))?,
        )?;
        let auth_token = SecretString::from(
            var(env_vars::AUTH_TOKEN).ok_or(Error::ConfigurationMissing(env_vars::AUTH_TOKEN))?,
        );

        let session_key = var(env_vars::SESSION_KEY_ADDRESS)
            .and_then(|raw| optional_address(env_vars::SESSION_KEY_ADDRESS, &raw));

        let account = var(env_vars::ACCOUNT).and_then(|raw| optional_address(env_vars::ACCOUNT, &raw));
        let primary = match (account, var(env_vars::PRIVATE_KEY)) {
            (Some(address), Some(key)) => PrimaryAccount::Signing {
                address,
                private_key: SecretString::from(key),
            },
            (Some(address), None) => PrimaryAccount::ReadOnly(address),
            (None, Some(_)) => {
                tracing::warn!(
                    "{} set without a valid {}; ignoring the key",
                    env_vars::PRIVATE_KEY,
                    env_vars::ACCOUNT
                );
                PrimaryAccount::Unset
            }
            (None, None) => PrimaryAccount::Unset,
        };

        let token = var(env_vars::TOKEN_ADDRESS)
            .and_then(|raw| optional_address(env_vars::TOKEN_ADDRESS, &raw))
            .and_then(|address| {
                let amount = token_amount(
                    var(env_vars::TOKEN_AMOUNT_WEI),
                    var(env_vars::TOKEN_AMOUNT),
                )?;
                Some(TokenLeg { address, amount })
            });

        Ok(Self {
            endpoint,
            auth_token,
            session_key,
            primary,
            token,
        })
    }
}

fn optional_address(name: &str, raw: &str) -> Option<Address> {
    match Address::from_str(raw.trim()) {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::warn!(var = name, error = %e, "Ignoring malformed address");
            None
        }
    }
}

fn token_amount(wei: Option<String>, units: Option<String>) -> Option<TokenAmount> {
    if let Some(raw) = wei {
        return match U256::from_str_radix(raw.trim(), 10) {
            Ok(amount) => Some(TokenAmount::Smallest(amount)),
            Err(e) => {
                tracing::warn!(var = env_vars::TOKEN_AMOUNT_WEI, error = %e, "Ignoring malformed amount");
                None
            }
        };
    }
    match units {
        Some(raw) => Some(TokenAmount::Units(raw.trim().to_string())),
        None => {
            tracing::warn!(
                "{} set without {} or {}; token legs disabled",
                env_vars::TOKEN_ADDRESS,
                env_vars::TOKEN_AMOUNT_WEI,
                env_vars::TOKEN_AMOUNT
            );
            None
        }
    }
}
