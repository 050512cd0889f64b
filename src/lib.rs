//! Gateway session key orchestrator
//!
//! Provisions a temporary "session key" account, funds it from a primary
//! account, optionally moves ERC20 balance to it, then reclaims native
//! currency and tokens back to the primary account.
//!
//! # Signing Model
//!
//! - The primary account signs locally ([`wallet`]); its key never leaves
//!   that module
//! - The session key has no local key: the gateway signs for it when the
//!   request carries a valid session token ([`delegated`])
//! - The session token and private key are held as `SecretString` and are
//!   redacted from logs and errors

pub mod config;
pub mod delegated;
pub mod erc20;
pub mod faucet;
pub mod onboarding;
pub mod orchestrator;
pub mod poller;
pub mod rpc;
pub mod session_key;
pub mod units;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{SessionConfig, Settings};
pub use error::{Error, Result};
pub use orchestrator::{Accounts, Orchestrator, RunOutcome, Stage};
