//! Configuration for the session-key orchestrator
//!
//! Two layers:
//! - [`SessionConfig`]: endpoint, token and accounts, read from the environment
//!   (secrets live here and only here).
//! - [`Settings`]: non-secret tunables, optionally loaded from a JSON file.

pub mod env;

use crate::units::{parse_units, NATIVE_DECIMALS};
use crate::{Error, Result};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub use env::{env_vars, PrimaryAccount, SessionConfig, TokenAmount, TokenLeg};

/// Confirmation polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationSettings {
    /// Maximum number of receipt queries
    pub max_attempts: u32,
    /// Pause between receipt queries (milliseconds)
    pub interval_ms: u64,
}

impl ConfirmationSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_ms: 500, // ~15s ceiling
        }
    }
}

/// Non-secret run settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Native amount sent from the primary account to the session key (ether units)
    pub funding_amount: String,
    /// Native amount refunded from the session key to the primary account (ether units)
    pub refund_amount: String,
    /// Receipt polling budget
    pub confirmation: ConfirmationSettings,
    /// Per-request HTTP timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            funding_amount: "0.01".to_string(),
            refund_amount: "0.005".to_string(),
            confirmation: ConfirmationSettings::default(),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Funding amount in wei
    pub fn funding_wei(&self) -> Result<U256> {
        parse_units(&self.funding_amount, NATIVE_DECIMALS)
            .map_err(|e| Error::Config(format!("funding_amount: {}", e)))
    }

    /// Refund amount in wei
    pub fn refund_wei(&self) -> Result<U256> {
        parse_units(&self.refund_amount, NATIVE_DECIMALS)
            .map_err(|e| Error::Config(format!("refund_amount: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
