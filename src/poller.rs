//! Bounded receipt polling
//!
//! A missing receipt after the budget is a normal outcome (`Ok(None)`), not an
//! error. RPC and transport errors while polling are surfaced unchanged.

use crate::config::ConfirmationSettings;
use crate::rpc::{Receipt, RpcClient};
use crate::Result;
use alloy::primitives::TxHash;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPoller {
    max_attempts: u32,
    interval: Duration,
}

impl ConfirmationPoller {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    pub fn from_settings(settings: &ConfirmationSettings) -> Self {
        Self::new(settings.max_attempts, settings.interval())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Query the receipt up to `max_attempts` times, sleeping between attempts.
    pub async fn await_receipt(&self, client: &RpcClient, hash: TxHash) -> Result<Option<Receipt>> {
        for attempt in 1..=self.max_attempts {
            if let Some(receipt) = client.transaction_receipt(hash).await? {
                info!(%hash, attempt, block = ?receipt.block_number, "Receipt observed");
                return Ok(Some(receipt));
            }
            debug!(%hash, attempt, max_attempts = self.max_attempts, "Receipt not yet available");

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        info!(%hash, max_attempts = self.max_attempts, "No receipt within polling budget");
        Ok(None)
    }
}

impl Default for ConfirmationPoller {
    fn default() -> Self {
        Self::from_settings(&ConfirmationSettings::default())
    }
}
