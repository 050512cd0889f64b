//! End-to-end session key scenario
//!
//! Stages run strictly in order. Each one is gated on configuration: a stage
//! whose inputs are missing is skipped with a warning and recorded in the
//! [`RunOutcome`]; RPC and transport failures abort the run.
//!
//! | Stage             | Needs                                 | Signed by |
//! |-------------------|---------------------------------------|-----------|
//! | NetworkProbe      | endpoint, token                       | -         |
//! | SessionKeyBalance | session key address                   | -         |
//! | FundSessionKey    | local key                             | local     |
//! | PostFundBalance   | funding ran                           | -         |
//! | TokenFunding      | token leg, local key                  | local     |
//! | NativeRefund      | primary address, local key            | gateway   |
//! | TokenRefund       | token leg, primary address, local key | gateway   |
//!
//! Without a local key the session key is never funded, so both refunds are
//! skipped as well.
//!
//! Every stdout line is `label: value` with snake_case labels, except the
//! network configuration, which follows a bare `network_config:` line as
//! indented JSON. The funding hashes are printed as `funding_tx_hash` and
//! `token_funding_tx_hash` (formerly `Funding tx hash` and
//! `Token transfer tx hash`).

mod console;

#[cfg(test)]
mod tests;

pub use console::Console;

use crate::config::{SessionConfig, Settings, TokenLeg};
use crate::delegated::DelegatedTransactionBuilder;
use crate::erc20::{transfer_calldata, Erc20};
use crate::poller::ConfirmationPoller;
use crate::rpc::{BlockTag, Receipt, RpcClient};
use crate::units::NATIVE_DECIMALS;
use crate::wallet::LocalSender;
use crate::Result;
use alloy::primitives::{Address, TxHash, U256};
use std::fmt;
use std::io::Write;
use tracing::{info, warn};

/// Route of the informational network configuration endpoint
const NETWORK_CONFIG_PATH: &str = "network-config/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NetworkProbe,
    SessionKeyBalance,
    FundSessionKey,
    PostFundBalance,
    TokenFunding,
    NativeRefund,
    TokenRefund,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::NetworkProbe,
        Stage::SessionKeyBalance,
        Stage::FundSessionKey,
        Stage::PostFundBalance,
        Stage::TokenFunding,
        Stage::NativeRefund,
        Stage::TokenRefund,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NetworkProbe => "network_probe",
            Stage::SessionKeyBalance => "session_key_balance",
            Stage::FundSessionKey => "fund_session_key",
            Stage::PostFundBalance => "post_fund_balance",
            Stage::TokenFunding => "token_funding",
            Stage::NativeRefund => "native_refund",
            Stage::TokenRefund => "token_refund",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stages ran and which were skipped (with the reason)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub executed: Vec<Stage>,
    pub skipped: Vec<(Stage, String)>,
}

impl RunOutcome {
    pub fn ran(&self, stage: Stage) -> bool {
        self.executed.contains(&stage)
    }

    pub fn skip_reason(&self, stage: Stage) -> Option<&str> {
        self.skipped
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, reason)| reason.as_str())
    }

    fn record(&mut self, stage: Stage) {
        self.executed.push(stage);
    }

    fn skip(&mut self, stage: Stage, reason: &str) {
        warn!(stage = %stage, reason, "Skipping stage");
        self.skipped.push((stage, reason.to_string()));
    }
}

/// Addresses the run moves value between
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accounts {
    /// Delegated account; the gateway signs for it
    pub session_key: Option<Address>,
    /// Funding source and refund target
    pub primary: Option<Address>,
    pub token: Option<TokenLeg>,
}

impl Accounts {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            session_key: config.session_key,
            primary: config.primary.address(),
            token: config.token.clone(),
        }
    }
}

/// Token leg with its amount resolved against on-chain decimals
#[derive(Debug, Clone, Copy)]
struct ResolvedToken {
    address: Address,
    amount: U256,
    decimals: u8,
}

pub struct Orchestrator<W> {
    client: RpcClient,
    accounts: Accounts,
    funding_wei: U256,
    refund_wei: U256,
    poller: ConfirmationPoller,
    sender: Option<Box<dyn LocalSender>>,
    console: Console<W>,
}

impl<W: Write> Orchestrator<W> {
    /// Amounts come from `settings`; a malformed amount is a configuration error.
    pub fn new(client: RpcClient, accounts: Accounts, settings: &Settings, out: W) -> Result<Self> {
        Ok(Self {
            client,
            accounts,
            funding_wei: settings.funding_wei()?,
            refund_wei: settings.refund_wei()?,
            poller: ConfirmationPoller::from_settings(&settings.confirmation),
            sender: None,
            console: Console::new(out),
        })
    }

    /// Enable the locally signed stages.
    pub fn with_local_sender(mut self, sender: Box<dyn LocalSender>) -> Self {
        if let Some(primary) = self.accounts.primary {
            if primary != sender.address() {
                warn!(
                    configured = %primary,
                    derived = %sender.address(),
                    "Configured account does not match the key's address, proceeding anyway"
                );
            }
        }
        self.sender = Some(sender);
        self
    }

    pub fn into_inner(self) -> W {
        self.console.into_inner()
    }

    pub async fn run(&mut self) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();

        self.probe_network().await?;
        outcome.record(Stage::NetworkProbe);

        let Some(session_key) = self.accounts.session_key else {
            for stage in &Stage::ALL[1..] {
                outcome.skip(*stage, "no session key address configured");
            }
            return Ok(outcome);
        };

        self.native_balance(session_key, "session_key_balance_wei", "session_key_balance_eth")
            .await?;
        outcome.record(Stage::SessionKeyBalance);

        if self.sender.is_some() {
            self.fund_session_key(session_key).await?;
            outcome.record(Stage::FundSessionKey);

            self.native_balance(
                session_key,
                "session_key_balance_wei_after",
                "session_key_balance_eth_after",
            )
            .await?;
            outcome.record(Stage::PostFundBalance);
        } else {
            outcome.skip(Stage::FundSessionKey, "no local signing key");
            outcome.skip(Stage::PostFundBalance, "session key was not funded");
        }

        let mut token = None;
        match (self.accounts.token.clone(), self.sender.is_some()) {
            (None, _) => outcome.skip(Stage::TokenFunding, "no token configured"),
            (Some(_), false) => outcome.skip(Stage::TokenFunding, "no local signing key"),
            (Some(leg), true) => {
                let resolved = self.resolve_token(&leg).await?;
                self.fund_tokens(session_key, resolved).await?;
                token = Some(resolved);
                outcome.record(Stage::TokenFunding);
            }
        }

        let Some(primary) = self.accounts.primary else {
            outcome.skip(Stage::NativeRefund, "no primary account configured");
            outcome.skip(Stage::TokenRefund, "no primary account configured");
            return Ok(outcome);
        };

        if self.sender.is_none() {
            outcome.skip(Stage::NativeRefund, "no local signing key");
            outcome.skip(Stage::TokenRefund, "no local signing key");
            return Ok(outcome);
        }

        self.refund_native(session_key, primary).await?;
        outcome.record(Stage::NativeRefund);

        // resolved during TokenFunding whenever a token leg is configured
        match token {
            None => outcome.skip(Stage::TokenRefund, "no token configured"),
            Some(resolved) => {
                self.refund_tokens(session_key, primary, resolved).await?;
                outcome.record(Stage::TokenRefund);
            }
        }

        info!(
            executed = outcome.executed.len(),
            skipped = outcome.skipped.len(),
            "Run complete"
        );
        Ok(outcome)
    }

    async fn probe_network(&mut self) -> Result<()> {
        info!("Fetching network configuration");
        let config = self.client.get(NETWORK_CONFIG_PATH).await?;
        self.console.json("network_config", &config)
    }

    async fn native_balance(&mut self, address: Address, raw: &str, display: &str) -> Result<U256> {
        let balance = self.client.get_balance(address, BlockTag::Latest).await?;
        self.console.amount(raw, display, balance, NATIVE_DECIMALS)?;
        Ok(balance)
    }

    async fn token_balance(
        &mut self,
        token: ResolvedToken,
        owner: Address,
        raw: &str,
        display: &str,
    ) -> Result<U256> {
        let balance = self.erc20(token.address).balance_of(owner).await?;
        self.console.amount(raw, display, balance, token.decimals)?;
        Ok(balance)
    }

    async fn fund_session_key(&mut self, session_key: Address) -> Result<()> {
        let Some(sender) = self.sender.as_deref() else {
            return Ok(());
        };
        info!(to = %session_key, amount_wei = %self.funding_wei, "Funding session key");
        let hash = sender.send(session_key, self.funding_wei, None).await?;
        self.console.field("funding_tx_hash", hash)?;
        self.confirm(hash, "funding").await?;
        Ok(())
    }

    async fn fund_tokens(&mut self, session_key: Address, token: ResolvedToken) -> Result<()> {
        let Some(sender) = self.sender.as_deref() else {
            return Ok(());
        };
        info!(token = %token.address, amount = %token.amount, "Transferring tokens to session key");
        let calldata = transfer_calldata(session_key, token.amount);
        let hash = sender.send(token.address, U256::ZERO, Some(calldata)).await?;
        self.console.field("token_funding_tx_hash", hash)?;
        self.confirm(hash, "token funding").await?;

        self.token_balance(
            token,
            session_key,
            "session_key_token_balance_wei",
            "session_key_token_balance",
        )
        .await?;
        Ok(())
    }

    async fn refund_native(&mut self, session_key: Address, primary: Address) -> Result<()> {
        info!(to = %primary, amount_wei = %self.refund_wei, "Refunding native balance from session key");
        let hash = DelegatedTransactionBuilder::new(&self.client)
            .build_and_send(session_key, primary, Some(self.refund_wei), None)
            .await?;
        self.console.field("refund_tx_hash", hash)
    }

    async fn refund_tokens(
        &mut self,
        session_key: Address,
        primary: Address,
        token: ResolvedToken,
    ) -> Result<()> {
        self.token_balance(
            token,
            session_key,
            "session_key_token_balance_before_refund_wei",
            "session_key_token_balance_before_refund",
        )
        .await?;
        self.token_balance(
            token,
            primary,
            "primary_token_balance_before_refund_wei",
            "primary_token_balance_before_refund",
        )
        .await?;

        info!(token = %token.address, to = %primary, amount = %token.amount, "Refunding tokens from session key");
        let calldata = transfer_calldata(primary, token.amount);
        let hash = DelegatedTransactionBuilder::new(&self.client)
            .build_and_send(session_key, token.address, None, Some(calldata))
            .await?;
        self.console.field("token_refund_tx_hash", hash)?;

        let status = match self.confirm(hash, "token refund").await? {
            None => "unconfirmed",
            Some(receipt) if receipt.succeeded() == Some(false) => "reverted",
            Some(_) => "confirmed",
        };
        self.console.field("token_refund_status", status)?;

        self.token_balance(
            token,
            session_key,
            "session_key_token_balance_after_refund_wei",
            "session_key_token_balance_after_refund",
        )
        .await?;
        self.token_balance(
            token,
            primary,
            "primary_token_balance_after_refund_wei",
            "primary_token_balance_after_refund",
        )
        .await?;
        Ok(())
    }

    async fn resolve_token(&self, leg: &TokenLeg) -> Result<ResolvedToken> {
        let (amount, decimals) = self.erc20(leg.address).resolve_amount(&leg.amount).await?;
        Ok(ResolvedToken {
            address: leg.address,
            amount,
            decimals,
        })
    }

    async fn confirm(&self, hash: TxHash, what: &str) -> Result<Option<Receipt>> {
        let receipt = self.poller.await_receipt(&self.client, hash).await?;
        match &receipt {
            None => warn!(%hash, max_attempts = self.poller.max_attempts(), "{} not confirmed yet", what),
            Some(r) if r.succeeded() == Some(false) => warn!(%hash, "{} reverted", what),
            Some(_) => info!(%hash, "{} confirmed", what),
        }
        Ok(receipt)
    }

    fn erc20(&self, address: Address) -> Erc20<'_> {
        Erc20::new(&self.client, address)
    }
}
