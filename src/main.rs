//! Session key orchestrator CLI
//!
//! Command-line interface for provisioning, funding and draining a gateway
//! session key.

use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use ten_session_keys::config::{env_vars, SessionConfig, Settings};
use ten_session_keys::faucet::Faucet;
use ten_session_keys::orchestrator::{Accounts, Console, Orchestrator};
use ten_session_keys::rpc::{Endpoint, ReqwestTransport, RpcClient};
use ten_session_keys::wallet::{SecureWallet, WalletSender};
use ten_session_keys::{onboarding, session_key, Error, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "session-keys")]
#[command(about = "Provision, fund and reclaim gateway session keys")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to settings file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the network, fund the session key and refund the primary account
    Run,

    /// Look up the session key bound to the auth token
    SessionKey,

    /// Obtain a new auth token and authenticate it for the primary account
    Register {
        /// Chain id for the authentication message (queried when omitted)
        #[arg(long)]
        chain_id: Option<u64>,
    },

    /// Request testnet funds for the primary account from a faucet
    Faucet {
        /// Faucet base URL (defaults to FAUCET_URL)
        #[arg(long)]
        url: Option<String>,

        /// Account to fund (defaults to TEN_ACCOUNT)
        #[arg(long)]
        address: Option<String>,
    },

    /// Show effective settings
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // stdout is reserved for `label: value` output
    let layer = fmt::layer().with_writer(std::io::stderr);
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(layer.json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry().with(layer).with(filter).init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Run => run_session(&settings).await,
        Commands::SessionKey => run_session_key(&settings).await,
        Commands::Register { chain_id } => run_register(&settings, chain_id).await,
        Commands::Faucet { url, address } => run_faucet(&settings, url, address).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

async fn run_session(settings: &Settings) -> Result<()> {
    let config = SessionConfig::from_env()?;
    tracing::info!(
        endpoint = %config.endpoint.base(),
        session_key = ?config.session_key,
        primary = ?config.primary.address(),
        token = ?config.token.as_ref().map(|t| t.address),
        "Starting session key run"
    );

    let transport = Arc::new(ReqwestTransport::new(settings.request_timeout())?);
    let client = RpcClient::authenticated(
        transport,
        config.endpoint.clone(),
        config.auth_token.clone(),
    );

    let mut orchestrator = Orchestrator::new(
        client,
        Accounts::from_config(&config),
        settings,
        std::io::stdout(),
    )?;

    if let Some(key) = config.primary.private_key() {
        match SecureWallet::from_secret(key) {
            Ok(wallet) => {
                tracing::info!(address = %wallet.address(), "Loaded wallet from {}", env_vars::PRIVATE_KEY);
                let sender =
                    WalletSender::new(wallet, &config.endpoint, config.auth_token.clone())?;
                orchestrator = orchestrator.with_local_sender(Box::new(sender));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load wallet, funding disabled");
            }
        }
    }

    let outcome = orchestrator.run().await?;
    for (stage, reason) in &outcome.skipped {
        tracing::debug!(%stage, reason = %reason, "Skipped");
    }
    Ok(())
}

async fn run_session_key(settings: &Settings) -> Result<()> {
    let config = SessionConfig::from_env()?;
    let transport = Arc::new(ReqwestTransport::new(settings.request_timeout())?);
    let client = RpcClient::authenticated(transport, config.endpoint, config.auth_token);

    let lookup = session_key::discover(&client).await?;
    match lookup.raw.as_str() {
        Some(raw) => println!("raw_result: {}", raw),
        None => println!("raw_result: {}", lookup.raw),
    }
    match lookup.address {
        Some(address) => println!("session_key_address: {}", address),
        None => println!("session_key_address: none"),
    }
    Ok(())
}

async fn run_register(settings: &Settings, chain_id: Option<u64>) -> Result<()> {
    let endpoint = Endpoint::parse(
        &std::env::var(env_vars::RPC_URL)
            .map_err(|_| Error::ConfigurationMissing(env_vars::RPC_URL))?,
    )?;
    let key = std::env::var(env_vars::PRIVATE_KEY)
        .map(SecretString::from)
        .map_err(|_| Error::ConfigurationMissing(env_vars::PRIVATE_KEY))?;
    let wallet = SecureWallet::from_secret(&key)?;

    let transport = Arc::new(ReqwestTransport::new(settings.request_timeout())?);
    let registration = onboarding::register(transport, &endpoint, &wallet, chain_id).await?;

    println!("auth_token: {}", registration.token.expose_secret());
    println!("address: {}", registration.address);
    Ok(())
}

async fn run_faucet(
    settings: &Settings,
    url: Option<String>,
    address: Option<String>,
) -> Result<()> {
    let url = match url {
        Some(url) => url,
        None => std::env::var(env_vars::FAUCET_URL)
            .map_err(|_| Error::ConfigurationMissing(env_vars::FAUCET_URL))?,
    };
    let config = SessionConfig::from_env()?;
    let address = match address {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::InvalidArgument(format!("address '{}': {}", raw, e)))?,
        None => config
            .primary
            .address()
            .ok_or(Error::ConfigurationMissing(env_vars::ACCOUNT))?,
    };

    let transport = Arc::new(ReqwestTransport::new(settings.request_timeout())?);
    let faucet = Faucet::new(transport.clone(), &url)?;
    let client = RpcClient::authenticated(transport, config.endpoint, config.auth_token);

    let mut console = Console::new(std::io::stdout());
    faucet.top_up(&client, address, &mut console).await?;
    Ok(())
}
