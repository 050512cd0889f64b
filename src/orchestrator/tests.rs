use super::*;
use crate::config::{ConfirmationSettings, TokenAmount};
use crate::rpc::mock::MockGateway;
use crate::Error;
use alloy::primitives::Bytes;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const SESSION_KEY: &str = "0x1111111111111111111111111111111111111111";
const PRIMARY: &str = "0x2222222222222222222222222222222222222222";
const TOKEN: &str = "0x3333333333333333333333333333333333333333";
const TX_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const TX_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const TX_C: &str = "0xcccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";
const TX_D: &str = "0xdddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd";

type Sent = (Address, U256, Option<Bytes>);

/// Local sender that records transfers and hands out scripted hashes
struct RecordingSender {
    address: Address,
    hashes: Mutex<Vec<TxHash>>,
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl RecordingSender {
    fn new(hashes: &[&str]) -> (Box<Self>, Arc<Mutex<Vec<Sent>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sender = Box::new(Self {
            address: PRIMARY.parse().unwrap(),
            hashes: Mutex::new(hashes.iter().rev().map(|h| h.parse().unwrap()).collect()),
            sent: sent.clone(),
        });
        (sender, sent)
    }
}

#[async_trait]
impl LocalSender for RecordingSender {
    fn address(&self) -> Address {
        self.address
    }

    async fn send(&self, to: Address, value: U256, data: Option<Bytes>) -> Result<TxHash> {
        self.sent.lock().unwrap().push((to, value, data));
        self.hashes
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| Error::Wallet("no scripted hash left".to_string()))
    }
}

fn settings() -> Settings {
    Settings {
        confirmation: ConfirmationSettings {
            max_attempts: 3,
            interval_ms: 0,
        },
        ..Settings::default()
    }
}

fn word(value: U256) -> Value {
    json!(format!("0x{}", alloy::hex::encode(value.to_be_bytes::<32>())))
}

fn tokens(units: u64) -> U256 {
    U256::from(units) * U256::from(10u64).pow(U256::from(18u8))
}

fn receipt() -> Value {
    json!({"transactionHash": TX_A, "blockNumber": "0x10", "status": "0x1"})
}

fn output(orchestrator: Orchestrator<Vec<u8>>) -> String {
    String::from_utf8(orchestrator.into_inner()).unwrap()
}

fn line<'a>(output: &'a str, label: &str) -> Option<&'a str> {
    let prefix = format!("{}: ", label);
    output.lines().find_map(|l| l.strip_prefix(prefix.as_str()))
}

fn gateway_with_network_config() -> Arc<MockGateway> {
    let gateway = MockGateway::new();
    gateway.on_path("network-config/", 200, r#"{"L2ChainID":443}"#);
    gateway
}

/// gas price, estimate, nonce and send scripted for delegated sends
fn script_delegated(gateway: &MockGateway, nonces: &[&str], hashes: &[&str]) {
    gateway.respond("eth_gasPrice", json!("0x3b9aca00"));
    gateway.respond("eth_estimateGas", json!("0x5208"));
    for nonce in nonces {
        gateway.respond("eth_getTransactionCount", json!(nonce));
    }
    for hash in hashes {
        gateway.respond("eth_sendTransaction", json!(hash));
    }
}

#[tokio::test]
async fn test_only_endpoint_and_token_reads_network_config() {
    let gateway = gateway_with_network_config();
    let mut orchestrator =
        Orchestrator::new(gateway.client(), Accounts::default(), &settings(), Vec::new()).unwrap();

    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(gateway.requests().len(), 1);
    assert_eq!(outcome.executed, vec![Stage::NetworkProbe]);
    assert_eq!(outcome.skipped.len(), Stage::ALL.len() - 1);
    assert_eq!(
        outcome.skip_reason(Stage::SessionKeyBalance),
        Some("no session key address configured")
    );
    assert_eq!(output(orchestrator), "network_config:\n{\n  \"L2ChainID\": 443\n}\n");
}

#[tokio::test]
async fn test_network_config_failure_aborts() {
    let gateway = MockGateway::new();
    gateway.on_path("network-config/", 503, "upstream unavailable");
    let accounts = Accounts {
        session_key: Some(SESSION_KEY.parse().unwrap()),
        ..Accounts::default()
    };
    let mut orchestrator =
        Orchestrator::new(gateway.client(), accounts, &settings(), Vec::new()).unwrap();

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, Error::Transport { status: 503, .. }));
    assert_eq!(gateway.requests().len(), 1);
}

#[tokio::test]
async fn test_without_local_key_nothing_is_sent() {
    let gateway = gateway_with_network_config();
    gateway.respond("eth_getBalance", json!("0x2386f26fc10000"));
    script_delegated(&gateway, &["0x4"], &[TX_C]);
    let accounts = Accounts {
        session_key: Some(SESSION_KEY.parse().unwrap()),
        primary: Some(PRIMARY.parse().unwrap()),
        token: Some(TokenLeg {
            address: TOKEN.parse().unwrap(),
            amount: TokenAmount::Units("1".to_string()),
        }),
    };
    let mut orchestrator =
        Orchestrator::new(gateway.client(), accounts, &settings(), Vec::new()).unwrap();

    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.executed, vec![Stage::NetworkProbe, Stage::SessionKeyBalance]);
    for stage in [
        Stage::FundSessionKey,
        Stage::TokenFunding,
        Stage::NativeRefund,
        Stage::TokenRefund,
    ] {
        assert_eq!(outcome.skip_reason(stage), Some("no local signing key"));
    }
    assert!(!outcome.ran(Stage::PostFundBalance));
    assert_eq!(gateway.rpc_methods(), vec!["eth_getBalance"]);
    assert!(gateway.params_of("eth_sendTransaction").is_empty());

    let text = output(orchestrator);
    assert_eq!(line(&text, "session_key_balance_wei"), Some("10000000000000000"));
    assert_eq!(line(&text, "session_key_balance_eth"), Some("0.01"));
    assert!(line(&text, "funding_tx_hash").is_none());
    assert!(line(&text, "refund_tx_hash").is_none());
}

#[tokio::test]
async fn test_native_refund_without_token() {
    let gateway = gateway_with_network_config();
    gateway.respond("eth_getBalance", json!("0x0"));
    gateway.respond("eth_getBalance", json!("0x2386f26fc10000"));
    gateway.respond("eth_getTransactionReceipt", receipt());
    script_delegated(&gateway, &["0x4"], &[TX_C]);
    let accounts = Accounts {
        session_key: Some(SESSION_KEY.parse().unwrap()),
        primary: Some(PRIMARY.parse().unwrap()),
        token: None,
    };
    let (sender, _) = RecordingSender::new(&[TX_A]);
    let mut orchestrator = Orchestrator::new(gateway.client(), accounts, &settings(), Vec::new())
        .unwrap()
        .with_local_sender(sender);

    let outcome = orchestrator.run().await.unwrap();

    assert!(outcome.ran(Stage::NativeRefund));
    assert_eq!(outcome.skip_reason(Stage::TokenRefund), Some("no token configured"));

    let refund = &gateway.params_of("eth_sendTransaction")[0][0];
    assert_eq!(refund["value"], "0x11c37937e08000");
    assert_eq!(refund["gas"], "0x5208");
    assert_eq!(refund["nonce"], "0x4");
    assert_eq!(line(&output(orchestrator), "refund_tx_hash"), Some(TX_C));
}

#[tokio::test]
async fn test_without_primary_only_reads() {
    let gateway = gateway_with_network_config();
    gateway.respond("eth_getBalance", json!("0x0"));
    let accounts = Accounts {
        session_key: Some(SESSION_KEY.parse().unwrap()),
        ..Accounts::default()
    };
    let mut orchestrator =
        Orchestrator::new(gateway.client(), accounts, &settings(), Vec::new()).unwrap();

    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.executed, vec![Stage::NetworkProbe, Stage::SessionKeyBalance]);
    assert_eq!(
        outcome.skip_reason(Stage::NativeRefund),
        Some("no primary account configured")
    );
    assert_eq!(gateway.rpc_methods(), vec!["eth_getBalance"]);
    assert_eq!(line(&output(orchestrator), "session_key_balance_eth"), Some("0"));
}

#[tokio::test]
async fn test_full_run_with_token_legs() {
    let gateway = gateway_with_network_config();
    gateway.respond("eth_getBalance", json!("0x0"));
    gateway.respond("eth_getBalance", json!("0x2386f26fc10000"));
    gateway.respond("eth_getTransactionReceipt", receipt());
    // decimals, post-funding balance, before refund (sk, primary), after refund (sk, primary)
    for value in [
        U256::from(18u8),
        tokens(100),
        tokens(100),
        U256::ZERO,
        U256::ZERO,
        tokens(100),
    ] {
        gateway.respond("eth_call", word(value));
    }
    script_delegated(&gateway, &["0x0", "0x1"], &[TX_C, TX_D]);

    let accounts = Accounts {
        session_key: Some(SESSION_KEY.parse().unwrap()),
        primary: Some(PRIMARY.parse().unwrap()),
        token: Some(TokenLeg {
            address: TOKEN.parse().unwrap(),
            amount: TokenAmount::Units("100".to_string()),
        }),
    };
    let (sender, sent) = RecordingSender::new(&[TX_A, TX_B]);
    let mut orchestrator = Orchestrator::new(gateway.client(), accounts, &settings(), Vec::new())
        .unwrap()
        .with_local_sender(sender);

    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.executed, Stage::ALL.to_vec());
    assert!(outcome.skipped.is_empty());

    let sent = sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, SESSION_KEY.parse::<Address>().unwrap());
    assert_eq!(sent[0].1, U256::from(10_000_000_000_000_000u64));
    assert!(sent[0].2.is_none());
    assert_eq!(sent[1].0, TOKEN.parse::<Address>().unwrap());
    assert_eq!(sent[1].1, U256::ZERO);
    assert_eq!(
        sent[1].2.as_ref().unwrap(),
        &crate::erc20::transfer_calldata(SESSION_KEY.parse().unwrap(), tokens(100))
    );

    // two delegated sends, each with a freshly queried nonce
    let sends = gateway.params_of("eth_sendTransaction");
    assert_eq!(sends.len(), 2);
    assert_eq!(sends[0][0]["nonce"], "0x0");
    assert_eq!(sends[1][0]["nonce"], "0x1");
    assert_eq!(sends[1][0]["to"].as_str().unwrap().to_lowercase(), TOKEN);
    assert!(sends[1][0].get("value").is_none());

    // funding, token funding and token refund are each polled once
    assert_eq!(gateway.params_of("eth_getTransactionReceipt").len(), 3);

    let text = output(orchestrator);
    assert_eq!(line(&text, "session_key_balance_eth"), Some("0"));
    assert_eq!(line(&text, "funding_tx_hash"), Some(TX_A));
    assert_eq!(line(&text, "session_key_balance_eth_after"), Some("0.01"));
    assert_eq!(line(&text, "token_funding_tx_hash"), Some(TX_B));
    assert_eq!(line(&text, "session_key_token_balance"), Some("100"));
    assert_eq!(line(&text, "refund_tx_hash"), Some(TX_C));
    assert_eq!(line(&text, "token_refund_tx_hash"), Some(TX_D));
    assert_eq!(line(&text, "token_refund_status"), Some("confirmed"));
    assert_eq!(line(&text, "primary_token_balance_after_refund"), Some("100"));
    assert_eq!(line(&text, "session_key_token_balance_after_refund"), Some("0"));
}

#[tokio::test]
async fn test_token_refund_without_polling_budget() {
    let gateway = gateway_with_network_config();
    gateway.respond("eth_getBalance", json!("0x0"));
    // decimals, post-funding balance, before refund (sk, primary), after refund (sk, primary)
    for value in [6u64, 5_000_000, 5_000_000, 0, 0, 5_000_000] {
        gateway.respond("eth_call", word(U256::from(value)));
    }
    script_delegated(&gateway, &["0x0", "0x1"], &[TX_C, TX_D]);

    let accounts = Accounts {
        session_key: Some(SESSION_KEY.parse().unwrap()),
        primary: Some(PRIMARY.parse().unwrap()),
        token: Some(TokenLeg {
            address: TOKEN.parse().unwrap(),
            amount: TokenAmount::Smallest(U256::from(5_000_000u64)),
        }),
    };
    let settings = Settings {
        confirmation: ConfirmationSettings {
            max_attempts: 0,
            interval_ms: 0,
        },
        ..Settings::default()
    };
    let (sender, _) = RecordingSender::new(&[TX_A, TX_B]);
    let mut orchestrator = Orchestrator::new(gateway.client(), accounts, &settings, Vec::new())
        .unwrap()
        .with_local_sender(sender);

    let outcome = orchestrator.run().await.unwrap();

    assert!(outcome.ran(Stage::TokenFunding));
    assert!(outcome.ran(Stage::TokenRefund));
    assert!(gateway.params_of("eth_getTransactionReceipt").is_empty());

    let text = output(orchestrator);
    assert_eq!(line(&text, "token_refund_status"), Some("unconfirmed"));
    assert_eq!(line(&text, "session_key_token_balance_before_refund"), Some("5"));
    assert_eq!(line(&text, "primary_token_balance_after_refund_wei"), Some("5000000"));
}

#[tokio::test]
async fn test_delegated_send_error_aborts() {
    let gateway = gateway_with_network_config();
    gateway.respond("eth_getBalance", json!("0x0"));
    gateway.respond("eth_gasPrice", json!("0x1"));
    gateway.respond("eth_estimateGas", json!("0x5208"));
    gateway.respond("eth_getTransactionCount", json!("0x0"));
    gateway.respond("eth_getTransactionReceipt", receipt());
    gateway.respond_error("eth_sendTransaction", -32000, "insufficient funds for gas * price + value");

    let accounts = Accounts {
        session_key: Some(SESSION_KEY.parse().unwrap()),
        primary: Some(PRIMARY.parse().unwrap()),
        token: None,
    };
    let (sender, _) = RecordingSender::new(&[TX_A]);
    let mut orchestrator = Orchestrator::new(gateway.client(), accounts, &settings(), Vec::new())
        .unwrap()
        .with_local_sender(sender);

    let err = orchestrator.run().await.unwrap_err();
    match err {
        Error::Rpc { method, message, .. } => {
            assert_eq!(method, "eth_sendTransaction");
            assert_eq!(message, "insufficient funds for gas * price + value");
        }
        other => panic!("expected RPC error, got {other:?}"),
    }
}

#[test]
fn test_malformed_settings_amount_is_rejected() {
    let gateway = MockGateway::new();
    let settings = Settings {
        funding_amount: "a lot".to_string(),
        ..Settings::default()
    };

    let err = Orchestrator::new(gateway.client(), Accounts::default(), &settings, Vec::new())
        .err()
        .unwrap();
    assert!(matches!(err, Error::Config(_)));
}
