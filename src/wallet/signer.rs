//! Local signing key for the primary account
//!
//! SECURITY: This is the ONLY place where the primary private key exists.
//! - Keys are held in alloy's PrivateKeySigner
//! - Keys are never serialized, logged or included in errors
//! - The session key never has a `SecureWallet`; the gateway signs for it

use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signature;
use secrecy::{ExposeSecret, SecretString};

pub struct SecureWallet {
    signer: PrivateKeySigner,
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy provider integration
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Create a wallet from a secret hex-encoded key (with or without `0x`).
    pub fn from_secret(key: &SecretString) -> Result<Self> {
        Self::from_hex(key.expose_secret())
    }

    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        // The parse error is not forwarded: it could echo key material.
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|_| Error::Wallet("Invalid private key".to_string()))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer.clone());

        Ok(Self {
            signer,
            address,
            wallet,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Get a reference to the EthereumWallet for use with alloy providers
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }

    /// Sign a 32-byte digest (EIP-712 or otherwise prehashed).
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        use alloy::signers::SignerSync;

        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))
    }
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}
