//! Primary-account signing
//!
//! This module handles private key storage and locally-signed transfers.
//! The session key is never represented here.

mod sender;
mod signer;

pub use sender::{LocalSender, WalletSender};
pub use signer::SecureWallet;
