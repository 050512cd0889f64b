//! Gateway RPC access
//!
//! All JSON-RPC payloads are built in one place ([`RpcClient::call`]); every
//! `eth_*` method has a single typed call-site in [`eth`].

mod client;
mod endpoint;
pub mod eth;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::RpcClient;
pub use endpoint::Endpoint;
pub use eth::{BlockTag, CallRequest, Receipt};
pub use transport::{HttpMethod, HttpReply, HttpRequest, ReqwestTransport, Transport};
