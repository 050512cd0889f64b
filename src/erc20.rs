//! Minimal ERC20 access
//!
//! Calldata is ABI-encoded with `sol!`; view calls go through the gateway's
//! `eth_call` so they share the session token and error handling.

use crate::config::TokenAmount;
use crate::rpc::{CallRequest, RpcClient};
use crate::units::parse_units;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// ERC20 contract reached through the gateway
#[derive(Debug, Clone, Copy)]
pub struct Erc20<'a> {
    client: &'a RpcClient,
    address: Address,
}

impl<'a> Erc20<'a> {
    pub fn new(client: &'a RpcClient, address: Address) -> Self {
        Self { client, address }
    }

    pub async fn decimals(&self) -> Result<u8> {
        let word = self.view("decimals", IERC20::decimalsCall {}.abi_encode()).await?;
        u8::try_from(word)
            .map_err(|_| Error::decode("decimals", format!("{} does not fit uint8", word)))
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256> {
        self.view("balanceOf", IERC20::balanceOfCall { owner }.abi_encode())
            .await
    }

    /// On-chain decimals and the configured amount in the token's smallest unit.
    pub async fn resolve_amount(&self, amount: &TokenAmount) -> Result<(U256, u8)> {
        let decimals = self.decimals().await?;
        let value = match amount {
            TokenAmount::Smallest(value) => *value,
            TokenAmount::Units(units) => parse_units(units, decimals)
                .map_err(|e| Error::Config(format!("token amount: {}", e)))?,
        };
        Ok((value, decimals))
    }

    async fn view(&self, function: &str, calldata: Vec<u8>) -> Result<U256> {
        let request = CallRequest {
            data: Some(Bytes::from(calldata)),
            ..CallRequest::new(self.address)
        };
        let result = self.client.call_contract(&request).await?;

        // single static return value: one 32-byte word
        if result.len() < 32 {
            return Err(Error::decode(
                function,
                format!("expected a 32-byte word, got {} bytes", result.len()),
            ));
        }
        Ok(U256::from_be_slice(&result[..32]))
    }
}

/// `transfer(to, amount)` calldata.
pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    Bytes::from(IERC20::transferCall { to, amount }.abi_encode())
}
