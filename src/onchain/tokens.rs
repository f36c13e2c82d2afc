//! ERC-20 reads: balances and router allowance.

use crate::onchain::abi;
use crate::onchain::transport::{ReadTransport, TransportError};
use alloy::primitives::{Address, U256};
use std::sync::Arc;

#[derive(Clone)]
pub struct TokenReader {
    transport: Arc<dyn ReadTransport>,
}

impl TokenReader {
    pub fn new(transport: Arc<dyn ReadTransport>) -> Self {
        Self { transport }
    }

    pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, TransportError> {
        let data = self
            .transport
            .eth_call(token, abi::balance_of_call(owner))
            .await?;
        abi::word(&data, 0).ok_or_else(|| TransportError::Malformed("balanceOf".to_string()))
    }

    pub async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, TransportError> {
        let data = self
            .transport
            .eth_call(token, abi::allowance_call(owner, spender))
            .await?;
        abi::word(&data, 0).ok_or_else(|| TransportError::Malformed("allowance".to_string()))
    }
}
