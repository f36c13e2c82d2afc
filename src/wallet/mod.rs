//! Signing wallet interface.
//!
//! The controller never holds keys. Everything that needs a signature or a
//! user prompt goes through a `WalletProvider`, whose methods mirror the
//! EIP-1193 requests a browser wallet understands. Account and chain change
//! notifications arrive as `WalletEvent`s pushed in by the owner.

pub mod rpc;
pub mod watch;

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use rpc::JsonRpcWallet;
pub use watch::WalletWatcher;

/// EIP-1193 / EIP-3326: the wallet doesn't know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("wallet error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Bytes>,
    },
    #[error("wallet request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed wallet response: {0}")]
    Malformed(String),
    #[error("no receipt for {hash} after {polls} polls")]
    ReceiptTimeout { hash: B256, polls: u32 },
}

impl WalletError {
    pub fn code(&self) -> Option<i64> {
        match self {
            WalletError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN)
    }
}

/// Parameters for `wallet_addEthereumChain` (EIP-3085).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl ChainParams {
    pub fn new(chain_id: u64, name: &str, rpc_url: &str, explorer_url: &str) -> Self {
        Self {
            chain_id: chain_hex(chain_id),
            chain_name: name.to_string(),
            native_currency: NativeCurrency {
                name: "ETH".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec![rpc_url.to_string()],
            block_explorer_urls: vec![explorer_url.to_string()],
        }
    }
}

pub fn chain_hex(chain_id: u64) -> String {
    format!("0x{chain_id:x}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: B256,
    pub success: bool,
}

/// Notifications a wallet pushes when the user changes something under us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnected,
}

#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// `eth_requestAccounts`: prompts the user if needed.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// `eth_accounts`: currently exposed accounts, never prompts.
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// `wallet_addEthereumChain`
    async fn add_chain(&self, params: &ChainParams) -> Result<(), WalletError>;

    /// Sign and broadcast; returns the transaction hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, WalletError>;

    /// Block until the transaction is mined.
    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt, WalletError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_params_shape() {
        let params = ChainParams::new(
            421614,
            "Arbitrum Sepolia",
            "https://sepolia-rollup.arbitrum.io/rpc",
            "https://sepolia.arbiscan.io",
        );
        let v = serde_json::to_value(&params).unwrap();
        assert_eq!(v["chainId"], "0x66eee");
        assert_eq!(v["chainName"], "Arbitrum Sepolia");
        assert_eq!(v["nativeCurrency"]["decimals"], 18);
        assert_eq!(v["rpcUrls"][0], "https://sepolia-rollup.arbitrum.io/rpc");
        assert_eq!(v["blockExplorerUrls"][0], "https://sepolia.arbiscan.io");
    }

    #[test]
    fn test_unrecognized_chain_code() {
        let err = WalletError::Rpc {
            code: UNRECOGNIZED_CHAIN,
            message: "unknown".to_string(),
            data: None,
        };
        assert!(err.is_unrecognized_chain());
        assert!(!WalletError::Malformed("x".to_string()).is_unrecognized_chain());
    }
}
