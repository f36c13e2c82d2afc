//! `WalletProvider` over HTTP JSON-RPC.
//!
//! Works against anything that accepts EIP-1193 method names on a JSON-RPC
//! endpoint (Frame, a dev node with unlocked accounts, a signer proxy).
//! Provider error codes are kept intact so the controller can react to 4902.

use crate::wallet::{ChainParams, TransactionRequest, TxReceipt, WalletError, WalletProvider};
use alloy::primitives::hex;
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Revert data shows up either as a bare hex string or nested under `data`.
fn error_data(value: Option<Value>) -> Option<Bytes> {
    let hex_str = match value? {
        Value::String(s) => s,
        Value::Object(mut map) => match map.remove("data")? {
            Value::String(s) => s,
            _ => return None,
        },
        _ => return None,
    };
    hex::decode(hex_str).ok().map(Bytes::from)
}

pub struct JsonRpcWallet {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    receipt_poll: Duration,
    receipt_max_polls: u32,
}

impl JsonRpcWallet {
    pub fn new(url: String, receipt_poll: Duration, receipt_max_polls: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            next_id: AtomicU64::new(1),
            receipt_poll,
            receipt_max_polls,
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method = method, id = id, "wallet request");
        let resp: RpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = resp.error {
            debug!(method = method, code = err.code, message = %err.message, "wallet error");
            return Err(WalletError::Rpc {
                code: err.code,
                message: err.message,
                data: error_data(err.data),
            });
        }

        Ok(resp.result.unwrap_or(Value::Null))
    }

    fn as_str(value: &Value, what: &str) -> Result<String, WalletError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Malformed(format!("{what}: {value}")))
    }
}

fn parse_accounts(result: &Value) -> Result<Vec<Address>, WalletError> {
    let list = result
        .as_array()
        .ok_or_else(|| WalletError::Malformed(format!("accounts: {result}")))?;

    list.iter()
        .map(|v| {
            let s = JsonRpcWallet::as_str(v, "account")?;
            Address::from_str(&s).map_err(|e| WalletError::Malformed(e.to_string()))
        })
        .collect()
}

fn parse_quantity(s: &str) -> Result<u64, WalletError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| WalletError::Malformed(format!("quantity {s}: {e}")))
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let result = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts(&result)
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let result = self.request("eth_accounts", json!([])).await?;
        parse_accounts(&result)
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let result = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&Self::as_str(&result, "chainId")?)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": super::chain_hex(chain_id) }]),
        )
        .await?;
        info!(chain_id, "wallet switched chain");
        Ok(())
    }

    async fn add_chain(&self, params: &ChainParams) -> Result<(), WalletError> {
        let params = serde_json::to_value(params)
            .map_err(|e| WalletError::Malformed(e.to_string()))?;
        self.request("wallet_addEthereumChain", json!([params])).await?;
        Ok(())
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, WalletError> {
        let result = self
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": tx.from.to_string(),
                    "to": tx.to.to_string(),
                    "data": hex::encode_prefixed(&tx.data),
                }]),
            )
            .await?;
        let s = Self::as_str(&result, "tx hash")?;
        B256::from_str(&s).map_err(|e| WalletError::Malformed(e.to_string()))
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt, WalletError> {
        for _ in 0..self.receipt_max_polls {
            let result = self
                .request("eth_getTransactionReceipt", json!([hash.to_string()]))
                .await?;

            if let Some(status) = result.get("status").and_then(Value::as_str) {
                let success = parse_quantity(status)? == 1;
                if !success {
                    warn!(tx = %hash, "transaction reverted");
                }
                return Ok(TxReceipt { hash, success });
            }

            tokio::time::sleep(self.receipt_poll).await;
        }

        Err(WalletError::ReceiptTimeout {
            hash,
            polls: self.receipt_max_polls,
        })
    }
}
