//! Shared read-only transport.
//!
//! One long-lived client serves every read in the app: `eth_call`s against
//! the risk signal and token contracts, and the Polymarket REST lookup.
//! Readers take it as `Arc<dyn ReadTransport>` so tests can swap in an
//! in-memory implementation.

use alloy::primitives::hex;
use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("empty result")]
    EmptyResult,
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ReadTransport: Send + Sync + 'static {
    /// `eth_call` at the latest block. Empty or null results are errors.
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError>;

    /// GET a URL and parse the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;
}

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
}

/// reqwest-backed transport against a fixed JSON-RPC endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(rpc_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl ReadTransport for HttpTransport {
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [{ "to": to.to_string(), "data": hex::encode_prefixed(&data) }, "latest"],
        });

        let resp = self.client.post(&self.rpc_url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                status: resp.status().as_u16(),
                url: self.rpc_url.clone(),
            });
        }

        let parsed: RpcResponse = resp.json().await?;
        if let Some(err) = parsed.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = match parsed.result {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => return Err(TransportError::EmptyResult),
            Some(other) => return Err(TransportError::Malformed(other.to_string())),
        };

        let bytes = hex::decode(&result).map_err(|e| TransportError::Malformed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TransportError::EmptyResult);
        }

        debug!(to = %to, len = bytes.len(), "eth_call ok");
        Ok(Bytes::from(bytes))
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.json().await?)
    }
}
