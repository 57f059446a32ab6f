//! Registry read client
//!
//! Minimal JSON-RPC 2.0 client over `reqwest`. Every request carries its own deadline;
//! a timeout is reported as [`RpcError::Timeout`] like any other per-call failure.

pub mod abi;
pub mod registry;

pub use registry::{ContractRegistry, RegistryReader, ReputationSummary, ValidationSummary};

use crate::error::RpcError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

/// JSON-RPC client bound to one endpoint.
#[derive(Debug)]
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one request and return its `result` value.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let exchange = async {
            let response = self.http.post(&self.url).json(&body).send().await?;
            let status = response.status();
            let text = response.text().await?;
            let envelope: RpcResponse = match serde_json::from_str(&text) {
                Ok(envelope) => envelope,
                Err(_) if !status.is_success() => return Err(RpcError::Status(status.as_u16())),
                Err(e) => return Err(RpcError::Decode(e.to_string())),
            };
            if let Some(error) = envelope.error {
                return Err(RpcError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            if !status.is_success() {
                return Err(RpcError::Status(status.as_u16()));
            }
            envelope
                .result
                .ok_or_else(|| RpcError::Decode("response has neither result nor error".to_string()))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| RpcError::Timeout {
                method: method.to_string(),
                secs: self.timeout.as_secs(),
            })?
    }

    /// Latest block number reported by the endpoint.
    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let quantity = result
            .as_str()
            .ok_or_else(|| RpcError::Decode(format!("block number is not a string: {}", result)))?;
        parse_quantity(quantity)
    }

    /// `eth_call` against `to` at the latest block, returning raw return data.
    pub async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let params = json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let result = self.request("eth_call", params).await?;
        let encoded = result
            .as_str()
            .ok_or_else(|| RpcError::Decode(format!("call result is not a string: {}", result)))?;
        decode_hex(encoded)
    }
}

/// Parse a hex quantity such as `0x1b4`.
pub fn parse_quantity(quantity: &str) -> Result<u64, RpcError> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Decode(format!("quantity without 0x prefix: {}", quantity)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Decode(format!("invalid quantity {}: {}", quantity, e)))
}

fn decode_hex(data: &str) -> Result<Vec<u8>, RpcError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(digits).map_err(|e| RpcError::Decode(format!("invalid hex data: {}", e)))
}
