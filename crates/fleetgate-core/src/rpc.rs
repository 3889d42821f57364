use async_trait::async_trait;
use fleetgate_canonical::Address;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`ChainClient`].
#[derive(Error, Debug)]
pub enum RpcError {
    /// HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Node answered with a JSON-RPC error object.
    #[error("node error {code}: {message}")]
    Node {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },
    /// Node answered with something that is not a hex result.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Call did not complete within the caller's limit.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Read-only access to deployed contracts.
///
/// Implementations are shared across concurrently processed messages.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Executes a read call against `to` with ABI-encoded `data` and returns
    /// the raw return bytes.
    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError>;
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// [`ChainClient`] issuing `eth_call` against the latest block over HTTP.
#[derive(Debug)]
pub struct JsonRpcClient {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Creates a client for the node at `url`. `timeout` bounds each HTTP request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Node URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [
                { "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) },
                "latest"
            ]
        });

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(RpcError::InvalidResponse(format!("HTTP {} {}", status, text)));
        }

        let reply = resp.json::<JsonRpcResponse>().await?;
        if let Some(err) = reply.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        let result = reply
            .result
            .ok_or_else(|| RpcError::InvalidResponse("missing result".to_string()))?;
        let digits = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(digits).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }
}
