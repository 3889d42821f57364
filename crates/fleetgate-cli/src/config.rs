//! Options file loading and chain client selection.

use async_trait::async_trait;
use fleetgate_canonical::Address;
use fleetgate_core::{ChainClient, JsonRpcClient, PipelineOptions, RpcError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure to load an options file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// File is not a valid options document.
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads pipeline options from a JSON file, or the defaults.
pub fn load_options(path: Option<&str>) -> Result<PipelineOptions, ConfigError> {
    let Some(path) = path else {
        return Ok(PipelineOptions::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    let options = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;
    debug!(path, ?options, "loaded options");
    Ok(options)
}

/// Chain client used when no RPC endpoint is configured; every call fails.
struct OfflineChain;

#[async_trait]
impl ChainClient for OfflineChain {
    async fn call(&self, _to: &Address, _data: &[u8]) -> Result<Vec<u8>, RpcError> {
        Err(RpcError::InvalidResponse(
            "no RPC endpoint configured".to_string(),
        ))
    }
}

/// JSON-RPC client for `rpc_url`, or an offline client.
pub fn chain_client(
    rpc_url: Option<&str>,
    options: &PipelineOptions,
) -> Result<Arc<dyn ChainClient>, Box<dyn std::error::Error>> {
    match rpc_url {
        Some(url) => Ok(Arc::new(JsonRpcClient::new(url, options.rpc_timeout())?)),
        None => Ok(Arc::new(OfflineChain)),
    }
}
