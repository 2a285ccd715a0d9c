//! A JSON-RPC over HTTP client for an execution node. Only knows about the handful of methods
//! needed to read contract state.
use std::{
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
};

use alloy_primitives::{Address, Bytes};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::performance::TimedExt;

#[derive(Debug, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcMessage {
    Error { error: RpcError },
    Result { result: Value },
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("request to execution node failed")]
    Http(#[from] reqwest::Error),
    #[error("execution node responded with status {status} for {method}")]
    Status { method: String, status: StatusCode },
    #[error("{method} failed with rpc error {error}")]
    Rpc { method: String, error: RpcError },
    #[error("unexpected response to {method}: {reason}")]
    Malformed { method: String, reason: String },
}

pub struct ExecutionNodeHttp {
    client: reqwest::Client,
    next_id: AtomicU64,
    url: String,
}

impl ExecutionNodeHttp {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            url: url.to_string(),
        }
    }

    pub async fn call(&self, method: &str, params: &Value) -> Result<Value, NodeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        let res = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .timed(method)
            .await?;

        if res.status() != StatusCode::OK {
            return Err(NodeError::Status {
                method: method.to_string(),
                status: res.status(),
            });
        }

        match res.json::<RpcMessage>().await? {
            RpcMessage::Result { result } => Ok(result),
            RpcMessage::Error { error } => Err(NodeError::Rpc {
                method: method.to_string(),
                error,
            }),
        }
    }

    pub async fn chain_id(&self) -> Result<u64, NodeError> {
        let value = self.call("eth_chainId", &json!([])).await?;
        let malformed = |reason: String| NodeError::Malformed {
            method: "eth_chainId".to_string(),
            reason,
        };

        let hex_chain_id = value
            .as_str()
            .ok_or_else(|| malformed(format!("expected a hex string, got {value}")))?;
        u64::from_str_radix(hex_chain_id.trim_start_matches("0x"), 16)
            .map_err(|err| malformed(err.to_string()))
    }

    /// Executes a read only message call against the latest block.
    pub async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, NodeError> {
        let value = self
            .call("eth_call", &json!([{ "to": to, "data": data }, "latest"]))
            .await?;

        serde_json::from_value::<Bytes>(value).map_err(|err| NodeError::Malformed {
            method: "eth_call".to_string(),
            reason: err.to_string(),
        })
    }
}
