use crate::utils::error::{ReconcileError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Owned handle to a ledger node's JSON-RPC endpoint.
pub struct LedgerConnection {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl LedgerConnection {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        tracing::debug!("JSON-RPC {} -> {}", method, self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: RpcResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(ReconcileError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(body.result).map_err(|e| {
            ReconcileError::invalid_response(format!(
                "{} returned unexpected result: {}",
                method, e
            ))
        })
    }

    pub async fn is_connected(&self) -> bool {
        match self.call::<String>("eth_chainId", Value::Array(vec![])).await {
            Ok(chain_id) => {
                tracing::debug!("Ledger node at {} reports chain {}", self.url, chain_id);
                true
            }
            Err(e) => {
                tracing::warn!("Ledger node at {} unreachable: {}", self.url, e);
                false
            }
        }
    }
}
