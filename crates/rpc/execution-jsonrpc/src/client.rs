//! Remote `Executor` over JSON-RPC.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evolve_execution::conversion::to_unix_seconds;
use evolve_execution::{Executor, ExecutorError, ExecutorResult, Hash, ProxyConfig, Tx};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{
    ExecuteTxsParams, ExecuteTxsResult, GetTxsResult, InitChainParams, InitChainResult,
    SetFinalParams, SetFinalResult,
};

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

/// [`Executor`] that forwards every call to a JSON-RPC server.
///
/// Requests time out after the configured `default_timeout`. Backend errors
/// come back as [`ExecutorError::Rpc`] since the wire format only carries a
/// code and a message.
#[derive(Debug)]
pub struct JsonRpcExecutorClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcExecutorClient {
    /// Create a client for the server at `url`, e.g. `http://127.0.0.1:40042`.
    pub fn new(url: impl Into<String>, config: &ProxyConfig) -> ExecutorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.default_timeout)
            .build()
            .map_err(|e| ExecutorError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<P, R>(&self, method: &str, params: P) -> ExecutorResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| request_error(method, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Transport(format!(
                "{method}: HTTP {status}: {body}"
            )));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ExecutorError::DeadlineExceeded
            } else {
                ExecutorError::InvalidResponse(format!("{method}: {e}"))
            }
        })?;

        if let Some(err) = envelope.error {
            return Err(ExecutorError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = envelope
            .result
            .ok_or_else(|| ExecutorError::InvalidResponse(format!("{method}: missing result")))?;
        serde_json::from_value(result)
            .map_err(|e| ExecutorError::InvalidResponse(format!("{method}: {e}")))
    }
}

fn request_error(method: &str, err: reqwest::Error) -> ExecutorError {
    if err.is_timeout() {
        ExecutorError::DeadlineExceeded
    } else {
        ExecutorError::Transport(format!("{method}: {err}"))
    }
}

#[async_trait]
impl Executor for JsonRpcExecutorClient {
    async fn init_chain(
        &self,
        genesis_time: DateTime<Utc>,
        initial_height: u64,
        chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)> {
        let result: InitChainResult = self
            .call(
                "init_chain",
                InitChainParams {
                    genesis_time: to_unix_seconds(genesis_time),
                    initial_height,
                    chain_id,
                },
            )
            .await?;
        Ok((result.state_root, result.max_bytes))
    }

    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>> {
        let result: GetTxsResult = self.call("get_txs", json!({})).await?;
        Ok(result.txs)
    }

    async fn execute_txs(
        &self,
        txs: &[Tx],
        block_height: u64,
        timestamp: DateTime<Utc>,
        prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)> {
        let result: ExecuteTxsResult = self
            .call(
                "execute_txs",
                ExecuteTxsParams {
                    txs,
                    block_height,
                    timestamp: to_unix_seconds(timestamp),
                    prev_state_root,
                },
            )
            .await?;
        Ok((result.updated_state_root, result.max_bytes))
    }

    async fn set_final(&self, block_height: u64) -> ExecutorResult<()> {
        let _: SetFinalResult = self
            .call("set_final", SetFinalParams { block_height })
            .await?;
        Ok(())
    }
}
