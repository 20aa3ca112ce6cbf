//! JSON-RPC server implementation.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use evolve_execution::conversion::from_unix_seconds;
use evolve_execution::{Executor, ExecutorError, Hash, ProxyConfig, Tx};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;

use crate::api::ExecutionApiServer;
use crate::error::executor_error_to_rpc;
use crate::types::{ExecuteTxsResult, GetTxsResult, InitChainResult, SetFinalResult};

/// Default listen address of the JSON-RPC server.
pub const DEFAULT_JSONRPC_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 40042);

/// Configuration for the JSON-RPC server.
#[derive(Debug, Clone)]
pub struct JsonRpcServerConfig {
    /// Address to bind the HTTP server to.
    pub http_addr: SocketAddr,
    /// Request body limit.
    pub proxy: ProxyConfig,
}

impl Default for JsonRpcServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_JSONRPC_ADDR,
            proxy: ProxyConfig::default(),
        }
    }
}

/// JSON-RPC front end of an executor.
pub struct ExecutionRpc<E: ?Sized> {
    executor: Arc<E>,
}

impl<E: ?Sized> ExecutionRpc<E> {
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }
}

impl<E: ?Sized> Clone for ExecutionRpc<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: ?Sized> fmt::Debug for ExecutionRpc<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRpc").finish_non_exhaustive()
    }
}

fn reject(method: &str, err: ExecutorError) -> ErrorObjectOwned {
    tracing::warn!("{} failed: {}", method, err);
    executor_error_to_rpc(&err)
}

#[async_trait]
impl<E> ExecutionApiServer for ExecutionRpc<E>
where
    E: Executor + ?Sized + 'static,
{
    async fn init_chain(
        &self,
        genesis_time: i64,
        initial_height: u64,
        chain_id: String,
    ) -> Result<InitChainResult, ErrorObjectOwned> {
        tracing::debug!(
            "init_chain: chain_id={}, initial_height={}",
            chain_id,
            initial_height
        );

        let genesis_time = from_unix_seconds(genesis_time).map_err(|e| reject("init_chain", e))?;
        let (state_root, max_bytes) = self
            .executor
            .init_chain(genesis_time, initial_height, &chain_id)
            .await
            .map_err(|e| reject("init_chain", e))?;

        Ok(InitChainResult {
            state_root,
            max_bytes,
        })
    }

    async fn get_txs(&self) -> Result<GetTxsResult, ErrorObjectOwned> {
        let txs = self
            .executor
            .get_txs()
            .await
            .map_err(|e| reject("get_txs", e))?;

        tracing::debug!("get_txs: returning {} txs", txs.len());

        Ok(GetTxsResult { txs })
    }

    async fn execute_txs(
        &self,
        txs: Vec<Tx>,
        block_height: u64,
        timestamp: i64,
        prev_state_root: Hash,
    ) -> Result<ExecuteTxsResult, ErrorObjectOwned> {
        tracing::debug!("execute_txs: height={}, txs={}", block_height, txs.len());

        let timestamp = from_unix_seconds(timestamp).map_err(|e| reject("execute_txs", e))?;
        let (updated_state_root, max_bytes) = self
            .executor
            .execute_txs(&txs, block_height, timestamp, &prev_state_root)
            .await
            .map_err(|e| reject("execute_txs", e))?;

        Ok(ExecuteTxsResult {
            updated_state_root,
            max_bytes,
        })
    }

    async fn set_final(&self, block_height: u64) -> Result<SetFinalResult, ErrorObjectOwned> {
        tracing::debug!("set_final: height={}", block_height);

        self.executor
            .set_final(block_height)
            .await
            .map_err(|e| reject("set_final", e))?;

        Ok(SetFinalResult {})
    }
}

/// Start the JSON-RPC server.
///
/// Returns the bound address (useful when binding port 0) and the handle that
/// stops the server.
pub async fn start_server<E>(
    config: JsonRpcServerConfig,
    executor: Arc<E>,
) -> Result<(SocketAddr, ServerHandle), Box<dyn std::error::Error + Send + Sync>>
where
    E: Executor + ?Sized + 'static,
{
    let max_body = u32::try_from(config.proxy.max_request_size).unwrap_or(u32::MAX);

    let server = Server::builder()
        .max_request_body_size(max_body)
        .build(config.http_addr)
        .await?;
    let local_addr = server.local_addr()?;

    let module = ExecutionRpc::new(executor).into_rpc();
    let handle = server.start(module);

    tracing::info!("Started execution JSON-RPC server on {}", local_addr);

    Ok((local_addr, handle))
}
