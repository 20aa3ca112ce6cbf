//! Remote `Executor` over gRPC.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evolve_execution::conversion::{
    hash_from_raw, hash_to_raw, to_unix_seconds, txs_from_raw, txs_to_raw,
};
use evolve_execution::{Executor, ExecutorError, ExecutorResult, Hash, ProxyConfig, Tx};
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use crate::auth::{bearer, AUTHORIZATION_METADATA};
use crate::error::status_to_executor_error;
use crate::proto::execution::v1::{
    execution_service_client::ExecutionServiceClient, ExecuteTxsRequest, GetTxsRequest,
    InitChainRequest, SetFinalRequest,
};

/// [`Executor`] that forwards every call to a remote ExecutionService.
///
/// Each call carries the configured `default_timeout` both as the gRPC
/// deadline and as a local timeout. When an auth secret is configured it is
/// sent as a bearer token.
#[derive(Debug, Clone)]
pub struct GrpcExecutorClient {
    inner: ExecutionServiceClient<Channel>,
    config: ProxyConfig,
}

impl GrpcExecutorClient {
    /// Connect to `endpoint`, e.g. `http://127.0.0.1:40041`.
    pub async fn connect(
        endpoint: impl Into<String>,
        config: ProxyConfig,
    ) -> ExecutorResult<Self> {
        let endpoint = endpoint.into();
        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| ExecutorError::Transport(format!("invalid endpoint {endpoint}: {e}")))?
            .connect_timeout(config.default_timeout)
            .connect()
            .await
            .map_err(|e| {
                ExecutorError::Transport(format!("failed to connect to {endpoint}: {e}"))
            })?;

        tracing::debug!("Connected execution gRPC client to {}", endpoint);

        Ok(Self::with_channel(channel, config))
    }

    /// Build a client on an existing channel.
    pub fn with_channel(channel: Channel, config: ProxyConfig) -> Self {
        Self {
            inner: ExecutionServiceClient::new(channel),
            config,
        }
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.config.default_timeout);
        if let Some(secret) = &self.config.auth_secret {
            match MetadataValue::try_from(bearer(secret)) {
                Ok(value) => {
                    request.metadata_mut().insert(AUTHORIZATION_METADATA, value);
                }
                Err(_) => tracing::warn!("Auth secret is not valid metadata, sending without it"),
            }
        }
        request
    }

    async fn call<T, F>(&self, call: F) -> ExecutorResult<T>
    where
        F: Future<Output = Result<tonic::Response<T>, Status>>,
    {
        match tokio::time::timeout(self.config.default_timeout, call).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(status_to_executor_error(&status)),
            Err(_) => Err(ExecutorError::DeadlineExceeded),
        }
    }
}

#[async_trait]
impl Executor for GrpcExecutorClient {
    async fn init_chain(
        &self,
        genesis_time: DateTime<Utc>,
        initial_height: u64,
        chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)> {
        let request = self.request(InitChainRequest {
            genesis_time: to_unix_seconds(genesis_time),
            initial_height,
            chain_id: chain_id.to_string(),
        });
        let mut client = self.inner.clone();
        let response = self.call(client.init_chain(request)).await?;
        Ok((hash_from_raw(response.state_root), response.max_bytes))
    }

    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>> {
        let request = self.request(GetTxsRequest {});
        let mut client = self.inner.clone();
        let response = self.call(client.get_txs(request)).await?;
        Ok(txs_from_raw(response.txs))
    }

    async fn execute_txs(
        &self,
        txs: &[Tx],
        block_height: u64,
        timestamp: DateTime<Utc>,
        prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)> {
        let request = self.request(ExecuteTxsRequest {
            txs: txs_to_raw(txs),
            block_height,
            timestamp: to_unix_seconds(timestamp),
            prev_state_root: hash_to_raw(prev_state_root),
        });
        let mut client = self.inner.clone();
        let response = self.call(client.execute_txs(request)).await?;
        Ok((
            hash_from_raw(response.updated_state_root),
            response.max_bytes,
        ))
    }

    async fn set_final(&self, block_height: u64) -> ExecutorResult<()> {
        let request = self.request(SetFinalRequest { block_height });
        let mut client = self.inner.clone();
        self.call(client.set_final(request)).await?;
        Ok(())
    }
}
