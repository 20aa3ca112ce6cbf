//! ExecutionService implementation over any `Executor`.

use std::fmt;
use std::sync::Arc;

use evolve_execution::conversion::{
    from_unix_seconds, hash_from_raw, hash_to_raw, txs_from_raw, txs_to_raw,
};
use evolve_execution::{Executor, ExecutorError};
use tonic::{Request, Response, Status};

use crate::error::executor_error_to_status;
use crate::proto::execution::v1::{
    execution_service_server::ExecutionService, ExecuteTxsRequest, ExecuteTxsResponse,
    GetTxsRequest, GetTxsResponse, InitChainRequest, InitChainResponse, SetFinalRequest,
    SetFinalResponse,
};

/// Adapter from the generated gRPC service trait to an [`Executor`].
///
/// Wire fields are converted with `evolve_execution::conversion`, the backend
/// is called, and errors are mapped with [`executor_error_to_status`].
pub struct ExecutionServiceImpl<E: ?Sized> {
    executor: Arc<E>,
}

impl<E: ?Sized> ExecutionServiceImpl<E> {
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }
}

impl<E: ?Sized> Clone for ExecutionServiceImpl<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: ?Sized> fmt::Debug for ExecutionServiceImpl<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionServiceImpl").finish_non_exhaustive()
    }
}

fn reject(operation: &str, err: ExecutorError) -> Status {
    tracing::warn!("{} failed: {}", operation, err);
    executor_error_to_status(&err)
}

#[tonic::async_trait]
impl<E> ExecutionService for ExecutionServiceImpl<E>
where
    E: Executor + ?Sized + 'static,
{
    async fn init_chain(
        &self,
        request: Request<InitChainRequest>,
    ) -> Result<Response<InitChainResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!(
            "InitChain: chain_id={}, initial_height={}",
            req.chain_id,
            req.initial_height
        );

        let genesis_time =
            from_unix_seconds(req.genesis_time).map_err(|e| reject("InitChain", e))?;

        let (state_root, max_bytes) = self
            .executor
            .init_chain(genesis_time, req.initial_height, &req.chain_id)
            .await
            .map_err(|e| reject("InitChain", e))?;

        Ok(Response::new(InitChainResponse {
            state_root: hash_to_raw(&state_root),
            max_bytes,
        }))
    }

    async fn get_txs(
        &self,
        _request: Request<GetTxsRequest>,
    ) -> Result<Response<GetTxsResponse>, Status> {
        let txs = self
            .executor
            .get_txs()
            .await
            .map_err(|e| reject("GetTxs", e))?;

        tracing::debug!("GetTxs: returning {} txs", txs.len());

        Ok(Response::new(GetTxsResponse {
            txs: txs_to_raw(&txs),
        }))
    }

    async fn execute_txs(
        &self,
        request: Request<ExecuteTxsRequest>,
    ) -> Result<Response<ExecuteTxsResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!(
            "ExecuteTxs: height={}, txs={}",
            req.block_height,
            req.txs.len()
        );

        let timestamp = from_unix_seconds(req.timestamp).map_err(|e| reject("ExecuteTxs", e))?;
        let txs = txs_from_raw(req.txs);
        let prev_state_root = hash_from_raw(req.prev_state_root);

        let (updated_state_root, max_bytes) = self
            .executor
            .execute_txs(&txs, req.block_height, timestamp, &prev_state_root)
            .await
            .map_err(|e| reject("ExecuteTxs", e))?;

        Ok(Response::new(ExecuteTxsResponse {
            updated_state_root: hash_to_raw(&updated_state_root),
            max_bytes,
        }))
    }

    async fn set_final(
        &self,
        request: Request<SetFinalRequest>,
    ) -> Result<Response<SetFinalResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!("SetFinal: height={}", req.block_height);

        self.executor
            .set_final(req.block_height)
            .await
            .map_err(|e| reject("SetFinal", e))?;

        Ok(Response::new(SetFinalResponse {}))
    }
}
