//! The executor contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ExecutorResult;
use crate::types::{Hash, Tx};

/// Interface every execution backend implements.
///
/// Calls are cancelled by dropping the returned future; callers that need a
/// deadline wrap the call in `tokio::time::timeout`. The network clients also
/// apply their configured per-call timeout.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Initialize the chain with genesis parameters.
    ///
    /// Requirements:
    /// - `initial_height` must be greater than zero
    /// - `chain_id` must be non-empty, bounded and use a restricted character set
    /// - `genesis_time` must not be in the future
    /// - identical parameters yield the same result when repeated
    ///
    /// Returns the genesis state root and the maximum transaction size in bytes.
    async fn init_chain(
        &self,
        genesis_time: DateTime<Utc>,
        initial_height: u64,
        chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)>;

    /// Fetch candidate transactions from the mempool without removing them.
    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>>;

    /// Execute an ordered batch of transactions on top of `prev_state_root`.
    ///
    /// The resulting root depends only on `prev_state_root` and the ordered
    /// transactions. It becomes the pending root for `block_height` until
    /// [`Executor::set_final`] is called. Returns the updated state root and
    /// the current maximum transaction size.
    async fn execute_txs(
        &self,
        txs: &[Tx],
        block_height: u64,
        timestamp: DateTime<Utc>,
        prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)>;

    /// Mark the block at `block_height` as finalized.
    async fn set_final(&self, block_height: u64) -> ExecutorResult<()>;
}

/// Capability to push transactions into a backend's mempool.
///
/// Only backends with a local mempool implement this; the conformance suite
/// skips mempool checks when it is absent.
#[async_trait]
pub trait TxInjector: Send + Sync {
    /// Add a transaction to the mempool.
    async fn inject_tx(&self, tx: Tx);

    /// Add a freshly generated random transaction and return it.
    async fn inject_random_tx(&self) -> Tx;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Arc<E> {
    async fn init_chain(
        &self,
        genesis_time: DateTime<Utc>,
        initial_height: u64,
        chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)> {
        (**self)
            .init_chain(genesis_time, initial_height, chain_id)
            .await
    }

    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>> {
        (**self).get_txs().await
    }

    async fn execute_txs(
        &self,
        txs: &[Tx],
        block_height: u64,
        timestamp: DateTime<Utc>,
        prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)> {
        (**self)
            .execute_txs(txs, block_height, timestamp, prev_state_root)
            .await
    }

    async fn set_final(&self, block_height: u64) -> ExecutorResult<()> {
        (**self).set_final(block_height).await
    }
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Box<E> {
    async fn init_chain(
        &self,
        genesis_time: DateTime<Utc>,
        initial_height: u64,
        chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)> {
        (**self)
            .init_chain(genesis_time, initial_height, chain_id)
            .await
    }

    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>> {
        (**self).get_txs().await
    }

    async fn execute_txs(
        &self,
        txs: &[Tx],
        block_height: u64,
        timestamp: DateTime<Utc>,
        prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)> {
        (**self)
            .execute_txs(txs, block_height, timestamp, prev_state_root)
            .await
    }

    async fn set_final(&self, block_height: u64) -> ExecutorResult<()> {
        (**self).set_final(block_height).await
    }
}

#[async_trait]
impl<I: TxInjector + ?Sized> TxInjector for Arc<I> {
    async fn inject_tx(&self, tx: Tx) {
        (**self).inject_tx(tx).await
    }

    async fn inject_random_tx(&self) -> Tx {
        (**self).inject_random_tx().await
    }
}
