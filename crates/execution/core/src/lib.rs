//! Executor contract for Evolve execution environments.
//!
//! This crate defines the boundary between a block-producing orchestrator and a
//! pluggable execution layer. Every backend (the in-process dummy executor, the
//! gRPC client, the JSON-RPC client) implements the same [`Executor`] trait, so
//! the orchestrator never needs to know which one it is talking to.
//!
//! # Overview
//!
//! The contract has four operations:
//!
//! - `init_chain`: Initialize the chain with genesis parameters
//! - `get_txs`: Fetch candidate transactions from the execution mempool
//! - `execute_txs`: Execute a batch of transactions on top of a state root
//! - `set_final`: Mark the block at a height as finalized
//!
//! The [`conversion`] module holds the domain-to-wire conversions used by both
//! wire bindings so that they encode timestamps and byte fields identically.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use evolve_execution::Executor;
//!
//! async fn produce(executor: Arc<dyn Executor>) -> Result<(), evolve_execution::ExecutorError> {
//!     let (genesis_root, _max_bytes) = executor
//!         .init_chain(chrono::Utc::now(), 1, "test-chain")
//!         .await?;
//!     let txs = executor.get_txs().await?;
//!     let (_root, _) = executor
//!         .execute_txs(&txs, 1, chrono::Utc::now(), &genesis_root)
//!         .await?;
//!     executor.set_final(1).await
//! }
//! ```

pub mod config;
pub mod conversion;
pub mod error;
pub mod executor;
pub mod types;
pub mod validation;

pub use config::ProxyConfig;
pub use error::{ErrorCategory, ExecutorError, ExecutorResult};
pub use executor::{Executor, TxInjector};
pub use types::{Hash, Tx};
