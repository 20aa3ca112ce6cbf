//! JSON-RPC API trait definition.
//!
//! Parameter names double as the keys of the named-params form.

use evolve_execution::{Hash, Tx};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;

use crate::types::{ExecuteTxsResult, GetTxsResult, InitChainResult, SetFinalResult};

/// Executor methods served over JSON-RPC.
#[rpc(server)]
pub trait ExecutionApi {
    /// Initialize the chain. `genesis_time` is in unix seconds.
    #[method(name = "init_chain")]
    async fn init_chain(
        &self,
        genesis_time: i64,
        initial_height: u64,
        chain_id: String,
    ) -> Result<InitChainResult, ErrorObjectOwned>;

    /// Return the candidate transactions.
    #[method(name = "get_txs")]
    async fn get_txs(&self) -> Result<GetTxsResult, ErrorObjectOwned>;

    /// Execute a batch of base64 transactions. `timestamp` is in unix seconds.
    #[method(name = "execute_txs")]
    async fn execute_txs(
        &self,
        txs: Vec<Tx>,
        block_height: u64,
        timestamp: i64,
        prev_state_root: Hash,
    ) -> Result<ExecuteTxsResult, ErrorObjectOwned>;

    /// Finalize a block.
    #[method(name = "set_final")]
    async fn set_final(&self, block_height: u64) -> Result<SetFinalResult, ErrorObjectOwned>;
}
