//! Result and parameter payloads of the JSON-RPC methods.

use evolve_execution::{Hash, Tx};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitChainResult {
    pub state_root: Hash,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTxsResult {
    pub txs: Vec<Tx>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteTxsResult {
    pub updated_state_root: Hash,
    pub max_bytes: u64,
}

/// Empty result of `set_final`, serialized as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetFinalResult {}

/// Named params of `init_chain`.
#[derive(Debug, Serialize)]
pub(crate) struct InitChainParams<'a> {
    pub(crate) genesis_time: i64,
    pub(crate) initial_height: u64,
    pub(crate) chain_id: &'a str,
}

/// Named params of `execute_txs`.
#[derive(Debug, Serialize)]
pub(crate) struct ExecuteTxsParams<'a> {
    pub(crate) txs: &'a [Tx],
    pub(crate) block_height: u64,
    pub(crate) timestamp: i64,
    pub(crate) prev_state_root: &'a Hash,
}

/// Named params of `set_final`.
#[derive(Debug, Serialize)]
pub(crate) struct SetFinalParams {
    pub(crate) block_height: u64,
}
