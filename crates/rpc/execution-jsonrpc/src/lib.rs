//! JSON-RPC 2.0 binding of the executor contract.
//!
//! The server exposes four methods over HTTP POST:
//!
//! | Method        | Params                                                   | Result                             |
//! |---------------|----------------------------------------------------------|------------------------------------|
//! | `init_chain`  | `genesis_time`, `initial_height`, `chain_id`             | `{state_root, max_bytes}`          |
//! | `get_txs`     | none                                                     | `{txs}`                            |
//! | `execute_txs` | `txs`, `block_height`, `timestamp`, `prev_state_root`    | `{updated_state_root, max_bytes}`  |
//! | `set_final`   | `block_height`                                           | `{}`                               |
//!
//! Params may be given as a named object or a positional array. Byte values
//! are standard base64 strings; timestamps are unix seconds. Every backend
//! error is reported as `-32603` carrying the error text.
//!
//! [`JsonRpcExecutorClient`] implements `Executor` on top of a remote server.

pub mod api;
pub mod client;
pub mod error;
pub mod server;
pub mod types;

pub use api::ExecutionApiServer;
pub use client::JsonRpcExecutorClient;
pub use error::{codes, executor_error_to_rpc};
pub use server::{start_server, ExecutionRpc, JsonRpcServerConfig, DEFAULT_JSONRPC_ADDR};
pub use types::{ExecuteTxsResult, GetTxsResult, InitChainResult, SetFinalResult};
