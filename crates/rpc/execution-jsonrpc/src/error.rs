//! JSON-RPC error codes and backend error conversion.

use evolve_execution::ExecutorError;
use jsonrpsee::types::ErrorObjectOwned;

/// Standard JSON-RPC 2.0 error codes.
pub mod codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request - JSON is not a valid request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Convert a backend error into a JSON-RPC error object.
///
/// Every backend error maps to [`codes::INTERNAL_ERROR`]; the variant is only
/// recoverable from the message text.
pub fn executor_error_to_rpc(err: &ExecutorError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(codes::INTERNAL_ERROR, err.to_string(), None::<()>)
}
