//! Error taxonomy of the executor contract.

use thiserror::Error;

/// Error type for executor operations.
///
/// Every variant has a stable identifier ([`ExecutorError::code`]) which the
/// gRPC binding carries across the wire so the client can rebuild the exact
/// variant. The JSON-RPC binding only preserves the message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    // Chain initialization
    #[error("initial height cannot be zero")]
    ZeroInitialHeight,

    #[error("chain ID cannot be empty")]
    EmptyChainId,

    #[error("chain ID contains invalid characters")]
    InvalidChainId,

    #[error("chain ID exceeds maximum length")]
    ChainIdTooLong,

    #[error("genesis time cannot be in the future")]
    FutureGenesisTime,

    // Transaction execution
    #[error("previous state root cannot be empty")]
    EmptyStateRoot,

    #[error("block timestamp cannot be in the future")]
    FutureBlockTime,

    #[error("invalid block height")]
    InvalidBlockHeight,

    #[error("transaction cannot be empty")]
    EmptyTx,

    #[error("transaction size exceeds maximum allowed")]
    TxTooLarge,

    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    // State
    #[error("block not found at height {0}")]
    BlockNotFound(u64),

    #[error("chain already initialized with different genesis parameters")]
    GenesisMismatch,

    // Transport and protocol
    #[error("request too large")]
    RequestTooLarge,

    #[error("invalid JWT token")]
    Unauthenticated,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("call cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC error: {code} {message}")]
    Rpc { code: i32, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`ExecutorError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller-supplied data violates a precondition.
    Validation,
    /// The request conflicts with the current chain state.
    State,
    /// The request never reached the backend intact, or the reply did not come back.
    Transport,
    /// Anything else raised by the backend.
    Internal,
}

impl ExecutorError {
    /// Stable identifier of the variant.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ZeroInitialHeight => "zero_initial_height",
            Self::EmptyChainId => "empty_chain_id",
            Self::InvalidChainId => "invalid_chain_id",
            Self::ChainIdTooLong => "chain_id_too_long",
            Self::FutureGenesisTime => "future_genesis_time",
            Self::EmptyStateRoot => "empty_state_root",
            Self::FutureBlockTime => "future_block_time",
            Self::InvalidBlockHeight => "invalid_block_height",
            Self::EmptyTx => "empty_tx",
            Self::TxTooLarge => "tx_too_large",
            Self::InvalidTimestamp(_) => "invalid_timestamp",
            Self::BlockNotFound(_) => "block_not_found",
            Self::GenesisMismatch => "genesis_mismatch",
            Self::RequestTooLarge => "request_too_large",
            Self::Unauthenticated => "unauthenticated",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
            Self::Transport(_) => "transport",
            Self::Rpc { .. } => "rpc",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Internal(_) => "internal",
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ZeroInitialHeight
            | Self::EmptyChainId
            | Self::InvalidChainId
            | Self::ChainIdTooLong
            | Self::FutureGenesisTime
            | Self::EmptyStateRoot
            | Self::FutureBlockTime
            | Self::InvalidBlockHeight
            | Self::EmptyTx
            | Self::TxTooLarge
            | Self::InvalidTimestamp(_) => ErrorCategory::Validation,
            Self::BlockNotFound(_) | Self::GenesisMismatch => ErrorCategory::State,
            Self::RequestTooLarge
            | Self::Unauthenticated
            | Self::DeadlineExceeded
            | Self::Cancelled
            | Self::Transport(_)
            | Self::Rpc { .. }
            | Self::InvalidResponse(_) => ErrorCategory::Transport,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Rebuild an error from its stable identifier and rendered message.
    ///
    /// Returns `None` for identifiers this version does not know. Variants
    /// with a payload recover it from `message`; `Rpc` is never rebuilt since
    /// its code only exists on the JSON-RPC binding.
    pub fn from_code(code: &str, message: &str) -> Option<Self> {
        let err = match code {
            "zero_initial_height" => Self::ZeroInitialHeight,
            "empty_chain_id" => Self::EmptyChainId,
            "invalid_chain_id" => Self::InvalidChainId,
            "chain_id_too_long" => Self::ChainIdTooLong,
            "future_genesis_time" => Self::FutureGenesisTime,
            "empty_state_root" => Self::EmptyStateRoot,
            "future_block_time" => Self::FutureBlockTime,
            "invalid_block_height" => Self::InvalidBlockHeight,
            "empty_tx" => Self::EmptyTx,
            "tx_too_large" => Self::TxTooLarge,
            "invalid_timestamp" => Self::InvalidTimestamp(trailing_number(message)?),
            "block_not_found" => Self::BlockNotFound(trailing_number(message)?),
            "genesis_mismatch" => Self::GenesisMismatch,
            "request_too_large" => Self::RequestTooLarge,
            "unauthenticated" => Self::Unauthenticated,
            "deadline_exceeded" => Self::DeadlineExceeded,
            "cancelled" => Self::Cancelled,
            "transport" => Self::Transport(strip_prefix(message, "transport error: ")),
            "invalid_response" => {
                Self::InvalidResponse(strip_prefix(message, "invalid response: "))
            }
            "internal" => Self::Internal(strip_prefix(message, "internal error: ")),
            _ => return None,
        };
        Some(err)
    }
}

fn trailing_number<T: std::str::FromStr>(message: &str) -> Option<T> {
    message.rsplit(' ').next()?.parse().ok()
}

fn strip_prefix(message: &str, prefix: &str) -> String {
    message.strip_prefix(prefix).unwrap_or(message).to_string()
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
