//! Precondition checks of the executor contract.
//!
//! Backends call these before touching state so every implementation rejects
//! the same inputs with the same error.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{ExecutorError, ExecutorResult};
use crate::types::{Hash, Tx};

/// Maximum length of a chain ID, in characters.
pub const MAX_CHAIN_ID_LEN: usize = 32;

/// How far in the future a block timestamp may be before it is rejected.
pub const BLOCK_TIME_GRACE_SECS: i64 = 60;

/// Check a chain ID: non-empty, at most [`MAX_CHAIN_ID_LEN`] characters of
/// `[A-Za-z0-9._-]`.
pub fn validate_chain_id(chain_id: &str) -> ExecutorResult<()> {
    if chain_id.is_empty() {
        return Err(ExecutorError::EmptyChainId);
    }
    if !chain_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ExecutorError::InvalidChainId);
    }
    if chain_id.len() > MAX_CHAIN_ID_LEN {
        return Err(ExecutorError::ChainIdTooLong);
    }
    Ok(())
}

/// Check genesis parameters against the current time `now`.
pub fn validate_genesis(
    genesis_time: DateTime<Utc>,
    initial_height: u64,
    chain_id: &str,
    now: DateTime<Utc>,
) -> ExecutorResult<()> {
    if initial_height == 0 {
        return Err(ExecutorError::ZeroInitialHeight);
    }
    validate_chain_id(chain_id)?;
    if genesis_time > now {
        return Err(ExecutorError::FutureGenesisTime);
    }
    Ok(())
}

/// Check an execution request.
///
/// Order matters: previous root, timestamp, height, then transactions. An
/// empty transaction anywhere in the batch reports [`ExecutorError::EmptyTx`]
/// before any size check runs.
pub fn validate_execution(
    txs: &[Tx],
    block_height: u64,
    timestamp: DateTime<Utc>,
    prev_state_root: &Hash,
    max_bytes: u64,
    now: DateTime<Utc>,
) -> ExecutorResult<()> {
    if prev_state_root.is_empty() {
        return Err(ExecutorError::EmptyStateRoot);
    }
    if timestamp > now + TimeDelta::seconds(BLOCK_TIME_GRACE_SECS) {
        return Err(ExecutorError::FutureBlockTime);
    }
    if block_height == 0 {
        return Err(ExecutorError::InvalidBlockHeight);
    }
    if txs.iter().any(Tx::is_empty) {
        return Err(ExecutorError::EmptyTx);
    }
    if txs.iter().any(|tx| tx.len() as u64 > max_bytes) {
        return Err(ExecutorError::TxTooLarge);
    }
    Ok(())
}
