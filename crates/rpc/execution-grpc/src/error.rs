//! Mapping between `ExecutorError` and `tonic::Status`.

use evolve_execution::{ErrorCategory, ExecutorError};
use tonic::metadata::MetadataValue;
use tonic::{Code, Status};

/// Metadata key carrying the stable error identifier.
pub const ERROR_CODE_METADATA: &str = "x-executor-error";

fn status_code(err: &ExecutorError) -> Code {
    match err {
        ExecutorError::BlockNotFound(_) => Code::NotFound,
        ExecutorError::GenesisMismatch => Code::FailedPrecondition,
        ExecutorError::RequestTooLarge => Code::ResourceExhausted,
        ExecutorError::Unauthenticated => Code::Unauthenticated,
        ExecutorError::DeadlineExceeded => Code::DeadlineExceeded,
        ExecutorError::Cancelled => Code::Cancelled,
        ExecutorError::Transport(_) => Code::Unavailable,
        err if err.category() == ErrorCategory::Validation => Code::InvalidArgument,
        _ => Code::Internal,
    }
}

/// Convert an executor error into a gRPC status.
pub fn executor_error_to_status(err: &ExecutorError) -> Status {
    let mut status = Status::new(status_code(err), err.to_string());
    status
        .metadata_mut()
        .insert(ERROR_CODE_METADATA, MetadataValue::from_static(err.code()));
    status
}

/// Convert a gRPC status back into an executor error.
///
/// The `x-executor-error` metadata wins when present and known. Otherwise the
/// status code decides; codes without a dedicated variant become
/// [`ExecutorError::Rpc`] carrying the numeric gRPC code.
pub fn status_to_executor_error(status: &Status) -> ExecutorError {
    let rebuilt = status
        .metadata()
        .get(ERROR_CODE_METADATA)
        .and_then(|value| value.to_str().ok())
        .and_then(|code| ExecutorError::from_code(code, status.message()));
    if let Some(err) = rebuilt {
        return err;
    }

    match status.code() {
        Code::DeadlineExceeded => ExecutorError::DeadlineExceeded,
        Code::Cancelled => ExecutorError::Cancelled,
        Code::Unauthenticated => ExecutorError::Unauthenticated,
        Code::ResourceExhausted | Code::OutOfRange => ExecutorError::RequestTooLarge,
        Code::Unavailable | Code::Unknown => ExecutorError::Transport(status.message().to_string()),
        Code::Internal => ExecutorError::Internal(status.message().to_string()),
        code => ExecutorError::Rpc {
            code: code as i32,
            message: status.message().to_string(),
        },
    }
}
