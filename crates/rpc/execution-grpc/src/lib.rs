//! gRPC binding of the executor contract.
//!
//! This crate exposes any [`Executor`](evolve_execution::Executor) as the
//! `execution.v1.ExecutionService` gRPC service and provides a client that
//! implements the same trait on top of a remote service.
//!
//! # Overview
//!
//! - [`ExecutionServiceImpl`]: server-side adapter from the generated service
//!   trait to an `Executor`
//! - [`GrpcServer`]: tonic server with request size limits, optional gzip and
//!   the [`AuthInterceptor`] hook
//! - [`GrpcExecutorClient`]: remote `Executor` with per-call timeouts
//!
//! Errors cross the wire as a `tonic::Status` whose code reflects the error
//! category, plus an `x-executor-error` metadata entry carrying the stable
//! error identifier, so the client rebuilds the exact `ExecutorError`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use evolve_execution_dummy::DummyExecutor;
//! use evolve_execution_grpc::{GrpcServer, GrpcServerConfig};
//!
//! let server = GrpcServer::new(GrpcServerConfig::default(), Arc::new(DummyExecutor::new()));
//! server.serve().await?;
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod server;
pub mod service;

/// Generated protobuf types and service stubs.
pub mod proto {
    pub mod execution {
        #[allow(unreachable_pub, clippy::all)]
        pub mod v1 {
            tonic::include_proto!("execution.v1");
        }
    }
}

pub use auth::{AcceptAllVerifier, AuthInterceptor, TokenVerifier};
pub use client::GrpcExecutorClient;
pub use error::{executor_error_to_status, status_to_executor_error, ERROR_CODE_METADATA};
pub use server::{GrpcServer, GrpcServerConfig, DEFAULT_GRPC_ADDR};
pub use service::ExecutionServiceImpl;
