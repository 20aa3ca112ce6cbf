//! Dummy executor daemon.
//!
//! Serves one in-memory `DummyExecutor` over gRPC (default `127.0.0.1:40041`)
//! and, when `--rpc-addr` is given or `rpc.enabled` is set, over JSON-RPC as
//! well. Both servers share the same state. Stops on Ctrl-C or SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! # gRPC only, default address
//! dummy-executor
//!
//! # both bindings
//! dummy-executor --grpc-addr 0.0.0.0:40041 --rpc-addr 0.0.0.0:40042
//!
//! # from a config file, with an environment override
//! EXECUTOR_LOG_LEVEL=debug dummy-executor --config executor.yaml
//! ```

mod config;

use std::sync::Arc;

use clap::Parser;
use evolve_execution_dummy::DummyExecutor;
use evolve_execution_grpc::GrpcServer;
use evolve_execution_jsonrpc::start_server;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{resolve_config, ConfigArgs};

#[derive(Debug, Parser)]
#[command(name = "dummy-executor")]
#[command(about = "Serve the in-memory reference executor")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

fn init_tracing(log_level: &str) {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli.config)?;
    init_tracing(&config.log_level);

    let grpc_config = config.grpc_server_config()?;
    let rpc_config = config.jsonrpc_server_config()?;

    tracing::info!("Creating dummy executor (max_bytes={})", config.max_bytes);
    let executor = Arc::new(DummyExecutor::with_max_bytes(config.max_bytes));

    let rpc_handle = match rpc_config {
        Some(rpc_config) => {
            let (addr, handle) = start_server(rpc_config, Arc::clone(&executor)).await?;
            tracing::info!("JSON-RPC listening on {}", addr);
            Some(handle)
        }
        None => None,
    };

    tracing::info!("Type Ctrl+C to shut down");
    GrpcServer::new(grpc_config, executor)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = rpc_handle {
        if handle.stop().is_ok() {
            handle.stopped().await;
        }
        tracing::info!("JSON-RPC server stopped");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
