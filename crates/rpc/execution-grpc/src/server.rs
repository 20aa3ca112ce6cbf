//! gRPC server for the ExecutionService.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use evolve_execution::{Executor, ProxyConfig};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server;

use crate::auth::{AcceptAllVerifier, AuthInterceptor, TokenVerifier};
use crate::proto::execution::v1::execution_service_server::ExecutionServiceServer;
use crate::service::ExecutionServiceImpl;

/// Default listen address of the gRPC server.
pub const DEFAULT_GRPC_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 40041);

type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for the gRPC server.
#[derive(Debug, Clone)]
pub struct GrpcServerConfig {
    /// Address to bind the gRPC server to.
    pub addr: SocketAddr,
    /// Enable gzip compression.
    pub enable_gzip: bool,
    /// Request size limit and auth secret.
    pub proxy: ProxyConfig,
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_GRPC_ADDR,
            enable_gzip: true,
            proxy: ProxyConfig::default(),
        }
    }
}

/// gRPC server exposing one shared executor.
pub struct GrpcServer<E: ?Sized> {
    config: GrpcServerConfig,
    executor: Arc<E>,
    verifier: Arc<dyn TokenVerifier>,
}

impl<E: ?Sized> fmt::Debug for GrpcServer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E> GrpcServer<E>
where
    E: Executor + ?Sized + 'static,
{
    pub fn new(config: GrpcServerConfig, executor: Arc<E>) -> Self {
        Self {
            config,
            executor,
            verifier: Arc::new(AcceptAllVerifier),
        }
    }

    /// Replace the token verifier used when an auth secret is configured.
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    fn service(
        &self,
    ) -> InterceptedService<ExecutionServiceServer<ExecutionServiceImpl<E>>, AuthInterceptor> {
        let max_size = self.config.proxy.max_request_size;
        let mut server = ExecutionServiceServer::new(ExecutionServiceImpl::new(Arc::clone(
            &self.executor,
        )))
        .max_decoding_message_size(max_size)
        .max_encoding_message_size(usize::MAX);

        if self.config.enable_gzip {
            server = server
                .accept_compressed(tonic::codec::CompressionEncoding::Gzip)
                .send_compressed(tonic::codec::CompressionEncoding::Gzip);
        }

        let interceptor = AuthInterceptor::new(self.config.proxy.auth_secret.clone())
            .with_verifier(Arc::clone(&self.verifier));

        InterceptedService::new(server, interceptor)
    }

    /// Run the server on the configured address until it fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self.config.addr;
        let service = self.service();

        tracing::info!("Starting execution gRPC server on {}", addr);

        Server::builder().add_service(service).serve(addr).await?;

        Ok(())
    }

    /// Run the server on the configured address until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.config.addr;
        let service = self.service();

        tracing::info!("Starting execution gRPC server on {}", addr);

        Server::builder()
            .add_service(service)
            .serve_with_shutdown(addr, signal)
            .await?;

        tracing::info!("Execution gRPC server on {} stopped", addr);
        Ok(())
    }

    /// Run the server on an already bound listener until `signal` resolves.
    ///
    /// The configured address is ignored.
    pub async fn serve_with_listener<F>(
        self,
        listener: TcpListener,
        signal: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        let service = self.service();

        tracing::info!("Starting execution gRPC server on {}", local_addr);

        Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await?;

        Ok(())
    }
}
