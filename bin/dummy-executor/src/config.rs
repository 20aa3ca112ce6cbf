//! Configuration of the dummy executor binary.
//!
//! Resolution order: defaults < YAML file < `EXECUTOR_*` environment
//! variables < CLI flags. Nested keys use `__` in environment variables, e.g.
//! `EXECUTOR_GRPC__ADDR=0.0.0.0:40041`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Args;
use evolve_execution::ProxyConfig;
use evolve_execution_dummy::DEFAULT_MAX_BYTES;
use evolve_execution_grpc::GrpcServerConfig;
use evolve_execution_jsonrpc::JsonRpcServerConfig;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const ENV_PREFIX: &str = "EXECUTOR_";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid {field} '{value}': {source}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GrpcSection {
    pub(crate) addr: String,
    pub(crate) enable_gzip: bool,
}

impl Default for GrpcSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:40041".to_string(),
            enable_gzip: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RpcSection {
    pub(crate) enabled: bool,
    pub(crate) http_addr: String,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            enabled: false,
            http_addr: "127.0.0.1:40042".to_string(),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DummyExecutorConfig {
    pub(crate) grpc: GrpcSection,
    pub(crate) rpc: RpcSection,
    /// Timeout, request size limit and auth secret shared by both servers.
    pub(crate) proxy: ProxyConfig,
    /// Maximum transaction size reported by the executor.
    pub(crate) max_bytes: u64,
    pub(crate) log_level: String,
}

impl Default for DummyExecutorConfig {
    fn default() -> Self {
        Self {
            grpc: GrpcSection::default(),
            rpc: RpcSection::default(),
            proxy: ProxyConfig::default(),
            max_bytes: DEFAULT_MAX_BYTES,
            log_level: "info".to_string(),
        }
    }
}

impl DummyExecutorConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Zero("max_bytes"));
        }
        if self.proxy.max_request_size == 0 {
            return Err(ConfigError::Zero("proxy.max_request_size"));
        }
        if self.proxy.default_timeout.is_zero() {
            return Err(ConfigError::Zero("proxy.default_timeout_ms"));
        }
        parse_addr("grpc.addr", &self.grpc.addr)?;
        if self.rpc.enabled {
            parse_addr("rpc.http_addr", &self.rpc.http_addr)?;
        }
        Ok(())
    }

    pub(crate) fn grpc_server_config(&self) -> Result<GrpcServerConfig, ConfigError> {
        Ok(GrpcServerConfig {
            addr: parse_addr("grpc.addr", &self.grpc.addr)?,
            enable_gzip: self.grpc.enable_gzip,
            proxy: self.proxy.clone(),
        })
    }

    /// JSON-RPC server settings, or `None` when the server is disabled.
    pub(crate) fn jsonrpc_server_config(&self) -> Result<Option<JsonRpcServerConfig>, ConfigError> {
        if !self.rpc.enabled {
            return Ok(None);
        }
        Ok(Some(JsonRpcServerConfig {
            http_addr: parse_addr("rpc.http_addr", &self.rpc.http_addr)?,
            proxy: self.proxy.clone(),
        }))
    }
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|source| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
        source,
    })
}

#[derive(Debug, Clone, Default, Args)]
pub(crate) struct ConfigArgs {
    /// Config YAML path
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// gRPC server listen address override
    #[arg(long, alias = "address")]
    pub(crate) grpc_addr: Option<String>,

    /// Serve JSON-RPC on this address as well
    #[arg(long)]
    pub(crate) rpc_addr: Option<String>,

    /// Disable gzip compression for gRPC
    #[arg(long)]
    pub(crate) disable_gzip: bool,

    /// Maximum request size in bytes
    #[arg(long)]
    pub(crate) max_request_size: Option<usize>,

    /// Maximum transaction size in bytes
    #[arg(long)]
    pub(crate) max_bytes: Option<u64>,

    /// Log level override
    #[arg(long)]
    pub(crate) log_level: Option<String>,
}

fn build_figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(DummyExecutorConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Yaml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Resolve the configuration from all sources.
pub(crate) fn resolve_config(args: &ConfigArgs) -> Result<DummyExecutorConfig, ConfigError> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.clone()));
        }
    }

    let mut figment = build_figment(args.config.as_deref());

    if let Some(ref v) = args.grpc_addr {
        figment = figment.merge(("grpc.addr", v.as_str()));
    }
    if let Some(ref v) = args.rpc_addr {
        figment = figment
            .merge(("rpc.http_addr", v.as_str()))
            .merge(("rpc.enabled", true));
    }
    if args.disable_gzip {
        figment = figment.merge(("grpc.enable_gzip", false));
    }
    if let Some(v) = args.max_request_size {
        figment = figment.merge(("proxy.max_request_size", v));
    }
    if let Some(v) = args.max_bytes {
        figment = figment.merge(("max_bytes", v));
    }
    if let Some(ref v) = args.log_level {
        figment = figment.merge(("log_level", v.as_str()));
    }

    let config: DummyExecutorConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}
