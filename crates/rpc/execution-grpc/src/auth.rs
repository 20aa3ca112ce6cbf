//! Authentication hook for the gRPC server.
//!
//! When a shared secret is configured, [`AuthInterceptor`] reads the bearer
//! token from the `authorization` metadata and asks a [`TokenVerifier`] to
//! accept or reject it. The stock [`AcceptAllVerifier`] accepts everything:
//! token verification is an extension point, not a security control.

use std::fmt;
use std::sync::Arc;

use evolve_execution::ExecutorError;
use tonic::service::Interceptor;
use tonic::{Request, Status};

use crate::error::executor_error_to_status;

/// Metadata key of the bearer token.
pub const AUTHORIZATION_METADATA: &str = "authorization";

const BEARER_PREFIX: &str = "Bearer ";

/// Decides whether a bearer token is valid for the configured secret.
pub trait TokenVerifier: Send + Sync + 'static {
    fn verify(&self, token: &str, secret: &str) -> bool;
}

/// Verifier that accepts every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllVerifier;

impl TokenVerifier for AcceptAllVerifier {
    fn verify(&self, _token: &str, _secret: &str) -> bool {
        true
    }
}

/// Tonic interceptor guarding every call of the execution service.
#[derive(Clone)]
pub struct AuthInterceptor {
    secret: Option<Arc<str>>,
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthInterceptor {
    /// Create an interceptor; without a secret every request passes.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(Arc::from),
            verifier: Arc::new(AcceptAllVerifier),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }
}

impl fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(request);
        };

        let token = request
            .metadata()
            .get(AUTHORIZATION_METADATA)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix(BEARER_PREFIX).unwrap_or(value))
            .unwrap_or_default();

        if self.verifier.verify(token, secret) {
            Ok(request)
        } else {
            tracing::warn!("Rejected request with invalid token");
            Err(executor_error_to_status(&ExecutorError::Unauthenticated))
        }
    }
}

/// Render the `authorization` header value for `token`.
pub(crate) fn bearer(token: &str) -> String {
    format!("{BEARER_PREFIX}{token}")
}
