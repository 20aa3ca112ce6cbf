//! Configuration shared by the wire bindings.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default maximum request size (1MB).
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Per-binding behavior knobs for servers and clients.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Timeout applied to every client call.
    #[serde(rename = "default_timeout_ms", with = "duration_ms")]
    pub default_timeout: Duration,
    /// Maximum accepted request size in bytes.
    pub max_request_size: usize,
    /// Shared secret for the authentication hook.
    ///
    /// Only the gRPC binding consults it, and the stock verifier accepts every
    /// token; see `AuthInterceptor` in the gRPC crate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            auth_secret: None,
        }
    }
}

impl ProxyConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn with_auth_secret(mut self, secret: impl Into<String>) -> Self {
        self.auth_secret = Some(secret.into());
        self
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("default_timeout", &self.default_timeout)
            .field("max_request_size", &self.max_request_size)
            .field(
                "auth_secret",
                &self.auth_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
