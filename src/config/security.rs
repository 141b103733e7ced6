//! Security and authentication configuration types.

use super::defaults::{
    default_cors_origins, default_jwt_leeway_secs, default_max_connections_per_ip,
    default_max_message_size, default_require_auth,
};
use serde::{Deserialize, Serialize};

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Enable authentication for WebSocket connections
    #[serde(default = "default_require_auth")]
    pub require_websocket_auth: bool,
    /// Enable authentication for the metrics endpoint
    #[serde(default = "default_require_auth")]
    pub require_metrics_auth: bool,
    /// Authentication token for metrics endpoint (if required)
    #[serde(default)]
    pub metrics_auth_token: Option<String>,
    /// Maximum WebSocket message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum connections per IP address
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// JWT bearer-token verification settings.
    #[serde(default)]
    pub jwt: JwtConfig,
    /// Transport-level security configuration (TLS termination).
    #[serde(default)]
    pub transport: TransportSecurityConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            require_websocket_auth: default_require_auth(),
            require_metrics_auth: default_require_auth(),
            metrics_auth_token: None,
            max_message_size: default_max_message_size(),
            max_connections_per_ip: default_max_connections_per_ip(),
            jwt: JwtConfig::default(),
            transport: TransportSecurityConfig::default(),
        }
    }
}

/// Bearer token verification configuration.
///
/// The auth *provider* (issuer) is an external collaborator per spec §1; this crate only
/// verifies tokens it is handed, using a shared signing secret (HS256).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    /// HMAC signing secret shared with the token issuer.
    #[serde(default)]
    pub hmac_secret: Option<String>,
    /// Accept connections with no `sub` claim, minting a fresh random `PlayerId`.
    #[serde(default)]
    pub allow_anonymous: bool,
    /// Clock-skew leeway applied to `exp` validation, seconds.
    #[serde(default = "default_jwt_leeway_secs")]
    pub leeway_secs: u64,
    /// Expected `iss` claim, if the issuer should be pinned.
    #[serde(default)]
    pub required_issuer: Option<String>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            hmac_secret: None,
            allow_anonymous: false,
            leeway_secs: default_jwt_leeway_secs(),
            required_issuer: None,
        }
    }
}

/// Transport-level security configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TransportSecurityConfig {
    #[serde(default)]
    pub tls: TlsServerConfig,
}

/// TLS server configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TlsServerConfig {
    /// Enable HTTPS/TLS termination for the HTTP + WebSocket listener.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the PEM-encoded certificate chain presented to clients.
    #[serde(default)]
    pub certificate_path: Option<String>,
    /// Path to the PEM-encoded private key corresponding to the certificate chain.
    #[serde(default)]
    pub private_key_path: Option<String>,
}

impl Default for TlsServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            certificate_path: None,
            private_key_path: None,
        }
    }
}

/// Client certificate authentication mode for TLS (retained for forward compatibility
/// with the `tls` feature; this crate does not require client certs).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuthMode {
    #[default]
    None,
    Optional,
    Require,
}
