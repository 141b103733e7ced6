use thiserror::Error;

/// Errors returned while verifying a bearer token presented on a WebSocket upgrade.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer token presented")]
    MissingToken,
    #[error("malformed or unverifiable token")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
    #[error("token issuer does not match the configured issuer")]
    IssuerMismatch,
    #[error("server has no JWT signing secret configured and anonymous access is disabled")]
    NotConfigured,
}
