//! Authentication ports: token codec and password hashing.

use std::time::Duration;

use crate::domain::AccessToken;

/// Claims carried inside an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// The principal's login identifier (email).
    pub subject: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issued at, seconds since the Unix epoch.
    pub iat: i64,
}

/// Token codec: issues and verifies signed, time-bounded access tokens.
///
/// The signing algorithm and secret belong to the implementation's
/// configuration. Nothing read from a presented token may select them.
pub trait TokenService: Send + Sync {
    /// Issue a token for `subject` that expires `ttl` from now.
    fn issue(&self, subject: &str, ttl: Duration) -> Result<AccessToken, AuthError>;

    /// Validate and decode a token.
    ///
    /// Failures are returned as [`AuthError::InvalidToken`] or
    /// [`AuthError::TokenExpired`].
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// Lifetime applied by [`TokenService::issue_default`].
    fn default_ttl(&self) -> Duration;

    /// Issue a token with the configured lifetime.
    fn issue_default(&self, subject: &str) -> Result<AccessToken, AuthError> {
        self.issue(subject, self.default_ttl())
    }
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error("Hashing error: {0}")]
    HashingError(String),
}
