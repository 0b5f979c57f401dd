//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;

use crate::ports::{AuthError, RateLimitError};

/// Errors surfaced by [`AuthService`](crate::services::AuthService).
///
/// Security verdicts (`RateLimited`, `InvalidCredentials`, `Unauthenticated`,
/// `PrincipalNotFound`) are kept apart from `Infrastructure`, which only
/// reports that a backing store could not answer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Principal no longer exists")]
    PrincipalNotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Constraint(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Infrastructure(other.to_string()),
        }
    }
}

impl From<RateLimitError> for ServiceError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::InvalidKey => {
                ServiceError::Validation("Identifier must not be empty".to_string())
            }
            other => ServiceError::Infrastructure(other.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ServiceError::InvalidCredentials,
            AuthError::TokenExpired | AuthError::InvalidToken(_) => ServiceError::Unauthenticated,
            AuthError::HashingError(msg) | AuthError::Encoding(msg) => {
                ServiceError::Infrastructure(msg)
            }
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}
