//! Error handling middleware - RFC 7807 compliant responses.

use std::fmt;
use std::time::Duration;

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use rlpro_core::ServiceError;
use rlpro_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
///
/// One variant per caller-facing outcome. Infrastructure details are logged
/// and never sent to the client.
#[derive(Debug)]
pub enum AppError {
    RateLimited { retry_after: Duration },
    InvalidCredentials,
    Unauthenticated,
    PrincipalNotFound,
    Conflict(String),
    Validation(String),
    Unavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::RateLimited { retry_after } => {
                write!(f, "Rate limited for {}s", retry_after.as_secs())
            }
            AppError::InvalidCredentials => write!(f, "Invalid credentials"),
            AppError::Unauthenticated => write!(f, "Unauthenticated"),
            AppError::PrincipalNotFound => write!(f, "Principal not found"),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            AppError::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

/// Whole seconds, rounded up so clients never retry early.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::PrincipalNotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        let error = match self {
            AppError::RateLimited { retry_after } => {
                let secs = retry_after_secs(*retry_after);
                builder
                    .insert_header(("X-RateLimit-Remaining", "0"))
                    .insert_header((header::RETRY_AFTER, secs.to_string()));
                ErrorResponse::too_many_requests(secs)
            }
            AppError::InvalidCredentials => {
                ErrorResponse::unauthorized("Incorrect email or password.")
            }
            AppError::Unauthenticated => {
                builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
                ErrorResponse::unauthorized(
                    "Please provide a valid Bearer token in the Authorization header.",
                )
            }
            AppError::PrincipalNotFound => {
                ErrorResponse::not_found("The account for this token no longer exists.")
            }
            AppError::Conflict(detail) => ErrorResponse::conflict(detail),
            AppError::Validation(detail) => ErrorResponse::validation(detail),
            AppError::Unavailable(detail) => {
                tracing::error!("Infrastructure failure: {}", detail);
                ErrorResponse::service_unavailable()
            }
        };

        builder.json(error)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::RateLimited { retry_after } => AppError::RateLimited { retry_after },
            ServiceError::InvalidCredentials => AppError::InvalidCredentials,
            ServiceError::Unauthenticated => AppError::Unauthenticated,
            ServiceError::PrincipalNotFound => AppError::PrincipalNotFound,
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Infrastructure(msg) => AppError::Unavailable(msg),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_service_error_has_distinct_status() {
        let cases = [
            (
                ServiceError::RateLimited {
                    retry_after: Duration::from_secs(30),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::PrincipalNotFound, StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ServiceError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceError::Infrastructure("redis down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let res = AppError::RateLimited {
            retry_after: Duration::from_millis(12_300),
        }
        .error_response();

        assert_eq!(res.headers().get(header::RETRY_AFTER).unwrap(), "13");
    }

    #[test]
    fn test_unauthenticated_challenges_bearer() {
        let res = AppError::Unauthenticated.error_response();

        assert_eq!(res.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }
}
