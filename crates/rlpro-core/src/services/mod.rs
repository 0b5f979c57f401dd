//! Services - the business workflows composed from ports.

mod auth;
mod rate_limiter;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthAction, AuthService};
pub use rate_limiter::{FixedWindowRateLimiter, RateLimitConfig};
