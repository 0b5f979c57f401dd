//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod clock;
mod counter_store;
mod rate_limit;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use clock::Clock;
pub use counter_store::{CounterState, CounterStore, CounterStoreError};
pub use rate_limit::{RateLimitDecision, RateLimitError, RateLimiter};
pub use repository::UserRepository;
