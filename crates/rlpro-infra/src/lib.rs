//! # RateLimiter Pro Infrastructure
//!
//! Concrete implementations of the ports defined in `rlpro-core`.
//! This crate contains the counter stores, user stores, token codec and
//! password hasher.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory only
//! - `postgres` - PostgreSQL user store via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `redis` - Redis counter store for the rate limiter

pub mod clock;
pub mod counter_store;
pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use clock::{ManualClock, SystemClock};
pub use counter_store::InMemoryCounterStore;
pub use database::InMemoryUserRepository;

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

// Re-exports - External services
#[cfg(feature = "redis")]
pub use counter_store::{RedisConfig, RedisCounterStore};
#[cfg(feature = "postgres")]
pub use database::PostgresUserRepository;
