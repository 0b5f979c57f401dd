//! # RateLimiter Pro Core
//!
//! The domain layer of RateLimiter Pro: the fixed-window rate limiter, the
//! authentication workflow and the ports they are written against.
//! This crate contains pure business logic with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{RepoError, ServiceError};
pub use services::{AuthService, FixedWindowRateLimiter, RateLimitConfig};
