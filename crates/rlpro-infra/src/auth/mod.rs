//! Authentication implementations.

mod jwt;
mod password;

pub use jwt::{JwtConfig, JwtTokenService, parse_algorithm};
pub use password::Argon2PasswordService;
