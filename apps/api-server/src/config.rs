//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rlpro_core::RateLimitConfig;
use rlpro_core::ports::AuthError;
use rlpro_infra::JwtConfig;

#[cfg(feature = "postgres")]
use rlpro_infra::database::DatabaseConfig;
#[cfg(feature = "redis")]
use rlpro_infra::RedisConfig;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid JWT configuration: {0}")]
    Jwt(#[from] AuthError),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    pub jwt: JwtConfig,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS").unwrap_or(defaults.max_requests),
            window: parse_env("RATE_LIMIT_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            store_timeout: parse_env("STORE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
        };
        validate_rate_limit(&rate_limit)?;

        #[cfg(feature = "postgres")]
        let database = env::var("DATABASE_URL").ok().map(|url| {
            let mut config = DatabaseConfig::new(url);
            if let Some(max) = parse_env("DB_MAX_CONNECTIONS") {
                config.max_connections = max;
            }
            if let Some(min) = parse_env("DB_MIN_CONNECTIONS") {
                config.min_connections = min;
            }
            config
        });

        // Redis is opt-in: without REDIS_URL counters stay in process.
        #[cfg(feature = "redis")]
        let redis = env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env());

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("PORT").unwrap_or(8080),
            rate_limit,
            jwt: JwtConfig::from_env()?,
            #[cfg(feature = "postgres")]
            database,
            #[cfg(feature = "redis")]
            redis,
        })
    }
}

/// A zero window disables limiting and a zero limit blocks every caller.
fn validate_rate_limit(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.max_requests == 0 {
        return Err(ConfigError::Zero("RATE_LIMIT_MAX_REQUESTS"));
    }
    if config.window.is_zero() {
        return Err(ConfigError::Zero("RATE_LIMIT_WINDOW_SECS"));
    }
    if config.store_timeout.is_zero() {
        return Err(ConfigError::Zero("STORE_TIMEOUT_MS"));
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
