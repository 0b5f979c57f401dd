//! Application state - shared across all handlers.

use std::sync::Arc;

use rlpro_core::ports::{CounterStore, PasswordService, TokenService, UserRepository};
use rlpro_core::{AuthService, FixedWindowRateLimiter, RateLimitConfig};
use rlpro_infra::{
    Argon2PasswordService, InMemoryCounterStore, InMemoryUserRepository, JwtTokenService,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let counters = Self::counter_store(config).await;
        let users = Self::user_repository(config).await;

        let state = Self::from_parts(
            users,
            counters,
            Arc::new(Argon2PasswordService::new()),
            Arc::new(JwtTokenService::new(config.jwt.clone())),
            config.rate_limit.clone(),
        );

        tracing::info!(
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window.as_secs(),
            "Application state initialized"
        );
        state
    }

    /// Wire the services from already-built adapters.
    pub fn from_parts(
        users: Arc<dyn UserRepository>,
        counters: Arc<dyn CounterStore>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        let store_timeout = rate_limit.store_timeout;
        let limiter = Arc::new(FixedWindowRateLimiter::new(counters, rate_limit));

        Self {
            auth: Arc::new(AuthService::new(
                users,
                passwords,
                tokens,
                limiter,
                store_timeout,
            )),
        }
    }

    #[cfg(feature = "redis")]
    async fn counter_store(config: &AppConfig) -> Arc<dyn CounterStore> {
        use rlpro_infra::RedisCounterStore;

        let Some(redis) = &config.redis else {
            tracing::warn!("REDIS_URL not set. Rate limit counters are per-process.");
            return Arc::new(InMemoryCounterStore::new());
        };

        match RedisCounterStore::new(redis).await {
            Ok(store) => Arc::new(store),
            Err(e) if redis.fallback_to_memory => {
                tracing::error!(
                    "Failed to connect to Redis: {}. Using in-memory counters.",
                    e
                );
                Arc::new(InMemoryCounterStore::new())
            }
            Err(e) => {
                // Without a fallback every limiter call reports the outage.
                tracing::error!("Failed to connect to Redis: {}. Rate limiting unavailable.", e);
                Arc::new(UnavailableCounterStore(e.to_string()))
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn counter_store(_config: &AppConfig) -> Arc<dyn CounterStore> {
        tracing::info!("Running without redis feature - using in-memory counters");
        Arc::new(InMemoryCounterStore::new())
    }

    #[cfg(feature = "postgres")]
    async fn user_repository(config: &AppConfig) -> Arc<dyn UserRepository> {
        use rlpro_infra::PostgresUserRepository;
        use rlpro_infra::database::connect;

        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Arc::new(InMemoryUserRepository::new());
        };

        match connect(db_config).await {
            Ok(conn) => Arc::new(PostgresUserRepository::new(conn)),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Arc::new(InMemoryUserRepository::new())
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn user_repository(_config: &AppConfig) -> Arc<dyn UserRepository> {
        tracing::info!("Running without postgres feature - using in-memory repository");
        Arc::new(InMemoryUserRepository::new())
    }
}

/// Counter store standing in for an unreachable Redis when fallback is off.
#[cfg(feature = "redis")]
struct UnavailableCounterStore(String);

#[cfg(feature = "redis")]
#[async_trait::async_trait]
impl CounterStore for UnavailableCounterStore {
    async fn increment_and_expire(
        &self,
        _key: &str,
        _window: std::time::Duration,
    ) -> Result<rlpro_core::ports::CounterState, rlpro_core::ports::CounterStoreError> {
        Err(rlpro_core::ports::CounterStoreError::Connection(
            self.0.clone(),
        ))
    }
}
