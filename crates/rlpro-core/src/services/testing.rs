//! In-process fakes for the ports, shared by the service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::{AccessToken, User};
use crate::error::RepoError;
use crate::ports::{
    AuthError, CounterState, CounterStore, CounterStoreError, PasswordService, TokenClaims,
    TokenService, UserRepository,
};

/// Counter store driven by tokio's clock, so paused-time tests can expire windows.
#[derive(Default)]
pub struct FakeCounterStore {
    counters: Mutex<HashMap<String, (u64, Instant)>>,
}

impl FakeCounterStore {
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.counters.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CounterStore for FakeCounterStore {
    async fn increment_and_expire(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<CounterState, CounterStoreError> {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();
        let entry = counters
            .entry(key.to_string())
            .or_insert((0, now + window));
        if now >= entry.1 {
            *entry = (0, now + window);
        }
        entry.0 += 1;

        Ok(CounterState {
            count: entry.0,
            ttl: entry.1 - now,
        })
    }
}

pub struct FailingCounterStore;

#[async_trait]
impl CounterStore for FailingCounterStore {
    async fn increment_and_expire(
        &self,
        _key: &str,
        _window: Duration,
    ) -> Result<CounterState, CounterStoreError> {
        Err(CounterStoreError::Connection("connection refused".to_string()))
    }
}

/// Never answers.
pub struct StalledCounterStore;

#[async_trait]
impl CounterStore for StalledCounterStore {
    async fn increment_and_expire(
        &self,
        _key: &str,
        _window: Duration,
    ) -> Result<CounterState, CounterStoreError> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub struct FakeUserRepository {
    users: Mutex<HashMap<String, User>>,
    pub lookups: AtomicUsize,
}

impl FakeUserRepository {
    pub async fn remove(&self, email: &str) {
        self.users.lock().await.remove(email);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for FakeUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().await.get(email).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.email) {
            return Err(RepoError::Constraint("Email already registered".to_string()));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }
}

/// User store that never answers.
pub struct StalledUserRepository;

#[async_trait]
impl UserRepository for StalledUserRepository {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, RepoError> {
        std::future::pending().await
    }

    async fn create(&self, _user: User) -> Result<User, RepoError> {
        std::future::pending().await
    }
}

/// Reversible "hash" that keeps the tests fast.
#[derive(Default)]
pub struct FakePasswordService {
    pub verifications: AtomicUsize,
}

impl PasswordService for FakePasswordService {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(format!("hashed:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        match hash.strip_prefix("hashed:") {
            Some(expected) => Ok(expected == password),
            None => Err(AuthError::HashingError("unrecognised hash".to_string())),
        }
    }
}

/// Tokens of the form `signed:<subject>`; anything else fails verification.
pub struct FakeTokenService {
    pub now: DateTime<Utc>,
}

impl Default for FakeTokenService {
    fn default() -> Self {
        Self { now: Utc::now() }
    }
}

impl TokenService for FakeTokenService {
    fn issue(&self, subject: &str, ttl: Duration) -> Result<AccessToken, AuthError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| AuthError::Encoding(e.to_string()))?;
        Ok(AccessToken {
            value: format!("signed:{subject}"),
            expires_at: self.now + ttl,
        })
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let subject = token
            .strip_prefix("signed:")
            .ok_or_else(|| AuthError::InvalidToken("bad signature".to_string()))?;
        Ok(TokenClaims {
            subject: subject.to_string(),
            exp: self.now.timestamp() + 3600,
            iat: self.now.timestamp(),
        })
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(3600)
    }
}
