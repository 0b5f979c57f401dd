//! In-memory user repository - used when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rlpro_core::domain::User;
use rlpro_core::error::RepoError;
use rlpro_core::ports::UserRepository;

/// In-memory user store keyed by email.
///
/// `create` checks and inserts under one write lock, which gives the same
/// uniqueness guarantee as a unique index.
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user. Returns whether one was stored.
    pub async fn remove(&self, email: &str) -> bool {
        self.users.write().await.remove(email).is_some()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(RepoError::Constraint("Email already registered".to_string()));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }
}
