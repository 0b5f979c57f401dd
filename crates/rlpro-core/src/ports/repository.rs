use async_trait::async_trait;

use crate::domain::User;
use crate::error::RepoError;

/// User repository - the user-storage collaborator.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Insert a new user.
    ///
    /// Fails with [`RepoError::Constraint`] when the email is already taken.
    /// Uniqueness is enforced by the store itself, so two concurrent
    /// registrations of the same email cannot both succeed.
    async fn create(&self, user: User) -> Result<User, RepoError>;
}
