//! PostgreSQL user repository.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DbConn, DbErr, SqlErr};

use rlpro_core::domain::{User, mask_email};
use rlpro_core::error::RepoError;
use rlpro_core::ports::UserRepository;

use super::entity::user::{self, Entity as UserEntity};

/// PostgreSQL user repository. Email uniqueness comes from the column's
/// unique index.
pub struct PostgresUserRepository {
    db: DbConn,
}

impl PostgresUserRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn map_db_err(err: DbErr) -> RepoError {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return RepoError::Constraint("Email already registered".to_string());
    }
    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        other => {
            let err_str = other.to_string();
            if err_str.contains("duplicate") || err_str.contains("unique") {
                RepoError::Constraint("Email already registered".to_string())
            } else {
                RepoError::Query(err_str)
            }
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find_by_email(email)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn create(&self, new_user: User) -> Result<User, RepoError> {
        let active_model: user::ActiveModel = new_user.into();
        let model = active_model.insert(&self.db).await.map_err(map_db_err)?;

        Ok(model.into())
    }
}
