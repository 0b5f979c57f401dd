//! Registration, login and session resolution.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{AccessToken, User, mask_email};
use crate::error::{RepoError, ServiceError};
use crate::ports::{
    PasswordService, RateLimitDecision, RateLimiter, TokenService, UserRepository,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Verified against when the email is unknown, so a failed login costs the
/// same hash verification whether or not the account exists.
const DECOY_PASSWORD: &str = "decoy-password-never-valid";

/// Rate-limited entry points. Each gets its own counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Register,
    Login,
}

impl AuthAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthAction::Register => "register",
            AuthAction::Login => "login",
        }
    }
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication workflow over the user store, password hasher, token codec
/// and rate limiter.
///
/// Register and login consult the rate limiter before touching any store or
/// credential. The limiter key is the submitted email, which any caller can
/// forge; when the transport knows the caller's network address it is passed
/// as `client` and limited under its own key as well.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
    limiter: Arc<dyn RateLimiter>,
    store_timeout: Duration,
    decoy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        limiter: Arc<dyn RateLimiter>,
        store_timeout: Duration,
    ) -> Self {
        let decoy_hash = passwords.hash(DECOY_PASSWORD).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not prepare decoy password hash");
            String::new()
        });

        Self {
            users,
            passwords,
            tokens,
            limiter,
            store_timeout,
            decoy_hash,
        }
    }

    /// Lifetime of the tokens issued by [`AuthService::login`].
    pub fn token_ttl(&self) -> Duration {
        self.tokens.default_ttl()
    }

    /// Create an account for `email`.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        client: Option<&str>,
    ) -> Result<User, ServiceError> {
        let email = normalize_email(email)?;
        self.enforce_rate_limit(AuthAction::Register, &email, client)
            .await?;

        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = self.passwords.hash(password)?;
        let user = self
            .with_timeout(self.users.create(User::new(email.clone(), password_hash)))
            .await
            .inspect_err(|e| {
                if matches!(e, RepoError::Constraint(_)) {
                    tracing::info!(email = %mask_email(&email), "Registration for existing email");
                }
            })?;

        tracing::info!(user_id = %user.id, email = %mask_email(&user.email), "User registered");
        Ok(user)
    }

    /// Check `email`/`password` and issue an access token.
    ///
    /// Unknown email and wrong password both fail with
    /// [`ServiceError::InvalidCredentials`].
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: Option<&str>,
    ) -> Result<AccessToken, ServiceError> {
        let email = normalize_email(email)?;
        self.enforce_rate_limit(AuthAction::Login, &email, client)
            .await?;

        let Some(user) = self.with_timeout(self.users.find_by_email(&email)).await? else {
            let _ = self.passwords.verify(password, &self.decoy_hash);
            tracing::warn!(email = %mask_email(&email), "Login failed");
            return Err(ServiceError::InvalidCredentials);
        };

        if !self.passwords.verify(password, &user.password_hash)? {
            tracing::warn!(email = %mask_email(&email), "Login failed");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue_default(&user.email)?;
        tracing::info!(user_id = %user.id, "Access token issued");
        Ok(token)
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn resolve_session(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            ServiceError::Unauthenticated
        })?;

        self.with_timeout(self.users.find_by_email(&claims.subject))
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    subject = %mask_email(&claims.subject),
                    "Valid token for a principal that no longer exists"
                );
                ServiceError::PrincipalNotFound
            })
    }

    async fn enforce_rate_limit(
        &self,
        action: AuthAction,
        email: &str,
        client: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut keys = Vec::with_capacity(2);
        if let Some(addr) = client.filter(|a| !a.is_empty()) {
            keys.push(format!("{action}:client:{addr}"));
        }
        keys.push(format!("{action}:email:{email}"));

        for key in &keys {
            if let RateLimitDecision::Limited { retry_after } =
                self.limiter.check_and_consume(key).await?
            {
                tracing::warn!(
                    action = %action,
                    email = %mask_email(email),
                    retry_after_secs = retry_after.as_secs(),
                    "Rate limit exceeded"
                );
                return Err(ServiceError::RateLimited { retry_after });
            }
        }

        Ok(())
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| RepoError::Timeout(self.store_timeout))?
    }
}

fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ServiceError::Validation("Email must not be empty".to_string()));
    }
    Ok(email)
}

fn validate_email(email: &str) -> Result<(), ServiceError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ServiceError::Validation("Invalid email address".to_string())),
    }
}
