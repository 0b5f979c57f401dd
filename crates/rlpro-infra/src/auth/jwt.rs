//! JWT token service implementation.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use rlpro_core::domain::AccessToken;
use rlpro_core::ports::{AuthError, Clock, TokenClaims, TokenService};

use crate::clock::SystemClock;

const DEFAULT_SECRET: &str = "change-me-in-production";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Pinned signing algorithm. Only HMAC algorithms are accepted.
    pub algorithm: Algorithm,
    pub ttl: Duration,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            algorithm: Algorithm::HS256,
            ttl: Duration::from_secs(60 * 60),
            issuer: "ratelimiter-pro".to_string(),
        }
    }
}

impl JwtConfig {
    /// Load configuration from environment variables.
    ///
    /// `JWT_EXPIRATION_TIME` is in minutes.
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("JWT_SECRET_KEY").unwrap_or_else(|_| DEFAULT_SECRET.to_string());

        // Warn if using default secret in production
        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET_KEY environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET_KEY for production use.");
            }
        }

        let algorithm = match std::env::var("JWT_ALGORITHM") {
            Ok(name) => parse_algorithm(&name)?,
            Err(_) => Algorithm::HS256,
        };

        let minutes: u64 = std::env::var("JWT_EXPIRATION_TIME")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            secret,
            algorithm,
            ttl: ttl_from_minutes(minutes)?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "ratelimiter-pro".to_string()),
        })
    }
}

/// Token lifetime for `JWT_EXPIRATION_TIME`. It must fit a timestamp offset.
fn ttl_from_minutes(minutes: u64) -> Result<Duration, AuthError> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .filter(|ttl| TimeDelta::from_std(*ttl).is_ok())
        .ok_or_else(|| {
            AuthError::Encoding(format!("JWT_EXPIRATION_TIME of {minutes} minutes is too large"))
        })
}

/// Parse an algorithm name, accepting only the symmetric HMAC family.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    match Algorithm::from_str(name.trim()) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        Ok(other) => Err(AuthError::Encoding(format!(
            "Unsupported JWT algorithm {other:?}, expected HS256, HS384 or HS512"
        ))),
        Err(e) => Err(AuthError::Encoding(format!("Unknown JWT algorithm {name}: {e}"))),
    }
}

/// Wire format of the token payload.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user email
    exp: i64,    // expiration timestamp
    iat: i64,    // issued at
    iss: String, // issuer
}

/// JWT-based token service.
///
/// Expiry is checked against the injected clock with no leeway: a token is
/// valid while `now < exp`.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // The header's alg must equal the configured one. Expiry is checked
        // by hand against `clock`.
        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
            config,
            clock,
        }
    }

    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self::new(JwtConfig::from_env()?))
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, subject: &str, ttl: Duration) -> Result<AccessToken, AuthError> {
        let now = self.clock.now();
        let ttl = TimeDelta::from_std(ttl).map_err(|e| AuthError::Encoding(e.to_string()))?;
        let exp = now.timestamp() + ttl.num_seconds();

        let claims = Claims {
            sub: subject.to_string(),
            exp,
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let value = encode(
            &Header::new(self.config.algorithm),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| AuthError::Encoding(e.to_string()))?;

        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::Encoding("Expiry out of range".to_string()))?;

        Ok(AccessToken { value, expires_at })
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        let claims = token_data.claims;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(TokenClaims {
            subject: claims.sub,
            exp: claims.exp,
            iat: claims.iat,
        })
    }

    fn default_ttl(&self) -> Duration {
        self.config.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            algorithm: Algorithm::HS256,
            ttl: Duration::from_secs(3600),
            issuer: "test-issuer".to_string(),
        }
    }

    fn pinned_clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_issue_then_verify_returns_subject() {
        let clock = pinned_clock();
        let service = JwtTokenService::with_clock(test_config(), Arc::new(clock.clone()));

        let token = service
            .issue("test@example.com", Duration::from_secs(600))
            .unwrap();
        let claims = service.verify(&token.value).unwrap();

        assert_eq!(claims.subject, "test@example.com");
        assert_eq!(claims.exp, clock.now().timestamp() + 600);
        assert_eq!(token.expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn test_issue_is_deterministic_for_fixed_clock() {
        let service = JwtTokenService::with_clock(test_config(), Arc::new(pinned_clock()));

        let a = service.issue_default("test@example.com").unwrap();
        let b = service.issue_default("test@example.com").unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_token_expires_at_exp() {
        let clock = pinned_clock();
        let service = JwtTokenService::with_clock(test_config(), Arc::new(clock.clone()));
        let token = service
            .issue("test@example.com", Duration::from_secs(60))
            .unwrap();

        clock.advance(TimeDelta::seconds(59));
        assert!(service.verify(&token.value).is_ok());

        clock.advance(TimeDelta::seconds(1));
        assert!(matches!(
            service.verify(&token.value),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_validate_invalid_token() {
        let service = JwtTokenService::new(test_config());

        for garbage in ["invalid-token", "", "a.b.c", "eyJhbGciOiJIUzI1NiJ9..."] {
            let result = service.verify(garbage);
            assert!(matches!(result, Err(AuthError::InvalidToken(_))), "{garbage}");
        }
    }

    #[test]
    fn test_rejects_token_signed_with_other_secret() {
        let clock = Arc::new(pinned_clock());
        let issuer = JwtTokenService::with_clock(
            JwtConfig {
                secret: "other-secret".to_string(),
                ..test_config()
            },
            clock.clone(),
        );
        let verifier = JwtTokenService::with_clock(test_config(), clock);

        let token = issuer.issue_default("test@example.com").unwrap();

        assert!(matches!(
            verifier.verify(&token.value),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_token_signed_with_other_algorithm() {
        let clock = Arc::new(pinned_clock());
        let issuer = JwtTokenService::with_clock(
            JwtConfig {
                algorithm: Algorithm::HS512,
                ..test_config()
            },
            clock.clone(),
        );
        let verifier = JwtTokenService::with_clock(test_config(), clock);

        let token = issuer.issue_default("test@example.com").unwrap();

        assert!(matches!(
            verifier.verify(&token.value),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_unsigned_token() {
        let service = JwtTokenService::with_clock(test_config(), Arc::new(pinned_clock()));
        // {"alg":"none","typ":"JWT"} . {"sub":"test@example.com","exp":9999999999,"iat":0,"iss":"test-issuer"} .
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJzdWIiOiJ0ZXN0QGV4YW1wbGUuY29tIiwiZXhwIjo5OTk5OTk5OTk5LCJpYXQiOjAsImlzcyI6InRlc3QtaXNzdWVyIn0.";

        assert!(matches!(
            service.verify(token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_validate_wrong_issuer_token() {
        let clock = Arc::new(pinned_clock());
        let service1 = JwtTokenService::with_clock(
            JwtConfig {
                issuer: "issuer1".to_string(),
                ..test_config()
            },
            clock.clone(),
        );
        let service2 = JwtTokenService::with_clock(
            JwtConfig {
                issuer: "issuer2".to_string(),
                ..test_config()
            },
            clock,
        );

        let token = service1.issue_default("test@test.com").unwrap();

        assert!(service2.verify(&token.value).is_err());
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm("HS512").unwrap(), Algorithm::HS512);
        assert!(parse_algorithm("RS256").is_err());
        assert!(parse_algorithm("none").is_err());
    }

    #[test]
    fn test_ttl_from_minutes() {
        assert_eq!(ttl_from_minutes(60).unwrap(), Duration::from_secs(3600));
        assert!(ttl_from_minutes(u64::MAX).is_err());
        assert!(ttl_from_minutes(u64::MAX / 60).is_err());
    }

    #[test]
    fn test_default_ttl() {
        let service = JwtTokenService::new(JwtConfig::default());

        assert_eq!(service.default_ttl(), Duration::from_secs(3600));
    }
}
