//! Authentication extractor.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;

use rlpro_core::domain::User;

use crate::middleware::error::AppError;
use crate::state::AppState;

/// The user behind a valid Bearer token.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.0.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity(pub User);

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
            tracing::error!("AppState not found in app data");
            return Box::pin(async {
                Err(AppError::Unavailable("Server configuration error".to_string()))
            });
        };

        let token = bearer_token(req);

        Box::pin(async move {
            let token = token.ok_or(AppError::Unauthenticated)?;
            let user = state.auth.resolve_session(&token).await?;
            Ok(Identity(user))
        })
    }
}
