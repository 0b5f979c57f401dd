//! Registration, login and current-user handlers.

use actix_web::{HttpRequest, HttpResponse, web};

use rlpro_core::domain::User;
use rlpro_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Caller's network address, used as an extra rate limit key.
fn client_addr(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}

fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        email: user.email,
        created_at: user.created_at.to_rfc3339(),
    }
}

/// POST /api/v1/users/
pub async fn register(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let client = client_addr(&req);

    let user = state
        .auth
        .register(&body.email, &body.password, client.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(user_response(user)))
}

/// POST /api/v1/auth/login
pub async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let client = client_addr(&req);

    let token = state
        .auth
        .login(&body.email, &body.password, client.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(AuthResponse::bearer(
        token.value,
        state.auth.token_ttl().as_secs(),
    )))
}

/// GET /api/v1/auth/me - Protected route
pub async fn me(identity: Identity) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(user_response(identity.0)))
}
