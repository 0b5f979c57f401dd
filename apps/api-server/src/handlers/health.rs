//! Liveness endpoints.

use actix_web::HttpResponse;
use serde::Serialize;

use rlpro_shared::dto::MessageResponse;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// GET /
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse {
        message: "RateLimiter Pro API is running".to_string(),
    })
}

/// Health check endpoint - returns server status.
///
/// GET /api/v1/health
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}
