//! HTTP handlers and route configuration.

mod auth;
mod health;

use actix_web::web;

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Malformed bodies are reported like any other validation failure.
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into());

    cfg.app_data(json_config)
        .route("/", web::get().to(health::root))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .service(
                    web::scope("/users")
                        .route("", web::post().to(auth::register))
                        .route("/", web::post().to(auth::register)),
                )
                .service(
                    web::scope("/auth")
                        .route("/login", web::post().to(auth::login))
                        .route("/me", web::get().to(auth::me)),
                ),
        );
}
