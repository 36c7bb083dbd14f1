pub mod auth;
pub mod health;
pub mod sets;
pub mod swagger;

use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    web, HttpRequest,
};

use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Auth endpoints
        .service(
            web::scope("/api/v1/auth")
                .route("/github", web::get().to(auth::github_auth))
                .route("/callback", web::get().to(auth::github_callback))
                .route("/dev-login", web::post().to(auth::dev_login)),
        )
        // Public browse: anonymous or signed-in viewers
        .service(
            web::scope("/api/v1/sets")
                .route("", web::get().to(sets::list_public_sets))
                .route("/{id}", web::get().to(sets::get_set)),
        )
        // Caller's own sets - Requires JWT
        .service(
            web::scope("/api/v1/me")
                .wrap(AuthMiddleware)
                .route("", web::get().to(auth::get_me))
                .route("/sets", web::get().to(sets::list_my_sets))
                .route("/sets", web::post().to(sets::create_set))
                .route("/sets/{id}", web::put().to(sets::update_set))
                .route("/sets/{id}", web::delete().to(sets::delete_set)),
        );
}

/// Malformed JSON bodies, unknown enum values included, are reported through
/// the regular error envelope as a 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            log::warn!("⚠️ Rejected JSON body: {}", err);
            AppError::Validation(format!("Invalid request body: {}", err)).into()
        })
}

/// Query strings that do not deserialize (repeated keys, for instance) get the
/// same envelope as body errors.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        log::warn!("⚠️ Rejected query string: {}", err);
        AppError::Validation(format!("Invalid query string: {}", err)).into()
    })
}
