use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flashcards Service API",
        version = "1.0.0",
        description = "API documentation for the Flashcards Service. \n\n**Authentication:** endpoints under `/api/v1/me` require a JWT Bearer token. Browsing public sets is open to everyone.\n\n**Features:**\n- GitHub sign-in\n- Flashcard set authoring with public, unlisted and private visibility\n- Browse and search of public sets\n- Health monitoring",
        contact(
            name = "Flashcards Service Team"
        )
    ),
    paths(
        // Auth endpoints
        crate::api::auth::github_auth,
        crate::api::auth::dev_login,
        crate::api::auth::get_me,

        // Health
        crate::api::health::health_check,

        // Public sets
        crate::api::sets::list_public_sets,
        crate::api::sets::get_set,

        // Owned sets
        crate::api::sets::list_my_sets,
        crate::api::sets::create_set,
        crate::api::sets::update_set,
        crate::api::sets::delete_set,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::GithubAuthUrlResponse,
            crate::services::auth_service::DevLoginRequest,
            crate::models::UserInfo,

            // Health
            crate::api::health::HealthResponse,

            // Sets
            crate::models::Visibility,
            crate::models::Category,
            crate::models::CardDraft,
            crate::models::SetDraft,
            crate::models::SetSummary,
            crate::models::CardResponse,
            crate::models::SetDetail,
            crate::api::sets::SetListResponse,
            crate::api::sets::SetDetailResponse,
            crate::api::sets::MutationResponse,
        )
    ),
    tags(
        (name = "Auth", description = "GitHub sign-in and the signed-in user's profile."),
        (name = "Health", description = "Health check endpoint for monitoring service status."),
        (name = "Sets", description = "Browse public flashcard sets and open a single set for study."),
        (name = "My sets", description = "Create, replace and delete the caller's own sets."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/v1/auth/callback or dev-login"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_set_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/sets"));
        assert!(doc.paths.paths.contains_key("/api/v1/sets/{id}"));
        assert!(doc.paths.paths.contains_key("/api/v1/me/sets/{id}"));
        assert!(doc
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("bearer_auth"))
            .unwrap_or(false));
    }
}
