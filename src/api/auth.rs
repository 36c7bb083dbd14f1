use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::services::auth_service::{self, AuthResponse, Claims, DevLoginRequest, GithubAuthUrlResponse};
use crate::state::AppState;
use crate::utils::AppError;

/// Start GitHub sign-in
#[utoipa::path(
    get,
    path = "/api/v1/auth/github",
    tag = "Auth",
    responses(
        (status = 200, description = "GitHub authorize URL", body = GithubAuthUrlResponse),
        (status = 500, description = "GitHub sign-in is not configured")
    )
)]
pub async fn github_auth(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    log::info!("🔐 GET /auth/github - Generating OAuth URL");

    let github = state
        .settings
        .github
        .as_ref()
        .ok_or_else(|| AppError::Internal("GitHub OAuth is not configured".to_string()))?;

    let oauth_state = state.tokens.issue_state()?;
    Ok(HttpResponse::Ok().json(GithubAuthUrlResponse {
        success: true,
        auth_url: auth_service::github_authorize_url(github, &oauth_state),
        state: oauth_state,
    }))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}

async fn sign_in_with_github(state: &AppState, query: &CallbackQuery) -> Result<String, AppError> {
    let github = state
        .settings
        .github
        .as_ref()
        .ok_or_else(|| AppError::Internal("GitHub OAuth is not configured".to_string()))?;

    state
        .tokens
        .verify_state(query.state.as_deref().unwrap_or_default())?;

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::Validation("no_code".to_string()))?;

    let profile = auth_service::fetch_github_profile(github, code).await?;
    let user = auth_service::find_or_create_github_user(state.users.as_ref(), &profile).await?;
    state.tokens.issue(&user)
}

/// GitHub redirects here; the browser is sent on to the frontend with either
/// an `access_token` or an `error`.
pub async fn github_callback(
    state: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    log::info!("🔐 GET /auth/callback - Processing GitHub OAuth");

    let frontend_url = state.settings.frontend_url.trim_end_matches('/').to_string();

    if let Some(error) = &query.error {
        log::error!("❌ OAuth error: {}", error);
        return redirect(format!(
            "{}/auth/callback?error={}",
            frontend_url,
            urlencoding::encode(error)
        ));
    }

    match sign_in_with_github(&state, &query).await {
        Ok(token) => {
            log::info!("✅ GitHub OAuth successful");
            redirect(format!(
                "{}/auth/callback?access_token={}",
                frontend_url,
                urlencoding::encode(&token)
            ))
        }
        Err(e) => {
            log::error!("❌ GitHub OAuth failed: {}", e);
            redirect(format!(
                "{}/auth/callback?error={}",
                frontend_url,
                urlencoding::encode(&e.public_message())
            ))
        }
    }
}

/// Local sign-in without GitHub, for development
#[utoipa::path(
    post,
    path = "/api/v1/auth/dev-login",
    tag = "Auth",
    request_body = DevLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 404, description = "Dev login disabled")
    )
)]
pub async fn dev_login(
    state: web::Data<AppState>,
    request: web::Json<DevLoginRequest>,
) -> Result<HttpResponse, AppError> {
    if !state.settings.dev_login {
        return Err(AppError::NotFound("Route".to_string()));
    }
    log::info!("🔧 POST /auth/dev-login - name: {}", request.name);

    let user = auth_service::dev_login(state.users.as_ref(), &request.name).await?;
    let token = state.tokens.issue(&user)?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        success: true,
        token,
        user: user.info(),
    }))
}

/// Profile of the signed-in user
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Auth",
    responses(
        (status = 200, description = "User information retrieved", body = crate::models::UserInfo),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let info = auth_service::get_current_user(state.users.as_ref(), &user.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": info
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GithubOAuth, Settings};
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_dev_login_then_me() {
        let state = web::Data::new(AppState::in_memory(Settings::for_tests()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(crate::api::json_config())
                .app_data(crate::api::query_config())
                .configure(crate::api::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/dev-login")
            .set_json(serde_json::json!({ "name": "Margaret" }))
            .to_request();
        let auth: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let token = auth["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/v1/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let me: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(me["user"]["name"], "Margaret");

        let req = test::TestRequest::get()
            .uri("/api/v1/me")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_dev_login_disabled() {
        let mut settings = Settings::for_tests();
        settings.dev_login = false;
        let state = web::Data::new(AppState::in_memory(settings));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(crate::api::json_config())
                .app_data(crate::api::query_config())
                .configure(crate::api::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/dev-login")
            .set_json(serde_json::json!({ "name": "Eve" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_callback_rejects_forged_state() {
        let mut settings = Settings::for_tests();
        settings.github = Some(GithubOAuth {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost/api/v1/auth/callback".to_string(),
        });
        let state = web::Data::new(AppState::in_memory(settings));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::api::configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/callback?code=abc&state=forged")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers().get("Location").unwrap().to_str().unwrap();
        assert!(location.starts_with("http://localhost:3000/auth/callback?error="));
        assert!(!location.contains("access_token"));

        let req = test::TestRequest::get().uri("/api/v1/auth/github").to_request();
        let url: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(url["auth_url"]
            .as_str()
            .unwrap()
            .starts_with("https://github.com/login/oauth/authorize"));
    }
}
