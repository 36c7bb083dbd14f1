use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{GithubOAuth, Settings};
use crate::database::UserStore;
use crate::models::{User, UserInfo};
use crate::services::access_policy::Viewer;
use crate::utils::AppError;

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";
const STATE_AUDIENCE: &str = "oauth-state";
const STATE_TTL_MINUTES: i64 = 10;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // user_id
    pub name: Option<String>,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn viewer(&self) -> Viewer {
        Viewer::new(self.sub.clone())
    }
}

/// Claims of the signed OAuth `state` parameter.
#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    jti: String,
    iat: usize,
    exp: usize,
    aud: String,
    iss: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GithubAuthUrlResponse {
    pub success: bool,
    pub auth_url: String,
    pub state: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DevLoginRequest {
    pub name: String,
}

/// Signs and verifies session tokens (HS256).
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, issuer: &str, audience: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.jwt_secret,
            &settings.jwt_issuer,
            &settings.jwt_audience,
            settings.jwt_ttl_hours,
        )
    }

    fn validation(&self, audience: &str) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.user_id.clone(),
            name: user.name.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation(&self.audience))
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Invalid token: {}", e);
                AppError::Unauthenticated
            })
    }

    /// Short-lived signed value used as the OAuth `state` (CSRF guard).
    pub fn issue_state(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = StateClaims {
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::minutes(STATE_TTL_MINUTES)).timestamp() as usize,
            aud: STATE_AUDIENCE.to_string(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to generate state: {}", e)))
    }

    pub fn verify_state(&self, state: &str) -> Result<(), AppError> {
        decode::<StateClaims>(state, &self.decoding, &self.validation(STATE_AUDIENCE))
            .map(|_| ())
            .map_err(|_| AppError::Validation("Invalid OAuth state".to_string()))
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn github_authorize_url(github: &GithubOAuth, state: &str) -> String {
    let params = [
        ("client_id", github.client_id.as_str()),
        ("redirect_uri", github.redirect_uri.as_str()),
        ("scope", "read:user"),
        ("state", state),
        ("allow_signup", "true"),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", GITHUB_AUTHORIZE_URL, query_string)
}

/// Subset of the GitHub `/user` payload we keep.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubProfile {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchanges the authorization code and fetches the GitHub profile.
pub async fn fetch_github_profile(github: &GithubOAuth, code: &str) -> Result<GithubProfile, AppError> {
    let client = reqwest::Client::new();

    let token_response: GithubTokenResponse = client
        .post(GITHUB_TOKEN_URL)
        .header("Accept", "application/json")
        .form(&[
            ("client_id", github.client_id.as_str()),
            ("client_secret", github.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", github.redirect_uri.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let access_token = match token_response.access_token {
        Some(token) => token,
        None => {
            return Err(AppError::Upstream(format!(
                "GitHub refused the code: {} {}",
                token_response.error.unwrap_or_default(),
                token_response.error_description.unwrap_or_default()
            )))
        }
    };

    let profile = client
        .get(GITHUB_USER_URL)
        .header("Authorization", format!("Bearer {}", access_token))
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", "flashcards-service")
        .send()
        .await?
        .error_for_status()?
        .json::<GithubProfile>()
        .await?;

    Ok(profile)
}

/// Returns the account linked to the GitHub profile, creating it on first
/// sign-in. Existing accounts are returned unchanged.
pub async fn find_or_create_github_user(
    users: &dyn UserStore,
    profile: &GithubProfile,
) -> Result<User, AppError> {
    if let Some(existing) = users.find_user_by_github_id(profile.id).await? {
        log::info!("✅ Found existing user by github_id: {}", existing.user_id);
        return Ok(existing);
    }

    let user = User {
        user_id: ObjectId::new().to_hex(),
        name: Some(profile.name.clone().unwrap_or_else(|| profile.login.clone())),
        image: profile.avatar_url.clone(),
        github_id: Some(profile.id),
        created_at: Utc::now().timestamp(),
    };

    match users.insert_user(&user).await {
        Ok(()) => {
            log::info!("✅ Created user {} for GitHub account {}", user.user_id, profile.login);
            Ok(user)
        }
        Err(e) => {
            // Concurrent first sign-in of the same account
            users
                .find_user_by_github_id(profile.id)
                .await?
                .ok_or(e)
        }
    }
}

/// Creates a throwaway local account. Only reachable when dev login is on.
pub async fn dev_login(users: &dyn UserStore, name: &str) -> Result<User, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 50 {
        return Err(AppError::Validation("name must be 1 to 50 characters".to_string()));
    }

    let user = User {
        user_id: ObjectId::new().to_hex(),
        name: Some(name.to_string()),
        image: None,
        github_id: None,
        created_at: Utc::now().timestamp(),
    };
    users.insert_user(&user).await?;

    log::info!("🔧 Dev user {} created ({})", user.user_id, name);
    Ok(user)
}

pub async fn get_current_user(users: &dyn UserStore, user_id: &str) -> Result<UserInfo, AppError> {
    users
        .find_user(user_id)
        .await?
        .map(|user| user.info())
        .ok_or_else(|| AppError::NotFound("User".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn keys() -> TokenKeys {
        TokenKeys::new("test-secret", "flashcards-service", "flashcards-api", 1)
    }

    fn user() -> User {
        User {
            user_id: "u-1".to_string(),
            name: Some("Linus".to_string()),
            image: None,
            github_id: Some(7),
            created_at: 0,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let keys = keys();
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.viewer(), Viewer::new("u-1"));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = TokenKeys::new("other-secret", "flashcards-service", "flashcards-api", 1);
        let token = other.issue(&user()).unwrap();
        assert_eq!(keys().verify(&token).unwrap_err(), AppError::Unauthenticated);
        assert_eq!(keys().verify("garbage").unwrap_err(), AppError::Unauthenticated);
    }

    #[test]
    fn test_state_is_not_a_session_token() {
        let keys = keys();
        let state = keys.issue_state().unwrap();
        assert!(keys.verify_state(&state).is_ok());
        assert!(keys.verify(&state).is_err());

        let token = keys.issue(&user()).unwrap();
        assert!(keys.verify_state(&token).is_err());
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_authorize_url_encodes_params() {
        let github = GithubOAuth {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3002/api/v1/auth/callback".to_string(),
        };
        let url = github_authorize_url(&github, "st");
        assert!(url.starts_with("https://github.com/login/oauth/authorize?client_id=client"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3002%2Fapi%2Fv1%2Fauth%2Fcallback"));
        assert!(url.contains("state=st"));
        assert!(!url.contains("secret"));
    }

    #[tokio::test]
    async fn test_github_user_created_once() {
        let store = MemoryStore::new();
        let profile = GithubProfile {
            id: 99,
            login: "octocat".to_string(),
            name: None,
            avatar_url: Some("https://avatars.githubusercontent.com/u/99".to_string()),
        };

        let first = find_or_create_github_user(&store, &profile).await.unwrap();
        assert_eq!(first.name.as_deref(), Some("octocat"));

        let renamed = GithubProfile {
            name: Some("The Octocat".to_string()),
            ..profile
        };
        let second = find_or_create_github_user(&store, &renamed).await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_dev_login_validates_name() {
        let store = MemoryStore::new();
        assert!(dev_login(&store, "  ").await.is_err());
        let user = dev_login(&store, "Tester").await.unwrap();
        let info = get_current_user(&store, &user.user_id).await.unwrap();
        assert_eq!(info.name.as_deref(), Some("Tester"));
    }
}
