use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDB,
    Memory,
}

#[derive(Debug, Clone)]
pub struct GithubOAuth {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Runtime configuration, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub app_env: AppEnv,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_ttl_hours: i64,
    pub github: Option<GithubOAuth>,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub dev_login: bool,
}

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let app_env = match get("APP_ENV").as_deref() {
            None | Some("development") | Some("test") => AppEnv::Development,
            Some("production") => AppEnv::Production,
            Some(other) => bail!("APP_ENV must be development or production, got '{}'", other),
        };
        let production = app_env == AppEnv::Production;

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("PORT '{}' is not a port number", raw))?,
            None => 3002,
        };

        let store_backend = match get("STORE_BACKEND").as_deref() {
            None | Some("mongodb") => StoreBackend::MongoDB,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be mongodb or memory, got '{}'", other),
        };

        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::MongoDB {
            match &database_url {
                None => bail!("DATABASE_URL must be set when STORE_BACKEND=mongodb"),
                Some(url) if !url.starts_with("mongodb://") && !url.starts_with("mongodb+srv://") => {
                    bail!("DATABASE_URL must be a mongodb:// or mongodb+srv:// URL")
                }
                Some(_) => {}
            }
        }

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if production => bail!("JWT_SECRET must be set in production"),
            None => DEV_JWT_SECRET.to_string(),
        };

        let jwt_ttl_hours = match get("JWT_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .with_context(|| format!("JWT_TTL_HOURS '{}' must be a positive integer", raw))?,
            None => 24,
        };

        let port_str = port.to_string();
        let github = match (get("GITHUB_CLIENT_ID"), get("GITHUB_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GithubOAuth {
                client_id,
                client_secret,
                redirect_uri: get("GITHUB_REDIRECT_URI").unwrap_or_else(|| {
                    format!("http://localhost:{}/api/v1/auth/callback", port_str)
                }),
            }),
            (None, None) if !production => None,
            _ => bail!("GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET must both be set"),
        };

        let frontend_url = get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string());

        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => vec![frontend_url.clone()],
        };

        let dev_login = matches!(get("DEV_LOGIN").as_deref(), Some("true") | Some("1"));
        if dev_login && production {
            bail!("DEV_LOGIN cannot be enabled in production");
        }

        Ok(Settings {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            app_env,
            store_backend,
            database_url,
            jwt_secret,
            jwt_issuer: get("JWT_ISSUER").unwrap_or_else(|| "flashcards-service".to_string()),
            jwt_audience: get("JWT_AUDIENCE").unwrap_or_else(|| "flashcards-api".to_string()),
            jwt_ttl_hours,
            github,
            frontend_url,
            cors_origins,
            dev_login,
        })
    }

    /// Settings for tests: memory store, dev login on, fixed secret.
    pub fn for_tests() -> Self {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 0,
            app_env: AppEnv::Development,
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "flashcards-service".to_string(),
            jwt_audience: "flashcards-api".to_string(),
            jwt_ttl_hours: 1,
            github: None,
            frontend_url: "http://localhost:3000".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            dev_login: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_memory_backend_defaults() {
        let s = settings(&[("STORE_BACKEND", "memory")]).unwrap();
        assert_eq!(s.port, 3002);
        assert_eq!(s.app_env, AppEnv::Development);
        assert_eq!(s.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(s.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(s.github.is_none());
        assert!(!s.dev_login);
    }

    #[test]
    fn test_mongodb_requires_database_url() {
        assert!(settings(&[]).is_err());
        assert!(settings(&[("DATABASE_URL", "postgres://x")]).is_err());
        let s = settings(&[("DATABASE_URL", "mongodb://localhost:27017/flashcards")]).unwrap();
        assert_eq!(s.store_backend, StoreBackend::MongoDB);
    }

    #[test]
    fn test_production_requires_secrets() {
        let base = [("APP_ENV", "production"), ("STORE_BACKEND", "memory")];
        assert!(settings(&base).is_err());

        let with_secret = [
            ("APP_ENV", "production"),
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
        ];
        // GitHub credentials still missing
        assert!(settings(&with_secret).is_err());

        let complete = [
            ("APP_ENV", "production"),
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("GITHUB_CLIENT_ID", "id"),
            ("GITHUB_CLIENT_SECRET", "secret"),
            ("PORT", "8080"),
        ];
        let s = settings(&complete).unwrap();
        let github = s.github.unwrap();
        assert_eq!(github.redirect_uri, "http://localhost:8080/api/v1/auth/callback");

        let mut dev_login = complete.to_vec();
        dev_login.push(("DEV_LOGIN", "true"));
        assert!(settings(&dev_login).is_err());
    }

    #[test]
    fn test_half_configured_github_rejected() {
        assert!(settings(&[("STORE_BACKEND", "memory"), ("GITHUB_CLIENT_ID", "id")]).is_err());
    }

    #[test]
    fn test_cors_origins_list() {
        let s = settings(&[
            ("STORE_BACKEND", "memory"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ])
        .unwrap();
        assert_eq!(s.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}
