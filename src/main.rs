use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use flashcards_service::{
    api,
    config::{Settings, StoreBackend},
    database::{self, MongoStore},
    middleware,
    state::AppState,
};

async fn build_state(settings: Settings) -> anyhow::Result<AppState> {
    match settings.store_backend {
        StoreBackend::MongoDB => {
            let url = settings
                .database_url
                .clone()
                .context("DATABASE_URL must be set")?;
            let db = database::MongoDB::new(&url)
                .await
                .context("Failed to connect to MongoDB")?;
            log::info!("✅ MongoDB connected successfully");
            Ok(AppState::with_mongo(MongoStore::new(db), settings))
        }
        StoreBackend::Memory => {
            log::warn!("⚠️  Using in-memory store, data is lost on restart");
            Ok(AppState::in_memory(settings))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env()?;
    let host = settings.host.clone();
    let port = settings.port;

    log::info!("🚀 Starting Flashcards Service...");
    log::info!("🗄️  Store backend: {:?}", settings.store_backend);
    if settings.github.is_none() {
        log::warn!("⚠️  GitHub OAuth not configured, /api/v1/auth/github is disabled");
    }
    if settings.dev_login {
        log::warn!("🔧 Dev login enabled at /api/v1/auth/dev-login");
    }

    let state = web::Data::new(build_state(settings).await?);

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = state
            .settings
            .cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi),
            )
            .configure(api::configure)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {}:{}", host, port))?
    .run()
    .await?;

    Ok(())
}
