//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        ai_backend::PrimaryBackendAdapter, db::DbAdapter, files::LocalFileStore,
        firebase::FirebaseVerifier, openrouter::OpenRouterAdapter,
    },
    ai::{AiPipeline, ProviderEntry, RetryPolicy},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::Router;
use careprep_core::ports::TokenVerifier;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await.map_err(sqlx::Error::from)?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();

    // The pipeline tries providers in order: the internal AI backend first,
    // then OpenRouter, with the built-in static templates as the last tier.
    let mut providers = Vec::new();
    if let Some(base_url) = &config.ai_service_url {
        providers.push(ProviderEntry::new(
            Arc::new(PrimaryBackendAdapter::new(
                http_client.clone(),
                base_url.clone(),
            )),
            RetryPolicy::rate_limit_default(),
        ));
    } else {
        info!("AI_SERVICE_URL not set; primary AI backend disabled");
    }
    providers.push(ProviderEntry::new(
        Arc::new(OpenRouterAdapter::new(
            http_client.clone(),
            config.openrouter_api_key.clone(),
            config.openrouter_model.clone(),
        )),
        RetryPolicy::no_retry(),
    ));
    let pipeline = Arc::new(AiPipeline::new(providers));

    let verifier = Arc::new(FirebaseVerifier::new(
        http_client.clone(),
        config.firebase_api_key.clone(),
    ));
    if !verifier.ready() {
        info!("FIREBASE_API_KEY not set; authenticated routes will return 503");
    }

    let file_store = Arc::new(LocalFileStore::new(config.upload_dir.clone()));

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        store: db_adapter,
        files: file_store,
        verifier,
        ai: pipeline,
        config: config.clone(),
    });

    let app = Router::new()
        .merge(web::router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
