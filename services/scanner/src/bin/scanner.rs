//! services/scanner/src/bin/scanner.rs

use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::{routing::get, Router};
use scanner_lib::{
    adapters::StaticPatientDirectory,
    config::Config,
    error::ApiError,
    web::{
        get_patient_handler, get_profile_handler, health_handler, list_patients_handler,
        rest::ApiDoc,
        state::AppState, ws_handler,
    },
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
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
    info!("Configuration loaded. Starting scanner service...");
    match config.scan_timeout {
        Some(timeout) => info!("Scans time out after {:?}.", timeout),
        None => info!("Scan timeout disabled."),
    }

    // --- 2. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        patients: Arc::new(StaticPatientDirectory::demo()),
    });

    // --- 3. Create the Web Router ---
    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {}",
            config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let api_router = Router::new()
        .route("/health", get(health_handler))
        .route("/patients", get(list_patients_handler))
        .route("/patients/{patient_id}", get(get_patient_handler))
        .route("/patients/{patient_id}/profile", get(get_profile_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 4. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
