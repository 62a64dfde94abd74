//! services/api/src/bin/api.rs

use access_core::AccessSession;
use api_lib::{
    adapters::{FileFlagStore, HttpAuthAdapter, HttpPaymentAdapter, RetryPolicy},
    config::Config,
    error::ApiError,
    web::{api_router, entitlement_watch, ApiDoc, AppState},
};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Flag Store & Restore the Session ---
    let flag_store = Arc::new(FileFlagStore::new(config.flag_store_path.clone()));
    info!("Using flag store at {}", flag_store.path().display());
    let session = AccessSession::builder()
        .flag_store(flag_store)
        .trial_length_days(config.trial_length_days)
        .build()?;
    let snapshot = session.snapshot();
    info!(
        "Session {} restored (premium: {}, days remaining: {}).",
        session.id(),
        snapshot.is_premium,
        snapshot.days_remaining
    );

    // --- 3. Initialize Service Adapters ---
    let client = reqwest::Client::builder()
        .timeout(config.transport_timeout)
        .build()?;
    let retry = RetryPolicy::new(config.transport_max_retries);
    let auth = Arc::new(HttpAuthAdapter::new(
        client.clone(),
        config.auth_base_url.clone(),
        retry.clone(),
    ));
    let payments = Arc::new(HttpPaymentAdapter::new(
        client,
        config.payment_base_url.clone(),
        retry,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(session, auth, payments));

    // --- 5. Start the Entitlement Watch ---
    let shutdown = CancellationToken::new();
    let watch = tokio::spawn(entitlement_watch(
        app_state.clone(),
        config.entitlement_tick,
        shutdown.clone(),
    ));

    // --- 6. Create the Web Router ---
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
        })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .merge(api_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = watch.await;
    Ok(())
}
