//! HTTP trigger API
//!
//! Lets an external cron, an operator or a browser start cycles and inspect
//! state. Recipient registration lives elsewhere.

use crate::{Config, Result, notifier::Notifier};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Triggers (guarded by the trigger token when one is configured)
/// - `GET|POST /notify-latest` - Run a cycle (`?force=1|true` or `{"force": true}`)
/// - `POST /test-push` - Send a test notification to every recipient
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /status` - Recipient count and control state
/// - `GET /feed/latest` - Newest feed item
pub fn create_router(notifier: Arc<Notifier>, config: Arc<Config>) -> Router {
    let state = AppState::new(notifier);

    let triggers = Router::new()
        .route(
            "/notify-latest",
            get(routes::notify_latest).post(routes::notify_latest),
        )
        .route("/test-push", post(routes::test_push))
        .route_layer(middleware::from_fn_with_state(
            config.api.trigger_token.clone(),
            auth::require_trigger_token,
        ));

    let router = Router::new()
        .route("/health", get(routes::health_check))
        .route("/status", get(routes::status))
        .route("/feed/latest", get(routes::latest_item))
        .merge(triggers)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Serve the API on `config.api.bind_address` until `shutdown` is cancelled
pub async fn start_api_server(
    notifier: Arc<Notifier>,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(notifier, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
