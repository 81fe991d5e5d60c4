//! System handlers: health, status, latest feed item.

use crate::api::AppState;
use crate::error::Result;
use axum::{Json, extract::State, response::IntoResponse};
use serde_json::{Value, json};

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /status - Recipient count and control state
pub async fn status(State(state): State<AppState>) -> Result<Json<Value>> {
    let snapshot = state.notifier.status().await?;
    Ok(Json(json!({
        "ok": true,
        "recipients": snapshot.recipients,
        "state": snapshot.state,
    })))
}

/// GET /feed/latest - Newest feed item (served from cache when fresh)
pub async fn latest_item(State(state): State<AppState>) -> Result<Json<Value>> {
    let item = state.notifier.latest_item().await?;
    Ok(Json(json!({
        "ok": true,
        "item": item,
    })))
}
