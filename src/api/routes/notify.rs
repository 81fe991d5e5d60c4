//! Trigger handlers: notify-latest, test-push.

use super::{NotifyQuery, TestPushRequest, is_truthy};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{CycleOptions, CycleOutcome};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Response of a completed cycle
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    /// Always true; failures use the error body
    pub ok: bool,
    /// Cycle result
    #[serde(flatten)]
    pub outcome: CycleOutcome,
}

/// GET|POST /notify-latest - Run one notification cycle
///
/// `force` comes from `?force=1|true` or, on POST, a JSON body
/// `{"force": true}`.
pub async fn notify_latest(
    State(state): State<AppState>,
    Query(query): Query<NotifyQuery>,
    body: Bytes,
) -> Result<Json<NotifyResponse>> {
    let force = query
        .force
        .as_deref()
        .is_some_and(|f| f == "1" || f == "true")
        || body_force(&body);

    let outcome = state.notifier.run_cycle(CycleOptions { force }).await?;

    Ok(Json(NotifyResponse { ok: true, outcome }))
}

// Malformed or non-object bodies simply don't force.
fn body_force(body: &[u8]) -> bool {
    if body.is_empty() {
        return false;
    }
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("force").map(is_truthy))
        .unwrap_or(false)
}

/// POST /test-push - Send a test notification to every recipient
pub async fn test_push(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let request = if body.is_empty() {
        TestPushRequest::default()
    } else {
        serde_json::from_slice::<TestPushRequest>(&body).map_err(|e| Error::Config {
            message: format!("invalid test-push body: {}", e),
            key: None,
        })?
    };

    let summary = state.notifier.send_test(&request.into_message()).await?;

    Ok(Json(json!({
        "ok": true,
        "sent": summary.delivered,
        "total": summary.attempted,
        "pruned": summary.pruned.removed,
    })))
}
