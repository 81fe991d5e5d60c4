//! Trigger token middleware
//!
//! When `ApiConfig::trigger_token` is set, the trigger routes require the token
//! in one of (first non-empty wins):
//!
//! - the `token` query parameter
//! - the `X-Cron-Token` header
//! - an `Authorization: Bearer <token>` header
//!
//! Anything else receives a 401 Unauthorized response.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use crate::error::ApiError;

/// Header carrying the trigger token for schedulers that cannot set `Authorization`
pub const CRON_TOKEN_HEADER: &str = "x-cron-token";

/// Reject the request unless it presents the configured trigger token
///
/// Applies to forced and unforced triggers alike.
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use feed_push::api::auth::require_trigger_token;
///
/// let token = Some("s3cret".to_string());
/// let router: Router = Router::new()
///     .layer(middleware::from_fn_with_state(token, require_trigger_token));
/// ```
pub async fn require_trigger_token(
    State(expected_token): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    // If no token is configured, allow all requests through
    let Some(expected) = expected_token else {
        return next.run(request).await;
    };

    let provided = query_token(request.uri().query()).or_else(|| header_token(request.headers()));

    match provided {
        // Constant-time comparison to prevent timing side-channel attacks
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => unauthorized_response("Invalid trigger token"),
        None => unauthorized_response("Missing trigger token"),
    }
}

fn query_token(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    let cron = headers
        .get(CRON_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());
    if let Some(token) = cron {
        return Some(token.to_string());
    }

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;
    let (scheme, token) = authorization.split_once(' ')?;
    let token = token.trim_start();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Constant-time byte comparison.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(message))).into_response()
}
