use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Json, Response},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::dispatch::handle_event;
use crate::events::{EventResponse, PayloadKind, SlackEventPayload};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const RETRY_NUM_HEADER: &str = "x-slack-retry-num";

/// Requests signed longer ago than this are rejected as possible replays.
const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

/// Slack event payloads are small; anything larger is refused before buffering.
pub const MAX_WEBHOOK_BODY_SIZE: usize = 1024 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Check a `v0=<hex>` Slack signature over `v0:<timestamp>:<body>`.
pub fn verify_slack_signature(
    secret: &str,
    timestamp: &str,
    payload: &[u8],
    signature: &str,
) -> bool {
    let Some(signature_hex) = signature.strip_prefix("v0=") else {
        return false;
    };

    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(payload);

    // Use constant-time verification
    mac.verify_slice(&signature_bytes).is_ok()
}

/// Whether a request timestamp is close enough to `now` to accept.
pub fn is_fresh_timestamp(timestamp: &str, now: i64) -> bool {
    match timestamp.parse::<i64>() {
        Ok(ts) => (now - ts).abs() <= MAX_REQUEST_AGE_SECS,
        Err(_) => false,
    }
}

async fn verify_request_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(secret) = state.signing_secret.as_deref() else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();

    let timestamp = header_str(&parts.headers, TIMESTAMP_HEADER).ok_or(StatusCode::UNAUTHORIZED)?;
    let signature = header_str(&parts.headers, SIGNATURE_HEADER).ok_or(StatusCode::UNAUTHORIZED)?;

    let bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_SIZE)
        .await
        .map_err(|e| {
            warn!("Failed to read Slack request body: {}", e);
            StatusCode::PAYLOAD_TOO_LARGE
        })?;

    if !is_fresh_timestamp(timestamp, chrono::Utc::now().timestamp()) {
        warn!("Rejecting Slack request with stale timestamp {}", timestamp);
        return Err(StatusCode::UNAUTHORIZED);
    }

    if !verify_slack_signature(secret, timestamp, &bytes, signature) {
        error!("Invalid Slack request signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let request = Request::from_parts(parts, axum::body::Body::from(bytes));
    Ok(next.run(request).await)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

pub async fn slack_events_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EventResponse>, StatusCode> {
    let payload: SlackEventPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!("Failed to parse Slack event payload: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    // Event replies are at-most-once: the first delivery already ran the
    // handler. Verification challenges are still answered.
    let is_callback = matches!(payload.kind(), PayloadKind::EventCallback(_));
    if let Some(retry) = header_str(&headers, RETRY_NUM_HEADER).filter(|_| is_callback) {
        info!(
            "Acknowledging Slack retry #{} of event {} without reprocessing",
            retry,
            payload.event_id.as_deref().unwrap_or("unknown")
        );
        return Ok(Json(EventResponse::ack()));
    }

    info!(
        "Received Slack payload of type '{}' (event {})",
        payload.payload_type,
        payload.event_id.as_deref().unwrap_or("none")
    );

    let response = handle_event(state.transport.as_ref(), &payload).await;
    Ok(Json(response))
}

pub fn webhook_router(middleware_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/slack/events", post(slack_events_handler))
        .route_layer(middleware::from_fn_with_state(
            middleware_state,
            verify_request_signature,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("v0:{}:", timestamp).as_bytes());
        mac.update(body);
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"type":"url_verification","challenge":"abc"}"#;
        let signature = sign(SECRET, "1531420618", body);
        assert!(verify_slack_signature(SECRET, "1531420618", body, &signature));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign(SECRET, "1531420618", b"original");
        assert!(!verify_slack_signature(SECRET, "1531420618", b"tampered", &signature));
    }

    #[test]
    fn test_wrong_timestamp_rejected() {
        let signature = sign(SECRET, "1531420618", b"body");
        assert!(!verify_slack_signature(SECRET, "1531420619", b"body", &signature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signature = sign("another-secret", "1531420618", b"body");
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", &signature));
    }

    #[test]
    fn test_bad_signature_format_rejected() {
        let signature = sign(SECRET, "1531420618", b"body");
        let without_prefix = signature.trim_start_matches("v0=");
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", without_prefix));
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", "v0=not-hex"));
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", "v1=abcd"));
    }

    #[test]
    fn test_timestamp_freshness() {
        let now = 1_700_000_000;
        assert!(is_fresh_timestamp("1700000000", now));
        assert!(is_fresh_timestamp("1699999800", now));
        assert!(!is_fresh_timestamp("1699999000", now));
        assert!(!is_fresh_timestamp("1700001000", now));
        assert!(!is_fresh_timestamp("yesterday", now));
    }
}
