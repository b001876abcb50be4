//! HTTP handlers for the dashboard API.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use mergemate_core::{
    reviewer_handle, send_pr_notification, visible_records, NotificationOptions, PrNotification,
    PullRequestRecord, StatusFilter,
};

use crate::AppState;

pub const NOTIFY_SUCCESS_MESSAGE: &str = "Notifications sent successfully!";
pub const NOTIFY_FAILURE_MESSAGE: &str = "Failed to send notifications. Please try again.";

/// Query string of the PR list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PrsQuery {
    /// Status tab: all, pending or approved.
    #[serde(default)]
    pub status: Option<String>,
    /// Free-text search over title and author.
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrsApiResponse {
    pub version: String,
    pub status: StatusFilter,
    pub query: String,
    pub prs: Vec<PullRequestRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyApiResponse {
    pub ok: bool,
    pub message: String,
    pub deliveries: usize,
}

/// Validate the authorization header against the dashboard auth token.
///
/// Returns `Ok(())` if authorized, or an error response if not.
#[allow(clippy::result_large_err)] // Response is large but this is idiomatic in Axum handlers
fn validate_auth(headers: &HeaderMap, auth_token: &Option<String>) -> Result<(), Response> {
    let Some(expected_token) = auth_token else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Dashboard API is disabled (DASHBOARD_AUTH_TOKEN not configured)",
        )
            .into_response());
    };

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header.map(|value| value.strip_prefix("Bearer ")) {
        Some(Some(provided_token)) if provided_token == expected_token => Ok(()),
        Some(Some(_)) => Err((StatusCode::UNAUTHORIZED, "Invalid token").into_response()),
        Some(None) => Err((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format. Expected: Bearer <token>",
        )
            .into_response()),
        None => Err((
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header. Expected: Bearer <token>",
        )
            .into_response()),
    }
}

/// Handler: GET /dashboard
///
/// The page itself holds no data; its script asks for the token before
/// calling the API.
pub async fn get_dashboard_html() -> impl IntoResponse {
    Html(include_str!("dashboard.html"))
}

/// Handler: GET /dashboard/api/prs?status=&q=
pub async fn get_prs_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<PrsQuery>,
) -> Result<Json<PrsApiResponse>, Response> {
    validate_auth(&headers, &state.dashboard_auth_token)?;

    let status = match params.status.as_deref() {
        Some(raw) if !raw.is_empty() => raw
            .parse::<StatusFilter>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?,
        _ => StatusFilter::All,
    };
    let query = params.q.unwrap_or_default();

    let records = state.records.records().await.map_err(|e| {
        tracing::error!("Failed to load pull requests: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load pull requests",
        )
            .into_response()
    })?;

    Ok(Json(PrsApiResponse {
        version: mergemate_core::get_version(),
        status,
        prs: visible_records(&records, status, &query),
        query,
    }))
}

/// Handler: POST /dashboard/api/prs/{id}/notify
///
/// Sends the review request to the notification channel and to each reviewer.
pub async fn notify_reviewers_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<NotifyApiResponse>, Response> {
    validate_auth(&headers, &state.dashboard_auth_token)?;

    let record = state
        .records
        .find(&id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load pull request {}: {:#}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load pull requests",
            )
                .into_response()
        })?
        .ok_or_else(|| {
            (StatusCode::NOT_FOUND, format!("Unknown pull request {}", id)).into_response()
        })?;

    let options = options_for(&record, &state.notification_channel);

    match send_pr_notification(
        state.transport.as_ref(),
        &PrNotification::from(&record),
        &options,
    )
    .await
    {
        Ok(deliveries) => Ok(Json(NotifyApiResponse {
            ok: true,
            message: NOTIFY_SUCCESS_MESSAGE.to_string(),
            deliveries,
        })),
        Err(e) => {
            tracing::error!("Failed to send notifications for {}: {}", id, e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(NotifyApiResponse {
                    ok: false,
                    message: NOTIFY_FAILURE_MESSAGE.to_string(),
                    deliveries: e.delivered,
                }),
            )
                .into_response())
        }
    }
}

/// The channel plus a direct message to every reviewer of `record`.
fn options_for(record: &PullRequestRecord, channel: &str) -> NotificationOptions {
    NotificationOptions {
        channel: Some(channel.to_string()),
        recipients: Some(
            record
                .reviewers
                .iter()
                .map(|name| reviewer_handle(name))
                .collect(),
        ),
    }
}
