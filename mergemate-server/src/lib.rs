pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod events;
pub mod webhook;

use std::sync::Arc;

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use mergemate_core::{MessageTransport, RecordSource};

pub use config::Config;
pub use dispatch::handle_event;
pub use events::{EventResponse, SlackEventPayload};

pub struct AppState {
    /// Shared by the dashboard notifier and the event replies.
    pub transport: Arc<dyn MessageTransport>,
    pub records: Arc<dyn RecordSource>,
    pub signing_secret: Option<String>,
    pub notification_channel: String,
    pub dashboard_auth_token: Option<String>,
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "mergemate"
    }))
}

async fn help_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "mergemate",
        "version": mergemate_core::get_version(),
        "description": "Pull request dashboard with Slack reviewer notifications",
        "endpoints": [
            {
                "path": "/health",
                "method": "GET",
                "description": "Health check endpoint",
                "authentication": "None"
            },
            {
                "path": "/slack/events",
                "method": "POST",
                "description": "Slack Events API receiver (url_verification, reaction_added, message)",
                "authentication": "Slack request signature (X-Slack-Signature)"
            },
            {
                "path": "/dashboard",
                "method": "GET",
                "description": "Dashboard HTML page",
                "authentication": "None"
            },
            {
                "path": "/dashboard/api/prs",
                "method": "GET",
                "description": "Pull requests filtered by ?status=all|pending|approved and ?q=<text>",
                "authentication": "Bearer token (DASHBOARD_AUTH_TOKEN)"
            },
            {
                "path": "/dashboard/api/prs/{id}/notify",
                "method": "POST",
                "description": "Send the review request to the channel and each reviewer",
                "authentication": "Bearer token (DASHBOARD_AUTH_TOKEN)"
            },
            {
                "path": "/help",
                "method": "GET",
                "description": "API documentation and service information",
                "authentication": "None"
            }
        ],
        "configuration": {
            "required_env_vars": ["SLACK_BOT_TOKEN"],
            "optional_env_vars": [
                "SLACK_SIGNING_SECRET (default: signature checks disabled)",
                "PORT (default: 3000)",
                "NOTIFICATION_CHANNEL (default: merge-mate-notifications)",
                "SLACK_API_BASE_URL (default: https://slack.com/api)",
                "RECORDS_PATH (default: built-in sample pull requests)",
                "DASHBOARD_AUTH_TOKEN (default: dashboard API disabled)"
            ]
        }
    }))
}

/// All routes, ready to be served.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/help", get(help_handler))
        .merge(webhook::webhook_router(state.clone()))
        .merge(dashboard::dashboard_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
