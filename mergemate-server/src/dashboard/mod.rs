//! Pull request dashboard.
//!
//! This module provides:
//! - A JSON API listing pull requests, filtered by status tab and search text
//! - An endpoint that sends the review request for one pull request
//! - The embedded HTML page that drives both

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn dashboard_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard_html))
        .route("/dashboard/api/prs", get(handlers::get_prs_api))
        .route(
            "/dashboard/api/prs/{id}/notify",
            post(handlers::notify_reviewers_api),
        )
}
