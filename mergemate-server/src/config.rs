use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use mergemate_core::slack::require_bot_token;
use mergemate_core::DEFAULT_SLACK_API_BASE;

pub const DEFAULT_NOTIFICATION_CHANNEL: &str = "merge-mate-notifications";

#[derive(Clone)]
pub struct Config {
    pub slack_bot_token: String,
    /// Signing secret from the Slack app's "Basic Information" page.
    /// If unset, inbound requests are not signature-checked.
    pub slack_signing_secret: Option<String>,
    pub slack_api_base_url: String,
    /// Channel that receives every review request from the dashboard.
    pub notification_channel: String,
    pub port: u16,
    /// JSON file with the pull request list. The built-in sample list is used if unset.
    pub records_path: Option<PathBuf>,
    /// Bearer token for the dashboard API.
    /// If not set, the dashboard API is disabled (returns 503).
    pub dashboard_auth_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let slack_bot_token = require_bot_token(env::var("SLACK_BOT_TOKEN").ok())
            .context("Slack bot token is required to start the server")?;

        let slack_signing_secret = parse_optional_secret(env::var("SLACK_SIGNING_SECRET").ok());

        let slack_api_base_url = env::var("SLACK_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SLACK_API_BASE.to_string());

        let notification_channel = env::var("NOTIFICATION_CHANNEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NOTIFICATION_CHANNEL.to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let records_path = env::var("RECORDS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let dashboard_auth_token = parse_optional_secret(env::var("DASHBOARD_AUTH_TOKEN").ok());

        Ok(Config {
            slack_bot_token,
            slack_signing_secret,
            slack_api_base_url,
            notification_channel,
            port,
            records_path,
            dashboard_auth_token,
        })
    }
}

/// Parse an optional secret such as DASHBOARD_AUTH_TOKEN or SLACK_SIGNING_SECRET.
///
/// Returns None if the value is missing, empty, or contains only whitespace,
/// so an empty token can never match an empty Authorization header.
pub fn parse_optional_secret(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
