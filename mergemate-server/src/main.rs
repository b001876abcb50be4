use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use mergemate_core::{JsonFileRecordSource, RecordSource, SlackClient, StaticRecordSource};
use mergemate_server::{app, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting Merge Mate");

    let config =
        Config::from_env().context("Failed to load configuration from environment variables")?;

    let slack_client =
        SlackClient::with_base_url(config.slack_bot_token, config.slack_api_base_url)
            .context("Failed to create Slack client")?;

    let records: Arc<dyn RecordSource> = match &config.records_path {
        Some(path) => {
            info!("Loading pull requests from {}", path.display());
            Arc::new(JsonFileRecordSource::new(path))
        }
        None => {
            info!("RECORDS_PATH not set, serving the built-in sample pull requests");
            Arc::new(StaticRecordSource::sample())
        }
    };

    if config.slack_signing_secret.is_none() {
        warn!("SLACK_SIGNING_SECRET not set; Slack event requests will not be verified");
    }
    if config.dashboard_auth_token.is_none() {
        warn!("DASHBOARD_AUTH_TOKEN not set; the dashboard API is disabled");
    }

    let app_state = Arc::new(AppState {
        transport: Arc::new(slack_client),
        records,
        signing_secret: config.slack_signing_secret,
        notification_channel: config.notification_channel,
        dashboard_auth_token: config.dashboard_auth_token,
    });

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
