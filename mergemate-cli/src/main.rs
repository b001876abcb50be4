use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use mergemate_core::{
    reviewer_handle, send_pr_notification, visible_records, JsonFileRecordSource,
    NotificationOptions, PrNotification, PullRequestRecord, RecordSource, SlackClient,
    StaticRecordSource, StatusFilter,
};

const DEFAULT_CHANNEL: &str = "merge-mate-notifications";

/// Merge Mate: pull request review notifications over Slack
#[derive(Parser, Debug)]
#[command(name = "mergemate")]
#[command(about = "Browse pull requests and notify their reviewers on Slack", long_about = None)]
struct Cli {
    /// JSON file with the pull request list (defaults to the built-in samples)
    #[arg(long, global = true, env = "RECORDS_PATH")]
    records: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List pull requests, optionally filtered
    List(ListArgs),
    /// Send the review request for a pull request to Slack
    Notify(NotifyArgs),
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Status tab to show: all, pending or approved
    #[arg(long, default_value = "all")]
    status: StatusFilter,

    /// Case-insensitive search over title and author
    #[arg(long, short, default_value = "")]
    query: String,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct NotifyArgs {
    /// Pull request id, e.g. PR-123
    id: String,

    /// Channel to post to
    #[arg(long, env = "NOTIFICATION_CHANNEL", default_value = DEFAULT_CHANNEL)]
    channel: String,

    /// Only post to the channel; do not message reviewers individually
    #[arg(long)]
    no_direct_messages: bool,

    /// Print the message and destinations instead of sending
    #[arg(long)]
    dry_run: bool,
}

fn record_source(path: Option<PathBuf>) -> Arc<dyn RecordSource> {
    match path {
        Some(path) => Arc::new(JsonFileRecordSource::new(path)),
        None => Arc::new(StaticRecordSource::sample()),
    }
}

async fn list(source: &dyn RecordSource, args: ListArgs) -> Result<()> {
    let records = source.records().await?;
    let visible = visible_records(&records, args.status, &args.query);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    if visible.is_empty() {
        println!("No pull requests match.");
        return Ok(());
    }

    for pr in &visible {
        print!("{}", format_record(pr));
    }
    Ok(())
}

fn format_record(pr: &PullRequestRecord) -> String {
    let mut out = format!("{:<8} {:<9} {} ({})\n", pr.id, pr.status, pr.title, pr.author);
    if !pr.description.is_empty() {
        out.push_str(&format!("         {}\n", pr.description));
    }
    out.push_str(&format!(
        "         created {} | reviewers: {}\n",
        pr.created,
        pr.reviewers.join(", ")
    ));
    out.push_str(&format!("         {}\n", pr.url));
    out
}

async fn notify(source: &dyn RecordSource, args: NotifyArgs) -> Result<()> {
    let record = source
        .find(&args.id)
        .await?
        .ok_or_else(|| anyhow!("No pull request with id {}", args.id))?;

    let recipients = if args.no_direct_messages {
        None
    } else {
        Some(record.reviewers.iter().map(|name| reviewer_handle(name)).collect())
    };
    let options = NotificationOptions {
        channel: Some(args.channel),
        recipients,
    };
    let notification = PrNotification::from(&record);

    if args.dry_run {
        println!("Destinations: {}", options.destinations().join(", "));
        println!(
            "{}",
            serde_json::to_string_pretty(&notification.message("<destination>"))?
        );
        return Ok(());
    }

    // Only the sending path needs the token
    let client = SlackClient::from_env().context("Cannot send notifications")?;

    let sent = send_pr_notification(&client, &notification, &options)
        .await
        .context("Failed to send notifications")?;
    println!("Notifications sent successfully! ({} messages)", sent);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = Cli::parse();
    let source = record_source(cli.records);

    match cli.command {
        Commands::List(args) => list(source.as_ref(), args).await,
        Commands::Notify(args) => notify(source.as_ref(), args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["mergemate", "list"]).unwrap();
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.status, StatusFilter::All);
                assert_eq!(args.query, "");
                assert!(!args.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_status_is_case_insensitive() {
        let cli = Cli::try_parse_from(["mergemate", "list", "--status", "Pending"]).unwrap();
        match cli.command {
            Commands::List(args) => assert_eq!(args.status, StatusFilter::Pending),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["mergemate", "list", "--status", "merged"]).is_err());
    }

    #[test]
    fn test_notify_flags() {
        let cli = Cli::try_parse_from([
            "mergemate",
            "notify",
            "PR-123",
            "--channel",
            "reviews",
            "--no-direct-messages",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Notify(args) => {
                assert_eq!(args.id, "PR-123");
                assert_eq!(args.channel, "reviews");
                assert!(args.no_direct_messages);
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_format_record_shows_description() {
        let records = StaticRecordSource::sample().records().await.unwrap();
        let card = format_record(&records[0]);

        assert!(card.starts_with("PR-123   pending   Feature: Add notification system (Sarah Chen)"));
        assert!(card.contains("Implemented real-time notification system for PR updates"));
        assert!(card.contains("reviewers: John Doe, Jane Smith"));
    }

    #[test]
    fn test_format_record_skips_empty_description() {
        let pr = PullRequestRecord {
            id: "PR-1".to_string(),
            title: "t".to_string(),
            author: "a".to_string(),
            created: "2024-03-15".to_string(),
            status: mergemate_core::PrStatus::Approved,
            reviewers: Vec::new(),
            description: String::new(),
            url: "https://example.com/pull/1".to_string(),
        };
        assert_eq!(format_record(&pr).lines().count(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_token() {
        let source = StaticRecordSource::sample();
        let args = NotifyArgs {
            id: "PR-123".to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            no_direct_messages: false,
            dry_run: true,
        };
        assert!(notify(&source, args).await.is_ok());
    }

    #[tokio::test]
    async fn test_notify_unknown_pr() {
        let source = StaticRecordSource::sample();
        let args = NotifyArgs {
            id: "PR-999".to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            no_direct_messages: false,
            dry_run: true,
        };
        let err = notify(&source, args).await.unwrap_err();
        assert!(err.to_string().contains("PR-999"));
    }
}
