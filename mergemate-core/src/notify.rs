//! Reviewer notifications for a pull request.

use serde::Deserialize;
use tracing::{error, info};

use crate::blocks::review_request_blocks;
use crate::records::PullRequestRecord;
use crate::slack::{MessageTransport, PostMessage, SlackError};

/// The pull request fields a notification carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrNotification {
    pub title: String,
    pub url: String,
    pub author: String,
    pub reviewers: Vec<String>,
}

impl From<&PullRequestRecord> for PrNotification {
    fn from(pr: &PullRequestRecord) -> Self {
        Self {
            title: pr.title.clone(),
            url: pr.url.clone(),
            author: pr.author.clone(),
            reviewers: pr.reviewers.clone(),
        }
    }
}

impl PrNotification {
    /// The message every destination receives for this pull request.
    pub fn message(&self, channel: &str) -> PostMessage {
        PostMessage {
            channel: channel.to_string(),
            text: format!("New PR: {}", self.title),
            blocks: Some(review_request_blocks(
                &self.title,
                &self.url,
                &self.author,
                &self.reviewers,
            )),
            thread_ts: None,
        }
    }
}

/// Where a notification goes. Both fields may be set; neither is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationOptions {
    pub channel: Option<String>,
    /// Individual recipients (user ids or `@handle`s), messaged one at a time.
    pub recipients: Option<Vec<String>>,
}

impl NotificationOptions {
    /// Destinations in delivery order: the channel first, then each recipient.
    pub fn destinations(&self) -> Vec<&str> {
        self.channel
            .as_deref()
            .into_iter()
            .chain(self.recipients.iter().flatten().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to notify {destination} ({delivered} earlier deliveries succeeded)")]
pub struct NotifyError {
    pub destination: String,
    /// Deliveries that had already gone out; they are not rolled back.
    pub delivered: usize,
    #[source]
    pub source: SlackError,
}

/// Send the review request to every destination in `options`.
///
/// Deliveries run sequentially and the first failure aborts the call.
/// Returns the number of messages sent.
pub async fn send_pr_notification(
    transport: &dyn MessageTransport,
    notification: &PrNotification,
    options: &NotificationOptions,
) -> Result<usize, NotifyError> {
    let destinations = options.destinations();
    if destinations.is_empty() {
        info!(
            "No channel or recipients for '{}', nothing to send",
            notification.title
        );
        return Ok(0);
    }

    let template = notification.message("");
    let mut delivered = 0;

    for destination in destinations {
        let message = PostMessage {
            channel: destination.to_string(),
            ..template.clone()
        };

        if let Err(source) = transport.post_message(&message).await {
            error!("Failed to send Slack notification to {}: {}", destination, source);
            return Err(NotifyError {
                destination: destination.to_string(),
                delivered,
                source,
            });
        }
        delivered += 1;
    }

    info!(
        "Sent {} notification(s) for '{}'",
        delivered, notification.title
    );
    Ok(delivered)
}

/// Direct-message handle for a reviewer display name: `"John Doe"` becomes `"@johndoe"`.
pub fn reviewer_handle(display_name: &str) -> String {
    let name: String = display_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    format!("@{}", name)
}
