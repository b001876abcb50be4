//! In-memory transport for exercising notification and event code without Slack.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::slack::{MessageTransport, PostMessage, SlackError};

/// Records every attempted delivery, in order.
///
/// Deliveries to a destination listed in `failing` are recorded and then
/// rejected with `SlackError::Api("channel_not_found")`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<PostMessage>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: destinations.into_iter().map(Into::into).collect(),
        }
    }

    /// Snapshot of the attempted deliveries.
    pub fn calls(&self) -> Vec<PostMessage> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn post_message(&self, message: &PostMessage) -> Result<(), SlackError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(message.clone());
        }
        if self.failing.contains(&message.channel) {
            return Err(SlackError::Api("channel_not_found".to_string()));
        }
        Ok(())
    }
}
