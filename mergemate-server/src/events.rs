//! Slack Events API payloads.
//!
//! The wire format is a loose JSON object; [`SlackEventPayload::kind`] turns it
//! into a typed view the dispatcher can match on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEventPayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "type")]
    pub payload_type: String,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event: Option<SlackEvent>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_time: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub reaction: Option<String>,
    #[serde(default)]
    pub item: Option<ReactionItem>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub event_ts: Option<String>,
    /// Set on messages posted by bots, including our own replies.
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

/// The message a reaction was added to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionItem {
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

/// What a payload asks us to do.
#[derive(Debug, Clone, Copy)]
pub enum PayloadKind<'a> {
    UrlVerification { challenge: Option<&'a str> },
    EventCallback(EventKind<'a>),
    Other,
}

#[derive(Debug, Clone, Copy)]
pub enum EventKind<'a> {
    ReactionAdded(&'a SlackEvent),
    Message(&'a SlackEvent),
    Unhandled(&'a str),
}

impl SlackEventPayload {
    pub fn kind(&self) -> PayloadKind<'_> {
        if self.payload_type == "url_verification" {
            return PayloadKind::UrlVerification {
                challenge: self.challenge.as_deref(),
            };
        }

        match &self.event {
            Some(event) => PayloadKind::EventCallback(match event.event_type.as_str() {
                "reaction_added" => EventKind::ReactionAdded(event),
                "message" => EventKind::Message(event),
                other => EventKind::Unhandled(other),
            }),
            None => PayloadKind::Other,
        }
    }
}

impl SlackEvent {
    pub fn is_from_bot(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message")
    }
}

/// Body returned to Slack for every event delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventResponse {
    Challenge { challenge: String },
    Ack { ok: bool },
}

impl EventResponse {
    pub fn ack() -> Self {
        EventResponse::Ack { ok: true }
    }
}
