//! Routing of inbound Slack events to their reply handlers.
//!
//! Every call acknowledges. Slack retries deliveries that are not answered
//! quickly with a 2xx, so a failed reply is logged and otherwise dropped.

use tracing::{debug, error, info};

use mergemate_core::{MessageTransport, PostMessage};

use crate::events::{EventKind, EventResponse, PayloadKind, SlackEvent, SlackEventPayload};

pub async fn handle_event(
    transport: &dyn MessageTransport,
    payload: &SlackEventPayload,
) -> EventResponse {
    match payload.kind() {
        PayloadKind::UrlVerification { challenge } => {
            info!("Answering Slack URL verification challenge");
            EventResponse::Challenge {
                challenge: challenge.unwrap_or_default().to_string(),
            }
        }
        PayloadKind::EventCallback(EventKind::ReactionAdded(event)) => {
            handle_reaction_event(transport, event).await;
            EventResponse::ack()
        }
        PayloadKind::EventCallback(EventKind::Message(event)) => {
            handle_message_event(transport, event).await;
            EventResponse::ack()
        }
        PayloadKind::EventCallback(EventKind::Unhandled(event_type)) => {
            debug!("No handler for Slack event type '{}'", event_type);
            EventResponse::ack()
        }
        PayloadKind::Other => {
            debug!("Ignoring Slack payload of type '{}'", payload.payload_type);
            EventResponse::ack()
        }
    }
}

async fn handle_reaction_event(transport: &dyn MessageTransport, event: &SlackEvent) {
    let item = event.item.as_ref();
    let (Some(reaction), Some(channel)) = (
        event.reaction.as_deref(),
        item.and_then(|i| i.channel.as_deref()),
    ) else {
        debug!("Skipping reaction_added event without reaction or item channel");
        return;
    };

    let user = event.user.as_deref().unwrap_or("unknown");
    let message = PostMessage::text(
        channel,
        format!("Reaction {} was added by <@{}>", reaction, user),
    )
    .in_thread(item.and_then(|i| i.ts.clone()));

    if let Err(e) = transport.post_message(&message).await {
        error!("Error handling reaction event: {}", e);
    }
}

async fn handle_message_event(transport: &dyn MessageTransport, event: &SlackEvent) {
    if event.is_from_bot() {
        debug!("Skipping message event posted by a bot");
        return;
    }

    let (Some(channel), Some(text)) = (event.channel.as_deref(), event.text.as_deref()) else {
        debug!("Skipping message event without channel or text");
        return;
    };

    let message = PostMessage::text(channel, format!("Received: {}", text))
        .in_thread(event.event_ts.clone().or_else(|| event.ts.clone()));

    if let Err(e) = transport.post_message(&message).await {
        error!("Error handling message event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ReactionItem;
    use mergemate_core::test_utils::RecordingTransport;

    fn callback(event: SlackEvent) -> SlackEventPayload {
        SlackEventPayload {
            payload_type: "event_callback".to_string(),
            event: Some(event),
            ..Default::default()
        }
    }

    fn reaction_event(channel: Option<&str>) -> SlackEvent {
        SlackEvent {
            event_type: "reaction_added".to_string(),
            user: Some("U123".to_string()),
            reaction: Some("eyes".to_string()),
            item: Some(ReactionItem {
                item_type: Some("message".to_string()),
                channel: channel.map(str::to_string),
                ts: Some("1700000000.000100".to_string()),
            }),
            ..Default::default()
        }
    }

    fn message_event(channel: &str, text: &str) -> SlackEvent {
        SlackEvent {
            event_type: "message".to_string(),
            user: Some("U456".to_string()),
            channel: Some(channel.to_string()),
            text: Some(text.to_string()),
            ts: Some("1700000001.000200".to_string()),
            event_ts: Some("1700000001.000200".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_url_verification_echoes_challenge() {
        let transport = RecordingTransport::new();
        let payload = SlackEventPayload {
            payload_type: "url_verification".to_string(),
            challenge: Some("abc".to_string()),
            ..Default::default()
        };

        let response = handle_event(&transport, &payload).await;
        assert_eq!(
            response,
            EventResponse::Challenge {
                challenge: "abc".to_string()
            }
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reaction_reply_is_threaded_on_target_message() {
        let transport = RecordingTransport::new();
        let response = handle_event(&transport, &callback(reaction_event(Some("C1")))).await;

        assert_eq!(response, EventResponse::ack());
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].channel, "C1");
        assert_eq!(calls[0].text, "Reaction eyes was added by <@U123>");
        assert_eq!(calls[0].thread_ts.as_deref(), Some("1700000000.000100"));
    }

    #[tokio::test]
    async fn test_reaction_without_item_channel_is_skipped() {
        let transport = RecordingTransport::new();
        let response = handle_event(&transport, &callback(reaction_event(None))).await;

        assert_eq!(response, EventResponse::ack());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reaction_without_reaction_is_skipped() {
        let transport = RecordingTransport::new();
        let mut event = reaction_event(Some("C1"));
        event.reaction = None;

        handle_event(&transport, &callback(event)).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_message_is_echoed_in_thread() {
        let transport = RecordingTransport::new();
        let response =
            handle_event(&transport, &callback(message_event("C2", "hello there"))).await;

        assert_eq!(response, EventResponse::ack());
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].channel, "C2");
        assert_eq!(calls[0].text, "Received: hello there");
        assert_eq!(calls[0].thread_ts.as_deref(), Some("1700000001.000200"));
    }

    #[tokio::test]
    async fn test_message_without_text_is_skipped() {
        let transport = RecordingTransport::new();
        let mut event = message_event("C2", "x");
        event.text = None;

        handle_event(&transport, &callback(event)).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bot_message_is_not_echoed() {
        let transport = RecordingTransport::new();
        let mut event = message_event("C2", "Received: hello");
        event.bot_id = Some("B999".to_string());

        handle_event(&transport, &callback(event)).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_still_acknowledges() {
        let transport = RecordingTransport::failing_for(["C2"]);
        let response = handle_event(&transport, &callback(message_event("C2", "hi"))).await;

        assert_eq!(response, EventResponse::ack());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unhandled_event_is_acknowledged() {
        let transport = RecordingTransport::new();
        let event = SlackEvent {
            event_type: "app_mention".to_string(),
            channel: Some("C3".to_string()),
            text: Some("hi".to_string()),
            ..Default::default()
        };

        let response = handle_event(&transport, &callback(event)).await;
        assert_eq!(response, EventResponse::ack());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_payload_without_event_is_acknowledged() {
        let transport = RecordingTransport::new();
        let payload = SlackEventPayload {
            payload_type: "event_callback".to_string(),
            ..Default::default()
        };

        assert_eq!(handle_event(&transport, &payload).await, EventResponse::ack());
        assert!(transport.calls().is_empty());
    }
}
