//! The subset of Slack's Block Kit used by Merge Mate messages.

use serde::{Deserialize, Serialize};

/// Header label on every review request.
pub const REVIEW_HEADER: &str = "🔍 New Pull Request Ready for Review";

/// Label of the button linking to the pull request.
pub const VIEW_BUTTON_LABEL: &str = "View Pull Request";

/// A text composition object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    PlainText {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emoji: Option<bool>,
    },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        TextObject::PlainText {
            text: text.into(),
            emoji: Some(true),
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        TextObject::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            TextObject::PlainText { text, .. } | TextObject::Mrkdwn { text } => text,
        }
    }
}

/// Interactive element inside an `actions` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button {
        text: TextObject,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
}

/// One layout block of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBlock {
    Header { text: TextObject },
    Section { fields: Vec<TextObject> },
    Actions { elements: Vec<BlockElement> },
}

/// Blocks announcing a pull request that is ready for review.
pub fn review_request_blocks(
    title: &str,
    url: &str,
    author: &str,
    reviewers: &[String],
) -> Vec<MessageBlock> {
    vec![
        MessageBlock::Header {
            text: TextObject::plain(REVIEW_HEADER),
        },
        MessageBlock::Section {
            fields: vec![
                TextObject::mrkdwn(format!("*Title:*\n{}", title)),
                TextObject::mrkdwn(format!("*Author:*\n{}", author)),
            ],
        },
        MessageBlock::Section {
            fields: vec![TextObject::mrkdwn(format!(
                "*Reviewers:*\n{}",
                reviewers.join(", ")
            ))],
        },
        MessageBlock::Actions {
            elements: vec![BlockElement::Button {
                text: TextObject::plain(VIEW_BUTTON_LABEL),
                url: url.to_string(),
                style: Some("primary".to_string()),
            }],
        },
    ]
}
