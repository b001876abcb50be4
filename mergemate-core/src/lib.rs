pub mod blocks;
pub mod notify;
pub mod records;
pub mod slack;
pub mod test_utils;

pub use blocks::{MessageBlock, TextObject};
pub use notify::{
    reviewer_handle, send_pr_notification, NotificationOptions, NotifyError, PrNotification,
};
pub use records::{
    visible_records, JsonFileRecordSource, PrStatus, PullRequestRecord, RecordSource,
    StaticRecordSource, StatusFilter,
};
pub use slack::{MessageTransport, PostMessage, SlackClient, SlackError, DEFAULT_SLACK_API_BASE};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Short git hash of the running build, or "unknown".
pub fn get_version() -> String {
    let hash = option_env!("MERGEMATE_GIT_HASH").or(built_info::GIT_COMMIT_HASH);
    match hash {
        Some(hash) if hash.len() >= 8 => hash[..8].to_string(),
        Some(hash) => hash.to_string(),
        None => "unknown".to_string(),
    }
}
