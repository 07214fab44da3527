//! Source-platform direct messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Kind of a source-platform message item.
///
/// Maps to the CHECK-free `kind` TEXT column; unknown item types from the
/// source platform normalize to `Unknown` rather than failing ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    File,
    Sticker,
    Reaction,
    StoryReply,
    Unknown,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::File => "file",
            MessageKind::Sticker => "sticker",
            MessageKind::Reaction => "reaction",
            MessageKind::StoryReply => "story_reply",
            MessageKind::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "video" => Ok(MessageKind::Video),
            "audio" => Ok(MessageKind::Audio),
            "file" => Ok(MessageKind::File),
            "sticker" => Ok(MessageKind::Sticker),
            "reaction" => Ok(MessageKind::Reaction),
            "story_reply" => Ok(MessageKind::StoryReply),
            "unknown" => Ok(MessageKind::Unknown),
            other => Err(format!("invalid message kind: '{other}'")),
        }
    }
}

/// A direct message mirrored from the source platform.
///
/// Immutable once stored: edits and deletions on the source platform do not
/// mutate the stored row. `sent_at` is the source-platform send time and is
/// what sync cursors are computed from; `created_at` is the ingest time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub thread_id: String,
    pub sender_id: String,
    pub kind: MessageKind,
    pub text: String,
    pub media_urls: Vec<String>,
    /// Message id this one replies to, when the source platform exposes it.
    pub reply_to: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
