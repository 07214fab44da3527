//! Normalization of loose fetched records into the fixed domain shapes.
//!
//! This is the validation boundary: anything malformed is rejected here with
//! a reason, recorded by the pipeline as a `Validation` error entry, and
//! never reaches the store.

use chrono::{DateTime, Utc};
use dmbridge_types::message::{Message, MessageKind};
use dmbridge_types::thread::Thread;
use dmbridge_types::user::SourceUser;

use crate::source::{FetchedMessage, FetchedThread, FetchedUser};

/// Rejection of one fetched record.
#[derive(Debug, Clone)]
pub struct ValidationRejection {
    /// Source-side id when the record carried one.
    pub item_id: Option<String>,
    pub reason: String,
}

impl ValidationRejection {
    fn new(item_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            item_id,
            reason: reason.into(),
        }
    }
}

/// Normalize a fetched thread and the participant profiles embedded in it.
///
/// Requires a thread id and at least two resolvable participants. Users
/// missing an id or username are dropped from the profile list but do not
/// fail the thread, as long as enough participants remain.
pub fn normalize_thread(
    fetched: &FetchedThread,
    now: DateTime<Utc>,
) -> Result<(Thread, Vec<SourceUser>), ValidationRejection> {
    let thread_id = match fetched.thread_id.as_deref() {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => return Err(ValidationRejection::new(None, "thread without id")),
    };

    let users: Vec<SourceUser> = fetched
        .users
        .iter()
        .filter_map(|u| normalize_user(u, now))
        .collect();

    let participants: Vec<String> = users.iter().map(|u| u.user_id.clone()).collect();
    if participants.len() < 2 {
        return Err(ValidationRejection::new(
            Some(thread_id),
            "thread with fewer than two resolvable participants",
        ));
    }

    let thread = Thread {
        thread_id,
        participants,
        title: fetched.title.clone().filter(|t| !t.trim().is_empty()),
        is_group: fetched.is_group.unwrap_or(false),
        last_activity_at: fetched.last_activity_at,
        created_at: now,
        updated_at: now,
    };

    Ok((thread, users))
}

fn normalize_user(fetched: &FetchedUser, now: DateTime<Utc>) -> Option<SourceUser> {
    let user_id = fetched.user_id.as_deref()?.trim();
    let username = fetched.username.as_deref()?.trim();
    if user_id.is_empty() || username.is_empty() {
        return None;
    }
    Some(SourceUser {
        user_id: user_id.to_string(),
        username: username.to_lowercase(),
        full_name: fetched.full_name.clone(),
        avatar_url: fetched.avatar_url.clone(),
        followers: fetched.followers,
        following: fetched.following,
        is_verified: fetched.is_verified.unwrap_or(false),
        is_private: fetched.is_private.unwrap_or(false),
        created_at: now,
        updated_at: now,
    })
}

/// Normalize a fetched message.
///
/// Requires message id, thread id, sender id, and a send timestamp. An
/// unrecognized item type becomes `Unknown` rather than a rejection; a text
/// message with neither text nor media is rejected.
pub fn normalize_message(
    fetched: &FetchedMessage,
    now: DateTime<Utc>,
) -> Result<Message, ValidationRejection> {
    let message_id = require(fetched.message_id.as_deref(), &fetched.message_id, "message without id")?;
    let thread_id = require(fetched.thread_id.as_deref(), &fetched.message_id, "message without thread id")?;
    let sender_id = require(fetched.sender_id.as_deref(), &fetched.message_id, "message without sender")?;

    let sent_at = fetched.sent_at.ok_or_else(|| {
        ValidationRejection::new(fetched.message_id.clone(), "message without send timestamp")
    })?;

    let kind = fetched
        .kind
        .as_deref()
        .and_then(|k| k.parse::<MessageKind>().ok())
        .unwrap_or(MessageKind::Unknown);

    let text = fetched.text.clone().unwrap_or_default();
    if kind == MessageKind::Text && text.trim().is_empty() && fetched.media_urls.is_empty() {
        return Err(ValidationRejection::new(
            fetched.message_id.clone(),
            "text message with empty content",
        ));
    }

    Ok(Message {
        message_id,
        thread_id,
        sender_id,
        kind,
        text,
        media_urls: fetched.media_urls.clone(),
        reply_to: fetched.reply_to.clone(),
        sent_at,
        created_at: now,
    })
}

fn require(
    value: Option<&str>,
    item_id: &Option<String>,
    reason: &str,
) -> Result<String, ValidationRejection> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ValidationRejection::new(item_id.clone(), reason)),
    }
}
