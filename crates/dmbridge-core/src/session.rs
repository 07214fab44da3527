//! Session and context manager.
//!
//! The state machine the relay-bot dispatcher drives. A session moves
//! `Unlinked -> Linked -> ThreadActive`; selection moves between threads
//! without leaving `ThreadActive`. Every mutation is written through to the
//! store, so a process restart loses no context.

use chrono::Utc;
use dmbridge_types::error::SessionError;
use dmbridge_types::session::{ChatSession, PreferencesPatch};
use tracing::info;

use crate::repository::{SessionRepository, ThreadRepository};

/// Session lifecycle operations over the session and thread stores.
pub struct SessionService<S, T> {
    sessions: S,
    threads: T,
}

impl<S, T> SessionService<S, T>
where
    S: SessionRepository,
    T: ThreadRepository,
{
    pub fn new(sessions: S, threads: T) -> Self {
        Self { sessions, threads }
    }

    /// Fetch the session for a relay user, creating it on first contact.
    /// Idempotent: an existing session is returned untouched.
    pub async fn get_or_create(&self, relay_user_id: i64) -> Result<ChatSession, SessionError> {
        if let Some(session) = self.sessions.find_by_relay_user(relay_user_id).await? {
            return Ok(session);
        }
        let session = ChatSession::new(relay_user_id, Utc::now());
        self.sessions.upsert(&session).await?;
        info!(relay_user_id, "session created");
        Ok(session)
    }

    /// Link (or re-link) the relay user to a source-platform identity.
    ///
    /// Re-linking to a different identity clears the selected thread: the
    /// old selection may reference a thread the new identity is not part of.
    pub async fn link_identity(
        &self,
        relay_user_id: i64,
        source_user_id: String,
    ) -> Result<ChatSession, SessionError> {
        let mut session = self.get_or_create(relay_user_id).await?;

        if session.source_user_id.as_deref() != Some(source_user_id.as_str()) {
            session.current_thread_id = None;
        }
        session.source_user_id = Some(source_user_id);
        self.touch(&mut session);
        self.sessions.upsert(&session).await?;
        info!(relay_user_id, "source identity linked");
        Ok(session)
    }

    /// Select the active thread for message browsing and sending.
    ///
    /// Fails with `ThreadNotFound` when the thread is absent or the linked
    /// identity is not a participant; the stored selection is unchanged in
    /// every failure case.
    pub async fn select_thread(
        &self,
        relay_user_id: i64,
        thread_id: &str,
    ) -> Result<ChatSession, SessionError> {
        let mut session = self
            .sessions
            .find_by_relay_user(relay_user_id)
            .await?
            .ok_or(SessionError::NotFound(relay_user_id))?;

        let source_user_id = session
            .source_user_id
            .clone()
            .ok_or(SessionError::NotLinked(relay_user_id))?;

        let thread = self
            .threads
            .find_by_thread_id(thread_id)
            .await?
            .ok_or_else(|| SessionError::ThreadNotFound(thread_id.to_string()))?;

        if !thread.has_participant(&source_user_id) {
            return Err(SessionError::ThreadNotFound(thread_id.to_string()));
        }

        session.current_thread_id = Some(thread.thread_id);
        self.touch(&mut session);
        self.sessions.upsert(&session).await?;
        Ok(session)
    }

    /// Drop the active thread selection (back to the thread list).
    pub async fn clear_thread(&self, relay_user_id: i64) -> Result<ChatSession, SessionError> {
        let mut session = self
            .sessions
            .find_by_relay_user(relay_user_id)
            .await?
            .ok_or(SessionError::NotFound(relay_user_id))?;
        session.current_thread_id = None;
        self.touch(&mut session);
        self.sessions.upsert(&session).await?;
        Ok(session)
    }

    /// Merge a partial preferences update into the session.
    pub async fn update_preferences(
        &self,
        relay_user_id: i64,
        patch: &PreferencesPatch,
    ) -> Result<ChatSession, SessionError> {
        let mut session = self
            .sessions
            .find_by_relay_user(relay_user_id)
            .await?
            .ok_or(SessionError::NotFound(relay_user_id))?;
        session.preferences.apply(patch);
        self.touch(&mut session);
        self.sessions.upsert(&session).await?;
        Ok(session)
    }

    fn touch(&self, session: &mut ChatSession) {
        let now = Utc::now();
        session.updated_at = now;
        session.last_activity_at = now;
    }
}
