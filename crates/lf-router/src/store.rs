//! The channel storage port and its in-memory reference implementation.
//!
//! `lf-db` implements [`ChannelLog`] against Postgres for production
//! sessions; the in-memory implementation here backs unit tests and
//! short-lived local sessions.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use lf_types::{CharacterId, IcSummary, Message};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RouterError;

/// Retention window for channel logs (spec.md §4.2: "at least 24 hours").
pub const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Storage port for channel-scoped message logs (spec.md §4.2, §6.3).
///
/// All methods are keyed by `session_id` since sessions never share state
/// (spec.md §5).
pub trait ChannelLog: Send + Sync {
    /// Append an IC message and its derived summary atomically: both commit
    /// or neither does (spec.md §4.2 failure semantics).
    fn append_ic(
        &self,
        session_id: Uuid,
        message: Message,
        summary: IcSummary,
    ) -> impl Future<Output = Result<(), RouterError>> + Send;

    /// Append an OOC message.
    fn append_ooc(
        &self,
        session_id: Uuid,
        message: Message,
    ) -> impl Future<Output = Result<(), RouterError>> + Send;

    /// Append a P2C message, indexed under its addressed character.
    fn append_p2c(
        &self,
        session_id: Uuid,
        character_id: CharacterId,
        message: Message,
    ) -> impl Future<Output = Result<(), RouterError>> + Send;

    /// The most recent IC messages, oldest first.
    fn recent_ic(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, RouterError>> + Send;

    /// The most recent IC summaries, oldest first.
    fn recent_ic_summaries(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<IcSummary>, RouterError>> + Send;

    /// The most recent OOC messages, oldest first.
    fn recent_ooc(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, RouterError>> + Send;

    /// The most recent P2C messages addressed to `character_id`, oldest first.
    fn recent_p2c_for(
        &self,
        session_id: Uuid,
        character_id: &CharacterId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, RouterError>> + Send;

    /// Purge every channel key and the P2C index for `session_id`.
    fn clear_session(&self, session_id: Uuid) -> impl Future<Output = Result<(), RouterError>> + Send;
}

#[derive(Debug, Default)]
struct SessionLogs {
    ic: Vec<Message>,
    ic_summaries: Vec<IcSummary>,
    ooc: Vec<Message>,
    p2c: HashMap<CharacterId, Vec<Message>>,
}

/// An in-process, retention-trimmed implementation of [`ChannelLog`].
#[derive(Debug, Default)]
pub struct InMemoryChannelLog {
    sessions: RwLock<HashMap<Uuid, SessionLogs>>,
}

impl InMemoryChannelLog {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn trim_retention(messages: &mut Vec<Message>) {
    let cutoff = Utc::now() - chrono::Duration::from_std(RETENTION).unwrap_or_default();
    messages.retain(|m| m.timestamp >= cutoff);
}

fn tail(messages: &[Message], limit: usize) -> Vec<Message> {
    let start = messages.len().saturating_sub(limit);
    messages[start..].to_vec()
}

impl ChannelLog for InMemoryChannelLog {
    async fn append_ic(
        &self,
        session_id: Uuid,
        message: Message,
        summary: IcSummary,
    ) -> Result<(), RouterError> {
        let mut sessions = self.sessions.write().await;
        let logs = sessions.entry(session_id).or_default();
        logs.ic.push(message);
        logs.ic_summaries.push(summary);
        trim_retention(&mut logs.ic);
        Ok(())
    }

    async fn append_ooc(&self, session_id: Uuid, message: Message) -> Result<(), RouterError> {
        let mut sessions = self.sessions.write().await;
        let logs = sessions.entry(session_id).or_default();
        logs.ooc.push(message);
        trim_retention(&mut logs.ooc);
        Ok(())
    }

    async fn append_p2c(
        &self,
        session_id: Uuid,
        character_id: CharacterId,
        message: Message,
    ) -> Result<(), RouterError> {
        let mut sessions = self.sessions.write().await;
        let logs = sessions.entry(session_id).or_default();
        let bucket = logs.p2c.entry(character_id).or_default();
        bucket.push(message);
        trim_retention(bucket);
        Ok(())
    }

    async fn recent_ic(&self, session_id: Uuid, limit: usize) -> Result<Vec<Message>, RouterError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|logs| tail(&logs.ic, limit))
            .unwrap_or_default())
    }

    async fn recent_ic_summaries(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> Result<Vec<IcSummary>, RouterError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|logs| {
                let start = logs.ic_summaries.len().saturating_sub(limit);
                logs.ic_summaries[start..].to_vec()
            })
            .unwrap_or_default())
    }

    async fn recent_ooc(&self, session_id: Uuid, limit: usize) -> Result<Vec<Message>, RouterError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|logs| tail(&logs.ooc, limit))
            .unwrap_or_default())
    }

    async fn recent_p2c_for(
        &self,
        session_id: Uuid,
        character_id: &CharacterId,
        limit: usize,
    ) -> Result<Vec<Message>, RouterError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .and_then(|logs| logs.p2c.get(character_id))
            .map(|bucket| tail(bucket, limit))
            .unwrap_or_default())
    }

    async fn clear_session(&self, session_id: Uuid) -> Result<(), RouterError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&session_id);
        Ok(())
    }
}
