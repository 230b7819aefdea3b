//! Postgres-backed [`ChannelLog`].
//!
//! Each published message becomes one row in `channel_messages`; IC rows
//! additionally carry their derived `ic_summary` so `recent_ic_summaries`
//! never needs to re-derive it. Reads and retention enforcement both filter
//! on `published_at`, matching the in-memory reference implementation's
//! 24-hour window (spec.md §4.2).

use chrono::{DateTime, Utc};
use lf_router::store::{ChannelLog, RETENTION};
use lf_router::RouterError;
use lf_types::{CharacterId, IcSummary, Message};
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

/// A [`ChannelLog`] implementation backed by a Postgres connection pool.
pub struct PostgresChannelLog {
    pool: PgPool,
}

impl PostgresChannelLog {
    /// Wrap a connection pool as a channel log.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn retention_cutoff() -> DateTime<Utc> {
    Utc::now() - chrono::Duration::from_std(RETENTION).unwrap_or_default()
}

fn to_router_error(context: &str, err: sqlx::Error) -> RouterError {
    RouterError::Permission(format!("{context}: {err}"))
}

impl ChannelLog for PostgresChannelLog {
    async fn append_ic(
        &self,
        session_id: Uuid,
        message: Message,
        summary: IcSummary,
    ) -> Result<(), RouterError> {
        let message_json = serde_json::to_value(&message)
            .map_err(|err| RouterError::Permission(format!("message does not serialize: {err}")))?;
        let summary_json = serde_json::to_value(&summary)
            .map_err(|err| RouterError::Permission(format!("summary does not serialize: {err}")))?;

        sqlx::query(
            r"
            INSERT INTO channel_messages
                (message_id, session_id, channel, p2c_character_id, message, ic_summary, published_at)
            VALUES ($1, $2, 'ic', NULL, $3, $4, $5)
            ",
        )
        .bind(message.message_id.into_inner())
        .bind(session_id)
        .bind(&message_json)
        .bind(&summary_json)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|err| to_router_error("append_ic", err))?;

        Ok(())
    }

    async fn append_ooc(&self, session_id: Uuid, message: Message) -> Result<(), RouterError> {
        let message_json = serde_json::to_value(&message)
            .map_err(|err| RouterError::Permission(format!("message does not serialize: {err}")))?;

        sqlx::query(
            r"
            INSERT INTO channel_messages
                (message_id, session_id, channel, p2c_character_id, message, ic_summary, published_at)
            VALUES ($1, $2, 'ooc', NULL, $3, NULL, $4)
            ",
        )
        .bind(message.message_id.into_inner())
        .bind(session_id)
        .bind(&message_json)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|err| to_router_error("append_ooc", err))?;

        Ok(())
    }

    async fn append_p2c(
        &self,
        session_id: Uuid,
        character_id: CharacterId,
        message: Message,
    ) -> Result<(), RouterError> {
        let message_json = serde_json::to_value(&message)
            .map_err(|err| RouterError::Permission(format!("message does not serialize: {err}")))?;

        sqlx::query(
            r"
            INSERT INTO channel_messages
                (message_id, session_id, channel, p2c_character_id, message, ic_summary, published_at)
            VALUES ($1, $2, 'p2c', $3, $4, NULL, $5)
            ",
        )
        .bind(message.message_id.into_inner())
        .bind(session_id)
        .bind(character_id.as_str())
        .bind(&message_json)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|err| to_router_error("append_p2c", err))?;

        Ok(())
    }

    async fn recent_ic(&self, session_id: Uuid, limit: usize) -> Result<Vec<Message>, RouterError> {
        self.recent_messages(session_id, "ic", None, limit).await
    }

    async fn recent_ic_summaries(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> Result<Vec<IcSummary>, RouterError> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"
            SELECT ic_summary FROM (
                SELECT ic_summary, published_at
                FROM channel_messages
                WHERE session_id = $1 AND channel = 'ic' AND published_at >= $2
                ORDER BY published_at DESC
                LIMIT $3
            ) recent
            ORDER BY published_at ASC
            ",
        )
        .bind(session_id)
        .bind(retention_cutoff())
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| to_router_error("recent_ic_summaries", err))?;

        rows.into_iter()
            .map(|row| {
                let summary_json: serde_json::Value = row
                    .try_get("ic_summary")
                    .map_err(|err| to_router_error("recent_ic_summaries", err))?;
                serde_json::from_value(summary_json).map_err(|err| {
                    RouterError::Permission(format!("stored ic summary is malformed: {err}"))
                })
            })
            .collect()
    }

    async fn recent_ooc(&self, session_id: Uuid, limit: usize) -> Result<Vec<Message>, RouterError> {
        self.recent_messages(session_id, "ooc", None, limit).await
    }

    async fn recent_p2c_for(
        &self,
        session_id: Uuid,
        character_id: &CharacterId,
        limit: usize,
    ) -> Result<Vec<Message>, RouterError> {
        self.recent_messages(session_id, "p2c", Some(character_id.as_str()), limit)
            .await
    }

    async fn clear_session(&self, session_id: Uuid) -> Result<(), RouterError> {
        sqlx::query("DELETE FROM channel_messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|err| to_router_error("clear_session", err))?;
        Ok(())
    }
}

impl PostgresChannelLog {
    async fn recent_messages(
        &self,
        session_id: Uuid,
        channel: &str,
        p2c_character_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>, RouterError> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"
            SELECT message FROM (
                SELECT message, published_at
                FROM channel_messages
                WHERE session_id = $1
                  AND channel = $2
                  AND published_at >= $3
                  AND ($4::TEXT IS NULL OR p2c_character_id = $4)
                ORDER BY published_at DESC
                LIMIT $5
            ) recent
            ORDER BY published_at ASC
            ",
        )
        .bind(session_id)
        .bind(channel)
        .bind(retention_cutoff())
        .bind(p2c_character_id)
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| to_router_error("recent_messages", err))?;

        rows.into_iter()
            .map(|row| {
                let message_json: serde_json::Value = row
                    .try_get("message")
                    .map_err(|err| to_router_error("recent_messages", err))?;
                serde_json::from_value(message_json).map_err(|err| {
                    RouterError::Permission(format!("stored message is malformed: {err}"))
                })
            })
            .collect()
    }
}
