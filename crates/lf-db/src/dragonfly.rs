//! `Dragonfly` (Redis-compatible) hot-path cache.
//!
//! Every session's state is durable in Postgres; `Dragonfly` only mirrors
//! the pieces a running session needs on every phase without paying a
//! Postgres round trip -- the current `GameState` for fast resume, whether
//! the turn is parked (and at which phase), and the set of P2C channels with
//! at least one publish, which the router must maintain explicitly rather
//! than discover by scanning (spec.md §4.2).
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `session:{id}:state` | JSON | Latest in-flight `GameState` |
//! | `session:{id}:parked` | JSON | The `Phase` the session is parked at, if any |
//! | `session:{id}:p2c:active` | Set | Character ids with at least one P2C publish |

use fred::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DbError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] if the key does not exist.
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value.map_or_else(
            || Err(DbError::KeyNotFound(key.to_owned())),
            |s| Ok(serde_json::from_str(&s)?),
        )
    }

    /// Delete a key from `Dragonfly`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    // =========================================================================
    // Session hot state -- session:{id}:state
    // =========================================================================

    /// Mirror a session's latest `GameState` for fast resume without a
    /// checkpoint-store round trip.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn set_session_state<T: Serialize>(
        &self,
        session_id: Uuid,
        state: &T,
    ) -> Result<(), DbError> {
        self.set_json(&session_state_key(session_id), state).await
    }

    /// Fetch a session's mirrored `GameState`, if one was cached.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] if nothing is cached for this session.
    pub async fn get_session_state<T: DeserializeOwned>(
        &self,
        session_id: Uuid,
    ) -> Result<T, DbError> {
        self.get_json(&session_state_key(session_id)).await
    }

    /// Drop a session's mirrored state, e.g. once the turn completes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete_session_state(&self, session_id: Uuid) -> Result<(), DbError> {
        self.delete(&session_state_key(session_id)).await
    }

    // =========================================================================
    // Parked flag -- session:{id}:parked
    // =========================================================================

    /// Record that a session is parked at the given interrupt phase.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn set_session_parked<T: Serialize>(
        &self,
        session_id: Uuid,
        phase: &T,
    ) -> Result<(), DbError> {
        self.set_json(&session_parked_key(session_id), phase).await
    }

    /// Fetch the phase a session is parked at, if any.
    pub async fn get_session_parked<T: DeserializeOwned>(
        &self,
        session_id: Uuid,
    ) -> Result<T, DbError> {
        self.get_json(&session_parked_key(session_id)).await
    }

    /// Clear a session's parked flag once the GM's command resumes it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn clear_session_parked(&self, session_id: Uuid) -> Result<(), DbError> {
        self.delete(&session_parked_key(session_id)).await
    }

    // =========================================================================
    // Active P2C channel index -- session:{id}:p2c:active
    // =========================================================================

    /// Record that a P2C channel to `character_id` now has at least one
    /// publish (spec.md §4.2: the router maintains this index explicitly,
    /// never by wildcard scan).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn mark_p2c_channel_active(
        &self,
        session_id: Uuid,
        character_id: &str,
    ) -> Result<(), DbError> {
        let _: u32 = self
            .client
            .sadd(active_p2c_key(session_id), character_id)
            .await?;
        Ok(())
    }

    /// The characters with at least one active P2C channel this session.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn active_p2c_channels(&self, session_id: Uuid) -> Result<Vec<String>, DbError> {
        let members: Vec<String> = self.client.smembers(active_p2c_key(session_id)).await?;
        Ok(members)
    }

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** this deletes all data. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), DbError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

fn session_state_key(session_id: Uuid) -> String {
    format!("session:{session_id}:state")
}

fn session_parked_key(session_id: Uuid) -> String {
    format!("session:{session_id}:parked")
}

fn active_p2c_key(session_id: Uuid) -> String {
    format!("session:{session_id}:p2c:active")
}
