//! Postgres-backed [`MemoryStorage`].
//!
//! `group_key` is stored as its `Display` rendering (`agent_alex`,
//! `character_zara_7`, `campaign_main`) since that rendering is already a
//! bijection with [`GroupKey`] per spec.md's glossary, and it lets
//! `edges_for_groups` push the scope filter into the query instead of
//! fetching everything and filtering in memory.

use lf_memory::store::MemoryStorage;
use lf_memory::MemoryError;
use lf_types::{AgentId, CharacterId, CorruptionType, GroupKey, KnowledgeLayer, MemoryEdge, MemoryType};
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

/// A [`MemoryStorage`] implementation backed by a Postgres connection pool.
pub struct PostgresMemoryStorage {
    pool: PgPool,
}

impl PostgresMemoryStorage {
    /// Wrap a connection pool as a memory store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn memory_type_tag(memory_type: MemoryType) -> &'static str {
    match memory_type {
        MemoryType::Episodic => "episodic",
        MemoryType::Semantic => "semantic",
        MemoryType::Procedural => "procedural",
    }
}

fn parse_memory_type(raw: &str) -> MemoryType {
    match raw {
        "semantic" => MemoryType::Semantic,
        "procedural" => MemoryType::Procedural,
        _ => MemoryType::Episodic,
    }
}

fn knowledge_layer_tag(layer: KnowledgeLayer) -> &'static str {
    match layer {
        KnowledgeLayer::PlayerOnly => "player_only",
        KnowledgeLayer::CharacterOnly => "character_only",
        KnowledgeLayer::Both => "both",
    }
}

fn parse_knowledge_layer(raw: &str) -> KnowledgeLayer {
    match raw {
        "player_only" => KnowledgeLayer::PlayerOnly,
        "character_only" => KnowledgeLayer::CharacterOnly,
        _ => KnowledgeLayer::Both,
    }
}

fn corruption_type_tag(kind: CorruptionType) -> &'static str {
    match kind {
        CorruptionType::DetailDrift => "detail_drift",
        CorruptionType::EmotionalColoring => "emotional_coloring",
        CorruptionType::Conflation => "conflation",
        CorruptionType::Simplification => "simplification",
        CorruptionType::FalseConfidence => "false_confidence",
    }
}

fn parse_corruption_type(raw: &str) -> Option<CorruptionType> {
    match raw {
        "detail_drift" => Some(CorruptionType::DetailDrift),
        "emotional_coloring" => Some(CorruptionType::EmotionalColoring),
        "conflation" => Some(CorruptionType::Conflation),
        "simplification" => Some(CorruptionType::Simplification),
        "false_confidence" => Some(CorruptionType::FalseConfidence),
        _ => None,
    }
}

/// Parse a `group_key` column value back into a [`GroupKey`].
///
/// Mirrors [`GroupKey`]'s `Display` impl: `campaign_main`, `character_<id>`,
/// or a bare `agent_<id>`.
fn parse_group_key(raw: &str) -> Option<GroupKey> {
    if raw == "campaign_main" {
        return Some(GroupKey::CampaignMain);
    }
    if let Some(suffix) = raw.strip_prefix("character_") {
        return CharacterId::new(format!("char_{suffix}")).ok().map(GroupKey::Character);
    }
    AgentId::new(raw.to_string()).ok().map(GroupKey::Agent)
}

impl MemoryStorage for PostgresMemoryStorage {
    async fn insert(&self, edge: MemoryEdge) {
        let group_key = edge.group_key.to_string();
        let memory_type = memory_type_tag(edge.memory_type);
        let knowledge_layer = knowledge_layer_tag(edge.knowledge_layer);
        let corruption_type = edge.corruption_type.map(corruption_type_tag);
        let session_number = i32::try_from(edge.session_number).unwrap_or(i32::MAX);
        let rehearsal_count = i32::try_from(edge.rehearsal_count).unwrap_or(i32::MAX);

        let result = sqlx::query(
            r"
            INSERT INTO memory_edges
                (uuid, group_key, fact, valid_at, invalid_at, episode_ids, source_node,
                 target_node, memory_type, session_number, days_elapsed, confidence,
                 importance, rehearsal_count, corruption_type, original_uuid, knowledge_layer)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ",
        )
        .bind(edge.uuid)
        .bind(&group_key)
        .bind(&edge.fact)
        .bind(edge.valid_at)
        .bind(edge.invalid_at)
        .bind(&edge.episode_ids)
        .bind(edge.source_node)
        .bind(edge.target_node)
        .bind(memory_type)
        .bind(session_number)
        .bind(edge.days_elapsed)
        .bind(edge.confidence)
        .bind(edge.importance)
        .bind(rehearsal_count)
        .bind(corruption_type)
        .bind(edge.original_uuid)
        .bind(knowledge_layer)
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            tracing::error!(error = %err, uuid = %edge.uuid, "failed to persist memory edge");
        }
    }

    async fn edges_for_groups(&self, group_keys: &[GroupKey]) -> Vec<MemoryEdge> {
        let keys: Vec<String> = group_keys.iter().map(ToString::to_string).collect();
        let rows = sqlx::query(
            r"
            SELECT uuid, group_key, fact, valid_at, invalid_at, episode_ids, source_node,
                   target_node, memory_type, session_number, days_elapsed, confidence,
                   importance, rehearsal_count, corruption_type, original_uuid, knowledge_layer
            FROM memory_edges
            WHERE group_key = ANY($1)
            ",
        )
        .bind(&keys)
        .fetch_all(&self.pool)
        .await;

        let Ok(rows) = rows else {
            tracing::error!("failed to query memory edges for groups");
            return Vec::new();
        };

        rows.into_iter().filter_map(|row| decode_edge(&row)).collect()
    }

    async fn supersede(&self, uuid: Uuid, at: f64) -> Result<(), MemoryError> {
        let result = sqlx::query("UPDATE memory_edges SET invalid_at = $1 WHERE uuid = $2")
            .bind(at)
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(MemoryError::NoSuchEdge(uuid));
        }
        Ok(())
    }

    async fn bump_rehearsal(&self, uuid: Uuid) {
        let result = sqlx::query(
            "UPDATE memory_edges SET rehearsal_count = rehearsal_count + 1 WHERE uuid = $1",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            tracing::error!(error = %err, %uuid, "failed to bump memory edge rehearsal count");
        }
    }
}

fn decode_edge(row: &sqlx::postgres::PgRow) -> Option<MemoryEdge> {
    let group_key_raw: String = row.try_get("group_key").ok()?;
    let group_key = parse_group_key(&group_key_raw)?;
    let memory_type_raw: String = row.try_get("memory_type").ok()?;
    let knowledge_layer_raw: String = row.try_get("knowledge_layer").ok()?;
    let corruption_type_raw: Option<String> = row.try_get("corruption_type").ok()?;
    let session_number: i32 = row.try_get("session_number").ok()?;
    let rehearsal_count: i32 = row.try_get("rehearsal_count").ok()?;

    Some(MemoryEdge {
        uuid: row.try_get("uuid").ok()?,
        fact: row.try_get("fact").ok()?,
        valid_at: row.try_get("valid_at").ok()?,
        invalid_at: row.try_get("invalid_at").ok()?,
        episode_ids: row.try_get("episode_ids").ok()?,
        source_node: row.try_get("source_node").ok()?,
        target_node: row.try_get("target_node").ok()?,
        group_key,
        memory_type: parse_memory_type(&memory_type_raw),
        #[allow(clippy::cast_sign_loss)]
        session_number: session_number as u32,
        days_elapsed: row.try_get("days_elapsed").ok()?,
        confidence: row.try_get("confidence").ok()?,
        importance: row.try_get("importance").ok()?,
        #[allow(clippy::cast_sign_loss)]
        rehearsal_count: rehearsal_count as u32,
        corruption_type: corruption_type_raw.as_deref().and_then(parse_corruption_type),
        original_uuid: row.try_get("original_uuid").ok()?,
        knowledge_layer: parse_knowledge_layer(&knowledge_layer_raw),
    })
}
