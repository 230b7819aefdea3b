//! The memory client operations (spec.md §4.7): `add_episode`, `search`,
//! `invalidate`, scoped by `group_key` and filtered by `knowledge_layer`.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use lf_types::{GroupKey, KnowledgeLayer, MemoryEdge, MemoryType, PlayerPersonality};

use crate::corruption::{corruption_probability, select_corruption_type, should_corrupt};
use crate::error::MemoryError;
use crate::renderer::CorruptionRenderer;
use crate::store::MemoryStorage;

/// Which side of the IC/OOC split a `search` call is reading for
/// (spec.md §4.7 `knowledge_layer` filter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderLayer {
    /// A player (OOC) read; excludes `character_only` edges.
    Player,
    /// A character (IC) read; excludes `player_only` edges.
    Character,
}

impl ReaderLayer {
    fn can_read(self, layer: KnowledgeLayer) -> bool {
        match (self, layer) {
            (Self::Player, KnowledgeLayer::CharacterOnly) => false,
            (Self::Character, KnowledgeLayer::PlayerOnly) => false,
            _ => true,
        }
    }
}

/// One result row from [`MemoryClient::search`] (spec.md §4.7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MemoryQueryResult {
    /// The edge's identifier (the corrupted variant's, if one was materialized).
    pub uuid: Uuid,
    /// The fact text the caller should use: corrupted if corruption fired.
    pub fact: String,
    /// Whether this result is a corrupted variant.
    pub corrupted: bool,
    /// The pristine fact, present only when `corrupted`, for debugging.
    /// Never forward this to an agent-facing prompt (spec.md §4.7).
    pub original_fact: Option<String>,
    pub memory_type: MemoryType,
    pub confidence: f64,
    pub importance: f64,
    pub valid_at: f64,
}

/// Parameters for a bounded temporal search (spec.md §4.7).
pub struct SearchParams<'a> {
    pub query: &'a str,
    pub group_keys: &'a [GroupKey],
    pub as_of: f64,
    pub min_confidence: f64,
    pub include_corrupted: bool,
    pub limit: usize,
    pub reader_layer: ReaderLayer,
    pub global_strength: f64,
}

/// The memory client (spec.md §4.7), generic over its storage backend and
/// corruption renderer.
pub struct MemoryClient<S, R> {
    storage: S,
    renderer: R,
}

impl<S: MemoryStorage, R: CorruptionRenderer> MemoryClient<S, R> {
    /// Build a client over a storage backend and corruption renderer.
    pub const fn new(storage: S, renderer: R) -> Self {
        Self { storage, renderer }
    }

    /// Create an episode and its single derived fact edge.
    ///
    /// Rejects writes whose `group_key` does not match `caller_scope`
    /// (spec.md §4.7 invariant); `CampaignMain` is writable by any caller
    /// whose own scope is itself `CampaignMain` or who is explicitly
    /// authorized to narrate shared facts (the GM adapter).
    pub async fn add_episode(
        &self,
        caller_scope: &GroupKey,
        group_key: GroupKey,
        session_number: u32,
        content: &str,
        reference_time: DateTime<Utc>,
        days_elapsed: f64,
        knowledge_layer: KnowledgeLayer,
    ) -> Result<MemoryEdge, MemoryError> {
        if &group_key != caller_scope && *caller_scope != GroupKey::CampaignMain {
            return Err(MemoryError::ScopeViolation {
                caller: caller_scope.clone(),
                target: group_key,
            });
        }

        let episode_id = Uuid::now_v7();
        let edge = MemoryEdge {
            uuid: Uuid::now_v7(),
            fact: content.to_string(),
            valid_at: days_elapsed,
            invalid_at: None,
            episode_ids: vec![episode_id],
            source_node: Uuid::now_v7(),
            target_node: Uuid::now_v7(),
            group_key,
            memory_type: MemoryType::Episodic,
            session_number,
            days_elapsed,
            confidence: 1.0,
            importance: 0.5,
            rehearsal_count: 0,
            corruption_type: None,
            original_uuid: None,
            knowledge_layer,
        };
        edge.validate()?;
        self.storage.insert(edge.clone()).await;
        tracing::debug!(
            edge_uuid = %edge.uuid,
            session_number,
            reference_time = %reference_time,
            "memory episode recorded"
        );
        Ok(edge)
    }

    /// Supersede an edge; it no longer satisfies `search`'s temporal filter
    /// once `at` passes.
    pub async fn invalidate(&self, uuid: Uuid, at: f64) -> Result<(), MemoryError> {
        self.storage.supersede(uuid, at).await
    }

    /// Semantic search with temporal filter and read-time corruption
    /// (spec.md §4.7).
    ///
    /// `personality` is the reading agent's; it governs corruption
    /// probability and type selection. `random_source` makes the corruption
    /// draw reproducible in tests, mirroring `lf-dice`'s injected-RNG
    /// pattern.
    pub async fn search<Rg: Rng + ?Sized>(
        &self,
        params: &SearchParams<'_>,
        personality: &PlayerPersonality,
        random_source: &mut Rg,
    ) -> Vec<MemoryQueryResult> {
        let candidates = self.storage.edges_for_groups(params.group_keys).await;
        let query_lower = params.query.to_lowercase();

        let mut results = Vec::new();
        for edge in candidates {
            if !temporally_valid(&edge, params.as_of) {
                continue;
            }
            if edge.confidence < params.min_confidence {
                continue;
            }
            if !params.reader_layer.can_read(edge.knowledge_layer) {
                continue;
            }
            if edge.is_corrupted() && !params.include_corrupted {
                continue;
            }
            if !query_lower.is_empty() && !edge.fact.to_lowercase().contains(&query_lower) {
                continue;
            }

            self.storage.bump_rehearsal(edge.uuid).await;

            let result = self
                .materialize_read(&edge, personality, params.global_strength, params.as_of, random_source)
                .await;
            results.push(result);

            if results.len() >= params.limit {
                break;
            }
        }
        results
    }

    /// Decide whether to corrupt `edge` on this read and, if so, render and
    /// persist the superseding corrupted edge before returning the result
    /// row the caller should see.
    async fn materialize_read<Rg: Rng + ?Sized>(
        &self,
        edge: &MemoryEdge,
        personality: &PlayerPersonality,
        global_strength: f64,
        as_of: f64,
        random_source: &mut Rg,
    ) -> MemoryQueryResult {
        if edge.is_corrupted() {
            return MemoryQueryResult {
                uuid: edge.uuid,
                fact: edge.fact.clone(),
                corrupted: true,
                original_fact: None,
                memory_type: edge.memory_type,
                confidence: edge.confidence,
                importance: edge.importance,
                valid_at: edge.valid_at,
            };
        }

        let probability = corruption_probability(edge, personality, global_strength);
        if !should_corrupt(probability, random_source) {
            return MemoryQueryResult {
                uuid: edge.uuid,
                fact: edge.fact.clone(),
                corrupted: false,
                original_fact: None,
                memory_type: edge.memory_type,
                confidence: edge.confidence,
                importance: edge.importance,
                valid_at: edge.valid_at,
            };
        }

        let kind = select_corruption_type(personality, random_source);
        let corrupted_fact = self.renderer.corrupt(&edge.fact, kind).await;

        let corrupted_edge = MemoryEdge {
            uuid: Uuid::now_v7(),
            fact: corrupted_fact.clone(),
            corruption_type: Some(kind),
            original_uuid: Some(edge.uuid),
            rehearsal_count: 0,
            ..edge.clone()
        };
        let corrupted_uuid = corrupted_edge.uuid;
        self.storage.insert(corrupted_edge).await;

        // `invalid_at` must be strictly greater than `valid_at` (spec.md §3);
        // `as_of` is guaranteed `>= edge.valid_at` by `temporally_valid`, but
        // bump past it on exact equality rather than violate the invariant.
        let supersede_at = if as_of > edge.valid_at {
            as_of
        } else {
            edge.valid_at + f64::EPSILON
        };
        if let Err(err) = self.storage.supersede(edge.uuid, supersede_at).await {
            tracing::warn!(edge_uuid = %edge.uuid, %err, "failed to supersede pristine edge after corruption");
        }

        tracing::debug!(
            original_uuid = %edge.uuid,
            corrupted_uuid = %corrupted_uuid,
            kind = ?kind,
            "memory edge corrupted at read time"
        );

        MemoryQueryResult {
            uuid: corrupted_uuid,
            fact: corrupted_fact,
            corrupted: true,
            original_fact: Some(edge.fact.clone()),
            memory_type: edge.memory_type,
            confidence: edge.confidence,
            importance: edge.importance,
            valid_at: edge.valid_at,
        }
    }
}

fn temporally_valid(edge: &MemoryEdge, as_of: f64) -> bool {
    edge.valid_at <= as_of && !edge.is_superseded_at(as_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::IdentityRenderer;
    use crate::store::InMemoryMemoryStorage;
    use lf_types::AgentId;
    use rand::{rngs::SmallRng, SeedableRng};

    fn personality(base_decay_rate: f64) -> PlayerPersonality {
        PlayerPersonality {
            analytical_score: 0.5,
            risk_tolerance: 0.5,
            detail_oriented: 0.5,
            emotional_memory: 0.5,
            assertiveness: 0.5,
            cooperativeness: 0.5,
            openness: 0.5,
            rule_adherence: 0.5,
            roleplay_intensity: 0.5,
            base_decay_rate,
        }
    }

    fn client() -> MemoryClient<InMemoryMemoryStorage, IdentityRenderer> {
        MemoryClient::new(InMemoryMemoryStorage::new(), IdentityRenderer)
    }

    #[tokio::test]
    async fn add_episode_rejects_out_of_scope_write() {
        let client = client();
        let caller = GroupKey::Agent(AgentId::new("agent_alex").expect("valid"));
        let target = GroupKey::Agent(AgentId::new("agent_sam").expect("valid"));
        let result = client
            .add_episode(&caller, target, 1, "A fact.", Utc::now(), 1.0, KnowledgeLayer::Both)
            .await;
        assert!(matches!(result, Err(MemoryError::ScopeViolation { .. })));
    }

    #[tokio::test]
    async fn add_episode_then_search_finds_it() {
        let client = client();
        let scope = GroupKey::CampaignMain;
        client
            .add_episode(&scope, scope.clone(), 1, "The merchant offered fifty gold.", Utc::now(), 1.0, KnowledgeLayer::Both)
            .await
            .expect("in scope");

        let mut rng = SmallRng::seed_from_u64(7);
        let params = SearchParams {
            query: "merchant",
            group_keys: &[scope],
            as_of: 100.0,
            min_confidence: 0.0,
            include_corrupted: true,
            limit: 10,
            reader_layer: ReaderLayer::Player,
            global_strength: 0.0,
        };
        let results = client.search(&params, &personality(0.5), &mut rng).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].corrupted);
    }

    #[tokio::test]
    async fn search_excludes_edges_not_yet_valid() {
        let client = client();
        let scope = GroupKey::CampaignMain;
        client
            .add_episode(&scope, scope.clone(), 1, "A future fact.", Utc::now(), 50.0, KnowledgeLayer::Both)
            .await
            .expect("in scope");

        let mut rng = SmallRng::seed_from_u64(1);
        let params = SearchParams {
            query: "",
            group_keys: &[scope],
            as_of: 10.0,
            min_confidence: 0.0,
            include_corrupted: true,
            limit: 10,
            reader_layer: ReaderLayer::Player,
            global_strength: 0.0,
        };
        let results = client.search(&params, &personality(0.5), &mut rng).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn character_only_layer_is_hidden_from_player_reads() {
        let client = client();
        let scope = GroupKey::CampaignMain;
        client
            .add_episode(
                &scope,
                scope.clone(),
                1,
                "A secret the character knows.",
                Utc::now(),
                1.0,
                KnowledgeLayer::CharacterOnly,
            )
            .await
            .expect("in scope");

        let mut rng = SmallRng::seed_from_u64(1);
        let params = SearchParams {
            query: "",
            group_keys: &[scope],
            as_of: 10.0,
            min_confidence: 0.0,
            include_corrupted: true,
            limit: 10,
            reader_layer: ReaderLayer::Player,
            global_strength: 0.0,
        };
        let results = client.search(&params, &personality(0.5), &mut rng).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn guaranteed_corruption_materializes_a_superseding_edge() {
        let client = client();
        let scope = GroupKey::CampaignMain;
        let edge = client
            .add_episode(&scope, scope.clone(), 1, "The door was blue.", Utc::now(), 900.0, KnowledgeLayer::Both)
            .await
            .expect("in scope");

        let mut rng = SmallRng::seed_from_u64(3);
        let mut extreme = personality(1.0);
        extreme.detail_oriented = 0.0;
        let params = SearchParams {
            query: "",
            group_keys: &[scope],
            as_of: 1000.0,
            min_confidence: 0.0,
            include_corrupted: true,
            limit: 10,
            reader_layer: ReaderLayer::Player,
            global_strength: 1.0,
        };
        let results = client.search(&params, &extreme, &mut rng).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].corrupted);
        assert_ne!(results[0].uuid, edge.uuid);
        assert!(results[0].original_fact.is_some());
    }

    #[tokio::test]
    async fn corruption_supersedes_the_pristine_edge() {
        let client = client();
        let scope = GroupKey::CampaignMain;
        let edge = client
            .add_episode(&scope, scope.clone(), 1, "The door was blue.", Utc::now(), 900.0, KnowledgeLayer::Both)
            .await
            .expect("in scope");

        let mut rng = SmallRng::seed_from_u64(3);
        let mut extreme = personality(1.0);
        extreme.detail_oriented = 0.0;
        let params = SearchParams {
            query: "",
            group_keys: &[scope.clone()],
            as_of: 1000.0,
            min_confidence: 0.0,
            include_corrupted: true,
            limit: 10,
            reader_layer: ReaderLayer::Player,
            global_strength: 1.0,
        };
        let first_pass = client.search(&params, &extreme, &mut rng).await;
        assert_eq!(first_pass.len(), 1);
        assert!(first_pass[0].corrupted);

        // The pristine edge is now superseded; a second read at the same
        // `as_of` must see only the already-materialized corrupted variant,
        // never re-corrupt the pristine one into a second corrupted edge.
        let second_pass = client.search(&params, &extreme, &mut rng).await;
        assert_eq!(second_pass.len(), 1);
        assert_eq!(second_pass[0].uuid, first_pass[0].uuid);
    }

    #[tokio::test]
    async fn invalidate_removes_edge_from_future_searches() {
        let client = client();
        let scope = GroupKey::CampaignMain;
        let edge = client
            .add_episode(&scope, scope.clone(), 1, "A fact.", Utc::now(), 1.0, KnowledgeLayer::Both)
            .await
            .expect("in scope");
        client.invalidate(edge.uuid, 5.0).await.expect("edge exists");

        let mut rng = SmallRng::seed_from_u64(1);
        let params = SearchParams {
            query: "",
            group_keys: &[scope],
            as_of: 10.0,
            min_confidence: 0.0,
            include_corrupted: true,
            limit: 10,
            reader_layer: ReaderLayer::Player,
            global_strength: 0.0,
        };
        let results = client.search(&params, &personality(0.5), &mut rng).await;
        assert!(results.is_empty());
    }
}
