//! Temporal storage port and in-memory reference implementation (spec.md §4.7).
//!
//! [`MemoryStorage`] is the persistence boundary; [`InMemoryMemoryStorage`]
//! is the reference implementation used in tests and as the default before
//! `lf-db` wires a Postgres-backed one in. Concurrent readers are always
//! permitted; writes serialize through a single lock per store instance,
//! which satisfies spec.md §5's per-`(group_key, source_node, target_node)`
//! serialization requirement at the cost of being coarser than strictly
//! necessary -- acceptable because writes are rare relative to reads.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use lf_types::{GroupKey, MemoryEdge};

use crate::error::MemoryError;

/// The storage port [`crate::client::MemoryClient`] is built against.
pub trait MemoryStorage {
    /// Persist a new edge. Callers are responsible for scope validation.
    fn insert(&self, edge: MemoryEdge) -> impl std::future::Future<Output = ()> + Send;

    /// All edges visible under any of `group_keys`, regardless of temporal
    /// validity -- callers apply the `as_of` filter themselves.
    fn edges_for_groups(
        &self,
        group_keys: &[GroupKey],
    ) -> impl std::future::Future<Output = Vec<MemoryEdge>> + Send;

    /// Mark an edge superseded as of `at`.
    fn supersede(
        &self,
        uuid: Uuid,
        at: f64,
    ) -> impl std::future::Future<Output = Result<(), MemoryError>> + Send;

    /// Increment the rehearsal count of a successfully-returned edge.
    fn bump_rehearsal(&self, uuid: Uuid) -> impl std::future::Future<Output = ()> + Send;
}

/// An in-process [`MemoryStorage`] keyed by edge uuid.
#[derive(Debug, Default)]
pub struct InMemoryMemoryStorage {
    edges: RwLock<HashMap<Uuid, MemoryEdge>>,
}

impl InMemoryMemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            edges: RwLock::new(HashMap::new()),
        }
    }
}

impl MemoryStorage for InMemoryMemoryStorage {
    async fn insert(&self, edge: MemoryEdge) {
        self.edges.write().await.insert(edge.uuid, edge);
    }

    async fn edges_for_groups(&self, group_keys: &[GroupKey]) -> Vec<MemoryEdge> {
        let guard = self.edges.read().await;
        guard
            .values()
            .filter(|edge| group_keys.contains(&edge.group_key))
            .cloned()
            .collect()
    }

    async fn supersede(&self, uuid: Uuid, at: f64) -> Result<(), MemoryError> {
        let mut guard = self.edges.write().await;
        let edge = guard.get_mut(&uuid).ok_or(MemoryError::NoSuchEdge(uuid))?;
        edge.invalid_at = Some(at);
        Ok(())
    }

    async fn bump_rehearsal(&self, uuid: Uuid) {
        let mut guard = self.edges.write().await;
        if let Some(edge) = guard.get_mut(&uuid) {
            edge.rehearsal_count = edge.rehearsal_count.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_types::{AgentId, KnowledgeLayer, MemoryType};

    fn edge(group_key: GroupKey) -> MemoryEdge {
        MemoryEdge {
            uuid: Uuid::now_v7(),
            fact: "A fact.".to_string(),
            valid_at: 0.0,
            invalid_at: None,
            episode_ids: vec![],
            source_node: Uuid::now_v7(),
            target_node: Uuid::now_v7(),
            group_key,
            memory_type: MemoryType::Episodic,
            session_number: 1,
            days_elapsed: 0.0,
            confidence: 0.9,
            importance: 0.5,
            rehearsal_count: 0,
            corruption_type: None,
            original_uuid: None,
            knowledge_layer: KnowledgeLayer::Both,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_by_group() {
        let store = InMemoryMemoryStorage::new();
        let group = GroupKey::Agent(AgentId::new("agent_alex").expect("valid"));
        store.insert(edge(group.clone())).await;
        let found = store.edges_for_groups(std::slice::from_ref(&group)).await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn supersede_sets_invalid_at() {
        let store = InMemoryMemoryStorage::new();
        let group = GroupKey::CampaignMain;
        let e = edge(group.clone());
        let uuid = e.uuid;
        store.insert(e).await;
        store.supersede(uuid, 5.0).await.expect("edge exists");
        let found = store.edges_for_groups(&[group]).await;
        assert_eq!(found[0].invalid_at, Some(5.0));
    }

    #[tokio::test]
    async fn supersede_missing_edge_errors() {
        let store = InMemoryMemoryStorage::new();
        let result = store.supersede(Uuid::now_v7(), 1.0).await;
        assert!(matches!(result, Err(MemoryError::NoSuchEdge(_))));
    }

    #[tokio::test]
    async fn bump_rehearsal_increments_count() {
        let store = InMemoryMemoryStorage::new();
        let group = GroupKey::CampaignMain;
        let e = edge(group.clone());
        let uuid = e.uuid;
        store.insert(e).await;
        store.bump_rehearsal(uuid).await;
        store.bump_rehearsal(uuid).await;
        let found = store.edges_for_groups(&[group]).await;
        assert_eq!(found[0].rehearsal_count, 2);
    }
}
