//! Corruption probability and type selection (spec.md §4.7).
//!
//! Corruption never mutates a pristine edge; callers materialize a new
//! superseding edge with `original_uuid` set once [`should_corrupt`] and
//! [`select_corruption_type`] have decided whether and how. Actually
//! rendering the degraded fact text is an LLM call dispatched through
//! `lf-worker`; see [`crate::renderer::CorruptionRenderer`] for the port.

use lf_types::{CorruptionType, MemoryEdge, PlayerPersonality};
use rand::Rng;

/// Upper bound on corruption probability regardless of input factors
/// (spec.md §4.7): a memory can always still be recalled faithfully.
const MAX_CORRUPTION_PROBABILITY: f64 = 0.95;

/// Compute the probability that `edge` should be corrupted on this read.
///
/// `p = personality_modifier * time_factor * importance_modifier *
/// rehearsal_factor * global_strength`, capped at 0.95 (spec.md §4.7).
#[must_use]
pub fn corruption_probability(
    edge: &MemoryEdge,
    personality: &PlayerPersonality,
    global_strength: f64,
) -> f64 {
    let time_factor = 1.0 - (-edge.days_elapsed / 365.0).exp();
    let importance_modifier = 1.5 - edge.importance;
    let rehearsal_factor = (1.0 - 0.05 * f64::from(edge.rehearsal_count)).max(0.0);
    let personality_modifier =
        personality.base_decay_rate * (1.0 + (0.5 - personality.detail_oriented));

    let p = personality_modifier * time_factor * importance_modifier * rehearsal_factor * global_strength;
    p.clamp(0.0, MAX_CORRUPTION_PROBABILITY)
}

/// Draw whether `edge` is corrupted on this read, given its probability.
#[must_use]
pub fn should_corrupt<R: Rng + ?Sized>(probability: f64, random_source: &mut R) -> bool {
    random_source.random::<f64>() < probability
}

/// Choose which degradation a corrupted edge receives, weighted by the
/// reading agent's personality (spec.md §4.7).
#[must_use]
pub fn select_corruption_type<R: Rng + ?Sized>(
    personality: &PlayerPersonality,
    random_source: &mut R,
) -> CorruptionType {
    use CorruptionType::{Conflation, DetailDrift, EmotionalColoring, FalseConfidence, Simplification};

    let roll: f64 = random_source.random();

    if personality.emotional_memory > 0.7 {
        return weighted_pick(
            roll,
            &[(0.5, EmotionalColoring), (0.3, Simplification), (0.2, DetailDrift)],
        );
    }
    if personality.analytical_score > 0.7 {
        return weighted_pick(
            roll,
            &[(0.4, DetailDrift), (0.3, FalseConfidence), (0.3, Simplification)],
        );
    }
    if personality.detail_oriented < 0.3 {
        return weighted_pick(
            roll,
            &[(0.5, Conflation), (0.3, Simplification), (0.2, FalseConfidence)],
        );
    }
    weighted_pick(
        roll,
        &[
            (0.3, DetailDrift),
            (0.3, Simplification),
            (0.2, EmotionalColoring),
            (0.2, Conflation),
        ],
    )
}

/// Pick the first bucket whose cumulative weight `roll` falls within.
///
/// Falls back to the last entry if rounding leaves a sliver of probability
/// mass unaccounted for.
fn weighted_pick(roll: f64, buckets: &[(f64, CorruptionType)]) -> CorruptionType {
    let mut cumulative = 0.0;
    for (weight, kind) in buckets {
        cumulative += *weight;
        if roll < cumulative {
            return *kind;
        }
    }
    buckets
        .last()
        .map_or(CorruptionType::Simplification, |(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    fn personality() -> PlayerPersonality {
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
            base_decay_rate: 0.5,
        }
    }

    fn edge(days_elapsed: f64, importance: f64, rehearsal_count: u32) -> MemoryEdge {
        use lf_types::{AgentId, GroupKey, KnowledgeLayer, MemoryType};
        MemoryEdge {
            uuid: uuid::Uuid::now_v7(),
            fact: "A fact.".to_string(),
            valid_at: 0.0,
            invalid_at: None,
            episode_ids: vec![],
            source_node: uuid::Uuid::now_v7(),
            target_node: uuid::Uuid::now_v7(),
            group_key: GroupKey::Agent(AgentId::new("agent_alex").expect("valid")),
            memory_type: MemoryType::Episodic,
            session_number: 1,
            days_elapsed,
            confidence: 0.9,
            importance,
            rehearsal_count,
            corruption_type: None,
            original_uuid: None,
            knowledge_layer: KnowledgeLayer::Both,
        }
    }

    #[test]
    fn probability_is_capped_at_0_95() {
        let e = edge(10_000.0, 0.0, 0);
        let mut extreme = personality();
        extreme.base_decay_rate = 1.0;
        extreme.detail_oriented = 0.0;
        let p = corruption_probability(&e, &extreme, 1.0);
        assert!(p <= MAX_CORRUPTION_PROBABILITY);
    }

    #[test]
    fn zero_global_strength_means_never_corrupt() {
        let e = edge(400.0, 0.1, 0);
        let p = corruption_probability(&e, &personality(), 0.0);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn high_rehearsal_count_lowers_probability() {
        let fresh = edge(400.0, 0.3, 0);
        let rehearsed = edge(400.0, 0.3, 15);
        let p_fresh = corruption_probability(&fresh, &personality(), 1.0);
        let p_rehearsed = corruption_probability(&rehearsed, &personality(), 1.0);
        assert!(p_rehearsed < p_fresh);
    }

    #[test]
    fn high_importance_lowers_probability() {
        let important = edge(400.0, 0.9, 0);
        let trivial = edge(400.0, 0.1, 0);
        let p_important = corruption_probability(&important, &personality(), 1.0);
        let p_trivial = corruption_probability(&trivial, &personality(), 1.0);
        assert!(p_important < p_trivial);
    }

    #[test]
    fn emotional_personality_favors_emotional_coloring() {
        let mut p = personality();
        p.emotional_memory = 0.9;
        let mut rng = SmallRng::seed_from_u64(1);
        let mut counts = std::collections::HashMap::new();
        for _ in 0..200 {
            let kind = select_corruption_type(&p, &mut rng);
            *counts.entry(kind).or_insert(0) += 1;
        }
        let emotional = counts.get(&CorruptionType::EmotionalColoring).copied().unwrap_or(0);
        assert!(emotional > counts.values().copied().max().unwrap_or(0) / 2);
    }
}
