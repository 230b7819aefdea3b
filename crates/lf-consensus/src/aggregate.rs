//! Stance roll-up and tie-break logic (spec.md §4.8).

use std::collections::{BTreeMap, HashMap};

use lf_types::{AgentId, ConsensusAggregate, ConsensusState, Stance, StanceVote};

/// Confidence below this threshold downgrades a vote toward [`Stance::Neutral`]
/// for aggregation purposes (spec.md §4.8 tie-breaks).
const CONFIDENCE_FLOOR: f64 = 0.5;

/// Recompute the consensus state for the current round (spec.md §4.8).
///
/// `stances` should contain one entry per active agent who has spoken;
/// agents with no entry are treated as silent. `max_rounds` and
/// `timeout_seconds` come from `lf-core::GameConfig` (spec.md §6.4
/// `consensus.max_rounds`, `consensus.timeout_seconds`).
#[must_use]
pub fn aggregate(
    stances: &BTreeMap<AgentId, StanceVote>,
    active_agents: &[AgentId],
    round: u32,
    wall_time_seconds: f64,
    max_rounds: u32,
    timeout_seconds: f64,
) -> ConsensusState {
    let effective: BTreeMap<AgentId, Stance> = active_agents
        .iter()
        .map(|agent| {
            let stance = stances
                .get(agent)
                .map(|vote| effective_stance(vote))
                .unwrap_or(Stance::Silent);
            (agent.clone(), stance)
        })
        .collect();

    let base = base_aggregate(&effective);
    let timed_out = round >= max_rounds || wall_time_seconds >= timeout_seconds;
    let aggregate = if base == ConsensusAggregate::Conflicted && timed_out {
        ConsensusAggregate::Timeout
    } else {
        base
    };

    ConsensusState {
        stances: stances.clone(),
        aggregate,
        round,
        wall_time_seconds,
    }
}

/// Downgrade a low-confidence vote toward neutral.
fn effective_stance(vote: &StanceVote) -> Stance {
    if vote.confidence < CONFIDENCE_FLOOR {
        Stance::Neutral
    } else {
        vote.stance
    }
}

fn base_aggregate(effective: &BTreeMap<AgentId, Stance>) -> ConsensusAggregate {
    let total = effective.len();
    if total == 0 {
        return ConsensusAggregate::Conflicted;
    }
    let agree = effective.values().filter(|s| **s == Stance::Agree).count();
    let disagree = effective.values().filter(|s| **s == Stance::Disagree).count();

    if agree == total {
        return ConsensusAggregate::Unanimous;
    }
    if disagree > 0 {
        return ConsensusAggregate::Conflicted;
    }
    if agree * 2 > total {
        return ConsensusAggregate::Majority;
    }
    ConsensusAggregate::Conflicted
}

/// The default decision on timeout: the currently leading stance, breaking
/// ties by the directive of the agent earliest in `active_agents`
/// (spec.md §4.8).
#[must_use]
pub fn default_decision(
    stances: &BTreeMap<AgentId, StanceVote>,
    active_agents: &[AgentId],
) -> Stance {
    let effective: Vec<(AgentId, Stance)> = active_agents
        .iter()
        .map(|agent| {
            let stance = stances
                .get(agent)
                .map(|vote| effective_stance(vote))
                .unwrap_or(Stance::Silent);
            (agent.clone(), stance)
        })
        .collect();

    let mut counts: HashMap<Stance, usize> = HashMap::new();
    for (_, stance) in &effective {
        *counts.entry(*stance).or_insert(0) += 1;
    }
    let Some(max_count) = counts.values().copied().max() else {
        return Stance::Neutral;
    };
    let leaders: Vec<Stance> = counts
        .iter()
        .filter(|(_, count)| **count == max_count)
        .map(|(stance, _)| *stance)
        .collect();

    if leaders.len() == 1 {
        return leaders[0];
    }
    // Tied: the earliest agent in active_agents order whose stance is among
    // the tied leaders decides.
    effective
        .iter()
        .find(|(_, stance)| leaders.contains(stance))
        .map_or(Stance::Neutral, |(_, stance)| *stance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(n: &str) -> AgentId {
        AgentId::new(format!("agent_{n}")).expect("valid")
    }

    fn vote(stance: Stance, confidence: f64) -> StanceVote {
        StanceVote { stance, confidence }
    }

    #[test]
    fn all_agree_is_unanimous() {
        let agents = vec![agent("a"), agent("b")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.9));
        stances.insert(agents[1].clone(), vote(Stance::Agree, 0.9));
        let state = aggregate(&stances, &agents, 1, 10.0, 5, 120.0);
        assert_eq!(state.aggregate, ConsensusAggregate::Unanimous);
    }

    #[test]
    fn majority_requires_zero_disagree() {
        let agents = vec![agent("a"), agent("b"), agent("c")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.9));
        stances.insert(agents[1].clone(), vote(Stance::Agree, 0.9));
        stances.insert(agents[2].clone(), vote(Stance::Neutral, 0.9));
        let state = aggregate(&stances, &agents, 1, 10.0, 5, 120.0);
        assert_eq!(state.aggregate, ConsensusAggregate::Majority);
    }

    #[test]
    fn any_disagree_is_conflicted_before_timeout() {
        let agents = vec![agent("a"), agent("b"), agent("c")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.9));
        stances.insert(agents[1].clone(), vote(Stance::Disagree, 0.9));
        stances.insert(agents[2].clone(), vote(Stance::Neutral, 0.9));
        let state = aggregate(&stances, &agents, 4, 10.0, 5, 120.0);
        assert_eq!(state.aggregate, ConsensusAggregate::Conflicted);
    }

    #[test]
    fn round_five_forces_timeout_from_conflicted() {
        // spec.md §8 scenario 6.
        let agents = vec![agent("a"), agent("b"), agent("c")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.9));
        stances.insert(agents[1].clone(), vote(Stance::Disagree, 0.9));
        stances.insert(agents[2].clone(), vote(Stance::Neutral, 0.9));
        let state = aggregate(&stances, &agents, 5, 10.0, 5, 120.0);
        assert_eq!(state.aggregate, ConsensusAggregate::Timeout);
    }

    #[test]
    fn wall_time_also_forces_timeout() {
        let agents = vec![agent("a"), agent("b")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.9));
        stances.insert(agents[1].clone(), vote(Stance::Disagree, 0.9));
        let state = aggregate(&stances, &agents, 1, 125.0, 5, 120.0);
        assert_eq!(state.aggregate, ConsensusAggregate::Timeout);
    }

    #[test]
    fn low_confidence_downgrades_to_neutral() {
        let agents = vec![agent("a"), agent("b")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.3));
        stances.insert(agents[1].clone(), vote(Stance::Agree, 0.9));
        let state = aggregate(&stances, &agents, 1, 10.0, 5, 120.0);
        assert_eq!(state.aggregate, ConsensusAggregate::Majority);
    }

    #[test]
    fn silent_agents_count_as_present_but_unaligned() {
        let agents = vec![agent("a"), agent("b")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.9));
        let state = aggregate(&stances, &agents, 1, 10.0, 5, 120.0);
        assert_eq!(state.aggregate, ConsensusAggregate::Conflicted);
    }

    #[test]
    fn default_decision_breaks_ties_by_active_agents_order() {
        let agents = vec![agent("a"), agent("b")];
        let mut stances = BTreeMap::new();
        stances.insert(agents[0].clone(), vote(Stance::Agree, 0.9));
        stances.insert(agents[1].clone(), vote(Stance::Disagree, 0.9));
        assert_eq!(default_decision(&stances, &agents), Stance::Agree);
    }
}
