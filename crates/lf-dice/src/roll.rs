//! Pool assembly, rolling, and LASER FEELINGS detection (spec.md §4.6).

use lf_types::{DiceResult, Outcome, TaskType};
use rand::Rng;

use crate::error::DiceError;

/// Auto-generated LASER FEELINGS question prompts, cycled by a random draw
/// so tests can pin a specific one via a seeded RNG.
const LASER_FEELINGS_QUESTIONS: &[&str] = &[
    "What aren't you seeing here?",
    "What's really going on?",
    "What should I be on the lookout for?",
    "What here is not what it seems?",
    "What's my enemy going to do next?",
];

/// Whether a single die value succeeds for `task_type` against `number`, and
/// whether it is an exact LASER FEELINGS match (spec.md §4.6).
#[must_use]
fn classify_die(value: u8, number: u8, task_type: TaskType) -> (bool, bool) {
    if value == number {
        return (true, true);
    }
    let success = match task_type {
        TaskType::Lasers => value < number,
        TaskType::Feelings => value > number,
    };
    (success, false)
}

/// Assemble a dice pool size from the spec.md §4.6 additive rule.
#[must_use]
pub const fn pool_size(is_prepared: bool, is_expert: bool, helper_success_count: u32) -> u8 {
    let mut count: u32 = 1;
    if is_prepared {
        count += 1;
    }
    if is_expert {
        count += 1;
    }
    count += helper_success_count;
    if count > u8::MAX as u32 {
        u8::MAX
    } else {
        count as u8
    }
}

/// Roll the main dice pool and classify the result (spec.md §4.6).
///
/// `random_source` is injected so tests can seed a deterministic RNG; per
/// spec.md §9, no hidden global randomness.
pub fn roll<R: Rng + ?Sized>(
    character_number: u8,
    task_type: TaskType,
    is_prepared: bool,
    is_expert: bool,
    helper_success_count: u32,
    random_source: &mut R,
) -> Result<DiceResult, DiceError> {
    if !(2..=5).contains(&character_number) {
        return Err(DiceError::InvalidCharacterNumber(character_number));
    }
    if pool_size(is_prepared, is_expert, helper_success_count) > 6 {
        tracing::warn!(
            character_number,
            helper_success_count,
            "dice pool exceeds the practical 6-die maximum; rolling all requested dice anyway"
        );
    }
    let dice_count = pool_size(is_prepared, is_expert, helper_success_count);
    let individual_rolls: Vec<u8> = (0..dice_count)
        .map(|_| random_source.random_range(1..=6))
        .collect();
    Ok(classify_rolls(&individual_rolls, character_number, task_type, random_source))
}

/// Roll a single-die helper pre-roll for `task_type` against the helper's own
/// number (spec.md §4.1 phase 13, §4.6).
pub fn roll_helper_preroll<R: Rng + ?Sized>(
    helper_number: u8,
    task_type: TaskType,
    random_source: &mut R,
) -> Result<DiceResult, DiceError> {
    roll(helper_number, task_type, false, false, 0, random_source)
}

/// Re-run success classification against explicit override values
/// (spec.md §6.2, Open Question resolved *yes* in SPEC_FULL.md §D.2): a GM
/// `override` at adjudication re-detects LASER FEELINGS from the supplied
/// values rather than preserving the system roll's flags.
#[must_use]
pub fn reclassify<R: Rng + ?Sized>(
    individual_rolls: &[u8],
    character_number: u8,
    task_type: TaskType,
    random_source: &mut R,
) -> DiceResult {
    classify_rolls(individual_rolls, character_number, task_type, random_source)
}

fn classify_rolls<R: Rng + ?Sized>(
    individual_rolls: &[u8],
    character_number: u8,
    task_type: TaskType,
    random_source: &mut R,
) -> DiceResult {
    let mut die_successes = Vec::with_capacity(individual_rolls.len());
    let mut laser_feelings_indices = Vec::new();
    for (index, &value) in individual_rolls.iter().enumerate() {
        let (success, is_laser_feelings) = classify_die(value, character_number, task_type);
        die_successes.push(success);
        if is_laser_feelings {
            laser_feelings_indices.push(index);
        }
    }
    let total_successes = u8::try_from(die_successes.iter().filter(|s| **s).count())
        .unwrap_or(u8::MAX);
    let outcome = Outcome::from_total_successes(total_successes);
    let laser_feelings_question = if laser_feelings_indices.is_empty() {
        None
    } else {
        let index = random_source.random_range(0..LASER_FEELINGS_QUESTIONS.len());
        Some(LASER_FEELINGS_QUESTIONS[index].to_string())
    };
    DiceResult {
        dice_count: u8::try_from(individual_rolls.len()).unwrap_or(u8::MAX),
        individual_rolls: individual_rolls.to_vec(),
        die_successes,
        laser_feelings_indices,
        total_successes,
        outcome,
        laser_feelings_question,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn pool_size_adds_prepared_expert_and_helpers() {
        assert_eq!(pool_size(false, false, 0), 1);
        assert_eq!(pool_size(true, false, 0), 2);
        assert_eq!(pool_size(true, true, 0), 3);
        assert_eq!(pool_size(true, true, 2), 5);
    }

    #[test]
    fn lasers_succeeds_below_number() {
        let (success, laser_feelings) = classify_die(1, 2, TaskType::Lasers);
        assert!(success);
        assert!(!laser_feelings);
    }

    #[test]
    fn feelings_succeeds_above_number() {
        let (success, laser_feelings) = classify_die(3, 2, TaskType::Feelings);
        assert!(success);
        assert!(!laser_feelings);
    }

    #[test]
    fn exact_match_is_laser_feelings_and_succeeds() {
        let (success, laser_feelings) = classify_die(2, 2, TaskType::Lasers);
        assert!(success);
        assert!(laser_feelings);
    }

    #[test]
    fn roll_rejects_invalid_character_number() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = roll(1, TaskType::Lasers, false, false, 0, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn minimal_turn_scenario_matches_spec_example() {
        // spec.md §8 scenario 1: character number 2, lasers, roll=1.
        let mut rng = SmallRng::seed_from_u64(42);
        let result = reclassify(&[1], 2, TaskType::Lasers, &mut rng);
        assert_eq!(result.total_successes, 1);
        assert_eq!(result.outcome, Outcome::Partial);
        assert!(result.laser_feelings_indices.is_empty());
    }

    #[test]
    fn laser_feelings_scenario_matches_spec_example() {
        // spec.md §8 scenario 2: roll equals the number (2).
        let mut rng = SmallRng::seed_from_u64(7);
        let result = reclassify(&[2], 2, TaskType::Lasers, &mut rng);
        assert_eq!(result.total_successes, 1);
        assert_eq!(result.outcome, Outcome::Partial);
        assert_eq!(result.laser_feelings_indices, vec![0]);
        assert!(result.laser_feelings_question.is_some());
    }

    #[test]
    fn total_successes_is_function_solely_of_counted_die_successes() {
        let mut rng = SmallRng::seed_from_u64(3);
        let result = roll(3, TaskType::Feelings, true, true, 1, &mut rng).expect("valid roll");
        let counted = u8::try_from(result.die_successes.iter().filter(|s| **s).count())
            .expect("small count");
        assert_eq!(counted, result.total_successes);
        assert_eq!(result.dice_count, 4);
    }
}
