//! Dice roll results (spec.md §4.6 `DiceResult`).

use serde::{Deserialize, Serialize};

use crate::enums::Outcome;

/// The full record of one dice resolution.
///
/// `lf-dice` is the only crate that constructs this type; `lf-core` and
/// `lf-gm-adapter` only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceResult {
    /// Number of dice rolled (1-6 in practice).
    pub dice_count: u8,
    /// Raw 1-6 value of each die, in roll order.
    pub individual_rolls: Vec<u8>,
    /// Per-die success flag, same order as `individual_rolls`.
    pub die_successes: Vec<bool>,
    /// Indices into `individual_rolls`/`die_successes` of exact-match dice.
    pub laser_feelings_indices: Vec<usize>,
    /// `count(die_successes == true)`.
    pub total_successes: u8,
    /// A pure function of `total_successes`.
    pub outcome: Outcome,
    /// Auto-generated question text, present only when a LASER FEELINGS die
    /// was rolled.
    pub laser_feelings_question: Option<String>,
}

impl DiceResult {
    /// Whether any die in this roll was an exact LASER FEELINGS match.
    #[must_use]
    pub fn has_laser_feelings(&self) -> bool {
        !self.laser_feelings_indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_successes_matches_die_successes_count() {
        let result = DiceResult {
            dice_count: 3,
            individual_rolls: vec![1, 4, 2],
            die_successes: vec![true, false, true],
            laser_feelings_indices: vec![],
            total_successes: 2,
            outcome: Outcome::from_total_successes(2),
            laser_feelings_question: None,
        };
        let counted = u8::try_from(result.die_successes.iter().filter(|s| **s).count())
            .expect("small count");
        assert_eq!(counted, result.total_successes);
        assert_eq!(result.outcome, Outcome::Success);
    }

    #[test]
    fn laser_feelings_presence_matches_indices() {
        let with = DiceResult {
            dice_count: 1,
            individual_rolls: vec![2],
            die_successes: vec![true],
            laser_feelings_indices: vec![0],
            total_successes: 1,
            outcome: Outcome::Partial,
            laser_feelings_question: Some("Is there a hidden passage?".to_string()),
        };
        assert!(with.has_laser_feelings());

        let without = DiceResult {
            laser_feelings_indices: vec![],
            laser_feelings_question: None,
            ..with
        };
        assert!(!without.has_laser_feelings());
    }
}
