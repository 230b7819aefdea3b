//! The player personality profile (spec.md §3 `PlayerPersonality`).

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

fn in_unit_interval(field: &'static str, value: f64) -> Result<(), TypesError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TypesError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

/// Ten immutable personality traits, each in `[0.0, 1.0]`.
///
/// Per spec.md §9, personality traits never gate mechanics directly: they
/// bias LLM prompt construction, corruption probability/type selection
/// (`lf-memory`), and stance-classification confidence (`lf-consensus`)
/// only. Anything in `lf-dice` or `lf-validation` that reads a field from
/// this struct is a bug.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPersonality {
    /// Bias toward systematic, logic-first reasoning in prompts.
    pub analytical_score: f64,
    /// Willingness to propose risky strategic intents.
    pub risk_tolerance: f64,
    /// Attention to concrete specifics over broad strokes.
    pub detail_oriented: f64,
    /// Weight given to affect when recalling or narrating memories.
    pub emotional_memory: f64,
    /// Tendency to take initiative in OOC discussion.
    pub assertiveness: f64,
    /// Tendency to defer to or build on other agents' proposals.
    pub cooperativeness: f64,
    /// Willingness to entertain unconventional approaches.
    pub openness: f64,
    /// Preference for adhering to established procedure.
    pub rule_adherence: f64,
    /// Intensity of in-character voice versus strategic register.
    pub roleplay_intensity: f64,
    /// Baseline rate at which this agent's memories degrade over time.
    pub base_decay_rate: f64,
}

impl PlayerPersonality {
    /// Validate that every trait lies in `[0.0, 1.0]`.
    pub fn validate(&self) -> Result<(), TypesError> {
        in_unit_interval("analytical_score", self.analytical_score)?;
        in_unit_interval("risk_tolerance", self.risk_tolerance)?;
        in_unit_interval("detail_oriented", self.detail_oriented)?;
        in_unit_interval("emotional_memory", self.emotional_memory)?;
        in_unit_interval("assertiveness", self.assertiveness)?;
        in_unit_interval("cooperativeness", self.cooperativeness)?;
        in_unit_interval("openness", self.openness)?;
        in_unit_interval("rule_adherence", self.rule_adherence)?;
        in_unit_interval("roleplay_intensity", self.roleplay_intensity)?;
        in_unit_interval("base_decay_rate", self.base_decay_rate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlayerPersonality {
        PlayerPersonality {
            analytical_score: 0.5,
            risk_tolerance: 0.5,
            detail_oriented: 0.8,
            emotional_memory: 0.3,
            assertiveness: 0.6,
            cooperativeness: 0.7,
            openness: 0.4,
            rule_adherence: 0.5,
            roleplay_intensity: 0.9,
            base_decay_rate: 0.2,
        }
    }

    #[test]
    fn valid_personality_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn out_of_range_trait_is_rejected() {
        let mut p = sample();
        p.detail_oriented = 1.5;
        assert!(p.validate().is_err());
    }
}
