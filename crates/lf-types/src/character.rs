//! Character and ship entities (spec.md §3 `CharacterSheet`, `ShipConfig`).

use serde::{Deserialize, Serialize};

use crate::enums::{Role, ShipProblem, ShipStrength, Style};
use crate::error::TypesError;
use crate::ids::{AgentId, CharacterId};

/// An immutable character sheet, one per character, linked to exactly one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    /// This character's identifier.
    pub character_id: CharacterId,
    /// The agent controlling this character.
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// One of seven archetypes.
    pub style: Style,
    /// One of seven crew roles.
    pub role: Role,
    /// 2-5; low favors lasers (logic/tech) tasks, high favors feelings (intuition/social).
    pub number: u8,
    /// The character's driving goal, free text.
    pub character_goal: String,
    /// Starting equipment; may be empty; never modified after session start.
    pub equipment: Vec<String>,
    /// Characteristic turns of phrase used to bias reaction prompts.
    pub speech_patterns: Vec<String>,
    /// Characteristic physical tics used to bias reaction prompts.
    pub mannerisms: Vec<String>,
}

impl CharacterSheet {
    /// Validate `number` is in the required 2-5 range.
    pub fn validate(&self) -> Result<(), TypesError> {
        if !(2..=5).contains(&self.number) {
            return Err(TypesError::OutOfRange {
                field: "number",
                value: f64::from(self.number),
                min: 2.0,
                max: 5.0,
            });
        }
        if self.name.trim().is_empty() {
            return Err(TypesError::Empty { field: "name" });
        }
        Ok(())
    }
}

/// Party-wide, narrative-only ship configuration (spec.md §3 `ShipConfig`).
///
/// Never consulted by mechanics: `lf-dice` and `lf-validation` must not read
/// this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipConfig {
    /// Ship's name; must be non-empty.
    pub name: String,
    /// Exactly two strengths drawn from the closed seven-member set.
    pub strengths: [ShipStrength; 2],
    /// Exactly one problem drawn from the closed four-member set.
    pub problem: ShipProblem,
}

impl ShipConfig {
    /// Validate the name is non-empty and the two strengths are distinct.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.name.trim().is_empty() {
            return Err(TypesError::Empty { field: "name" });
        }
        if self.strengths[0] == self.strengths[1] {
            return Err(TypesError::InvalidChoice {
                field: "strengths",
                value: "duplicate ship strength".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(number: u8) -> CharacterSheet {
        CharacterSheet {
            character_id: CharacterId::new("char_zara_7").expect("valid"),
            agent_id: AgentId::new("agent_alex").expect("valid"),
            name: "Zara-7".to_string(),
            style: Style::Android,
            role: Role::Engineer,
            number,
            character_goal: "Keep the ship flying".to_string(),
            equipment: vec!["toolkit".to_string()],
            speech_patterns: vec![],
            mannerisms: vec![],
        }
    }

    #[test]
    fn number_in_range_is_valid() {
        assert!(sheet(2).validate().is_ok());
        assert!(sheet(5).validate().is_ok());
    }

    #[test]
    fn number_out_of_range_is_rejected() {
        assert!(sheet(1).validate().is_err());
        assert!(sheet(6).validate().is_err());
    }

    #[test]
    fn ship_config_rejects_duplicate_strengths() {
        let ship = ShipConfig {
            name: "The Wayfarer".to_string(),
            strengths: [ShipStrength::FasterThanLight, ShipStrength::FasterThanLight],
            problem: ShipProblem::FuelHungry,
        };
        assert!(ship.validate().is_err());
    }

    #[test]
    fn ship_config_rejects_empty_name() {
        let ship = ShipConfig {
            name: String::new(),
            strengths: [ShipStrength::FasterThanLight, ShipStrength::HeavilyArmed],
            problem: ShipProblem::FuelHungry,
        };
        assert!(ship.validate().is_err());
    }
}
