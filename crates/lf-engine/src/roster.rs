//! Session roster: the set of characters, their controlling agents, and
//! each agent's personality profile for one session.
//!
//! Loaded once at startup from a YAML file (spec.md §3 `CharacterSheet`,
//! `PlayerPersonality`, `ShipConfig`). The roster is immutable for the
//! life of the session: it is the fixed input the turn machine and the
//! message router are built around, not state that changes turn to turn.

use std::collections::BTreeMap;

use lf_types::{AgentId, CharacterId, CharacterSheet, PlayerPersonality, ShipConfig};
use serde::Deserialize;

use crate::error::EngineError;

/// The full cast for one session: characters, their agents' personalities,
/// and the optional party-wide ship configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRoster {
    /// One sheet per character in the party.
    pub characters: Vec<CharacterSheet>,
    /// Personality profile for every agent referenced by `characters`.
    pub personalities: BTreeMap<AgentId, PlayerPersonality>,
    /// Narrative-only ship configuration, if this session uses a ship.
    #[serde(default)]
    pub ship: Option<ShipConfig>,
}

impl SessionRoster {
    /// Load and validate a roster from a YAML file.
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the file cannot be read,
    /// [`EngineError::Roster`] if the YAML is malformed or validation
    /// fails.
    pub fn from_file(path: &str) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse and validate a roster from a YAML string.
    ///
    /// # Errors
    /// Returns [`EngineError::Roster`] if the YAML is malformed or
    /// validation fails.
    pub fn parse(yaml: &str) -> Result<Self, EngineError> {
        let roster: Self =
            serde_yml::from_str(yaml).map_err(|err| EngineError::Roster {
                message: format!("failed to parse roster YAML: {err}"),
            })?;
        roster.validate()?;
        Ok(roster)
    }

    /// Validate every character sheet, every personality, and the ship
    /// configuration (if present), and confirm every character's agent
    /// has a personality entry.
    ///
    /// # Errors
    /// Returns [`EngineError::Roster`] on the first failing check.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.characters.is_empty() {
            return Err(EngineError::Roster {
                message: "roster has no characters".to_owned(),
            });
        }

        for sheet in &self.characters {
            sheet.validate().map_err(|err| EngineError::Roster {
                message: format!("character {}: {err}", sheet.character_id),
            })?;

            if !self.personalities.contains_key(&sheet.agent_id) {
                return Err(EngineError::Roster {
                    message: format!(
                        "character {} references agent {} with no personality entry",
                        sheet.character_id, sheet.agent_id
                    ),
                });
            }
        }

        for (agent_id, personality) in &self.personalities {
            personality.validate().map_err(|err| EngineError::Roster {
                message: format!("agent {agent_id}: {err}"),
            })?;
        }

        if let Some(ship) = &self.ship {
            ship.validate().map_err(|err| EngineError::Roster {
                message: format!("ship config: {err}"),
            })?;
        }

        Ok(())
    }

    /// Map every character to the agent that controls it, for the
    /// message router's `char_owner` resolution.
    #[must_use]
    pub fn character_owners(&self) -> BTreeMap<CharacterId, AgentId> {
        self.characters
            .iter()
            .map(|sheet| (sheet.character_id, sheet.agent_id))
            .collect()
    }

    /// Map every character to its sheet, for reaction-prompt construction.
    #[must_use]
    pub fn characters_by_id(&self) -> BTreeMap<CharacterId, CharacterSheet> {
        self.characters
            .iter()
            .map(|sheet| (sheet.character_id, sheet.clone()))
            .collect()
    }

    /// The distinct agents active in this session, in roster order, for
    /// `GameState::new`'s `active_agents` parameter.
    #[must_use]
    pub fn active_agents(&self) -> Vec<AgentId> {
        let mut seen = std::collections::BTreeSet::new();
        self.characters
            .iter()
            .filter(|sheet| seen.insert(sheet.agent_id))
            .map(|sheet| sheet.agent_id)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
characters:
  - character_id: char_zara_7
    agent_id: agent_alex
    name: Zara-7
    style: android
    role: engineer
    number: 3
    character_goal: Keep the ship flying
    equipment: [toolkit]
    speech_patterns: []
    mannerisms: []
personalities:
  agent_alex:
    analytical_score: 0.5
    risk_tolerance: 0.5
    detail_oriented: 0.8
    emotional_memory: 0.3
    assertiveness: 0.6
    cooperativeness: 0.7
    openness: 0.4
    rule_adherence: 0.5
    roleplay_intensity: 0.9
    base_decay_rate: 0.2
"#
    }

    #[test]
    fn valid_roster_parses() {
        let roster = SessionRoster::parse(sample_yaml()).unwrap();
        assert_eq!(roster.characters.len(), 1);
        assert_eq!(roster.active_agents().len(), 1);
    }

    #[test]
    fn missing_personality_is_rejected() {
        let yaml = r"
characters:
  - character_id: char_zara_7
    agent_id: agent_alex
    name: Zara-7
    style: android
    role: engineer
    number: 3
    character_goal: Keep the ship flying
    equipment: []
    speech_patterns: []
    mannerisms: []
personalities: {}
";
        let result = SessionRoster::parse(yaml);
        assert!(matches!(result, Err(EngineError::Roster { .. })));
    }

    #[test]
    fn empty_roster_is_rejected() {
        let yaml = "characters: []\npersonalities: {}\n";
        let result = SessionRoster::parse(yaml);
        assert!(matches!(result, Err(EngineError::Roster { .. })));
    }

    #[test]
    fn character_owners_maps_character_to_agent() {
        let roster = SessionRoster::parse(sample_yaml()).unwrap();
        let owners = roster.character_owners();
        let zara = CharacterId::new("char_zara_7").unwrap();
        assert_eq!(owners.get(&zara).copied(), Some(AgentId::new("agent_alex").unwrap()));
    }
}
