//! Messages and the channel sender/recipient identity (spec.md §3, §4.2, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::Channel;
use crate::ids::{AgentId, CharacterId, MessageId};

/// The identity of a message's author.
///
/// A sealed variant rather than a bare string, per spec.md §9.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Sender {
    /// A player-layer agent.
    Agent(AgentId),
    /// A roleplay-layer character.
    Character(CharacterId),
    /// The game master.
    Dm,
}

/// A message's restricted recipient, when it has one.
///
/// OOC and full IC bodies have no single addressee; P2C always addresses
/// exactly one character (spec.md §3, §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Recipient {
    /// Addressed to a specific agent.
    Agent(AgentId),
    /// Addressed to a specific character. Used for P2C directives.
    Character(CharacterId),
}

/// An append-only channel message (spec.md §3 `Message`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, assigned at publish time.
    pub message_id: MessageId,
    /// Wall-clock publish time.
    pub timestamp: DateTime<Utc>,
    /// Which channel this message belongs to.
    pub channel: Channel,
    /// Who authored the message.
    pub from: Sender,
    /// The restricted recipient, required and singleton for P2C, absent otherwise.
    pub to: Option<Recipient>,
    /// The message body.
    pub content: String,
    /// The turn this message was published during.
    pub turn_number: u32,
    /// The session this message was published during.
    pub session_number: u32,
}

/// A deterministic, pure projection of an IC [`Message`] for the player layer
/// (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcSummary {
    /// The character whose action this summarizes.
    pub character_id: CharacterId,
    /// A short summary of the action taken.
    pub action_summary: String,
    /// A short summary of the resolved outcome, once known.
    pub outcome_summary: Option<String>,
    /// The turn this message was published during.
    pub turn_number: u32,
    /// Wall-clock publish time, copied from the source message.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2c_recipient_is_a_character() {
        let to = Recipient::Character(CharacterId::new("char_zara_7").expect("valid"));
        assert!(matches!(to, Recipient::Character(_)));
    }

    #[test]
    fn sender_variants_round_trip_serde() {
        let senders = vec![
            Sender::Agent(AgentId::new("agent_alex").expect("valid")),
            Sender::Character(CharacterId::new("char_zara_7").expect("valid")),
            Sender::Dm,
        ];
        for sender in senders {
            let json = serde_json::to_string(&sender).expect("serialize");
            let restored: Sender = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(sender, restored);
        }
    }
}
