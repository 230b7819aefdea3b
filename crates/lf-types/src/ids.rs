//! Identifier types.
//!
//! Internal entities (messages, memory edges, worker jobs) get opaque UUIDv7
//! wrappers for efficient database indexing. Agents and characters are
//! addressed by the human-assigned string identifiers the spec fixes the
//! shape of (`agent_[a-z0-9_]+`, `char_[a-z0-9_]+`); these are validated at
//! construction so a malformed ID can never enter the system.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypesError;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a published message.
    MessageId
}

define_id! {
    /// Unique identifier for a memory edge.
    MemoryEdgeId
}

define_id! {
    /// Unique identifier for a worker job.
    JobId
}

define_id! {
    /// Unique identifier for a checkpoint row.
    CheckpointId
}

/// Validates that `raw` matches `prefix_` followed by one or more of
/// `[a-z0-9_]`.
fn validate_prefixed(raw: &str, prefix: &str) -> Result<(), TypesError> {
    let Some(rest) = raw.strip_prefix(prefix) else {
        return Err(TypesError::InvalidId {
            value: raw.to_string(),
            expected_prefix: prefix.to_string(),
        });
    };
    if rest.is_empty()
        || !rest
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err(TypesError::InvalidId {
            value: raw.to_string(),
            expected_prefix: prefix.to_string(),
        });
    }
    Ok(())
}

/// Generates a validated string-pattern newtype identifier.
macro_rules! define_pattern_id {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct from a raw string.
            pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
                let raw = raw.into();
                validate_prefixed(&raw, $prefix)?;
                Ok(Self(raw))
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypesError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_pattern_id! {
    /// Identifier for a human player's agent, matching `agent_[a-z0-9_]+`.
    AgentId, "agent_"
}

define_pattern_id! {
    /// Identifier for a roleplay character, matching `char_[a-z0-9_]+`.
    CharacterId, "char_"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_distinct_types() {
        let message = MessageId::new();
        let job = JobId::new();
        assert_ne!(message.into_inner(), Uuid::nil());
        assert_ne!(job.into_inner(), Uuid::nil());
    }

    #[test]
    fn uuid_id_roundtrip_serde() {
        let original = MemoryEdgeId::new();
        let json = serde_json::to_string(&original).expect("serialize");
        let restored: MemoryEdgeId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(original, restored);
    }

    #[test]
    fn agent_id_accepts_valid_pattern() {
        assert!(AgentId::new("agent_alex").is_ok());
        assert!(AgentId::new("agent_alex_2").is_ok());
    }

    #[test]
    fn agent_id_rejects_bad_prefix_and_case() {
        assert!(AgentId::new("character_alex").is_err());
        assert!(AgentId::new("agent_Alex").is_err());
        assert!(AgentId::new("agent_").is_err());
        assert!(AgentId::new("char_zara").is_err());
    }

    #[test]
    fn character_id_accepts_valid_pattern() {
        assert!(CharacterId::new("char_zara_7").is_ok());
    }

    #[test]
    fn character_id_serde_roundtrip() {
        let id = CharacterId::new("char_zara_7").expect("valid");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"char_zara_7\"");
        let restored: CharacterId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, restored);
    }

    #[test]
    fn character_id_rejects_malformed_json() {
        let result: Result<CharacterId, _> = serde_json::from_str("\"agent_alex\"");
        assert!(result.is_err());
    }
}
