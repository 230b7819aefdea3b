//! The message router (spec.md §4.2).

use std::collections::{BTreeMap, BTreeSet};

use lf_types::{Channel, CharacterId, IcSummary, Message, Recipient, Sender};
use uuid::Uuid;

use crate::error::RouterError;
use crate::store::ChannelLog;
use crate::summary::derive_ic_summary;

/// Enforces channel visibility and dispatches publish/fetch operations to a
/// [`ChannelLog`] backend.
///
/// This is the *only* gateway onto channel storage: per spec.md §4.2,
/// enforcement lives here, not in the caller, and `lf-core` never touches a
/// `ChannelLog` implementation directly.
pub struct Router<S: ChannelLog> {
    store: S,
    /// Which agent controls each character, used to validate P2C ownership.
    character_owners: BTreeMap<CharacterId, lf_types::AgentId>,
    /// Messages already published, used to reject duplicate publication
    /// (spec.md §4.3: "duplicate publication is forbidden").
    published: tokio::sync::Mutex<BTreeSet<Uuid>>,
}

impl<S: ChannelLog> Router<S> {
    /// Construct a router over `store` with the given agent-to-character
    /// ownership map.
    #[must_use]
    pub fn new(store: S, character_owners: BTreeMap<CharacterId, lf_types::AgentId>) -> Self {
        Self {
            store,
            character_owners,
            published: tokio::sync::Mutex::new(BTreeSet::new()),
        }
    }

    /// Publish a message, enforcing per-channel invariants (spec.md §4.2).
    pub async fn publish(&self, session_id: Uuid, message: Message) -> Result<(), RouterError> {
        {
            let mut published = self.published.lock().await;
            if !published.insert(message.message_id.into_inner()) {
                return Err(RouterError::DuplicatePublication(
                    message.message_id.to_string(),
                ));
            }
        }

        match message.channel {
            Channel::Ic => {
                let character_id = ic_subject_character(&message)?;
                let summary = derive_ic_summary(&message, &character_id);
                self.store
                    .append_ic(session_id, message, summary)
                    .await
            }
            Channel::Ooc => self.store.append_ooc(session_id, message).await,
            Channel::P2c => {
                let character_id = self.validate_p2c(&message)?;
                self.store.append_p2c(session_id, character_id, message).await
            }
        }
    }

    /// Validate a P2C message addresses exactly one character owned by its sender.
    fn validate_p2c(&self, message: &Message) -> Result<CharacterId, RouterError> {
        let Some(Recipient::Character(character_id)) = &message.to else {
            return Err(RouterError::P2cRequiresSingleRecipient);
        };
        let Sender::Agent(sender_agent) = &message.from else {
            return Err(RouterError::P2cRequiresSingleRecipient);
        };
        match self.character_owners.get(character_id) {
            Some(owner) if owner == sender_agent => Ok(character_id.clone()),
            Some(_) => Err(RouterError::P2cWrongOwner {
                agent: sender_agent.to_string(),
                character: character_id.to_string(),
            }),
            None => Err(RouterError::P2cWrongOwner {
                agent: sender_agent.to_string(),
                character: character_id.to_string(),
            }),
        }
    }

    /// Return the most recent IC entries plus P2C entries addressed to this
    /// character, in timestamp order (spec.md §4.2).
    pub async fn fetch_for_character(
        &self,
        session_id: Uuid,
        character_id: &CharacterId,
        limit: usize,
    ) -> Result<Vec<Message>, RouterError> {
        let mut ic = self.store.recent_ic(session_id, limit).await?;
        let mut p2c = self
            .store
            .recent_p2c_for(session_id, character_id, limit)
            .await?;
        ic.append(&mut p2c);
        ic.sort_by_key(|m| m.timestamp);
        if ic.len() > limit {
            let start = ic.len() - limit;
            ic = ic.split_off(start);
        }
        Ok(ic)
    }

    /// Return the most recent OOC entries plus IC summaries; never full IC
    /// bodies (spec.md §4.2).
    pub async fn fetch_for_player(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> Result<(Vec<Message>, Vec<IcSummary>), RouterError> {
        let ooc = self.store.recent_ooc(session_id, limit).await?;
        let summaries = self.store.recent_ic_summaries(session_id, limit).await?;
        Ok((ooc, summaries))
    }

    /// Idempotent purge across channels and the P2C index (spec.md §4.2).
    pub async fn clear_session(&self, session_id: Uuid) -> Result<(), RouterError> {
        self.store.clear_session(session_id).await
    }
}

/// The character an IC message's summary should be attributed to.
fn ic_subject_character(message: &Message) -> Result<CharacterId, RouterError> {
    match &message.from {
        Sender::Character(id) => Ok(id.clone()),
        Sender::Dm => match &message.to {
            Some(Recipient::Character(id)) => Ok(id.clone()),
            _ => Err(RouterError::Permission(
                "DM-authored IC entries must name the subject character via `to`".to_string(),
            )),
        },
        Sender::Agent(_) => Err(RouterError::Permission(
            "agents may not author IC messages directly".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lf_types::{AgentId, MessageId};

    use super::*;
    use crate::store::InMemoryChannelLog;

    fn router() -> Router<InMemoryChannelLog> {
        let mut owners = BTreeMap::new();
        owners.insert(
            CharacterId::new("char_zara_7").expect("valid"),
            AgentId::new("agent_alex").expect("valid"),
        );
        Router::new(InMemoryChannelLog::new(), owners)
    }

    fn ic_message(content: &str) -> Message {
        Message {
            message_id: MessageId::new(),
            timestamp: Utc::now(),
            channel: Channel::Ic,
            from: Sender::Character(CharacterId::new("char_zara_7").expect("valid")),
            to: None,
            content: content.to_string(),
            turn_number: 1,
            session_number: 1,
        }
    }

    #[tokio::test]
    async fn publishing_ic_is_visible_to_its_character() {
        let router = router();
        let session_id = Uuid::now_v7();
        let message = ic_message("I attempt to repair the console.");
        router.publish(session_id, message.clone()).await.expect("publish");

        let character_id = CharacterId::new("char_zara_7").expect("valid");
        let visible = router
            .fetch_for_character(session_id, &character_id, 10)
            .await
            .expect("fetch");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content, message.content);
    }

    #[tokio::test]
    async fn player_never_receives_full_ic_body() {
        let router = router();
        let session_id = Uuid::now_v7();
        router
            .publish(session_id, ic_message("I attempt to repair the console."))
            .await
            .expect("publish");

        let (ooc, summaries) = router.fetch_for_player(session_id, 10).await.expect("fetch");
        assert!(ooc.is_empty());
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].action_summary.len() <= "I attempt to repair the console.".len());
    }

    #[tokio::test]
    async fn ooc_never_visible_to_character_fetch() {
        let router = router();
        let session_id = Uuid::now_v7();
        let ooc_message = Message {
            message_id: MessageId::new(),
            timestamp: Utc::now(),
            channel: Channel::Ooc,
            from: Sender::Agent(AgentId::new("agent_alex").expect("valid")),
            to: None,
            content: "Let's try the console.".to_string(),
            turn_number: 1,
            session_number: 1,
        };
        router.publish(session_id, ooc_message).await.expect("publish");

        let character_id = CharacterId::new("char_zara_7").expect("valid");
        let visible = router
            .fetch_for_character(session_id, &character_id, 10)
            .await
            .expect("fetch");
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn p2c_rejects_wrong_owner() {
        let router = router();
        let session_id = Uuid::now_v7();
        let message = Message {
            message_id: MessageId::new(),
            timestamp: Utc::now(),
            channel: Channel::P2c,
            from: Sender::Agent(AgentId::new("agent_morgan").expect("valid")),
            to: Some(Recipient::Character(
                CharacterId::new("char_zara_7").expect("valid"),
            )),
            content: "Go left.".to_string(),
            turn_number: 1,
            session_number: 1,
        };
        let result = router.publish(session_id, message).await;
        assert!(matches!(result, Err(RouterError::P2cWrongOwner { .. })));
    }

    #[tokio::test]
    async fn p2c_visible_only_to_addressed_character() {
        let router = router();
        let session_id = Uuid::now_v7();
        let message = Message {
            message_id: MessageId::new(),
            timestamp: Utc::now(),
            channel: Channel::P2c,
            from: Sender::Agent(AgentId::new("agent_alex").expect("valid")),
            to: Some(Recipient::Character(
                CharacterId::new("char_zara_7").expect("valid"),
            )),
            content: "Go left.".to_string(),
            turn_number: 1,
            session_number: 1,
        };
        router.publish(session_id, message).await.expect("publish");

        let character_id = CharacterId::new("char_zara_7").expect("valid");
        let visible = router
            .fetch_for_character(session_id, &character_id, 10)
            .await
            .expect("fetch");
        assert_eq!(visible.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_publication_is_rejected() {
        let router = router();
        let session_id = Uuid::now_v7();
        let message = ic_message("I attempt to repair the console.");
        router.publish(session_id, message.clone()).await.expect("publish");
        let result = router.publish(session_id, message).await;
        assert!(matches!(result, Err(RouterError::DuplicatePublication(_))));
    }

    #[tokio::test]
    async fn clear_session_purges_all_channels() {
        let router = router();
        let session_id = Uuid::now_v7();
        router
            .publish(session_id, ic_message("I attempt to repair the console."))
            .await
            .expect("publish");
        router.clear_session(session_id).await.expect("clear");

        let character_id = CharacterId::new("char_zara_7").expect("valid");
        let visible = router
            .fetch_for_character(session_id, &character_id, 10)
            .await
            .expect("fetch");
        assert!(visible.is_empty());
    }
}
