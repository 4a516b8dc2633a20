//! In-memory conversation store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{ConversationStore, ConversationUpdate};
use crate::conversation::{Conversation, NewConversation, User};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<u64, User>,
    conversations: HashMap<u64, Conversation>,
    next_user_id: u64,
    next_conversation_id: u64,
}

/// Process-local store. Cloning shares the same underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_user(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.write();
        if inner.users.values().any(|u| u.username == username) {
            return Err(StoreError::UsernameTaken {
                username: username.to_string(),
            });
        }

        inner.next_user_id += 1;
        let salt = Uuid::new_v4().simple().to_string();
        let user = User {
            id: inner.next_user_id,
            username: username.to_string(),
            password_digest: password_digest(&salt, password),
            password_salt: salt,
        };
        inner.users.insert(user.id, user.clone());
        tracing::debug!(user_id = user.id, "created user");
        Ok(user)
    }

    async fn get_user(&self, id: u64) -> Option<User> {
        self.inner.read().users.get(&id).cloned()
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.inner
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    async fn create_conversation(&self, init: NewConversation) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.write();
        let user_id = init.user_id;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound { user_id });
        }
        if inner.conversations.values().any(|c| c.user_id == user_id) {
            return Err(StoreError::ConversationExists { user_id });
        }

        inner.next_conversation_id += 1;
        let conversation = Conversation::new(inner.next_conversation_id, init);
        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        tracing::debug!(conversation_id = conversation.id, user_id, "created conversation");
        Ok(conversation)
    }

    async fn get_conversation(&self, id: u64) -> Option<Conversation> {
        self.inner.read().conversations.get(&id).cloned()
    }

    async fn get_conversation_by_user(&self, user_id: u64) -> Option<Conversation> {
        self.inner
            .read()
            .conversations
            .values()
            .find(|c| c.user_id == user_id)
            .cloned()
    }

    async fn update(&self, id: u64, f: ConversationUpdate) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.write();
        let conversation = inner
            .conversations
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound { conversation_id: id })?;
        f(conversation);
        Ok(conversation.clone())
    }

    async fn set_milestone_achieved(
        &self,
        id: u64,
        milestone_id: &str,
        achieved: bool,
    ) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.write();
        let conversation = inner
            .conversations
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound { conversation_id: id })?;
        if !conversation.set_milestone_achieved(milestone_id, achieved) {
            return Err(StoreError::MilestoneNotFound {
                milestone_id: milestone_id.to_string(),
            });
        }
        Ok(conversation.clone())
    }

    async fn begin_reply(&self, id: u64) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.write();
        let conversation = inner
            .conversations
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound { conversation_id: id })?;
        if conversation.is_typing {
            return Err(StoreError::ReplyPending { conversation_id: id });
        }
        conversation.is_typing = true;
        conversation.touch();
        Ok(conversation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crate::milestone::Milestone;
    use crate::mood::Mood;

    async fn store_with_conversation() -> (MemoryStore, Conversation) {
        let store = MemoryStore::new();
        let user = store.create_user("senpai", "hunter2").await.unwrap();
        let conv = store
            .create_conversation(NewConversation::for_user(user.id))
            .await
            .unwrap();
        (store, conv)
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let store = MemoryStore::new();
        let user = store.create_user("senpai", "hunter2").await.unwrap();
        assert_eq!(user.id, 1);
        assert_ne!(user.password_digest, "hunter2");

        assert_eq!(
            store.create_user("senpai", "x").await.unwrap_err(),
            StoreError::UsernameTaken { username: "senpai".into() }
        );
        assert_eq!(store.get_user_by_username("senpai").await.unwrap().id, 1);
        assert!(store.get_user(99).await.is_none());

        assert_eq!(user.password_digest, password_digest(&user.password_salt, "hunter2"));
        assert_ne!(user.password_digest, password_digest(&user.password_salt, "hunter3"));
        assert!(store.get_user_by_username("nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_one_conversation_per_user() {
        let (store, conv) = store_with_conversation().await;
        assert_eq!(
            store
                .create_conversation(NewConversation::for_user(conv.user_id))
                .await
                .unwrap_err(),
            StoreError::ConversationExists { user_id: conv.user_id }
        );
        assert_eq!(
            store
                .create_conversation(NewConversation::for_user(42))
                .await
                .unwrap_err(),
            StoreError::UserNotFound { user_id: 42 }
        );
        assert_eq!(store.get_conversation_by_user(conv.user_id).await.unwrap().id, conv.id);
    }

    #[tokio::test]
    async fn test_mutations_return_updated_conversation() {
        let (store, conv) = store_with_conversation().await;

        let c = store.add_message(conv.id, Message::user("hi")).await.unwrap();
        assert_eq!(c.messages.len(), 1);
        assert!(c.updated_at >= conv.updated_at);

        let c = store.set_mood(conv.id, Mood::Sad).await.unwrap();
        assert_eq!(c.mood, Mood::Sad);

        let c = store.set_affection(conv.id, 140).await.unwrap();
        assert_eq!(c.affection, 100);

        let c = store
            .add_milestone(conv.id, Milestone::new("friend", "Friends", "d", true))
            .await
            .unwrap();
        let c2 = store
            .add_milestone(conv.id, Milestone::new("friend", "Friends", "d", true))
            .await
            .unwrap();
        assert_eq!(c.milestones.len(), 1);
        assert_eq!(c2.milestones.len(), 1);

        let c = store
            .set_milestone_achieved(conv.id, "friend", false)
            .await
            .unwrap();
        assert!(!c.milestones[0].achieved);
    }

    #[tokio::test]
    async fn test_not_found() {
        let (store, conv) = store_with_conversation().await;
        assert_eq!(
            store.set_mood(999, Mood::Happy).await.unwrap_err(),
            StoreError::ConversationNotFound { conversation_id: 999 }
        );
        assert_eq!(
            store
                .set_milestone_achieved(conv.id, "missing", true)
                .await
                .unwrap_err(),
            StoreError::MilestoneNotFound { milestone_id: "missing".into() }
        );
    }

    #[tokio::test]
    async fn test_reply_flag_is_exclusive() {
        let (store, conv) = store_with_conversation().await;
        assert!(store.begin_reply(conv.id).await.unwrap().is_typing);
        assert_eq!(
            store.begin_reply(conv.id).await.unwrap_err(),
            StoreError::ReplyPending { conversation_id: conv.id }
        );
        assert!(!store.end_reply(conv.id).await.unwrap().is_typing);
        assert!(store.begin_reply(conv.id).await.is_ok());
    }
}
