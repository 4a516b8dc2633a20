//! Conversation storage.
//!
//! # Architecture
//!
//! ```text
//! axum handlers / Companion
//!   ↓  Arc<dyn ConversationStore>
//! ConversationStore (async trait)
//!   ↓
//! MemoryStore (parking_lot::RwLock<HashMap>)
//! ```
//!
//! Every mutating call returns the updated conversation or a
//! [`StoreError`] naming what was missing.

pub mod memory;

use async_trait::async_trait;

use crate::conversation::{Conversation, Message, NewConversation, User};
use crate::error::StoreError;
use crate::milestone::Milestone;
use crate::mood::Mood;

pub use memory::MemoryStore;

/// Boxed mutation applied atomically by [`ConversationStore::update`].
pub type ConversationUpdate = Box<dyn FnOnce(&mut Conversation) + Send>;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    // --- Users ---

    async fn create_user(&self, username: &str, password: &str) -> Result<User, StoreError>;

    async fn get_user(&self, id: u64) -> Option<User>;

    async fn get_user_by_username(&self, username: &str) -> Option<User>;

    // --- Conversations ---

    /// Fails if the user is unknown or already has a conversation.
    async fn create_conversation(&self, init: NewConversation) -> Result<Conversation, StoreError>;

    async fn get_conversation(&self, id: u64) -> Option<Conversation>;

    async fn get_conversation_by_user(&self, user_id: u64) -> Option<Conversation>;

    /// Apply an arbitrary mutation under the write lock.
    async fn update(&self, id: u64, f: ConversationUpdate) -> Result<Conversation, StoreError>;

    async fn add_message(&self, id: u64, message: Message) -> Result<Conversation, StoreError> {
        self.update(id, Box::new(move |c| c.push_message(message))).await
    }

    async fn set_mood(&self, id: u64, mood: Mood) -> Result<Conversation, StoreError> {
        self.update(id, Box::new(move |c| c.set_mood(mood))).await
    }

    /// The score is clamped to `[0, 100]`.
    async fn set_affection(&self, id: u64, affection: i32) -> Result<Conversation, StoreError> {
        self.update(id, Box::new(move |c| c.set_affection(affection))).await
    }

    /// A milestone whose id is already present is ignored.
    async fn add_milestone(&self, id: u64, milestone: Milestone) -> Result<Conversation, StoreError> {
        self.update(id, Box::new(move |c| {
            c.add_milestone(milestone);
        }))
        .await
    }

    async fn set_milestone_achieved(
        &self,
        id: u64,
        milestone_id: &str,
        achieved: bool,
    ) -> Result<Conversation, StoreError>;

    /// Mark the conversation as awaiting a reply. Fails with
    /// [`StoreError::ReplyPending`] if it already is.
    async fn begin_reply(&self, id: u64) -> Result<Conversation, StoreError>;

    /// Clear the awaiting-reply flag.
    async fn end_reply(&self, id: u64) -> Result<Conversation, StoreError> {
        self.update(id, Box::new(|c| {
            c.is_typing = false;
            c.touch();
        }))
        .await
    }
}
