//! Conversation session data model.
//!
//! A [`Conversation`] is the explicit session object for one user: the
//! ordered message log plus the companion's mood, affection and milestones.
//! Everything that mutates a session goes through the store, which hands the
//! conversation out by value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::affection::{self, RelationshipLevel, INITIAL_AFFECTION};
use crate::milestone::Milestone;
use crate::mood::{Mood, MoodShift};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "luna")]
    Companion,
}

/// One chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn companion(content: impl Into<String>) -> Self {
        Self::new(Sender::Companion, content)
    }
}

/// A registered user. The password digest never leaves the store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip)]
    pub password_digest: String,
    #[serde(skip)]
    pub password_salt: String,
}

/// Initial values for a new conversation. Missing fields take the defaults
/// of a fresh session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    pub user_id: u64,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub affection: Option<i32>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl NewConversation {
    pub fn for_user(user_id: u64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}

/// Per-user chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: u64,
    pub user_id: u64,
    pub messages: Vec<Message>,
    pub mood: Mood,
    pub affection: i32,
    pub milestones: Vec<Milestone>,
    /// Set while a companion reply is being produced.
    #[serde(default)]
    pub is_typing: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: u64, init: NewConversation) -> Self {
        let now = Utc::now();
        let mut milestones: Vec<Milestone> = Vec::with_capacity(init.milestones.len());
        for m in init.milestones {
            if !milestones.iter().any(|e| e.id == m.id) {
                milestones.push(m);
            }
        }
        Self {
            id,
            user_id: init.user_id,
            messages: init.messages,
            mood: init.mood,
            affection: affection::clamp(init.affection.unwrap_or(INITIAL_AFFECTION)),
            milestones,
            is_typing: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn level(&self) -> RelationshipLevel {
        affection::level_for(self.affection)
    }

    pub fn milestone(&self, id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn set_mood(&mut self, mood: Mood) {
        self.mood = mood;
        self.touch();
    }

    /// Store `score` clamped into range.
    pub fn set_affection(&mut self, score: i32) {
        self.affection = affection::clamp(score);
        self.touch();
    }

    pub fn adjust_affection(&mut self, delta: i32) {
        self.set_affection(affection::adjust(self.affection, delta));
    }

    pub fn apply_mood_shift(&mut self, shift: MoodShift) {
        self.mood = shift.mood;
        self.adjust_affection(shift.affection_delta);
    }

    /// Adds the milestone unless one with the same id exists. Returns whether
    /// it was added.
    pub fn add_milestone(&mut self, milestone: Milestone) -> bool {
        if self.milestone(&milestone.id).is_some() {
            return false;
        }
        self.milestones.push(milestone);
        self.touch();
        true
    }

    /// Returns `false` when no milestone has that id.
    pub fn set_milestone_achieved(&mut self, id: &str, achieved: bool) -> bool {
        match self.milestones.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.achieved = achieved;
                self.touch();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_defaults() {
        let c = Conversation::new(1, NewConversation::for_user(7));
        assert_eq!(c.user_id, 7);
        assert_eq!(c.mood, Mood::Neutral);
        assert_eq!(c.affection, 35);
        assert_eq!(c.level(), RelationshipLevel::Acquaintances);
        assert!(c.messages.is_empty());
        assert!(!c.is_typing);
    }

    #[test]
    fn test_initial_values_are_clamped_and_deduped() {
        let init = NewConversation {
            user_id: 1,
            affection: Some(250),
            milestones: vec![
                Milestone::new("friend", "Friends", "a", true),
                Milestone::new("friend", "Friends", "b", false),
            ],
            ..Default::default()
        };
        let c = Conversation::new(1, init);
        assert_eq!(c.affection, 100);
        assert_eq!(c.milestones.len(), 1);
        assert_eq!(c.milestones[0].description, "a");
    }

    #[test]
    fn test_mood_shift_adjusts_affection() {
        let mut c = Conversation::new(1, NewConversation::for_user(1));
        c.apply_mood_shift(MoodShift {
            mood: Mood::Angry,
            affection_delta: -50,
        });
        assert_eq!(c.mood, Mood::Angry);
        assert_eq!(c.affection, 0);
    }

    #[test]
    fn test_milestone_unique_by_id() {
        let mut c = Conversation::new(1, NewConversation::for_user(1));
        assert!(c.add_milestone(Milestone::new("friend", "Friends", "", true)));
        assert!(!c.add_milestone(Milestone::new("friend", "Friends", "", true)));
        assert_eq!(c.milestones.len(), 1);

        assert!(c.set_milestone_achieved("friend", false));
        assert!(!c.milestone("friend").unwrap().achieved);
        assert!(!c.set_milestone_achieved("nope", true));
    }

    #[test]
    fn test_sender_accepts_legacy_label() {
        let s: Sender = serde_json::from_str("\"luna\"").unwrap();
        assert_eq!(s, Sender::Companion);
        assert_eq!(serde_json::to_string(&Sender::Companion).unwrap(), "\"companion\"");
    }

    #[test]
    fn test_conversation_json_is_camel_case() {
        let c = Conversation::new(3, NewConversation::for_user(9));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["userId"], 9);
        assert_eq!(json["isTyping"], false);
        assert_eq!(json["mood"], "neutral");
        assert!(json.get("createdAt").is_some());
    }
}
