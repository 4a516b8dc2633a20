//! # Companion
//!
//! Backend for a tsundere anime chat companion. A user has one persistent
//! conversation; every message nudges the companion's mood and affection,
//! replies come from an OpenAI-compatible upstream (OpenRouter by default)
//! and are split into short chat bubbles delivered with typing pauses.
//!
//! ```text
//! axum router (server)
//!   ├─ ConversationStore (store)      - users, conversations, typing flag
//!   └─ Companion (chat)               - one turn
//!        ├─ MoodClassifier (mood)
//!        ├─ ChatProxy → ChatCompletion (llms) with Persona prompt (persona)
//!        ├─ ResponseChunker (chunker)
//!        └─ affection / MilestoneTrigger (affection, milestone)
//! ```

pub mod affection;
pub mod chat;
pub mod chunker;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llms;
pub mod milestone;
pub mod mood;
pub mod persona;
pub mod server;
pub mod store;

#[cfg(test)]
mod testing;

pub use affection::RelationshipLevel;
pub use chat::{ChatProxy, Companion, TurnOutcome, FALLBACK_REPLY};
pub use chunker::{ChunkerConfig, ResponseChunker};
pub use config::AppConfig;
pub use conversation::{Conversation, Message, Sender, User};
pub use error::{ProxyError, StoreError, TurnError};
pub use llms::{ChatCompletion, ChatMessage, OpenRouterClient};
pub use milestone::{Milestone, MilestoneTrigger};
pub use mood::{Mood, MoodClassifier, MoodShift};
pub use persona::Persona;
pub use store::{ConversationStore, MemoryStore};

/// Crate version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
