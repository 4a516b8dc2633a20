//! Chat module - the conversation turn and the upstream proxy.
//!
//! ```text
//! User message
//!   → Mood classifier (mood + affection delta)
//!   → ChatProxy (persona prompt + history → upstream, fallback on error)
//!   → Response chunker (display-sized bubbles)
//!   → Paced appends to the conversation
//!   → Content bonus + milestone check
//! ```

pub mod companion;
pub mod proxy;

pub use companion::{Companion, ContentBonus, TurnOutcome, TypingPacer};
pub use proxy::{ChatProxy, ChatRequest, HistoryEntry, ProxyReply, FALLBACK_REPLY};
