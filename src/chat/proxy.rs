//! Chat proxy: persona prompt + history → upstream → reply text.
//!
//! Upstream failures never reach the caller. Any error (or a blank reply) is
//! logged and replaced by [`FALLBACK_REPLY`], so the conversation log stays
//! well-formed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::conversation::{Message, Sender};
use crate::llms::{ChatCompletion, TokenUsage};
use crate::mood::Mood;
use crate::persona::{build_messages, Persona};

/// In-character apology used whenever the upstream call fails.
pub const FALLBACK_REPLY: &str = "Hmph! (￣ヘ￣) My internet connection seems to be down right now. \
Don't get the wrong idea - I'll talk to you when it's back up. \
It's not like I miss our conversations or anything...";

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub mood: Option<String>,
}

/// A history item as sent by the client; ids and timestamps are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub sender: Sender,
    pub content: String,
}

impl From<HistoryEntry> for Message {
    fn from(entry: HistoryEntry) -> Self {
        Message::new(entry.sender, entry.content)
    }
}

/// Reply returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyReply {
    pub message: String,
    pub usage: Option<TokenUsage>,
    /// `true` when `message` is the fallback apology.
    pub fallback: bool,
}

impl ProxyReply {
    fn fallback() -> Self {
        Self {
            message: FALLBACK_REPLY.to_string(),
            usage: None,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatProxy {
    backend: Arc<dyn ChatCompletion>,
    persona: Persona,
}

impl ChatProxy {
    pub fn new(backend: Arc<dyn ChatCompletion>, persona: Persona) -> Self {
        Self { backend, persona }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Ask the upstream model for the companion's answer to `prompt`.
    pub async fn reply(&self, prompt: &str, history: &[Message], mood: Mood) -> ProxyReply {
        let messages = build_messages(&self.persona, mood, history, prompt);

        match self.backend.complete(&messages).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                tracing::debug!(
                    provider = self.backend.provider(),
                    model = %completion.model,
                    "completion received"
                );
                ProxyReply {
                    message: completion.text,
                    usage: completion.usage,
                    fallback: false,
                }
            }
            Ok(_) => {
                tracing::warn!(provider = self.backend.provider(), "blank completion, using fallback reply");
                ProxyReply::fallback()
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.backend.provider(),
                    model = self.backend.model(),
                    error = %e,
                    "completion failed, using fallback reply"
                );
                ProxyReply::fallback()
            }
        }
    }
}
