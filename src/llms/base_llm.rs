//! Chat-completion abstraction.
//!
//! Provides the trait every upstream completion backend implements, plus the
//! message and usage types shared between the prompt builder, the providers
//! and the chat proxy.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProxyError;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Token counts reported by the upstream provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Model that produced the text (may differ from the primary model when
    /// a fallback model answered).
    pub model: String,
    pub usage: Option<TokenUsage>,
}

// ---------------------------------------------------------------------------
// ChatCompletion trait
// ---------------------------------------------------------------------------

/// Upstream chat-completion backend.
///
/// Implementations own retries and timeouts; callers see either the final
/// text or the last error.
#[async_trait]
pub trait ChatCompletion: Send + Sync + fmt::Debug {
    /// Provider name, used in logs.
    fn provider(&self) -> &str;

    /// Primary model identifier.
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ProxyError>;
}
