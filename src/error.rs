//! Error types for the store and the upstream chat-completion client.
//!
//! HTTP status mapping lives in [`crate::server::error`].

use thiserror::Error;

/// Errors from the conversation store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: u64 },

    #[error("Conversation not found: {conversation_id}")]
    ConversationNotFound { conversation_id: u64 },

    #[error("Conversation not found for user: {user_id}")]
    NoConversationForUser { user_id: u64 },

    #[error("Milestone not found: {milestone_id}")]
    MilestoneNotFound { milestone_id: String },

    #[error("Username already exists: {username}")]
    UsernameTaken { username: String },

    #[error("Conversation already exists for user: {user_id}")]
    ConversationExists { user_id: u64 },

    /// A reply is already being produced for this conversation.
    #[error("Conversation {conversation_id} is waiting for a reply")]
    ReplyPending { conversation_id: u64 },
}

/// Errors that abort a conversation turn. Upstream failures are not among
/// them; those degrade to the fallback reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("Message content cannot be empty")]
    EmptyMessage,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the upstream chat-completion endpoint.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("API key not set. Set OPENROUTER_API_KEY.")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited by upstream for model {model} (429)")]
    RateLimited { model: String },

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed completion body: {0}")]
    MalformedResponse(String),
}

impl ProxyError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProxyError::Transport(_) | ProxyError::Timeout | ProxyError::RateLimited { .. } => true,
            ProxyError::Upstream { status, .. } => *status >= 500,
            ProxyError::MissingApiKey | ProxyError::MalformedResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Transport(e.to_string())
        }
    }
}
