//! Upstream LLM access.
//!
//! - [`base_llm`] - The [`ChatCompletion`] trait and shared message types
//! - [`providers`] - Concrete HTTP providers (OpenRouter / OpenAI-compatible)

pub mod base_llm;
pub mod providers;

pub use base_llm::{ChatCompletion, ChatMessage, Completion, TokenUsage};
pub use providers::openrouter::OpenRouterClient;
