//! LLM provider implementations.
//!
//! Each provider implements [`ChatCompletion`](crate::llms::base_llm::ChatCompletion)
//! and handles authentication, request formatting, retries and error mapping
//! for its API.

pub mod openrouter;
