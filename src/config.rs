//! Runtime configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` | `5000` |
//! | `OPENROUTER_API_KEY` | unset |
//! | `OPENROUTER_BASE_URL` | `https://openrouter.ai/api/v1` |
//! | `COMPANION_MODEL` | `mistralai/mistral-small-24b-instruct-2501:free` |
//! | `COMPANION_FALLBACK_MODELS` | empty (comma-separated) |
//! | `COMPANION_NAME` | `Luna` |
//! | `COMPANION_REFERER` | `http://localhost` |
//! | `COMPANION_TITLE` | `{name} AI Companion` |
//! | `CHAT_TIMEOUT_SECS` | `30` |
//! | `CHAT_MAX_ATTEMPTS` | `3` |
//! | `CHAT_RETRY_BACKOFF_MS` | `1000` |
//! | `CHUNK_SINGLE_MESSAGE_LIMIT` | `100` |
//! | `CHUNK_MAX_LEN` | `120` |
//! | `TYPING_DELAY_MIN_MS` | `1000` |
//! | `TYPING_DELAY_MAX_MS` | `2000` |

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::chunker::{ChunkerConfig, DEFAULT_MAX_CHUNK_LEN, DEFAULT_SINGLE_MESSAGE_LIMIT};
use crate::llms::providers::openrouter::DEFAULT_BASE_URL;

pub const DEFAULT_MODEL: &str = "mistralai/mistral-small-24b-instruct-2501:free";

/// Settings for the upstream chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub fallback_models: Vec<String>,
    pub referer: String,
    pub title: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Bounds of the randomized pause between consecutive reply chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingDelay {
    pub min: Duration,
    pub max: Duration,
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub companion_name: String,
    pub upstream: UpstreamConfig,
    pub chunker: ChunkerConfig,
    pub typing_delay: TypingDelay,
}

impl AppConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset or unparsable values fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let companion_name = lookup("COMPANION_NAME")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Luna".to_string());

        let fallback_models = lookup("COMPANION_FALLBACK_MODELS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let upstream = UpstreamConfig {
            api_key: lookup("OPENROUTER_API_KEY").filter(|k| !k.is_empty()),
            base_url: lookup("OPENROUTER_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: lookup("COMPANION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            fallback_models,
            referer: lookup("COMPANION_REFERER").unwrap_or_else(|| "http://localhost".to_string()),
            title: lookup("COMPANION_TITLE")
                .unwrap_or_else(|| format!("{} AI Companion", companion_name)),
            timeout: Duration::from_secs(parse_or(&lookup, "CHAT_TIMEOUT_SECS", 30)),
            max_attempts: parse_or(&lookup, "CHAT_MAX_ATTEMPTS", 3u32).max(1),
            retry_backoff: Duration::from_millis(parse_or(&lookup, "CHAT_RETRY_BACKOFF_MS", 1000)),
            temperature: 0.85,
            max_tokens: 250,
        };

        let chunker = ChunkerConfig {
            single_message_limit: parse_or(
                &lookup,
                "CHUNK_SINGLE_MESSAGE_LIMIT",
                DEFAULT_SINGLE_MESSAGE_LIMIT,
            ),
            max_chunk_len: parse_or(&lookup, "CHUNK_MAX_LEN", DEFAULT_MAX_CHUNK_LEN).max(1),
        };

        let min = parse_or(&lookup, "TYPING_DELAY_MIN_MS", 1000u64);
        let max = parse_or(&lookup, "TYPING_DELAY_MAX_MS", 2000u64).max(min);

        Self {
            port: parse_or(&lookup, "PORT", 5000),
            companion_name,
            upstream,
            chunker,
            typing_delay: TypingDelay {
                min: Duration::from_millis(min),
                max: Duration::from_millis(max),
            },
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{}={:?} is not valid, using default {}", key, raw, default);
            default
        }),
    }
}
