//! Response chunker: splits one long reply into display-sized chat bubbles.
//!
//! Short replies pass through as a single chunk. Longer ones are cut after
//! sentence-ending punctuation (or a newline) followed by whitespace and
//! greedily re-packed up to `max_chunk_len` characters. When no usable
//! sentence breaks exist the text is word-wrapped instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A sentence terminator followed by at least one whitespace character.
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?។\n]\s+").unwrap());

pub const DEFAULT_SINGLE_MESSAGE_LIMIT: usize = 100;
pub const DEFAULT_MAX_CHUNK_LEN: usize = 120;

/// Tuning thresholds, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Replies shorter than this are never split.
    pub single_message_limit: usize,
    /// Packing target for each chunk.
    pub max_chunk_len: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            single_message_limit: DEFAULT_SINGLE_MESSAGE_LIMIT,
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseChunker {
    pub config: ChunkerConfig,
}

impl ResponseChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split `text` into ordered, non-empty chunks.
    ///
    /// Every chunk is at most `max_chunk_len` characters unless a single
    /// sentence (or a single word, in the fallback) is longer on its own.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) < self.config.single_message_limit {
            return vec![text.to_string()];
        }

        let max = self.config.max_chunk_len;
        let mut chunks = Vec::new();
        let mut current = String::new();

        for segment in split_sentences(text) {
            if !current.is_empty() && char_len(&current) + 1 + char_len(segment) > max {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(segment);
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        if chunks.len() == 1 && char_len(&chunks[0]) > max {
            return wrap_words(text, max);
        }
        chunks
    }
}

/// Chunk with the default thresholds.
pub fn chunk(text: &str) -> Vec<String> {
    ResponseChunker::default().chunk(text)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split after each sentence break, keeping the terminator with its sentence
/// and dropping the whitespace that follows. Segments are trimmed and never
/// empty.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK.find_iter(text) {
        let terminator_len = m.as_str().chars().next().map_or(0, char::len_utf8);
        let segment = text[start..m.start() + terminator_len].trim();
        if !segment.is_empty() {
            segments.push(segment);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        segments.push(tail);
    }
    segments
}

/// Greedy word wrap at `max` characters. A word longer than `max` is kept
/// whole as its own chunk.
fn wrap_words(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if !line.is_empty() && char_len(&line) + 1 + char_len(word) > max {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
