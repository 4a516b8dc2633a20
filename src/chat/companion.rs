//! Turn engine: one user message in, paced companion replies out.
//!
//! Steps per turn:
//! 1. Mark the conversation as awaiting a reply (rejects overlapping turns)
//! 2. Append the user message and apply the classifier's mood shift
//! 3. Fetch the reply through the [`ChatProxy`] (never fails)
//! 4. Chunk the reply and append each chunk, pausing between appends
//!    (the fallback apology is appended whole, as a single message)
//! 5. Content bonus (+10 for "like"/"love") and milestone check
//! 6. Clear the awaiting-reply flag, whatever happened above (also when the
//!    turn future is dropped early)

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use super::proxy::ChatProxy;
use crate::affection::RelationshipLevel;
use crate::chunker::ResponseChunker;
use crate::config::TypingDelay;
use crate::conversation::{Conversation, Message};
use crate::error::{StoreError, TurnError};
use crate::milestone::{Milestone, MilestoneTrigger};
use crate::mood::{Mood, MoodClassifier, MoodShift};
use crate::store::ConversationStore;

// ============================================================================
// Pacing
// ============================================================================

/// Randomized pause between consecutive reply chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingPacer {
    pub min: Duration,
    pub max: Duration,
}

impl Default for TypingPacer {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(2000),
        }
    }
}

impl From<TypingDelay> for TypingPacer {
    fn from(d: TypingDelay) -> Self {
        Self { min: d.min, max: d.max }
    }
}

impl TypingPacer {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

// ============================================================================
// Content bonus
// ============================================================================

/// Extra affection for messages containing any of `keywords`.
#[derive(Debug, Clone)]
pub struct ContentBonus {
    pub keywords: Vec<&'static str>,
    pub amount: i32,
}

impl Default for ContentBonus {
    fn default() -> Self {
        Self {
            keywords: vec!["like", "love"],
            amount: 10,
        }
    }
}

impl ContentBonus {
    pub fn applies_to(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

// ============================================================================
// Turn outcome
// ============================================================================

/// Result of one turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// Conversation state after the turn.
    pub conversation: Conversation,
    /// Companion messages appended, in order.
    pub replies: Vec<Message>,
    pub mood_shift: Option<MoodShift>,
    pub level: RelationshipLevel,
    /// Milestone unlocked by this turn.
    pub milestone: Option<Milestone>,
    /// Whether the replies are the fallback apology.
    pub fallback: bool,
}

// ============================================================================
// Reply guard
// ============================================================================

/// Clears the awaiting-reply flag when a turn is dropped before it finishes,
/// e.g. when the HTTP client disconnects mid-turn.
struct ReplyGuard {
    store: Arc<dyn ConversationStore>,
    conversation_id: u64,
    armed: bool,
}

impl ReplyGuard {
    fn new(store: Arc<dyn ConversationStore>, conversation_id: u64) -> Self {
        Self {
            store,
            conversation_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ReplyGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let conversation_id = self.conversation_id;
        tracing::warn!(conversation_id, "turn cancelled, clearing reply flag");

        let store = self.store.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.end_reply(conversation_id).await {
                        tracing::error!(conversation_id, error = %e, "failed to clear reply flag");
                    }
                });
            }
            Err(_) => {
                tracing::error!(conversation_id, "no runtime to clear reply flag");
            }
        }
    }
}

// ============================================================================
// Companion
// ============================================================================

pub struct Companion {
    store: Arc<dyn ConversationStore>,
    proxy: ChatProxy,
    classifier: MoodClassifier,
    chunker: ResponseChunker,
    pacer: TypingPacer,
    bonus: ContentBonus,
    trigger: MilestoneTrigger,
}

impl Companion {
    pub fn new(store: Arc<dyn ConversationStore>, proxy: ChatProxy) -> Self {
        let trigger = MilestoneTrigger::friend(&proxy.persona().name);
        Self {
            store,
            proxy,
            classifier: MoodClassifier::default(),
            chunker: ResponseChunker::default(),
            pacer: TypingPacer::default(),
            bonus: ContentBonus::default(),
            trigger,
        }
    }

    pub fn with_chunker(mut self, chunker: ResponseChunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_pacer(mut self, pacer: TypingPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_classifier(mut self, classifier: MoodClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn proxy(&self) -> &ChatProxy {
        &self.proxy
    }

    /// Run one full turn for `content` in conversation `conversation_id`.
    pub async fn send_message(
        &self,
        conversation_id: u64,
        content: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let before = self.store.begin_reply(conversation_id).await?;
        let guard = ReplyGuard::new(self.store.clone(), conversation_id);
        let result = self.run_turn(before, content).await;

        // The flag must clear even when the turn failed part-way.
        let after = self.store.end_reply(conversation_id).await;
        guard.disarm();
        let after = match after {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(conversation_id, error = %e, "failed to clear reply flag");
                return Err(e.into());
            }
        };

        let (replies, mood_shift, milestone, fallback) = result?;
        tracing::info!(
            conversation_id,
            chunks = replies.len(),
            mood = %after.mood,
            affection = after.affection,
            fallback,
            "turn complete"
        );

        Ok(TurnOutcome {
            level: after.level(),
            conversation: after,
            replies,
            mood_shift,
            milestone,
            fallback,
        })
    }

    async fn run_turn(
        &self,
        before: Conversation,
        content: &str,
    ) -> Result<(Vec<Message>, Option<MoodShift>, Option<Milestone>, bool), StoreError> {
        let id = before.id;
        let history = before.messages;

        let mood_shift = self.classifier.classify(content);
        let user_message = Message::user(content);
        let current = self
            .store
            .update(
                id,
                Box::new(move |c| {
                    c.push_message(user_message);
                    if let Some(shift) = mood_shift {
                        c.apply_mood_shift(shift);
                    }
                }),
            )
            .await?;
        if let Some(shift) = mood_shift {
            tracing::debug!(conversation_id = id, mood = %shift.mood, delta = shift.affection_delta, "mood shift");
        }

        let reply = self.proxy.reply(content, &history, current.mood).await;

        // The apology is one message; only real replies are chunked.
        let fallback = reply.fallback;
        let chunks = if fallback {
            vec![reply.message]
        } else {
            self.chunker.chunk(&reply.message)
        };

        let mut replies = Vec::new();
        for (i, chunk) in chunks.into_iter().enumerate() {
            if i > 0 {
                self.pacer.pause().await;
            }
            let message = Message::companion(chunk);
            self.store.add_message(id, message.clone()).await?;
            replies.push(message);
        }

        let mut current = current;
        if self.bonus.applies_to(content) {
            let amount = self.bonus.amount;
            current = self
                .store
                .update(id, Box::new(move |c| c.adjust_affection(amount)))
                .await?;
        }

        let milestone = self.trigger.evaluate(current.affection, &current.milestones);
        if let Some(m) = &milestone {
            let m = m.clone();
            tracing::info!(conversation_id = id, milestone = %m.id, "milestone reached");
            self.store
                .update(
                    id,
                    Box::new(move |c| {
                        c.add_milestone(m);
                        c.set_mood(Mood::Happy);
                    }),
                )
                .await?;
        }

        Ok((replies, mood_shift, milestone, fallback))
    }
}
