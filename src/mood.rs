//! Companion mood and the keyword classifier that drives it.
//!
//! The classifier is a fixed, ordered list of keyword groups. Input is
//! lower-cased and checked for substring containment; the first group with a
//! hit decides both the new mood and the affection delta. There is no
//! scoring, negation handling or blending.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

/// Emotional state of the companion persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Angry,
    Sad,
    Embarrassed,
}

/// Returned when a mood label is not one of the five known moods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mood '{0}'")]
pub struct UnknownMood(pub String);

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Neutral,
        Mood::Happy,
        Mood::Angry,
        Mood::Sad,
        Mood::Embarrassed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::Angry => "angry",
            Mood::Sad => "sad",
            Mood::Embarrassed => "embarrassed",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Neutral => "😐",
            Mood::Happy => "😊",
            Mood::Angry => "😠",
            Mood::Sad => "😢",
            Mood::Embarrassed => "😳",
        }
    }

    /// Presentation data shown in the mood info panel.
    pub fn profile(&self) -> MoodProfile {
        let (description, effects): (&str, [&str; 4]) = match self {
            Mood::Happy => (
                "In a good mood and feeling positive towards you. Might be more open and friendly than usual.",
                [
                    "Response tone will be cheerful and enthusiastic",
                    "More likely to use happy kaomojis and emojis",
                    "May be more receptive to personal questions",
                    "Might show more affection than usual",
                ],
            ),
            Mood::Angry => (
                "Irritated and in a bad mood. Might be more short with you than usual.",
                [
                    "Responses will be shorter and more dismissive",
                    "Will use annoyed kaomojis like (￣︿￣)",
                    "Less likely to engage in longer conversations",
                    "Will need positive interactions to calm down",
                ],
            ),
            Mood::Sad => (
                "Feeling down. Might need some cheering up.",
                [
                    "Responses show vulnerability beneath the tsundere facade",
                    "Will use sadder kaomojis like (´• ᵕ •`) ♡",
                    "Might seek comfort but not directly ask for it",
                    "More receptive to kind words and reassurance",
                ],
            ),
            Mood::Embarrassed => (
                "Flustered and easily embarrassed. Compliments and teasing will make this worse (or better).",
                [
                    "Responses will be more flustered and defensive",
                    "Uses blushing kaomojis like (//ω//)",
                    "Has trouble forming coherent responses when teased",
                    "Might suddenly change topics out of embarrassment",
                ],
            ),
            Mood::Neutral => (
                "Default tsundere state, alternating between dismissive comments and moments of genuine interest.",
                [
                    "Balanced between cold and warm responses",
                    "Will use a variety of kaomojis",
                    "May be slightly dismissive but still engaged",
                    "Will show occasional moments of unexpected warmth",
                ],
            ),
        };

        MoodProfile {
            mood: *self,
            emoji: self.emoji(),
            description,
            effects: effects.to_vec(),
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Mood::Neutral),
            "happy" => Ok(Mood::Happy),
            "angry" => Ok(Mood::Angry),
            "sad" => Ok(Mood::Sad),
            "embarrassed" => Ok(Mood::Embarrassed),
            _ => Err(UnknownMood(s.to_string())),
        }
    }
}

/// Emoji, description and behavioral effects for one mood.
#[derive(Debug, Clone, Serialize)]
pub struct MoodProfile {
    pub mood: Mood,
    pub emoji: &'static str,
    pub description: &'static str,
    pub effects: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Outcome of a classifier hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodShift {
    pub mood: Mood,
    pub affection_delta: i32,
}

/// One keyword group: any keyword contained in the input selects `mood`.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub keywords: Vec<&'static str>,
    pub mood: Mood,
    pub affection_delta: i32,
}

impl KeywordRule {
    pub fn new(keywords: &[&'static str], mood: Mood, affection_delta: i32) -> Self {
        Self {
            keywords: keywords.to_vec(),
            mood,
            affection_delta,
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Ordered, first-match-wins keyword classifier.
#[derive(Debug, Clone)]
pub struct MoodClassifier {
    rules: Vec<KeywordRule>,
}

impl Default for MoodClassifier {
    fn default() -> Self {
        Self::new(vec![
            KeywordRule::new(&["love", "like", "cute"], Mood::Happy, 5),
            KeywordRule::new(&["sorry", "sad"], Mood::Sad, 0),
            KeywordRule::new(&["angry", "hate", "stupid"], Mood::Angry, -5),
            KeywordRule::new(&["beautiful", "pretty", "gorgeous"], Mood::Embarrassed, 3),
        ])
    }
}

impl MoodClassifier {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Classify `text`. `None` means no rule matched: mood and affection
    /// stay as they are.
    pub fn classify(&self, text: &str) -> Option<MoodShift> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| MoodShift {
                mood: rule.mood,
                affection_delta: rule.affection_delta,
            })
    }
}

/// Classify with the default rule set.
pub fn classify(text: &str) -> Option<MoodShift> {
    MoodClassifier::default().classify(text)
}
