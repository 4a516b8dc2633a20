//! Relationship milestones and the affection threshold that unlocks them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A one-time relationship event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub achieved: bool,
}

impl Milestone {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        achieved: bool,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            timestamp: Utc::now(),
            achieved,
        }
    }
}

/// Fires a milestone once affection reaches `threshold`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneTrigger {
    pub id: String,
    pub title: String,
    pub description: String,
    pub threshold: i32,
}

impl MilestoneTrigger {
    /// The "friend" milestone at affection 60.
    pub fn friend(companion_name: &str) -> Self {
        Self {
            id: "friend".to_string(),
            title: "Friends".to_string(),
            description: format!("You and {} have reached the 'Friends' stage", companion_name),
            threshold: 60,
        }
    }

    /// Returns the milestone to record, or `None` when the threshold is not
    /// met or a milestone with the same id already exists.
    pub fn evaluate(&self, affection: i32, existing: &[Milestone]) -> Option<Milestone> {
        if affection < self.threshold || existing.iter().any(|m| m.id == self.id) {
            return None;
        }
        Some(Milestone::new(
            self.id.clone(),
            self.title.clone(),
            self.description.clone(),
            true,
        ))
    }
}
