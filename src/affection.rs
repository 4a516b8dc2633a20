//! Affection score and relationship levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest affection score.
pub const MIN_AFFECTION: i32 = 0;
/// Highest affection score.
pub const MAX_AFFECTION: i32 = 100;
/// Score a fresh conversation starts at.
pub const INITIAL_AFFECTION: i32 = 35;

/// Apply `delta` to `current`, clamped to `[0, 100]`.
///
/// Clamping is lossy: `adjust(adjust(s, d), -d)` is not `s` near the bounds.
pub fn adjust(current: i32, delta: i32) -> i32 {
    clamp(current.saturating_add(delta))
}

/// Clamp a raw score into range.
pub fn clamp(score: i32) -> i32 {
    score.clamp(MIN_AFFECTION, MAX_AFFECTION)
}

/// Relationship stage derived from an affection score. Variants are ordered
/// from lowest to highest and serialize as their labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationshipLevel {
    Curious,
    Acquaintances,
    Friends,
    Close,
    #[serde(rename = "In Love")]
    InLove,
}

impl RelationshipLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipLevel::Curious => "Curious",
            RelationshipLevel::Acquaintances => "Acquaintances",
            RelationshipLevel::Friends => "Friends",
            RelationshipLevel::Close => "Close",
            RelationshipLevel::InLove => "In Love",
        }
    }
}

impl fmt::Display for RelationshipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a score to its relationship level.
pub fn level_for(score: i32) -> RelationshipLevel {
    if score >= 80 {
        RelationshipLevel::InLove
    } else if score >= 60 {
        RelationshipLevel::Close
    } else if score >= 40 {
        RelationshipLevel::Friends
    } else if score >= 20 {
        RelationshipLevel::Acquaintances
    } else {
        RelationshipLevel::Curious
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_clamps() {
        assert_eq!(adjust(35, 5), 40);
        assert_eq!(adjust(98, 5), 100);
        assert_eq!(adjust(2, -5), 0);
        assert_eq!(adjust(0, i32::MIN), 0);
        assert_eq!(adjust(100, i32::MAX), 100);
    }

    #[test]
    fn test_adjust_always_in_range() {
        for s in -10..=110 {
            for d in [-200, -10, -5, -1, 0, 1, 3, 5, 10, 200] {
                let v = adjust(s, d);
                assert!((MIN_AFFECTION..=MAX_AFFECTION).contains(&v), "adjust({s}, {d}) = {v}");
            }
        }
    }

    #[test]
    fn test_clamping_is_lossy_near_bounds() {
        assert_eq!(adjust(adjust(98, 5), -5), 95);
        assert_eq!(adjust(adjust(50, 5), -5), 50);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for(0), RelationshipLevel::Curious);
        assert_eq!(level_for(19), RelationshipLevel::Curious);
        assert_eq!(level_for(20), RelationshipLevel::Acquaintances);
        assert_eq!(level_for(INITIAL_AFFECTION), RelationshipLevel::Acquaintances);
        assert_eq!(level_for(40), RelationshipLevel::Friends);
        assert_eq!(level_for(60), RelationshipLevel::Close);
        assert_eq!(level_for(79), RelationshipLevel::Close);
        assert_eq!(level_for(80).label(), "In Love");
        assert_eq!(level_for(100), RelationshipLevel::InLove);
        assert_eq!(serde_json::to_string(&RelationshipLevel::InLove).unwrap(), "\"In Love\"");
    }

    #[test]
    fn test_level_monotonic() {
        let mut prev = level_for(MIN_AFFECTION);
        for s in MIN_AFFECTION..=MAX_AFFECTION {
            let level = level_for(s);
            assert!(level >= prev, "level dropped at {s}");
            prev = level;
        }
    }
}
