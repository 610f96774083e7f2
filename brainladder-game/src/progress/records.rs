use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{LevelId, WorldId};
use crate::constants::{FIRST_LEVEL_ID, FIRST_WORLD_ID, MAX_STARS};
use crate::error::{StateError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelStatus {
    Locked,
    Unlocked,
    Completed,
}

/// Persistent progress for one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgressRecord {
    pub level_id: LevelId,
    pub is_unlocked: bool,
    pub is_completed: bool,
    pub stars: u8,
    pub best_score: u32,
    pub attempts: u32,
    #[serde(default)]
    pub last_played_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LevelProgressRecord {
    /// Record for a level nobody has touched. Only the first level starts
    /// unlocked.
    #[must_use]
    pub fn new_default(level_id: LevelId) -> Self {
        Self {
            level_id,
            is_unlocked: level_id == FIRST_LEVEL_ID,
            is_completed: false,
            stars: 0,
            best_score: 0,
            attempts: 0,
            last_played_at: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> LevelStatus {
        if self.is_completed {
            LevelStatus::Completed
        } else if self.is_unlocked {
            LevelStatus::Unlocked
        } else {
            LevelStatus::Locked
        }
    }

    /// Fold one attempt into the record. Stars and best score only ratchet
    /// upward, completion is sticky.
    pub(crate) fn apply(&mut self, outcome: AttemptOutcome, now: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_played_at = Some(now);
        if outcome.completed {
            self.is_completed = true;
            self.stars = self.stars.max(outcome.stars);
            self.best_score = self.best_score.max(outcome.score);
            self.completed_at = Some(now);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldProgressRecord {
    pub world_id: WorldId,
    pub is_unlocked: bool,
    pub total_stars: u32,
    pub completed_levels: u32,
}

impl WorldProgressRecord {
    #[must_use]
    pub fn new_default(world_id: WorldId) -> Self {
        Self {
            world_id,
            is_unlocked: world_id == FIRST_WORLD_ID,
            total_stars: 0,
            completed_levels: 0,
        }
    }
}

/// Age group picked during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "3-5")]
    Preschool,
    #[serde(rename = "6-8")]
    Early,
    #[serde(rename = "9-10")]
    Older,
}

impl AgeBand {
    pub const ALL: [Self; 3] = [Self::Preschool, Self::Early, Self::Older];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Preschool => "3-5",
            Self::Early => "6-8",
            Self::Older => "9-10",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|band| band.label() == s.trim())
            .ok_or_else(|| format!("unknown age band '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u32,
    pub age_band: AgeBand,
    pub created_at: DateTime<Utc>,
}

/// Result of one finished attempt as handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub completed: bool,
    pub score: u32,
    pub stars: u8,
}

impl AttemptOutcome {
    #[must_use]
    pub const fn success(score: u32, stars: u8) -> Self {
        Self {
            completed: true,
            score,
            stars,
        }
    }

    #[must_use]
    pub const fn failure(score: u32) -> Self {
        Self {
            completed: false,
            score,
            stars: 0,
        }
    }

    pub(crate) fn check(self) -> Result<Self, StateError> {
        if self.stars > MAX_STARS {
            return Err(StateError::StarsOutOfRange(self.stars));
        }
        Ok(self)
    }
}

/// What the store did with an attempt.
#[derive(Debug)]
pub struct AttemptReceipt {
    /// The record as it stands after the attempt.
    pub record: LevelProgressRecord,
    /// Level newly unlocked by the cascade, if any.
    pub unlocked_next: Option<LevelId>,
    /// Set when persistence failed after retries. The record is queued and
    /// still visible to reads.
    pub persist_error: Option<StoreError>,
}

impl AttemptReceipt {
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Home screen figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub continue_level: LevelId,
    pub total_stars: u32,
    pub completed_levels: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn only_level_one_starts_unlocked() {
        assert_eq!(LevelProgressRecord::new_default(1).status(), LevelStatus::Unlocked);
        assert_eq!(LevelProgressRecord::new_default(2).status(), LevelStatus::Locked);
        assert!(WorldProgressRecord::new_default(1).is_unlocked);
        assert!(!WorldProgressRecord::new_default(2).is_unlocked);
    }

    #[test]
    fn failures_do_not_touch_completion_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut record = LevelProgressRecord::new_default(1);
        record.apply(AttemptOutcome::success(900, 3), now);
        record.apply(AttemptOutcome::failure(100), now);
        assert_eq!(record.attempts, 2);
        assert_eq!(record.stars, 3);
        assert_eq!(record.best_score, 900);
        assert_eq!(record.status(), LevelStatus::Completed);
    }

    #[test]
    fn age_bands_use_range_labels() {
        let json = serde_json::to_string(&AgeBand::Early).unwrap();
        assert_eq!(json, "\"6-8\"");
        assert_eq!("9-10".parse::<AgeBand>().unwrap(), AgeBand::Older);
        assert!("11-12".parse::<AgeBand>().is_err());
    }

    #[test]
    fn stars_above_three_are_rejected() {
        assert_eq!(
            AttemptOutcome::success(100, 4).check(),
            Err(StateError::StarsOutOfRange(4))
        );
    }
}
