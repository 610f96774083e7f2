//! Engine tuning: scoring, star thresholds, persistence retries and round
//! layouts.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_WRITE_RETRIES, SCORE_PER_HIT, THREE_STAR_PCT, TWO_STAR_PCT};
use crate::error::ConfigError;
use crate::mechanics::MechanicKind;

const DEFAULT_TUNING_DATA: &str = include_str!("../data/tuning.json");

/// How many correct tiles and distractors a round of one kind contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundLayout {
    pub correct: usize,
    pub distractors: usize,
}

impl RoundLayout {
    #[must_use]
    pub const fn new(correct: usize, distractors: usize) -> Self {
        Self {
            correct,
            distractors,
        }
    }

    #[must_use]
    pub const fn total(self) -> usize {
        self.correct + self.distractors
    }

    /// Built-in layout for a kind.
    #[must_use]
    pub const fn fallback(kind: MechanicKind) -> Self {
        match kind {
            MechanicKind::TapColor | MechanicKind::TapShape => Self::new(3, 6),
            MechanicKind::SelectBiggest | MechanicKind::SelectSmallest => Self::new(1, 3),
            MechanicKind::MatchPairs => Self::new(2, 0),
            MechanicKind::FindDifferent => Self::new(1, 4),
            MechanicKind::TapColorShape => Self::new(3, 9),
            MechanicKind::TapColorTimed | MechanicKind::BossMixed => Self::new(1, 5),
            MechanicKind::TapWithDistractors => Self::new(3, 15),
        }
    }
}

/// Percentage cut-offs for two and three stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarThresholds {
    pub three: u32,
    pub two: u32,
}

impl Default for StarThresholds {
    fn default() -> Self {
        Self {
            three: THREE_STAR_PCT,
            two: TWO_STAR_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_score_per_hit")]
    pub score_per_hit: u32,
    #[serde(default)]
    pub stars: StarThresholds,
    #[serde(default = "EngineConfig::default_write_retries")]
    pub write_retries: u32,
    #[serde(default)]
    pub layouts: BTreeMap<MechanicKind, RoundLayout>,
}

impl EngineConfig {
    const fn default_score_per_hit() -> u32 {
        SCORE_PER_HIT
    }

    const fn default_write_retries() -> u32 {
        DEFAULT_WRITE_RETRIES
    }

    fn fallback() -> Self {
        Self {
            score_per_hit: SCORE_PER_HIT,
            stars: StarThresholds::default(),
            write_retries: DEFAULT_WRITE_RETRIES,
            layouts: MechanicKind::ALL
                .into_iter()
                .map(|kind| (kind, RoundLayout::fallback(kind)))
                .collect(),
        }
    }

    /// Parse tuning JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or values that break scoring.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the invariants the scoring and generators rely on.
    ///
    /// # Errors
    ///
    /// Returns an error if a hit scores nothing, thresholds are out of order
    /// or a layout is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.score_per_hit == 0 {
            return Err(ConfigError::ZeroScorePerHit);
        }
        let StarThresholds { three, two } = self.stars;
        if two > three || three > 100 {
            return Err(ConfigError::StarThresholds { two, three });
        }
        if let Some((kind, _)) = self.layouts.iter().find(|(_, layout)| layout.correct == 0) {
            return Err(ConfigError::EmptyLayout { kind: *kind });
        }
        Ok(())
    }

    #[must_use]
    pub fn layout(&self, kind: MechanicKind) -> RoundLayout {
        self.layouts
            .get(&kind)
            .copied()
            .unwrap_or_else(|| RoundLayout::fallback(kind))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_json(DEFAULT_TUNING_DATA).unwrap_or_else(|_| Self::fallback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_tuning_matches_fallback() {
        assert_eq!(EngineConfig::default(), EngineConfig::fallback());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = EngineConfig::from_json("{}").unwrap();
        assert_eq!(cfg.score_per_hit, 100);
        assert_eq!(cfg.write_retries, 1);
        assert_eq!(cfg.stars, StarThresholds { three: 90, two: 70 });
        assert_eq!(cfg.layout(MechanicKind::TapWithDistractors).total(), 18);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = EngineConfig::from_json(r#"{"stars":{"three":60,"two":80}}"#).unwrap_err();
        assert_eq!(err, ConfigError::StarThresholds { two: 80, three: 60 });
    }

    #[test]
    fn empty_layouts_are_rejected() {
        let err = EngineConfig::from_json(
            r#"{"layouts":{"tap-color":{"correct":0,"distractors":4}}}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::EmptyLayout {
                kind: MechanicKind::TapColor
            }
        );
    }

    #[test]
    fn zero_score_per_hit_is_rejected() {
        let err = EngineConfig::from_json(r#"{"scorePerHit":0}"#).unwrap_err();
        assert_eq!(err, ConfigError::ZeroScorePerHit);
    }
}
