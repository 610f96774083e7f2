//! Score to star conversion.
use crate::config::StarThresholds;
use crate::constants::SCORE_PER_HIT;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarRater {
    thresholds: StarThresholds,
    score_per_hit: u32,
}

impl Default for StarRater {
    fn default() -> Self {
        Self::new(StarThresholds::default(), SCORE_PER_HIT)
    }
}

impl StarRater {
    #[must_use]
    pub const fn new(thresholds: StarThresholds, score_per_hit: u32) -> Self {
        Self {
            thresholds,
            score_per_hit,
        }
    }

    /// Rate a successful attempt on a 1..=3 scale.
    ///
    /// The percentage compare runs in integer space:
    /// `score * 100 >= perfect * pct` with `perfect = target * score_per_hit`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTarget`] when no perfect score exists.
    pub fn rate(&self, final_score: u32, target_count: u32) -> Result<u8, ConfigError> {
        let perfect = u64::from(target_count) * u64::from(self.score_per_hit);
        if perfect == 0 {
            return Err(ConfigError::ZeroTarget);
        }
        let scaled = u64::from(final_score) * 100;
        let stars = if scaled >= perfect * u64::from(self.thresholds.three) {
            3
        } else if scaled >= perfect * u64::from(self.thresholds.two) {
            2
        } else {
            1
        };
        Ok(stars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rater() -> StarRater {
        StarRater::default()
    }

    #[test]
    fn boundaries_match_thresholds() {
        let rater = rater();
        assert_eq!(rater.rate(900, 10).unwrap(), 3);
        assert_eq!(rater.rate(899, 10).unwrap(), 2);
        assert_eq!(rater.rate(700, 10).unwrap(), 2);
        assert_eq!(rater.rate(699, 10).unwrap(), 1);
        assert_eq!(rater.rate(0, 10).unwrap(), 1);
        assert_eq!(rater.rate(1000, 10).unwrap(), 3);
    }

    #[test]
    fn perfect_runs_earn_three_stars() {
        let rater = rater();
        for target in 1..=20 {
            assert_eq!(rater.rate(target * SCORE_PER_HIT, target).unwrap(), 3);
        }
    }

    #[test]
    fn zero_target_is_an_error() {
        assert_eq!(rater().rate(100, 0), Err(ConfigError::ZeroTarget));
    }

    #[test]
    fn custom_thresholds_apply() {
        let rater = StarRater::new(StarThresholds { three: 100, two: 50 }, 10);
        assert_eq!(rater.rate(99, 10).unwrap(), 2);
        assert_eq!(rater.rate(100, 10).unwrap(), 3);
        assert_eq!(rater.rate(49, 10).unwrap(), 1);
    }
}
