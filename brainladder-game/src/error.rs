//! Error kinds shared across the engine.
use thiserror::Error;

use crate::catalog::LevelId;
use crate::mechanics::MechanicKind;

/// Malformed level or palette definitions. A level carrying one of these is
/// unavailable; the engine never guesses a replacement mechanic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("level {level}: target count must be positive (got {value})")]
    NonPositiveTarget { level: LevelId, value: i64 },
    #[error("level {level}: mistake budget must be positive (got {value})")]
    NonPositiveMistakes { level: LevelId, value: i64 },
    #[error("level {level}: {kind} needs a time limit")]
    MissingTimeLimit { level: LevelId, kind: MechanicKind },
    #[error("unknown mechanic kind '{0}'")]
    UnknownMechanic(String),
    #[error("no strategy registered for {0}")]
    UnregisteredMechanic(MechanicKind),
    #[error("{kind} needs at least {needed} {pool} in the palette (found {found})")]
    PaletteTooSmall {
        kind: MechanicKind,
        pool: &'static str,
        needed: usize,
        found: usize,
    },
    #[error("level id {0} is defined more than once")]
    DuplicateLevel(LevelId),
    #[error("target count must be positive to rate stars")]
    ZeroTarget,
    #[error("score per hit must be positive")]
    ZeroScorePerHit,
    #[error("star thresholds invalid (two {two} > three {three} or above 100)")]
    StarThresholds { two: u32, three: u32 },
    #[error("{kind} layout needs at least one correct option")]
    EmptyLayout { kind: MechanicKind },
    #[error("could not satisfy {kind} constraints after {attempts} draws")]
    Unsatisfiable { kind: MechanicKind, attempts: u32 },
    #[error("malformed data: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Failures of the persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save data could not be encoded or decoded: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("no {table} row for key {key}")]
    MissingRow { table: &'static str, key: String },
    #[error("unsupported save version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// Operations attempted against state that does not allow them.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("level {0} does not exist")]
    UnknownLevel(LevelId),
    #[error("level {0} is locked")]
    LevelLocked(LevelId),
    #[error("level {0} belongs to a premium world")]
    PremiumLocked(LevelId),
    #[error("saved progress for level {0} could not be read")]
    ProgressUnreadable(LevelId),
    #[error("star count {0} is out of range")]
    StarsOutOfRange(u8),
}

/// Umbrella error returned by engine-level entry points.
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    State(#[from] StateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_become_malformed_config() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let cfg: ConfigError = err.into();
        assert!(matches!(cfg, ConfigError::Malformed(_)));
    }

    #[test]
    fn game_error_wraps_each_kind() {
        let err: GameError = StateError::LevelLocked(4).into();
        assert_eq!(err.to_string(), "level 4 is locked");
        let err: GameError = ConfigError::ZeroTarget.into();
        assert!(matches!(err, GameError::Config(ConfigError::ZeroTarget)));
    }
}
