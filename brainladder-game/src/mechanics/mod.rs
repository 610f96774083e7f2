//! Round generation for every mechanic kind.
//!
//! Each kind maps to a [`MechanicStrategy`] in the [`MechanicRegistry`]: a
//! generator producing a shuffled [`Round`] plus the [`EvaluationStyle`] the
//! outcome evaluator applies to player input.

pub mod boss;
pub mod different;
pub mod extremes;
pub mod pairs;
pub mod registry;
pub mod tap;

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Level, Palette};
use crate::config::{EngineConfig, RoundLayout};
use crate::error::ConfigError;

pub use boss::{BOSS_CHALLENGES, BossChallenge, BossMixed};
pub use different::FindDifferent;
pub use extremes::{Extreme, ExtremePick};
pub use pairs::{FlipResult, MatchPairs, PairBoard};
pub use registry::{EvaluationStyle, MechanicRegistry, MechanicStrategy, RoundGenerator};
pub use tap::{Attribute, AttributeTap, ColorShapeTap, DistinctPick, DistractorField};

/// Random stream used by every generator. Seeded per session.
pub type RoundRng = ChaCha20Rng;

/// Gameplay templates available to level definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MechanicKind {
    TapColor,
    TapShape,
    SelectBiggest,
    SelectSmallest,
    MatchPairs,
    FindDifferent,
    TapColorShape,
    TapColorTimed,
    TapWithDistractors,
    BossMixed,
}

impl MechanicKind {
    pub const ALL: [Self; 10] = [
        Self::TapColor,
        Self::TapShape,
        Self::SelectBiggest,
        Self::SelectSmallest,
        Self::MatchPairs,
        Self::FindDifferent,
        Self::TapColorShape,
        Self::TapColorTimed,
        Self::TapWithDistractors,
        Self::BossMixed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TapColor => "tap-color",
            Self::TapShape => "tap-shape",
            Self::SelectBiggest => "select-biggest",
            Self::SelectSmallest => "select-smallest",
            Self::MatchPairs => "match-pairs",
            Self::FindDifferent => "find-different",
            Self::TapColorShape => "tap-color-shape",
            Self::TapColorTimed => "tap-color-timed",
            Self::TapWithDistractors => "tap-with-distractors",
            Self::BossMixed => "boss-mixed",
        }
    }

    /// Kinds that run against a countdown and therefore require a time limit.
    #[must_use]
    pub const fn is_timed(self) -> bool {
        matches!(self, Self::TapColorTimed | Self::BossMixed)
    }
}

impl fmt::Display for MechanicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MechanicKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ConfigError::UnknownMechanic(needle.to_string()))
    }
}

/// Identifier of an option within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(pub u32);

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "opt-{}", self.0)
    }
}

/// Display attributes of a tile. Only the fields relevant to the mechanic
/// are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<u32>,
}

impl Appearance {
    #[must_use]
    pub fn colored(color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn shaped(shape: &str, color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            shape: Some(shape.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sized(size: u32, color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            size: Some(size),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn object(emoji: &str) -> Self {
        Self {
            emoji: Some(emoji.to_string()),
            ..Self::default()
        }
    }
}

/// A selectable tile in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOption {
    pub id: OptionId,
    pub appearance: Appearance,
    pub is_correct: bool,
}

/// What the player is asked to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Prompt {
    Color { color: String },
    Shape { shape: String },
    ColorShape { color: String, shape: String },
    Biggest,
    Smallest,
    OddOneOut,
    MatchPairs,
    Object { object: String },
}

/// One generated option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub kind: MechanicKind,
    pub prompt: Prompt,
    pub options: Vec<RoundOption>,
}

impl Round {
    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&RoundOption> {
        self.options.iter().find(|opt| opt.id == id)
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.options.iter().filter(|opt| opt.is_correct).count()
    }

    /// The other tile sharing a pair id with `id`.
    #[must_use]
    pub fn partner(&self, id: OptionId) -> Option<OptionId> {
        let pair = self.option(id)?.appearance.pair?;
        self.options
            .iter()
            .find(|opt| opt.id != id && opt.appearance.pair == Some(pair))
            .map(|opt| opt.id)
    }

    /// Ids of the correct options, in board order.
    #[must_use]
    pub fn correct_ids(&self) -> Vec<OptionId> {
        self.options
            .iter()
            .filter(|opt| opt.is_correct)
            .map(|opt| opt.id)
            .collect()
    }
}

/// Inputs shared by every generator call.
#[derive(Debug, Clone, Copy)]
pub struct RoundContext<'a> {
    pub level: &'a Level,
    pub palette: &'a Palette,
    pub config: &'a EngineConfig,
    pub layout: RoundLayout,
    pub round_index: u32,
}

impl<'a> RoundContext<'a> {
    #[must_use]
    pub fn new(
        level: &'a Level,
        palette: &'a Palette,
        config: &'a EngineConfig,
        round_index: u32,
    ) -> Self {
        Self {
            level,
            palette,
            config,
            layout: config.layout(level.mechanic),
            round_index,
        }
    }

    /// Same context with the layout of another kind, used when one mechanic
    /// borrows another's rule.
    #[must_use]
    pub fn with_layout(self, layout: RoundLayout) -> Self {
        Self { layout, ..self }
    }
}

/// Shuffle the tiles uniformly and assign ids in board order.
pub(crate) fn assemble(
    kind: MechanicKind,
    prompt: Prompt,
    mut tiles: Vec<(Appearance, bool)>,
    rng: &mut RoundRng,
) -> Round {
    tiles.shuffle(rng);
    let options = tiles
        .into_iter()
        .enumerate()
        .map(|(idx, (appearance, is_correct))| RoundOption {
            id: OptionId(u32::try_from(idx).unwrap_or(u32::MAX)),
            appearance,
            is_correct,
        })
        .collect();
    Round {
        kind,
        prompt,
        options,
    }
}

/// Fail validation when a palette pool is smaller than a rule needs.
pub(crate) fn require_pool(
    kind: MechanicKind,
    pool: &'static str,
    needed: usize,
    found: usize,
) -> Result<(), ConfigError> {
    if found < needed {
        return Err(ConfigError::PaletteTooSmall {
            kind,
            pool,
            needed,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn kinds_parse_from_their_labels() {
        for kind in MechanicKind::ALL {
            assert_eq!(kind.as_str().parse::<MechanicKind>().unwrap(), kind);
        }
        assert_eq!(
            "Tap-Color".parse::<MechanicKind>().unwrap(),
            MechanicKind::TapColor
        );
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        let err = "juggle".parse::<MechanicKind>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownMechanic("juggle".to_string()));
    }

    #[test]
    fn serde_uses_kebab_labels() {
        let json = serde_json::to_string(&MechanicKind::TapWithDistractors).unwrap();
        assert_eq!(json, "\"tap-with-distractors\"");
    }

    #[test]
    fn assemble_assigns_sequential_ids() {
        let mut rng = RoundRng::seed_from_u64(5);
        let tiles = vec![
            (Appearance::colored("red"), true),
            (Appearance::colored("blue"), false),
            (Appearance::colored("green"), false),
        ];
        let round = assemble(
            MechanicKind::TapColor,
            Prompt::Color {
                color: "red".into(),
            },
            tiles,
            &mut rng,
        );
        let ids: Vec<u32> = round.options.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(round.correct_count(), 1);
        let correct = round.correct_ids()[0];
        assert_eq!(
            round.option(correct).unwrap().appearance.color.as_deref(),
            Some("red")
        );
    }
}
