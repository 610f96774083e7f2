//! Kind to strategy dispatch.
use std::collections::HashMap;
use std::fmt;

use super::boss::BossMixed;
use super::different::FindDifferent;
use super::extremes::{Extreme, ExtremePick};
use super::pairs::MatchPairs;
use super::tap::{Attribute, AttributeTap, ColorShapeTap, DistinctPick, DistractorField};
use super::{MechanicKind, Round, RoundContext, RoundRng};
use crate::catalog::{Level, Palette};
use crate::config::EngineConfig;
use crate::error::ConfigError;

/// Produces option sets for one mechanic rule.
pub trait RoundGenerator: Send + Sync {
    /// Generate a shuffled round.
    ///
    /// # Errors
    ///
    /// Returns an error if the palette cannot satisfy the rule.
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError>;

    /// Check up front that the level and palette can always be generated.
    ///
    /// # Errors
    ///
    /// Returns an error describing the unsatisfiable requirement.
    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError>;
}

/// How player input is scored for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStyle {
    /// Every tap is judged on its own; a hit moves to a fresh round.
    SingleTap,
    /// Two taps reveal two tiles which either form a pair or not; the board
    /// persists for the whole attempt.
    Pairs,
}

impl EvaluationStyle {
    #[must_use]
    pub const fn regenerates_on_hit(self) -> bool {
        matches!(self, Self::SingleTap)
    }
}

/// Generator plus evaluation style registered for a kind.
pub struct MechanicStrategy {
    pub generator: Box<dyn RoundGenerator>,
    pub evaluation: EvaluationStyle,
}

impl MechanicStrategy {
    pub fn single_tap(generator: impl RoundGenerator + 'static) -> Self {
        Self {
            generator: Box::new(generator),
            evaluation: EvaluationStyle::SingleTap,
        }
    }

    pub fn pairs(generator: impl RoundGenerator + 'static) -> Self {
        Self {
            generator: Box::new(generator),
            evaluation: EvaluationStyle::Pairs,
        }
    }
}

impl fmt::Debug for MechanicStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MechanicStrategy")
            .field("evaluation", &self.evaluation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct MechanicRegistry {
    strategies: HashMap<MechanicKind, MechanicStrategy>,
}

impl Default for MechanicRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl MechanicRegistry {
    /// A registry with no strategies.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with every built-in mechanic.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(
            MechanicKind::TapColor,
            MechanicStrategy::single_tap(AttributeTap::new(Attribute::Color)),
        );
        registry.register(
            MechanicKind::TapShape,
            MechanicStrategy::single_tap(AttributeTap::new(Attribute::Shape)),
        );
        registry.register(
            MechanicKind::SelectBiggest,
            MechanicStrategy::single_tap(ExtremePick::new(Extreme::Biggest)),
        );
        registry.register(
            MechanicKind::SelectSmallest,
            MechanicStrategy::single_tap(ExtremePick::new(Extreme::Smallest)),
        );
        registry.register(MechanicKind::MatchPairs, MechanicStrategy::pairs(MatchPairs));
        registry.register(
            MechanicKind::FindDifferent,
            MechanicStrategy::single_tap(FindDifferent),
        );
        registry.register(
            MechanicKind::TapColorShape,
            MechanicStrategy::single_tap(ColorShapeTap),
        );
        registry.register(
            MechanicKind::TapColorTimed,
            MechanicStrategy::single_tap(DistinctPick::new(
                MechanicKind::TapColorTimed,
                Attribute::Color,
            )),
        );
        registry.register(
            MechanicKind::TapWithDistractors,
            MechanicStrategy::single_tap(DistractorField),
        );
        registry.register(
            MechanicKind::BossMixed,
            MechanicStrategy::single_tap(BossMixed::default()),
        );
        registry
    }

    /// Register or replace the strategy for a kind, returning the previous one.
    pub fn register(
        &mut self,
        kind: MechanicKind,
        strategy: MechanicStrategy,
    ) -> Option<MechanicStrategy> {
        self.strategies.insert(kind, strategy)
    }

    /// # Errors
    ///
    /// Returns an error if nothing is registered for `kind`.
    pub fn strategy(&self, kind: MechanicKind) -> Result<&MechanicStrategy, ConfigError> {
        self.strategies
            .get(&kind)
            .ok_or(ConfigError::UnregisteredMechanic(kind))
    }

    /// # Errors
    ///
    /// Returns an error if nothing is registered for `kind`.
    pub fn evaluation(&self, kind: MechanicKind) -> Result<EvaluationStyle, ConfigError> {
        self.strategy(kind).map(|strategy| strategy.evaluation)
    }

    /// Generate the round at `round_index` for a level.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind is unregistered or unsatisfiable.
    pub fn generate(
        &self,
        level: &Level,
        palette: &Palette,
        config: &EngineConfig,
        round_index: u32,
        rng: &mut RoundRng,
    ) -> Result<Round, ConfigError> {
        let strategy = self.strategy(level.mechanic)?;
        let ctx = RoundContext::new(level, palette, config, round_index);
        let round = strategy.generator.generate(&ctx, rng)?;
        log::debug!(
            "level {} round {round_index}: {} options, {} correct ({})",
            level.id,
            round.options.len(),
            round.correct_count(),
            round.kind
        );
        Ok(round)
    }

    /// Validate that a level can be played with this registry and palette.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind is unregistered or its generator rejects
    /// the palette.
    pub fn validate(
        &self,
        level: &Level,
        palette: &Palette,
        config: &EngineConfig,
    ) -> Result<(), ConfigError> {
        let strategy = self.strategy(level.mechanic)?;
        let ctx = RoundContext::new(level, palette, config, 0);
        strategy.generator.validate(&ctx)
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<MechanicKind> {
        let mut kinds: Vec<_> = self.strategies.keys().copied().collect();
        kinds.sort();
        kinds
    }
}
