//! boss-mixed: cycles through color, shape and size challenges.
use serde::{Deserialize, Serialize};

use super::extremes::{Extreme, ExtremePick};
use super::registry::RoundGenerator;
use super::tap::{Attribute, DistinctPick};
use super::{MechanicKind, Round, RoundContext, RoundRng};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BossChallenge {
    Color,
    Shape,
    Size,
}

pub const BOSS_CHALLENGES: [BossChallenge; 3] =
    [BossChallenge::Color, BossChallenge::Shape, BossChallenge::Size];

impl BossChallenge {
    /// Challenge presented at a round index.
    #[must_use]
    pub fn for_round(round_index: u32) -> Self {
        let idx = usize::try_from(round_index).unwrap_or(0) % BOSS_CHALLENGES.len();
        BOSS_CHALLENGES[idx]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BossMixed {
    color: DistinctPick,
    shape: DistinctPick,
    size: ExtremePick,
}

impl Default for BossMixed {
    fn default() -> Self {
        Self {
            color: DistinctPick::new(MechanicKind::BossMixed, Attribute::Color),
            shape: DistinctPick::new(MechanicKind::BossMixed, Attribute::Shape),
            size: ExtremePick::new(Extreme::Biggest),
        }
    }
}

impl BossMixed {
    fn size_context<'a>(ctx: &RoundContext<'a>) -> RoundContext<'a> {
        ctx.with_layout(ctx.config.layout(MechanicKind::SelectBiggest))
    }
}

impl RoundGenerator for BossMixed {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        match BossChallenge::for_round(ctx.round_index) {
            BossChallenge::Color => self.color.generate(ctx, rng),
            BossChallenge::Shape => self.shape.generate(ctx, rng),
            BossChallenge::Size => {
                self.size
                    .generate_as(MechanicKind::BossMixed, &Self::size_context(ctx), rng)
            }
        }
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        self.color.validate(ctx)?;
        self.shape.validate(ctx)?;
        self.size.validate(&Self::size_context(ctx))
    }
}
