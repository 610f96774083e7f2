//! select-biggest / select-smallest.
use rand::seq::SliceRandom;

use super::registry::RoundGenerator;
use super::{
    Appearance, MechanicKind, Prompt, Round, RoundContext, RoundRng, assemble, require_pool,
};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Biggest,
    Smallest,
}

impl Extreme {
    fn pick(self, sizes: &[u32]) -> Option<u32> {
        match self {
            Self::Biggest => sizes.iter().copied().max(),
            Self::Smallest => sizes.iter().copied().min(),
        }
    }

    const fn prompt(self) -> Prompt {
        match self {
            Self::Biggest => Prompt::Biggest,
            Self::Smallest => Prompt::Smallest,
        }
    }
}

/// Exactly one tile holds the extreme size; every other size differs from it.
#[derive(Debug, Clone, Copy)]
pub struct ExtremePick {
    extreme: Extreme,
}

impl ExtremePick {
    #[must_use]
    pub const fn new(extreme: Extreme) -> Self {
        Self { extreme }
    }

    /// Draw pairwise-distinct sizes. Without ties the extreme is unique.
    fn sample(
        &self,
        ctx: &RoundContext<'_>,
        rng: &mut RoundRng,
    ) -> Result<(Vec<u32>, u32), ConfigError> {
        let count = ctx.layout.total().max(2);
        let mut pool = ctx.palette.sizes.clone();
        pool.sort_unstable();
        pool.dedup();
        let sizes: Vec<u32> = pool.choose_multiple(rng, count).copied().collect();
        match self.extreme.pick(&sizes) {
            Some(extreme) if sizes.len() == count => Ok((sizes, extreme)),
            _ => Err(ConfigError::PaletteTooSmall {
                kind: ctx.level.mechanic,
                pool: "distinct sizes",
                needed: count,
                found: pool.len(),
            }),
        }
    }

    pub(crate) fn generate_as(
        &self,
        kind: MechanicKind,
        ctx: &RoundContext<'_>,
        rng: &mut RoundRng,
    ) -> Result<Round, ConfigError> {
        let (sizes, extreme) = self.sample(ctx, rng)?;
        let colors = ctx.palette.color_ids();
        let tiles = sizes
            .into_iter()
            .map(|size| {
                let color = colors.choose(rng).copied().unwrap_or("");
                (Appearance::sized(size, color), size == extreme)
            })
            .collect();
        Ok(assemble(kind, self.extreme.prompt(), tiles, rng))
    }
}

impl RoundGenerator for ExtremePick {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        self.generate_as(ctx.level.mechanic, ctx, rng)
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        let kind = ctx.level.mechanic;
        let needed = ctx.layout.total().max(2);
        require_pool(kind, "distinct sizes", needed, ctx.palette.distinct_sizes())?;
        require_pool(kind, "colors", 1, ctx.palette.colors.len())
    }
}
