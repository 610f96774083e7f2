use rand::seq::SliceRandom;

use super::registry::RoundGenerator;
use super::{Appearance, Prompt, Round, RoundContext, RoundRng, assemble, require_pool};
use crate::error::ConfigError;

/// find-different: one odd object among identical copies of another.
#[derive(Debug, Clone, Copy)]
pub struct FindDifferent;

impl RoundGenerator for FindDifferent {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        let kind = ctx.level.mechanic;
        let drawn: Vec<_> = ctx.palette.objects.choose_multiple(rng, 2).collect();
        let [odd, common] = drawn.as_slice() else {
            return Err(ConfigError::PaletteTooSmall {
                kind,
                pool: "objects",
                needed: 2,
                found: drawn.len(),
            });
        };

        let mut tiles = Vec::with_capacity(ctx.layout.total());
        for _ in 0..ctx.layout.correct {
            tiles.push((Appearance::object(&odd.emoji), true));
        }
        for _ in 0..ctx.layout.distractors {
            tiles.push((Appearance::object(&common.emoji), false));
        }
        Ok(assemble(kind, Prompt::OddOneOut, tiles, rng))
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        let kind = ctx.level.mechanic;
        require_pool(kind, "objects", 2, ctx.palette.objects.len())?;
        // The odd tile must be the minority or it is not odd.
        if ctx.layout.correct >= ctx.layout.distractors {
            return Err(ConfigError::Unsatisfiable { kind, attempts: 0 });
        }
        Ok(())
    }
}
