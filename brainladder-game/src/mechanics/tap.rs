//! Tap rules: pick every tile that matches a target attribute.
use rand::seq::SliceRandom;

use super::registry::RoundGenerator;
use super::{
    Appearance, MechanicKind, Prompt, Round, RoundContext, RoundRng, assemble, require_pool,
};
use crate::constants::MAX_REDRAWS;
use crate::error::ConfigError;

/// Tile attribute a tap rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Color,
    Shape,
}

impl Attribute {
    fn pool<'a>(self, ctx: &RoundContext<'a>) -> Vec<&'a str> {
        match self {
            Self::Color => ctx.palette.color_ids(),
            Self::Shape => ctx.palette.shape_ids(),
        }
    }

    const fn pool_name(self) -> &'static str {
        match self {
            Self::Color => "colors",
            Self::Shape => "shapes",
        }
    }

    fn prompt(self, target: &str) -> Prompt {
        match self {
            Self::Color => Prompt::Color {
                color: target.to_string(),
            },
            Self::Shape => Prompt::Shape {
                shape: target.to_string(),
            },
        }
    }

    fn tile(self, value: &str, colors: &[&str], rng: &mut RoundRng) -> Appearance {
        match self {
            Self::Color => Appearance::colored(value),
            Self::Shape => Appearance::shaped(value, colors.choose(rng).copied().unwrap_or("")),
        }
    }
}

fn pick<'a>(
    pool: &[&'a str],
    kind: MechanicKind,
    rng: &mut RoundRng,
) -> Result<&'a str, ConfigError> {
    pool.choose(rng).copied().ok_or(ConfigError::PaletteTooSmall {
        kind,
        pool: "entries",
        needed: 1,
        found: 0,
    })
}

/// tap-color / tap-shape: `correct` tiles carry the target value, the
/// distractors carry any other value (repeats allowed).
#[derive(Debug, Clone, Copy)]
pub struct AttributeTap {
    attribute: Attribute,
}

impl AttributeTap {
    #[must_use]
    pub const fn new(attribute: Attribute) -> Self {
        Self { attribute }
    }
}

impl RoundGenerator for AttributeTap {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        let kind = ctx.level.mechanic;
        let pool = self.attribute.pool(ctx);
        let colors = ctx.palette.color_ids();
        let target = pick(&pool, kind, rng)?;
        let others: Vec<&str> = pool.iter().copied().filter(|value| *value != target).collect();

        let mut tiles = Vec::with_capacity(ctx.layout.total());
        for _ in 0..ctx.layout.correct {
            tiles.push((self.attribute.tile(target, &colors, rng), true));
        }
        for _ in 0..ctx.layout.distractors {
            let value = pick(&others, kind, rng)?;
            tiles.push((self.attribute.tile(value, &colors, rng), false));
        }
        Ok(assemble(kind, self.attribute.prompt(target), tiles, rng))
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        let kind = ctx.level.mechanic;
        require_pool(kind, self.attribute.pool_name(), 2, self.attribute.pool(ctx).len())?;
        if self.attribute == Attribute::Shape {
            require_pool(kind, "colors", 1, ctx.palette.colors.len())?;
        }
        Ok(())
    }
}

/// One target among pairwise-distinct values (tap-color-timed, and the
/// color and shape challenges of the boss).
#[derive(Debug, Clone, Copy)]
pub struct DistinctPick {
    kind: MechanicKind,
    attribute: Attribute,
}

impl DistinctPick {
    #[must_use]
    pub const fn new(kind: MechanicKind, attribute: Attribute) -> Self {
        Self { kind, attribute }
    }
}

impl RoundGenerator for DistinctPick {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        let pool = self.attribute.pool(ctx);
        let colors = ctx.palette.color_ids();
        let count = ctx.layout.total().max(1);
        let picks: Vec<&str> = pool.choose_multiple(rng, count).copied().collect();
        let target = *picks.first().ok_or(ConfigError::PaletteTooSmall {
            kind: self.kind,
            pool: self.attribute.pool_name(),
            needed: count,
            found: 0,
        })?;

        let tiles = picks
            .iter()
            .enumerate()
            .map(|(idx, value)| (self.attribute.tile(value, &colors, rng), idx == 0))
            .collect();
        Ok(assemble(self.kind, self.attribute.prompt(target), tiles, rng))
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        require_pool(
            self.kind,
            self.attribute.pool_name(),
            ctx.layout.total().max(1),
            self.attribute.pool(ctx).len(),
        )
    }
}

/// tap-color-shape: correct tiles satisfy both targets, distractors are
/// re-drawn whenever they accidentally satisfy both.
#[derive(Debug, Clone, Copy)]
pub struct ColorShapeTap;

impl RoundGenerator for ColorShapeTap {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        let kind = ctx.level.mechanic;
        let colors = ctx.palette.color_ids();
        let shapes = ctx.palette.shape_ids();
        let color = pick(&colors, kind, rng)?;
        let shape = pick(&shapes, kind, rng)?;

        let mut tiles = Vec::with_capacity(ctx.layout.total());
        for _ in 0..ctx.layout.correct {
            tiles.push((Appearance::shaped(shape, color), true));
        }
        for _ in 0..ctx.layout.distractors {
            let mut draws = 0;
            let (c, s) = loop {
                let candidate = (pick(&colors, kind, rng)?, pick(&shapes, kind, rng)?);
                if candidate != (color, shape) {
                    break candidate;
                }
                draws += 1;
                if draws >= MAX_REDRAWS {
                    return Err(ConfigError::Unsatisfiable {
                        kind,
                        attempts: draws,
                    });
                }
            };
            tiles.push((Appearance::shaped(s, c), false));
        }

        let prompt = Prompt::ColorShape {
            color: color.to_string(),
            shape: shape.to_string(),
        };
        Ok(assemble(kind, prompt, tiles, rng))
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        let kind = ctx.level.mechanic;
        require_pool(kind, "colors", 1, ctx.palette.colors.len())?;
        require_pool(kind, "shapes", 1, ctx.palette.shapes.len())?;
        require_pool(
            kind,
            "color and shape combinations",
            2,
            ctx.palette.colors.len() * ctx.palette.shapes.len(),
        )
    }
}

/// tap-with-distractors: a few copies of the target hidden among many
/// distinct objects, none of them the target.
#[derive(Debug, Clone, Copy)]
pub struct DistractorField;

impl RoundGenerator for DistractorField {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        let kind = ctx.level.mechanic;
        let needed = ctx.layout.distractors + 1;
        let drawn: Vec<_> = ctx.palette.objects.choose_multiple(rng, needed).collect();
        let Some((target, distractors)) = drawn.split_first() else {
            return Err(ConfigError::PaletteTooSmall {
                kind,
                pool: "objects",
                needed,
                found: 0,
            });
        };

        let mut tiles = Vec::with_capacity(ctx.layout.total());
        for _ in 0..ctx.layout.correct {
            tiles.push((Appearance::object(&target.emoji), true));
        }
        tiles.extend(
            distractors
                .iter()
                .map(|object| (Appearance::object(&object.emoji), false)),
        );

        let prompt = Prompt::Object {
            object: target.id.clone(),
        };
        Ok(assemble(kind, prompt, tiles, rng))
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        require_pool(
            ctx.level.mechanic,
            "objects",
            ctx.layout.distractors + 1,
            ctx.palette.objects.len(),
        )
    }
}
