//! match-pairs: board generation and the two-phase flip state.
use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::registry::RoundGenerator;
use super::{Appearance, OptionId, Prompt, Round, RoundContext, RoundRng, assemble, require_pool};
use crate::error::ConfigError;

/// Deals `target_count` pairs of objects, two tiles per object sharing a
/// pair id. Every tile belongs to some pair, so every tile is correct.
#[derive(Debug, Clone, Copy)]
pub struct MatchPairs;

impl MatchPairs {
    fn pair_count(ctx: &RoundContext<'_>) -> usize {
        usize::try_from(ctx.level.target_count).unwrap_or(usize::MAX)
    }
}

impl RoundGenerator for MatchPairs {
    fn generate(&self, ctx: &RoundContext<'_>, rng: &mut RoundRng) -> Result<Round, ConfigError> {
        let kind = ctx.level.mechanic;
        let needed = Self::pair_count(ctx);
        let objects: Vec<_> = ctx.palette.objects.choose_multiple(rng, needed).collect();
        require_pool(kind, "objects", needed, objects.len())?;

        let mut tiles = Vec::with_capacity(needed * 2);
        for (pair, object) in (0u32..).zip(&objects) {
            for _ in 0..2 {
                let appearance = Appearance {
                    pair: Some(pair),
                    ..Appearance::object(&object.emoji)
                };
                tiles.push((appearance, true));
            }
        }
        Ok(assemble(kind, Prompt::MatchPairs, tiles, rng))
    }

    fn validate(&self, ctx: &RoundContext<'_>) -> Result<(), ConfigError> {
        require_pool(
            ctx.level.mechanic,
            "objects",
            Self::pair_count(ctx),
            ctx.palette.objects.len(),
        )
    }
}

/// Result of flipping a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipResult {
    /// Tile unknown, already face up, or part of a solved pair.
    Ignored,
    /// First tile of a pair attempt is now face up.
    Flipped,
    /// Second tile completed a pair.
    Matched,
    /// Second tile did not match; both stay revealed until settled.
    Mismatched,
}

/// Face-up state of a match-pairs board for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairBoard {
    flipped: SmallVec<[OptionId; 2]>,
    matched: BTreeSet<u32>,
    revealed_mismatch: Option<(OptionId, OptionId)>,
}

impl PairBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a revealed mismatch face down again. Returns true if anything
    /// changed.
    pub fn settle(&mut self) -> bool {
        if self.revealed_mismatch.take().is_some() {
            self.flipped.clear();
            true
        } else {
            false
        }
    }

    /// Flip a tile. Tiles of a pending mismatch count as face down, so both
    /// stay selectable. An accepted tap settles the mismatch first; an
    /// ignored one leaves the board as it was.
    pub fn flip(&mut self, round: &Round, id: OptionId) -> FlipResult {
        let Some(pair) = round.option(id).and_then(|opt| opt.appearance.pair) else {
            return FlipResult::Ignored;
        };
        let open = self.revealed_mismatch.is_none() && self.flipped.contains(&id);
        if self.matched.contains(&pair) || open {
            return FlipResult::Ignored;
        }
        self.settle();

        let Some(&first) = self.flipped.first() else {
            self.flipped.push(id);
            return FlipResult::Flipped;
        };
        let first_pair = round.option(first).and_then(|opt| opt.appearance.pair);
        if first_pair == Some(pair) {
            self.matched.insert(pair);
            self.flipped.clear();
            FlipResult::Matched
        } else {
            self.flipped.push(id);
            self.revealed_mismatch = Some((first, id));
            FlipResult::Mismatched
        }
    }

    #[must_use]
    pub fn is_face_up(&self, round: &Round, id: OptionId) -> bool {
        if self.flipped.contains(&id) {
            return true;
        }
        round
            .option(id)
            .and_then(|opt| opt.appearance.pair)
            .is_some_and(|pair| self.matched.contains(&pair))
    }

    /// Tiles currently face up but not part of a solved pair.
    #[must_use]
    pub fn flipped(&self) -> &[OptionId] {
        &self.flipped
    }

    #[must_use]
    pub fn is_matched(&self, pair: u32) -> bool {
        self.matched.contains(&pair)
    }

    #[must_use]
    pub fn matched_pairs(&self) -> usize {
        self.matched.len()
    }

    #[must_use]
    pub fn pending_mismatch(&self) -> Option<(OptionId, OptionId)> {
        self.revealed_mismatch
    }
}
