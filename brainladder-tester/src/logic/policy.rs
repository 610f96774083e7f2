use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use brainladder_game::{OptionId, SessionController};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

/// What a policy does on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMove {
    Tap(OptionId),
    Wait(Duration),
}

/// Policy interface for automated play.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Decide the next move for an active session.
    fn next_move(&mut self, session: &SessionController) -> PolicyMove;
}

/// Built-in play strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayStrategy {
    Perfect,
    Clumsy,
    Random,
    Idle,
}

impl PlayStrategy {
    pub const ALL: [Self; 4] = [Self::Perfect, Self::Clumsy, Self::Random, Self::Idle];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PlayStrategy::Perfect => "perfect",
            PlayStrategy::Clumsy => "clumsy",
            PlayStrategy::Random => "random",
            PlayStrategy::Idle => "idle",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            PlayStrategy::Perfect => Box::new(PerfectPolicy),
            PlayStrategy::Clumsy => Box::new(ClumsyPolicy),
            PlayStrategy::Random => Box::new(RandomPolicy {
                rng: ChaCha20Rng::seed_from_u64(seed),
            }),
            PlayStrategy::Idle => Box::new(IdlePolicy),
        }
    }
}

impl fmt::Display for PlayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlayStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown policy '{s}'"))
    }
}

struct PerfectPolicy;
struct ClumsyPolicy;
struct IdlePolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

/// Tiles worth tapping: on pair boards this skips solved pairs and the
/// single tile already waiting for its partner.
fn selectable(session: &SessionController) -> Vec<OptionId> {
    let state = session.state();
    let round = &state.round;
    match &state.board {
        Some(board) => {
            let open = if board.pending_mismatch().is_some() {
                &[][..]
            } else {
                board.flipped()
            };
            round
                .options
                .iter()
                .filter(|opt| !opt.appearance.pair.is_some_and(|pair| board.is_matched(pair)))
                .filter(|opt| !open.contains(&opt.id))
                .map(|opt| opt.id)
                .collect()
        }
        None => round.options.iter().map(|opt| opt.id).collect(),
    }
}

fn first_option(session: &SessionController) -> PolicyMove {
    session
        .round()
        .options
        .first()
        .map_or(PolicyMove::Wait(Duration::from_secs(1)), |opt| {
            PolicyMove::Tap(opt.id)
        })
}

fn correct_move(session: &SessionController) -> PolicyMove {
    let state = session.state();
    let round = &state.round;
    if let Some(board) = &state.board {
        if let [open] = board.flipped() {
            if board.pending_mismatch().is_none() {
                if let Some(partner) = round.partner(*open) {
                    return PolicyMove::Tap(partner);
                }
            }
        }
        return selectable(session)
            .first()
            .map_or_else(|| first_option(session), |id| PolicyMove::Tap(*id));
    }
    round
        .correct_ids()
        .first()
        .map_or_else(|| first_option(session), |id| PolicyMove::Tap(*id))
}

fn wrong_move(session: &SessionController) -> PolicyMove {
    let state = session.state();
    let round = &state.round;
    if let Some(board) = &state.board {
        // Every tile is correct on a pair board; a miss is a mismatched flip.
        let candidates = selectable(session);
        let open = match board.flipped() {
            [open] if board.pending_mismatch().is_none() => Some(*open),
            _ => None,
        };
        let pick = match open {
            Some(open) => {
                let pair = round.option(open).and_then(|opt| opt.appearance.pair);
                candidates
                    .into_iter()
                    .find(|id| round.option(*id).and_then(|opt| opt.appearance.pair) != pair)
            }
            None => candidates.first().copied(),
        };
        return pick.map_or_else(|| first_option(session), PolicyMove::Tap);
    }
    round
        .options
        .iter()
        .find(|opt| !opt.is_correct)
        .map_or_else(|| first_option(session), |opt| PolicyMove::Tap(opt.id))
}

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "perfect"
    }

    fn next_move(&mut self, session: &SessionController) -> PolicyMove {
        correct_move(session)
    }
}

impl PlayerPolicy for ClumsyPolicy {
    fn name(&self) -> &'static str {
        "clumsy"
    }

    fn next_move(&mut self, session: &SessionController) -> PolicyMove {
        wrong_move(session)
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn next_move(&mut self, session: &SessionController) -> PolicyMove {
        let candidates = selectable(session);
        candidates
            .choose(&mut self.rng)
            .map_or_else(|| first_option(session), |id| PolicyMove::Tap(*id))
    }
}

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "idle"
    }

    /// Lets the clock run out on timed levels; elsewhere it taps wrong so the
    /// attempt still ends.
    fn next_move(&mut self, session: &SessionController) -> PolicyMove {
        if session.countdown().is_some() {
            PolicyMove::Wait(Duration::from_secs(1))
        } else {
            wrong_move(session)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainladder_game::{GameEngine, MemoryBackend};

    #[test]
    fn strategies_parse_from_labels() {
        for strategy in PlayStrategy::ALL {
            assert_eq!(strategy.label().parse::<PlayStrategy>(), Ok(strategy));
        }
        assert_eq!("PERFECT".parse::<PlayStrategy>(), Ok(PlayStrategy::Perfect));
        assert!("lucky".parse::<PlayStrategy>().is_err());
    }

    #[test]
    fn perfect_and_clumsy_disagree_on_level_one() {
        let mut engine = GameEngine::with_defaults(MemoryBackend::new()).unwrap();
        let session = engine.start_level(1, Some(4)).unwrap();
        let PolicyMove::Tap(good) = PlayStrategy::Perfect.create_policy(0).next_move(&session)
        else {
            panic!("perfect policy should tap");
        };
        let PolicyMove::Tap(bad) = PlayStrategy::Clumsy.create_policy(0).next_move(&session)
        else {
            panic!("clumsy policy should tap");
        };
        assert!(session.round().option(good).unwrap().is_correct);
        assert!(!session.round().option(bad).unwrap().is_correct);
    }

    #[test]
    fn idle_policy_taps_on_untimed_levels() {
        let mut engine = GameEngine::with_defaults(MemoryBackend::new()).unwrap();
        let session = engine.start_level(1, Some(2)).unwrap();
        assert!(session.countdown().is_none());
        let mut policy = PlayStrategy::Idle.create_policy(0);
        assert!(matches!(policy.next_move(&session), PolicyMove::Tap(_)));
    }

    #[test]
    fn random_policy_is_reproducible() {
        let mut engine = GameEngine::with_defaults(MemoryBackend::new()).unwrap();
        let session = engine.start_level(1, Some(3)).unwrap();
        let mut a = PlayStrategy::Random.create_policy(17);
        let mut b = PlayStrategy::Random.create_policy(17);
        for _ in 0..5 {
            assert_eq!(a.next_move(&session), b.next_move(&session));
        }
    }
}
