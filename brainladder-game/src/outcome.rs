//! Applies player actions to a session.
use serde::{Deserialize, Serialize};

use crate::catalog::Level;
use crate::constants::SCORE_PER_HIT;
use crate::mechanics::{EvaluationStyle, FlipResult, OptionId, PairBoard};
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    Select(OptionId),
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeEvent {
    /// Input accepted, session continues on the same round.
    Continue,
    /// A hit that did not reach the target. Single-tap kinds get a new round.
    RoundWonAdvance,
    LevelSuccess,
    LevelFailure,
}

impl OutcomeEvent {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::LevelSuccess | Self::LevelFailure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeEvaluator {
    score_per_hit: u32,
}

impl Default for OutcomeEvaluator {
    fn default() -> Self {
        Self::new(SCORE_PER_HIT)
    }
}

impl OutcomeEvaluator {
    #[must_use]
    pub const fn new(score_per_hit: u32) -> Self {
        Self { score_per_hit }
    }

    /// Apply one action. Returns `None` and leaves the state untouched when
    /// the session is over or the input names no selectable option.
    pub fn evaluate(
        &self,
        state: &mut SessionState,
        level: &Level,
        style: EvaluationStyle,
        action: PlayerAction,
    ) -> Option<OutcomeEvent> {
        if !state.is_active {
            return None;
        }
        let event = match action {
            PlayerAction::Timeout => Self::finish(state, OutcomeEvent::LevelFailure),
            PlayerAction::Select(id) => match style {
                EvaluationStyle::SingleTap => {
                    let correct = state.round.option(id)?.is_correct;
                    if correct {
                        self.hit(state, level)
                    } else {
                        Self::miss(state, level)
                    }
                }
                EvaluationStyle::Pairs => {
                    let board = state.board.get_or_insert_with(PairBoard::new);
                    match board.flip(&state.round, id) {
                        FlipResult::Ignored => return None,
                        FlipResult::Flipped => OutcomeEvent::Continue,
                        FlipResult::Matched => self.hit(state, level),
                        FlipResult::Mismatched => Self::miss(state, level),
                    }
                }
            },
        };
        log::debug!(
            "level {} {action:?} -> {event:?} (score {}, mistakes {})",
            level.id,
            state.score,
            state.mistakes
        );
        Some(event)
    }

    fn hit(&self, state: &mut SessionState, level: &Level) -> OutcomeEvent {
        state.score = state.score.saturating_add(self.score_per_hit);
        state.round_index += 1;
        if state.round_index >= level.target_count {
            Self::finish(state, OutcomeEvent::LevelSuccess)
        } else {
            OutcomeEvent::RoundWonAdvance
        }
    }

    fn miss(state: &mut SessionState, level: &Level) -> OutcomeEvent {
        state.mistakes += 1;
        if state.mistakes >= level.max_wrong_attempts {
            Self::finish(state, OutcomeEvent::LevelFailure)
        } else {
            OutcomeEvent::Continue
        }
    }

    fn finish(state: &mut SessionState, event: OutcomeEvent) -> OutcomeEvent {
        state.is_active = false;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanics::{Appearance, MechanicKind, Prompt, Round, RoundOption};

    fn level(kind: MechanicKind, target: u32, mistakes: u32) -> Level {
        Level {
            id: 1,
            world_id: 1,
            number: 1,
            name: "eval".into(),
            mechanic: kind,
            target_count: target,
            max_wrong_attempts: mistakes,
            time_limit_seconds: None,
        }
    }

    fn tap_round() -> Round {
        Round {
            kind: MechanicKind::TapColor,
            prompt: Prompt::Color {
                color: "red".into(),
            },
            options: vec![
                RoundOption {
                    id: OptionId(0),
                    appearance: Appearance::colored("red"),
                    is_correct: true,
                },
                RoundOption {
                    id: OptionId(1),
                    appearance: Appearance::colored("blue"),
                    is_correct: false,
                },
            ],
        }
    }

    fn pair_round() -> Round {
        let tile = |id, pair| RoundOption {
            id: OptionId(id),
            appearance: Appearance {
                pair: Some(pair),
                ..Appearance::object("x")
            },
            is_correct: true,
        };
        Round {
            kind: MechanicKind::MatchPairs,
            prompt: Prompt::MatchPairs,
            options: vec![tile(0, 0), tile(1, 1), tile(2, 0), tile(3, 1)],
        }
    }

    #[test]
    fn hits_advance_until_target() {
        let lvl = level(MechanicKind::TapColor, 2, 3);
        let mut state = SessionState::new(lvl.id, tap_round());
        let eval = OutcomeEvaluator::default();
        let select = PlayerAction::Select(OptionId(0));
        assert_eq!(
            eval.evaluate(&mut state, &lvl, EvaluationStyle::SingleTap, select),
            Some(OutcomeEvent::RoundWonAdvance)
        );
        assert_eq!(
            eval.evaluate(&mut state, &lvl, EvaluationStyle::SingleTap, select),
            Some(OutcomeEvent::LevelSuccess)
        );
        assert_eq!(state.score, 200);
        assert!(!state.is_active);
    }

    #[test]
    fn misses_exhaust_the_budget() {
        let lvl = level(MechanicKind::TapColor, 3, 2);
        let mut state = SessionState::new(lvl.id, tap_round());
        let eval = OutcomeEvaluator::default();
        let wrong = PlayerAction::Select(OptionId(1));
        assert_eq!(
            eval.evaluate(&mut state, &lvl, EvaluationStyle::SingleTap, wrong),
            Some(OutcomeEvent::Continue)
        );
        assert_eq!(
            eval.evaluate(&mut state, &lvl, EvaluationStyle::SingleTap, wrong),
            Some(OutcomeEvent::LevelFailure)
        );
        assert_eq!(state.mistakes, 2);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn inactive_sessions_ignore_everything() {
        let lvl = level(MechanicKind::TapColor, 3, 3);
        let mut state = SessionState::new(lvl.id, tap_round());
        let eval = OutcomeEvaluator::default();
        assert_eq!(
            eval.evaluate(&mut state, &lvl, EvaluationStyle::SingleTap, PlayerAction::Timeout),
            Some(OutcomeEvent::LevelFailure)
        );
        let snapshot = state.clone();
        for action in [PlayerAction::Select(OptionId(0)), PlayerAction::Timeout] {
            assert_eq!(
                eval.evaluate(&mut state, &lvl, EvaluationStyle::SingleTap, action),
                None
            );
        }
        assert_eq!(state, snapshot);
    }

    #[test]
    fn unknown_option_is_a_no_op() {
        let lvl = level(MechanicKind::TapColor, 3, 3);
        let mut state = SessionState::new(lvl.id, tap_round());
        let snapshot = state.clone();
        let eval = OutcomeEvaluator::default();
        assert_eq!(
            eval.evaluate(
                &mut state,
                &lvl,
                EvaluationStyle::SingleTap,
                PlayerAction::Select(OptionId(42))
            ),
            None
        );
        assert_eq!(state, snapshot);
    }

    #[test]
    fn pairs_score_only_on_match() {
        let lvl = level(MechanicKind::MatchPairs, 2, 3);
        let mut state = SessionState::new(lvl.id, pair_round());
        let eval = OutcomeEvaluator::default();
        let mut tap = |id| {
            eval.evaluate(
                &mut state,
                &lvl,
                EvaluationStyle::Pairs,
                PlayerAction::Select(OptionId(id)),
            )
        };
        assert_eq!(tap(0), Some(OutcomeEvent::Continue));
        assert_eq!(tap(0), None);
        assert_eq!(tap(1), Some(OutcomeEvent::Continue));
        assert_eq!(tap(0), Some(OutcomeEvent::Continue));
        assert_eq!(tap(2), Some(OutcomeEvent::RoundWonAdvance));
        assert_eq!(tap(2), None);
        assert_eq!(tap(1), Some(OutcomeEvent::Continue));
        assert_eq!(tap(3), Some(OutcomeEvent::LevelSuccess));
        assert_eq!(state.score, 200);
        assert_eq!(state.mistakes, 1);
    }

    #[test]
    fn ignored_pair_taps_keep_the_mismatch_showing() {
        let lvl = level(MechanicKind::MatchPairs, 2, 3);
        let mut state = SessionState::new(lvl.id, pair_round());
        let eval = OutcomeEvaluator::default();
        for id in [0, 1] {
            eval.evaluate(
                &mut state,
                &lvl,
                EvaluationStyle::Pairs,
                PlayerAction::Select(OptionId(id)),
            );
        }
        let snapshot = state.clone();
        assert_eq!(
            eval.evaluate(
                &mut state,
                &lvl,
                EvaluationStyle::Pairs,
                PlayerAction::Select(OptionId(42))
            ),
            None
        );
        assert_eq!(state, snapshot);
        assert!(state.board.as_ref().is_some_and(|b| b.pending_mismatch().is_some()));
    }
}
