//! One level attempt from first round to terminal outcome.
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Level, LevelId, Palette};
use crate::config::EngineConfig;
use crate::error::{ConfigError, StateError};
use crate::mechanics::{
    EvaluationStyle, MechanicKind, MechanicRegistry, OptionId, PairBoard, Round, RoundRng,
};
use crate::outcome::{OutcomeEvaluator, OutcomeEvent, PlayerAction};
use crate::progress::{AttemptOutcome, AttemptReceipt, ProgressBackend, ProgressStore};
use crate::stars::StarRater;
use crate::timer::{Countdown, Tick};

/// Mutable state of the attempt in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub level_id: LevelId,
    /// Hits so far. For match-pairs this counts solved pairs.
    pub round_index: u32,
    pub score: u32,
    pub mistakes: u32,
    pub is_active: bool,
    pub round: Round,
    pub board: Option<PairBoard>,
}

impl SessionState {
    #[must_use]
    pub fn new(level_id: LevelId, round: Round) -> Self {
        let board = (round.kind == MechanicKind::MatchPairs).then(PairBoard::new);
        Self {
            level_id,
            round_index: 0,
            score: 0,
            mistakes: 0,
            is_active: true,
            round,
            board,
        }
    }
}

/// What happened when the attempt ended.
#[derive(Debug)]
pub struct AttemptReport {
    pub level_id: LevelId,
    pub outcome: AttemptOutcome,
    pub recorded: Result<AttemptReceipt, StateError>,
}

impl AttemptReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome.completed
    }
}

/// Drives a single attempt: generates rounds, feeds input to the evaluator,
/// owns the countdown and records the result once.
#[derive(Debug)]
pub struct SessionController {
    level: Level,
    registry: Arc<MechanicRegistry>,
    config: Arc<EngineConfig>,
    palette: Arc<Palette>,
    evaluator: OutcomeEvaluator,
    rater: StarRater,
    style: EvaluationStyle,
    rng: RoundRng,
    seed: Option<u64>,
    state: SessionState,
    countdown: Option<Countdown>,
    report: Option<AttemptReport>,
}

impl SessionController {
    /// Start an attempt. A seed makes every round reproducible; without one
    /// the generator draws from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns an error if the level's mechanic is unregistered, the config
    /// cannot rate a win, or the first round cannot be generated.
    pub fn new(
        level: Level,
        registry: Arc<MechanicRegistry>,
        config: Arc<EngineConfig>,
        palette: Arc<Palette>,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let style = registry.evaluation(level.mechanic)?;
        config.validate()?;
        let rater = StarRater::new(config.stars, config.score_per_hit);
        rater.rate(0, level.target_count)?;
        let mut rng = seed.map_or_else(RoundRng::from_entropy, RoundRng::seed_from_u64);
        let round = registry.generate(&level, &palette, &config, 0, &mut rng)?;
        log::info!(
            "starting level {} ({}) seed {seed:?}",
            level.id,
            level.mechanic
        );
        Ok(Self {
            evaluator: OutcomeEvaluator::new(config.score_per_hit),
            rater,
            state: SessionState::new(level.id, round),
            countdown: level.time_limit().map(Countdown::new),
            level,
            registry,
            config,
            palette,
            style,
            rng,
            seed,
            report: None,
        })
    }

    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn round(&self) -> &Round {
        &self.state.round
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[must_use]
    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    #[must_use]
    pub fn time_remaining(&self) -> Option<Duration> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    #[must_use]
    pub fn report(&self) -> Option<&AttemptReport> {
        self.report.as_ref()
    }

    /// Tap an option.
    ///
    /// # Errors
    ///
    /// Returns an error if the next round cannot be generated.
    pub fn select<B: ProgressBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
        id: OptionId,
    ) -> Result<Option<OutcomeEvent>, ConfigError> {
        self.apply(store, PlayerAction::Select(id))
    }

    /// Advance the countdown. Expiry ends the attempt as a failure; ticks on
    /// untimed levels or after the end do nothing.
    ///
    /// # Errors
    ///
    /// Expiry never generates a round, so this does not fail in practice.
    pub fn tick<B: ProgressBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
        elapsed: Duration,
    ) -> Result<Option<OutcomeEvent>, ConfigError> {
        let Some(countdown) = self.countdown.as_mut() else {
            return Ok(None);
        };
        match countdown.tick(elapsed) {
            Tick::Expired => self.apply(store, PlayerAction::Timeout),
            Tick::Running { .. } | Tick::Idle => Ok(None),
        }
    }

    /// Flip back a revealed match-pairs mismatch.
    pub fn settle(&mut self) -> bool {
        self.state.board.as_mut().is_some_and(PairBoard::settle)
    }

    /// Throw away the current attempt and start over on the same level.
    /// The random stream continues, so the new board differs.
    ///
    /// # Errors
    ///
    /// Returns an error if the first round cannot be generated.
    pub fn retry(&mut self) -> Result<(), ConfigError> {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.cancel();
        }
        let round = self.generate(0)?;
        self.state = SessionState::new(self.level.id, round);
        self.countdown = self.level.time_limit().map(Countdown::new);
        self.report = None;
        log::debug!("retrying level {}", self.level.id);
        Ok(())
    }

    /// End the session, returning the report if the attempt finished.
    pub fn teardown(mut self) -> Option<AttemptReport> {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.cancel();
        }
        self.report.take()
    }

    fn generate(&mut self, round_index: u32) -> Result<Round, ConfigError> {
        self.registry.generate(
            &self.level,
            &self.palette,
            &self.config,
            round_index,
            &mut self.rng,
        )
    }

    fn apply<B: ProgressBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
        action: PlayerAction,
    ) -> Result<Option<OutcomeEvent>, ConfigError> {
        let Some(event) =
            self.evaluator
                .evaluate(&mut self.state, &self.level, self.style, action)
        else {
            return Ok(None);
        };
        match event {
            OutcomeEvent::RoundWonAdvance if self.style.regenerates_on_hit() => {
                self.state.round = self.generate(self.state.round_index)?;
            }
            OutcomeEvent::LevelSuccess | OutcomeEvent::LevelFailure => self.finish(store, event),
            OutcomeEvent::RoundWonAdvance | OutcomeEvent::Continue => {}
        }
        Ok(Some(event))
    }

    // Rating was checked when the session started, so a win is always
    // recorded.
    fn finish<B: ProgressBackend>(&mut self, store: &mut ProgressStore<B>, event: OutcomeEvent) {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.cancel();
        }
        let score = self.state.score;
        let outcome = if event == OutcomeEvent::LevelSuccess {
            let stars = self
                .rater
                .rate(score, self.level.target_count)
                .unwrap_or_else(|err| {
                    log::error!("level {} could not be rated ({err}); 1 star", self.level.id);
                    1
                });
            AttemptOutcome::success(score, stars)
        } else {
            AttemptOutcome::failure(score)
        };
        let recorded = store.record_attempt(self.level.id, outcome);
        match &recorded {
            Ok(receipt) => {
                if let Some(err) = &receipt.persist_error {
                    log::warn!("level {} result kept in memory: {err}", self.level.id);
                }
            }
            Err(err) => log::warn!("level {} attempt not recorded: {err}", self.level.id),
        }
        self.report = Some(AttemptReport {
            level_id: self.level.id,
            outcome,
            recorded,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryBackend;

    fn controller(level: Level, seed: u64) -> SessionController {
        SessionController::new(
            level,
            Arc::new(MechanicRegistry::standard()),
            Arc::new(EngineConfig::default()),
            Arc::new(Palette::default()),
            Some(seed),
        )
        .unwrap()
    }

    fn tap_level() -> Level {
        Level {
            id: 1,
            world_id: 1,
            number: 1,
            name: "colors".into(),
            mechanic: MechanicKind::TapColor,
            target_count: 3,
            max_wrong_attempts: 2,
            time_limit_seconds: None,
        }
    }

    fn timed_level() -> Level {
        Level {
            id: 1,
            world_id: 1,
            number: 1,
            name: "quick".into(),
            mechanic: MechanicKind::TapColorTimed,
            target_count: 5,
            max_wrong_attempts: 3,
            time_limit_seconds: Some(5),
        }
    }

    #[test]
    fn same_seed_same_rounds() {
        let a = controller(tap_level(), 77);
        let b = controller(tap_level(), 77);
        assert_eq!(a.round(), b.round());
        assert_eq!(a.seed(), Some(77));
    }

    #[test]
    fn perfect_run_records_three_stars() {
        let mut store = ProgressStore::open(MemoryBackend::new());
        let mut session = controller(tap_level(), 1);
        let mut last = None;
        while session.is_active() {
            let id = session.round().correct_ids()[0];
            last = session.select(&mut store, id).unwrap();
        }
        assert_eq!(last, Some(OutcomeEvent::LevelSuccess));
        let report = session.teardown().unwrap();
        assert!(report.succeeded());
        assert_eq!(report.outcome.stars, 3);
        let receipt = report.recorded.unwrap();
        assert_eq!(receipt.unlocked_next, Some(2));
        assert_eq!(store.get_record(1).stars, 3);
    }

    #[test]
    fn timeout_fails_once_and_later_input_is_ignored() {
        let mut store = ProgressStore::open(MemoryBackend::new());
        let mut session = controller(timed_level(), 2);
        assert_eq!(
            session.tick(&mut store, Duration::from_secs(2)).unwrap(),
            None
        );
        assert_eq!(
            session.tick(&mut store, Duration::from_secs(3)).unwrap(),
            Some(OutcomeEvent::LevelFailure)
        );
        assert_eq!(session.tick(&mut store, Duration::from_secs(3)).unwrap(), None);
        let id = session.round().correct_ids()[0];
        assert_eq!(session.select(&mut store, id).unwrap(), None);
        assert_eq!(store.get_record(1).attempts, 1);
        assert!(!store.get_record(1).is_completed);
    }

    #[test]
    fn retry_resets_state_and_timer() {
        let mut store = ProgressStore::open(MemoryBackend::new());
        let mut session = controller(timed_level(), 3);
        session.tick(&mut store, Duration::from_secs(4)).unwrap();
        let wrong = session
            .round()
            .options
            .iter()
            .find(|opt| !opt.is_correct)
            .map(|opt| opt.id)
            .unwrap();
        session.select(&mut store, wrong).unwrap();
        session.retry().unwrap();
        assert_eq!(session.state().mistakes, 0);
        assert!(session.is_active());
        assert_eq!(session.time_remaining(), Some(Duration::from_secs(5)));
        assert!(session.report().is_none());
    }

    #[test]
    fn locked_level_outcome_is_reported_not_recorded() {
        let mut store = ProgressStore::open(MemoryBackend::new());
        let level = Level {
            id: 4,
            ..tap_level()
        };
        let mut session = controller(level, 4);
        while session.is_active() {
            let id = session.round().correct_ids()[0];
            session.select(&mut store, id).unwrap();
        }
        let report = session.teardown().unwrap();
        assert!(matches!(report.recorded, Err(StateError::LevelLocked(4))));
    }

    #[test]
    fn unratable_setups_are_refused_before_play() {
        let zero_hit = EngineConfig {
            score_per_hit: 0,
            ..EngineConfig::default()
        };
        let err = SessionController::new(
            tap_level(),
            Arc::new(MechanicRegistry::standard()),
            Arc::new(zero_hit),
            Arc::new(Palette::default()),
            Some(5),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroScorePerHit);

        let no_target = Level {
            target_count: 0,
            ..tap_level()
        };
        let err = SessionController::new(
            no_target,
            Arc::new(MechanicRegistry::standard()),
            Arc::new(EngineConfig::default()),
            Arc::new(Palette::default()),
            Some(5),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroTarget);
    }
}
