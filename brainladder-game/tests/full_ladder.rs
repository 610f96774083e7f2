use brainladder_game::{
    GameEngine, GameError, MemoryBackend, OptionId, OutcomeEvent, SessionController, StateError,
    constants::SETTING_PREMIUM_UNLOCKED,
};
use std::time::Duration;

/// Tap the right thing every time, including the partner tile on pair boards.
fn perfect_choice(session: &SessionController) -> OptionId {
    let state = session.state();
    let round = &state.round;
    match &state.board {
        Some(board) => {
            if let [open] = board.flipped() {
                if let Some(partner) = round.partner(*open) {
                    return partner;
                }
            }
            round
                .options
                .iter()
                .find(|opt| opt.appearance.pair.is_some_and(|pair| !board.is_matched(pair)))
                .map(|opt| opt.id)
                .unwrap()
        }
        None => round.correct_ids()[0],
    }
}

fn wrong_choice(session: &SessionController) -> Option<OptionId> {
    session
        .round()
        .options
        .iter()
        .find(|opt| !opt.is_correct)
        .map(|opt| opt.id)
}

fn play_perfect(engine: &mut GameEngine<MemoryBackend>, level_id: u32, seed: u64) -> OutcomeEvent {
    let mut session = engine.start_level(level_id, Some(seed)).unwrap();
    let mut last = None;
    let mut taps = 0;
    while session.is_active() {
        let choice = perfect_choice(&session);
        last = engine.select(&mut session, choice).unwrap().or(last);
        taps += 1;
        assert!(taps < 200, "level {level_id} did not terminate");
    }
    let report = session.teardown().unwrap();
    assert!(report.recorded.is_ok());
    last.unwrap()
}

#[test]
fn perfect_play_climbs_every_free_world() {
    let mut engine = GameEngine::with_defaults(MemoryBackend::new()).unwrap();
    let free: Vec<u32> = engine
        .catalog()
        .worlds()
        .iter()
        .filter(|world| !world.is_premium)
        .flat_map(|world| world.levels.iter().map(|level| level.id))
        .collect();
    for (seed, level_id) in free.iter().enumerate() {
        let event = play_perfect(&mut engine, *level_id, seed as u64);
        assert_eq!(event, OutcomeEvent::LevelSuccess, "level {level_id}");
        let record = engine.store_mut().get_record(*level_id);
        assert_eq!(record.stars, 3, "level {level_id}");
    }

    let summary = engine.summary();
    assert_eq!(summary.completed_levels, 20);
    assert_eq!(summary.total_stars, 60);
    assert_eq!(summary.continue_level, 21);

    // Level 21 is unlocked but lives in the premium world.
    assert!(matches!(
        engine.start_level(21, Some(1)),
        Err(GameError::State(StateError::PremiumLocked(21)))
    ));
    engine
        .store_mut()
        .set_setting(SETTING_PREMIUM_UNLOCKED, "true")
        .unwrap();
    assert_eq!(play_perfect(&mut engine, 21, 99), OutcomeEvent::LevelSuccess);

    let world_two = engine.store_mut().world_record(2);
    assert_eq!(world_two.completed_levels, 10);
    assert!(engine.store_mut().world_record(3).is_unlocked);
}

#[test]
fn clumsy_play_fails_and_keeps_the_next_level_locked() {
    let mut engine = GameEngine::with_defaults(MemoryBackend::new()).unwrap();
    let mut session = engine.start_level(1, Some(5)).unwrap();
    let mut last = None;
    while session.is_active() {
        let choice = wrong_choice(&session).unwrap();
        last = engine.select(&mut session, choice).unwrap();
    }
    assert_eq!(last, Some(OutcomeEvent::LevelFailure));
    let record = engine.store_mut().get_record(1);
    assert_eq!(record.attempts, 1);
    assert!(!record.is_completed);
    assert!(matches!(
        engine.start_level(2, Some(1)),
        Err(GameError::State(StateError::LevelLocked(2)))
    ));
}

#[test]
fn pairs_mismatches_cost_mistakes_until_failure() {
    let mut engine = GameEngine::with_defaults(MemoryBackend::new()).unwrap();
    let pairs_level = engine
        .catalog()
        .levels()
        .find(|level| level.mechanic == brainladder_game::MechanicKind::MatchPairs)
        .map(|level| (level.id, level.max_wrong_attempts))
        .unwrap();
    // Unlock everything up to the pairs level.
    for id in 1..pairs_level.0 {
        play_perfect(&mut engine, id, u64::from(id));
    }
    let mut session = engine.start_level(pairs_level.0, Some(3)).unwrap();
    let round = session.round().clone();
    let first = round.options[0].clone();
    let other = round
        .options
        .iter()
        .find(|opt| opt.appearance.pair != first.appearance.pair)
        .unwrap()
        .id;
    let mut events = Vec::new();
    while session.is_active() {
        events.push(engine.select(&mut session, first.id).unwrap());
        events.push(engine.select(&mut session, other).unwrap());
    }
    let mismatches = session.state().mistakes;
    assert_eq!(mismatches, pairs_level.1);
    assert_eq!(session.state().score, 0);
    assert_eq!(events.last(), Some(&Some(OutcomeEvent::LevelFailure)));
}

#[test]
fn timed_level_expires_through_the_engine() {
    let mut engine = GameEngine::with_defaults(MemoryBackend::new()).unwrap();
    let timed = engine
        .catalog()
        .levels()
        .find(|level| level.time_limit().is_some())
        .map(|level| level.id)
        .unwrap();
    for id in 1..timed {
        play_perfect(&mut engine, id, 7);
    }
    let mut session = engine.start_level(timed, Some(8)).unwrap();
    let limit = session.time_remaining().unwrap();
    let mut expired = None;
    for _ in 0..limit.as_secs() {
        if let Some(event) = engine.tick(&mut session, Duration::from_secs(1)).unwrap() {
            expired = Some(event);
        }
    }
    assert_eq!(expired, Some(OutcomeEvent::LevelFailure));
    assert_eq!(engine.tick(&mut session, Duration::from_secs(1)).unwrap(), None);
    let record = engine.store_mut().get_record(timed);
    assert_eq!(record.attempts, 1);
    assert!(!record.is_completed);
}
