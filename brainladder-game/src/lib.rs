//! Brain Ladder Game Engine
//!
//! Progression and session-outcome logic for the Brain Ladder mini-game app:
//! round generation per mechanic, outcome evaluation, star rating and saved
//! progress with unlock cascades. No UI or platform dependencies.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod mechanics;
pub mod outcome;
pub mod progress;
pub mod session;
pub mod stars;
pub mod timer;

use std::sync::Arc;

// Re-export commonly used types
pub use catalog::{
    Catalog, ColorSwatch, Level, LevelId, ObjectDef, Palette, ShapeDef, World, WorldId,
};
pub use config::{EngineConfig, RoundLayout, StarThresholds};
pub use error::{ConfigError, GameError, StateError, StoreError};
pub use mechanics::{
    Appearance, EvaluationStyle, MechanicKind, MechanicRegistry, MechanicStrategy, OptionId,
    PairBoard, Prompt, Round, RoundContext, RoundGenerator, RoundOption, RoundRng,
};
pub use outcome::{OutcomeEvaluator, OutcomeEvent, PlayerAction};
pub use progress::{
    AgeBand, AttemptOutcome, AttemptReceipt, JsonFileBackend, LevelProgressRecord, LevelStatus,
    MemoryBackend, ProgressBackend, ProgressStore, ProgressSummary, SharedProgressStore,
    UserProfile, WorldProgressRecord,
};
pub use session::{AttemptReport, SessionController, SessionState};
pub use stars::StarRater;
pub use timer::{Countdown, CountdownState, Tick};

/// Owns the catalog, mechanic registry, tuning and progress store, and opens
/// sessions for levels the player may enter.
#[derive(Debug)]
pub struct GameEngine<B: ProgressBackend> {
    catalog: Catalog,
    registry: Arc<MechanicRegistry>,
    config: Arc<EngineConfig>,
    store: ProgressStore<B>,
}

impl<B: ProgressBackend> GameEngine<B> {
    /// Assemble an engine from its parts. The store is opened with the
    /// config's retry budget.
    pub fn new(
        catalog: Catalog,
        registry: MechanicRegistry,
        config: EngineConfig,
        backend: B,
    ) -> Self {
        let store = ProgressStore::open_with_retries(backend, config.write_retries);
        Self {
            catalog,
            registry: Arc::new(registry),
            config: Arc::new(config),
            store,
        }
    }

    /// Engine over the embedded catalog, palette and tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded catalog fails to parse.
    pub fn with_defaults(backend: B) -> Result<Self, ConfigError> {
        let registry = MechanicRegistry::standard();
        let config = EngineConfig::default();
        let catalog = Catalog::embedded(&registry, &config)?;
        Ok(Self::new(catalog, registry, config, backend))
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &MechanicRegistry {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProgressStore<B> {
        &mut self.store
    }

    /// Open a session for a level.
    ///
    /// # Errors
    ///
    /// Returns the level's configuration error if it is unavailable,
    /// [`StateError::UnknownLevel`], [`StateError::LevelLocked`] for locked
    /// levels, or [`StateError::PremiumLocked`] for premium worlds that have
    /// not been purchased.
    pub fn start_level(
        &mut self,
        level_id: LevelId,
        seed: Option<u64>,
    ) -> Result<SessionController, GameError> {
        let level = self.catalog.level(level_id)?.clone();
        let premium = self
            .catalog
            .world(level.world_id)
            .is_some_and(|world| world.is_premium);
        if premium && !self.store.premium_unlocked() {
            return Err(StateError::PremiumLocked(level_id).into());
        }
        if !self.store.get_record(level_id).is_unlocked {
            return Err(StateError::LevelLocked(level_id).into());
        }
        let session = SessionController::new(
            level,
            Arc::clone(&self.registry),
            Arc::clone(&self.config),
            self.catalog.shared_palette(),
            seed,
        )?;
        Ok(session)
    }

    /// Tap an option in a session backed by this engine's store.
    ///
    /// # Errors
    ///
    /// Returns an error if the next round cannot be generated.
    pub fn select(
        &mut self,
        session: &mut SessionController,
        id: OptionId,
    ) -> Result<Option<OutcomeEvent>, ConfigError> {
        let event = session.select(&mut self.store, id)?;
        if event.is_some_and(OutcomeEvent::is_terminal) {
            self.refresh_world_of(session.level().world_id);
        }
        Ok(event)
    }

    /// Advance a session's countdown.
    ///
    /// # Errors
    ///
    /// See [`SessionController::tick`].
    pub fn tick(
        &mut self,
        session: &mut SessionController,
        elapsed: std::time::Duration,
    ) -> Result<Option<OutcomeEvent>, ConfigError> {
        let event = session.tick(&mut self.store, elapsed)?;
        if event.is_some_and(OutcomeEvent::is_terminal) {
            self.refresh_world_of(session.level().world_id);
        }
        Ok(event)
    }

    /// Recompute world totals, including the world after it whose first
    /// level may just have been unlocked.
    fn refresh_world_of(&mut self, world_id: WorldId) {
        for world in self.catalog.worlds() {
            if world.id == world_id || world.id == world_id.saturating_add(1) {
                self.store.refresh_world(world);
            }
        }
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        self.store.summary(&self.catalog)
    }

    /// Flush and release the backend.
    pub fn close(self) -> (B, Result<(), StoreError>) {
        self.store.close()
    }
}
