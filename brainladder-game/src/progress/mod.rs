//! Persistent progression state machine.
//!
//! A level moves `LOCKED -> UNLOCKED -> (attempted)* -> COMPLETED` and never
//! moves back. [`ProgressStore`] owns the backend, applies attempts, runs the
//! unlock cascade and keeps writes that failed after retries in a pending
//! queue so reads still see them.

pub mod backend;
pub mod file;
pub mod records;
pub mod shared;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::catalog::{Catalog, LevelId, World, WorldId};
use crate::constants::{
    DEFAULT_WRITE_RETRIES, FIRST_LEVEL_ID, SETTING_PREMIUM_UNLOCKED, SINGLE_PROFILE_ID,
};
use crate::error::{StateError, StoreError};

pub use backend::{MemoryBackend, ProgressBackend, Tables};
pub use file::JsonFileBackend;
pub use records::{
    AgeBand, AttemptOutcome, AttemptReceipt, LevelProgressRecord, LevelStatus, ProgressSummary,
    UserProfile, WorldProgressRecord,
};
pub use shared::SharedProgressStore;

#[derive(Debug)]
pub struct ProgressStore<B: ProgressBackend> {
    backend: B,
    write_retries: u32,
    pending: BTreeMap<LevelId, LevelProgressRecord>,
}

impl<B: ProgressBackend> ProgressStore<B> {
    /// Open a store with the default retry budget.
    pub fn open(backend: B) -> Self {
        Self::open_with_retries(backend, DEFAULT_WRITE_RETRIES)
    }

    /// Open a store and make sure the first level is playable, repairing a
    /// missing or locked row.
    pub fn open_with_retries(backend: B, write_retries: u32) -> Self {
        let mut store = Self {
            backend,
            write_retries,
            pending: BTreeMap::new(),
        };
        match store.load_record(FIRST_LEVEL_ID) {
            Ok(first) if !first.is_unlocked => {
                log::warn!("level {FIRST_LEVEL_ID} was locked; unlocking");
                store.unlock(first);
            }
            Ok(_) => {}
            Err(err) => log::warn!("level {FIRST_LEVEL_ID} unreadable at open, left as is: {err}"),
        }
        if let Err(err) = store.backend.flush() {
            log::warn!("initial flush failed: {err}");
        }
        store
    }

    /// Retry queued writes, flush, and hand the backend back.
    pub fn close(mut self) -> (B, Result<(), StoreError>) {
        let retried = self.retry_pending();
        let flushed = self.backend.flush();
        if !self.pending.is_empty() {
            log::warn!("closing with {} unsaved level rows", self.pending.len());
        }
        (self.backend, retried.and(flushed))
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of level rows waiting for a successful write.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Current record for a level, creating and persisting the default row
    /// if none exists. Read failures fall back to the default without
    /// persisting anything.
    pub fn get_record(&mut self, level_id: LevelId) -> LevelProgressRecord {
        self.load_record(level_id).unwrap_or_else(|err| {
            log::warn!("progress read for level {level_id} failed, using default: {err}");
            LevelProgressRecord::new_default(level_id)
        })
    }

    // Every write starts from this read. A failed read is an error here,
    // never a default row.
    fn load_record(&mut self, level_id: LevelId) -> Result<LevelProgressRecord, StoreError> {
        if let Some(record) = self.pending.get(&level_id) {
            return Ok(record.clone());
        }
        if let Some(record) = self.backend.level(level_id)? {
            return Ok(record);
        }
        let record = LevelProgressRecord::new_default(level_id);
        let created = self
            .backend
            .insert_level(&record)
            .and_then(|_| self.backend.flush());
        if let Err(err) = created {
            log::warn!("could not create progress row for level {level_id}: {err}");
        }
        Ok(record)
    }

    // Read without creating a row.
    fn peek(&self, level_id: LevelId) -> LevelProgressRecord {
        if let Some(record) = self.pending.get(&level_id) {
            return record.clone();
        }
        match self.backend.level(level_id) {
            Ok(Some(record)) => record,
            Ok(None) => LevelProgressRecord::new_default(level_id),
            Err(err) => {
                log::warn!("progress read for level {level_id} failed, using default: {err}");
                LevelProgressRecord::new_default(level_id)
            }
        }
    }

    /// Every level row, pending writes included, ordered by level id.
    pub fn all_records(&self) -> Vec<LevelProgressRecord> {
        let mut rows: BTreeMap<LevelId, LevelProgressRecord> = match self.backend.levels() {
            Ok(rows) => rows.into_iter().map(|row| (row.level_id, row)).collect(),
            Err(err) => {
                log::warn!("progress scan failed: {err}");
                BTreeMap::new()
            }
        };
        for (id, record) in &self.pending {
            rows.insert(*id, record.clone());
        }
        rows.into_values().collect()
    }

    /// Apply an attempt stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the level is locked, the star count is out of
    /// range, or the level's saved row cannot be read. Write failures do not
    /// fail the call; they are reported in the receipt.
    pub fn record_attempt(
        &mut self,
        level_id: LevelId,
        outcome: AttemptOutcome,
    ) -> Result<AttemptReceipt, StateError> {
        self.record_attempt_at(level_id, outcome, Utc::now())
    }

    /// Apply an attempt with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// See [`ProgressStore::record_attempt`].
    pub fn record_attempt_at(
        &mut self,
        level_id: LevelId,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<AttemptReceipt, StateError> {
        let outcome = outcome.check()?;
        let mut record = self.load_record(level_id).map_err(|err| {
            log::warn!("level {level_id} unreadable, attempt not applied: {err}");
            StateError::ProgressUnreadable(level_id)
        })?;
        if !record.is_unlocked {
            return Err(StateError::LevelLocked(level_id));
        }

        record.apply(outcome, now);
        let mut persist_error = self.persist(&record);
        if outcome.completed {
            log::info!(
                "level {level_id} completed with {} stars (best {})",
                record.stars,
                record.best_score
            );
        }

        let mut unlocked_next = None;
        if outcome.completed {
            if let Some(next_id) = level_id.checked_add(1) {
                match self.load_record(next_id) {
                    Ok(next) if !next.is_unlocked => {
                        let err = self.unlock(next);
                        persist_error = persist_error.or(err);
                        unlocked_next = Some(next_id);
                        log::info!("level {next_id} unlocked");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log::warn!("level {next_id} unreadable, unlock skipped: {err}");
                        persist_error = persist_error.or(Some(err));
                    }
                }
            }
        }

        if let Err(err) = self.backend.flush() {
            log::warn!("flush after level {level_id} failed: {err}");
            persist_error = persist_error.or(Some(err));
        }

        Ok(AttemptReceipt {
            record,
            unlocked_next,
            persist_error,
        })
    }

    /// Re-attempt queued writes.
    ///
    /// # Errors
    ///
    /// Returns the first error hit; rows that still fail stay queued.
    pub fn retry_pending(&mut self) -> Result<(), StoreError> {
        let queued: Vec<_> = self.pending.values().cloned().collect();
        let mut first_error = None;
        for record in queued {
            match self.upsert_level(&record) {
                Ok(()) => {
                    self.pending.remove(&record.level_id);
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => self.backend.flush(),
        }
    }

    /// World row, created with defaults if missing. The first world starts
    /// unlocked.
    pub fn world_record(&mut self, world_id: WorldId) -> WorldProgressRecord {
        match self.backend.world(world_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                let record = WorldProgressRecord::new_default(world_id);
                if let Err(err) = self.backend.insert_world(&record) {
                    log::warn!("could not create world row {world_id}: {err}");
                }
                record
            }
            Err(err) => {
                log::warn!("world read {world_id} failed, using default: {err}");
                WorldProgressRecord::new_default(world_id)
            }
        }
    }

    /// Recompute a world's totals from its level rows and persist them.
    pub fn refresh_world(&mut self, world: &World) -> WorldProgressRecord {
        let mut record = self.world_record(world.id);
        let levels: Vec<_> = world.levels.iter().map(|level| self.peek(level.id)).collect();
        record.total_stars = levels.iter().map(|row| u32::from(row.stars)).sum();
        record.completed_levels =
            u32::try_from(levels.iter().filter(|row| row.is_completed).count()).unwrap_or(u32::MAX);
        let first_unlocked = world
            .first_level()
            .is_some_and(|level| self.peek(level.id).is_unlocked);
        record.is_unlocked = record.is_unlocked || first_unlocked;

        let written = self
            .with_retries(|backend| {
                if backend.insert_world(&record)? {
                    Ok(())
                } else {
                    backend.update_world(&record)
                }
            })
            .and_then(|()| self.backend.flush());
        if let Err(err) = written {
            log::warn!("could not save world {}: {err}", world.id);
        }
        record
    }

    /// Home screen figures over every level in the catalog.
    #[must_use]
    pub fn summary(&self, catalog: &Catalog) -> ProgressSummary {
        let rows: Vec<_> = catalog.levels().map(|level| self.peek(level.id)).collect();
        let continue_level = rows
            .iter()
            .filter(|row| row.is_unlocked && !row.is_completed)
            .map(|row| row.level_id)
            .min()
            .or_else(|| {
                rows.iter()
                    .filter(|row| row.is_completed)
                    .map(|row| row.level_id)
                    .max()
            })
            .unwrap_or(FIRST_LEVEL_ID);
        ProgressSummary {
            continue_level,
            total_stars: rows.iter().map(|row| u32::from(row.stars)).sum(),
            completed_levels: u32::try_from(rows.iter().filter(|row| row.is_completed).count())
                .unwrap_or(u32::MAX),
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.backend.profile().unwrap_or_else(|err| {
            log::warn!("profile read failed: {err}");
            None
        })
    }

    /// Create the single user profile, or return the existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be written.
    pub fn create_profile(&mut self, age_band: AgeBand) -> Result<UserProfile, StoreError> {
        if let Some(existing) = self.backend.profile()? {
            return Ok(existing);
        }
        let profile = UserProfile {
            id: SINGLE_PROFILE_ID,
            age_band,
            created_at: Utc::now(),
        };
        self.with_retries(|backend| backend.insert_profile(&profile).map(|_| ()))?;
        self.backend.flush()?;
        log::info!("profile created for age band {age_band}");
        Ok(profile)
    }

    #[must_use]
    pub fn setting(&self, key: &str) -> Option<String> {
        self.backend.setting(key).unwrap_or_else(|err| {
            log::warn!("setting '{key}' read failed: {err}");
            None
        })
    }

    /// # Errors
    ///
    /// Returns an error if the setting cannot be written.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_retries(|backend| backend.put_setting(key, value))?;
        self.backend.flush()
    }

    /// Whether premium worlds have been unlocked on this device.
    #[must_use]
    pub fn premium_unlocked(&self) -> bool {
        self.setting(SETTING_PREMIUM_UNLOCKED).as_deref() == Some("true")
    }

    fn unlock(&mut self, mut record: LevelProgressRecord) -> Option<StoreError> {
        record.is_unlocked = true;
        self.persist(&record)
    }

    // Write with retries; on final failure queue the row for later.
    fn persist(&mut self, record: &LevelProgressRecord) -> Option<StoreError> {
        match self.upsert_level(record) {
            Ok(()) => {
                self.pending.remove(&record.level_id);
                None
            }
            Err(err) => {
                log::warn!(
                    "level {} write failed after retries, queued: {err}",
                    record.level_id
                );
                self.pending.insert(record.level_id, record.clone());
                Some(err)
            }
        }
    }

    fn upsert_level(&mut self, record: &LevelProgressRecord) -> Result<(), StoreError> {
        self.with_retries(|backend| {
            if backend.insert_level(record)? {
                Ok(())
            } else {
                backend.update_level(record)
            }
        })
    }

    fn with_retries<F>(&mut self, mut write: F) -> Result<(), StoreError>
    where
        F: FnMut(&mut B) -> Result<(), StoreError>,
    {
        let mut attempt = 0;
        loop {
            match write(&mut self.backend) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.write_retries => {
                    attempt += 1;
                    log::debug!("write failed ({err}), retry {attempt}/{}", self.write_retries);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
