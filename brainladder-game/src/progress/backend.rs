//! Row-store contract and the in-memory backend.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::records::{LevelProgressRecord, UserProfile, WorldProgressRecord};
use crate::catalog::{LevelId, WorldId};
use crate::error::StoreError;

/// Table-per-entity row store the progress engine persists through.
///
/// Inserts never overwrite; updates never create. Writes only need to be
/// durable after [`ProgressBackend::flush`].
pub trait ProgressBackend {
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn level(&self, id: LevelId) -> Result<Option<LevelProgressRecord>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn levels(&self) -> Result<Vec<LevelProgressRecord>, StoreError>;

    /// Insert a row unless one exists. Returns whether it was inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn insert_level(&mut self, record: &LevelProgressRecord) -> Result<bool, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::MissingRow`] when no row exists for the key.
    fn update_level(&mut self, record: &LevelProgressRecord) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn world(&self, id: WorldId) -> Result<Option<WorldProgressRecord>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn worlds(&self) -> Result<Vec<WorldProgressRecord>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn insert_world(&mut self, record: &WorldProgressRecord) -> Result<bool, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::MissingRow`] when no row exists for the key.
    fn update_world(&mut self, record: &WorldProgressRecord) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn profile(&self) -> Result<Option<UserProfile>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn insert_profile(&mut self, profile: &UserProfile) -> Result<bool, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace a setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns an error if pending writes cannot be made durable.
    fn flush(&mut self) -> Result<(), StoreError>;
}

/// The four tables as plain maps. Shared by the memory and file backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub level_progress: BTreeMap<LevelId, LevelProgressRecord>,
    #[serde(default)]
    pub world_progress: BTreeMap<WorldId, WorldProgressRecord>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    #[serde(default)]
    pub game_settings: BTreeMap<String, String>,
}

impl Tables {
    pub(crate) fn insert_level(&mut self, record: &LevelProgressRecord) -> bool {
        if self.level_progress.contains_key(&record.level_id) {
            return false;
        }
        self.level_progress.insert(record.level_id, record.clone());
        true
    }

    pub(crate) fn update_level(&mut self, record: &LevelProgressRecord) -> Result<(), StoreError> {
        let row = self
            .level_progress
            .get_mut(&record.level_id)
            .ok_or_else(|| StoreError::MissingRow {
                table: "level_progress",
                key: record.level_id.to_string(),
            })?;
        *row = record.clone();
        Ok(())
    }

    pub(crate) fn insert_world(&mut self, record: &WorldProgressRecord) -> bool {
        if self.world_progress.contains_key(&record.world_id) {
            return false;
        }
        self.world_progress.insert(record.world_id, record.clone());
        true
    }

    pub(crate) fn update_world(&mut self, record: &WorldProgressRecord) -> Result<(), StoreError> {
        let row = self
            .world_progress
            .get_mut(&record.world_id)
            .ok_or_else(|| StoreError::MissingRow {
                table: "world_progress",
                key: record.world_id.to_string(),
            })?;
        *row = record.clone();
        Ok(())
    }

    pub(crate) fn insert_profile(&mut self, profile: &UserProfile) -> bool {
        if self.user_profile.is_some() {
            return false;
        }
        self.user_profile = Some(profile.clone());
        true
    }
}

/// Volatile backend, used by tests and the tester harness.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Tables,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tables(&self) -> &Tables {
        &self.tables
    }
}

impl ProgressBackend for MemoryBackend {
    fn level(&self, id: LevelId) -> Result<Option<LevelProgressRecord>, StoreError> {
        Ok(self.tables.level_progress.get(&id).cloned())
    }

    fn levels(&self) -> Result<Vec<LevelProgressRecord>, StoreError> {
        Ok(self.tables.level_progress.values().cloned().collect())
    }

    fn insert_level(&mut self, record: &LevelProgressRecord) -> Result<bool, StoreError> {
        Ok(self.tables.insert_level(record))
    }

    fn update_level(&mut self, record: &LevelProgressRecord) -> Result<(), StoreError> {
        self.tables.update_level(record)
    }

    fn world(&self, id: WorldId) -> Result<Option<WorldProgressRecord>, StoreError> {
        Ok(self.tables.world_progress.get(&id).cloned())
    }

    fn worlds(&self) -> Result<Vec<WorldProgressRecord>, StoreError> {
        Ok(self.tables.world_progress.values().cloned().collect())
    }

    fn insert_world(&mut self, record: &WorldProgressRecord) -> Result<bool, StoreError> {
        Ok(self.tables.insert_world(record))
    }

    fn update_world(&mut self, record: &WorldProgressRecord) -> Result<(), StoreError> {
        self.tables.update_world(record)
    }

    fn profile(&self) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.tables.user_profile.clone())
    }

    fn insert_profile(&mut self, profile: &UserProfile) -> Result<bool, StoreError> {
        Ok(self.tables.insert_profile(profile))
    }

    fn setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.tables.game_settings.get(key).cloned())
    }

    fn put_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.tables
            .game_settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
