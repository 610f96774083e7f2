//! Versioned JSON save file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::backend::{ProgressBackend, Tables};
use super::records::{LevelProgressRecord, UserProfile, WorldProgressRecord};
use crate::catalog::{LevelId, WorldId};
use crate::constants::SAVE_FILE_VERSION;
use crate::error::StoreError;

#[derive(Debug, Serialize, Deserialize)]
struct SaveFile {
    version: u32,
    tables: Tables,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Keeps the tables in memory and rewrites the whole file on flush.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    tables: Tables,
    dirty: bool,
}

impl JsonFileBackend {
    /// Open a save file, starting empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, is not valid
    /// save data, or was written by an unsupported version.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let probe: VersionProbe = serde_json::from_str(&raw)?;
            if probe.version != SAVE_FILE_VERSION {
                return Err(StoreError::Version {
                    found: probe.version,
                    expected: SAVE_FILE_VERSION,
                });
            }
            let save: SaveFile = serde_json::from_str(&raw)?;
            log::debug!(
                "loaded {} level rows from {}",
                save.tables.level_progress.len(),
                path.display()
            );
            save.tables
        } else {
            Tables::default()
        };
        Ok(Self {
            path,
            tables,
            dirty: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProgressBackend for JsonFileBackend {
    fn level(&self, id: LevelId) -> Result<Option<LevelProgressRecord>, StoreError> {
        Ok(self.tables.level_progress.get(&id).cloned())
    }

    fn levels(&self) -> Result<Vec<LevelProgressRecord>, StoreError> {
        Ok(self.tables.level_progress.values().cloned().collect())
    }

    fn insert_level(&mut self, record: &LevelProgressRecord) -> Result<bool, StoreError> {
        let inserted = self.tables.insert_level(record);
        self.dirty |= inserted;
        Ok(inserted)
    }

    fn update_level(&mut self, record: &LevelProgressRecord) -> Result<(), StoreError> {
        self.tables.update_level(record)?;
        self.dirty = true;
        Ok(())
    }

    fn world(&self, id: WorldId) -> Result<Option<WorldProgressRecord>, StoreError> {
        Ok(self.tables.world_progress.get(&id).cloned())
    }

    fn worlds(&self) -> Result<Vec<WorldProgressRecord>, StoreError> {
        Ok(self.tables.world_progress.values().cloned().collect())
    }

    fn insert_world(&mut self, record: &WorldProgressRecord) -> Result<bool, StoreError> {
        let inserted = self.tables.insert_world(record);
        self.dirty |= inserted;
        Ok(inserted)
    }

    fn update_world(&mut self, record: &WorldProgressRecord) -> Result<(), StoreError> {
        self.tables.update_world(record)?;
        self.dirty = true;
        Ok(())
    }

    fn profile(&self) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.tables.user_profile.clone())
    }

    fn insert_profile(&mut self, profile: &UserProfile) -> Result<bool, StoreError> {
        let inserted = self.tables.insert_profile(profile);
        self.dirty |= inserted;
        Ok(inserted)
    }

    fn setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.tables.game_settings.get(key).cloned())
    }

    fn put_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.tables
            .game_settings
            .insert(key.to_string(), value.to_string());
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let save = SaveFile {
            version: SAVE_FILE_VERSION,
            tables: self.tables.clone(),
        };
        let body = serde_json::to_string_pretty(&save)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        log::debug!("saved progress to {}", self.path.display());
        Ok(())
    }
}
