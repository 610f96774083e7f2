//! Static level, world and palette reference data.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{ConfigError, GameError, StateError};
use crate::mechanics::{MechanicKind, MechanicRegistry};

const DEFAULT_CATALOG_DATA: &str = include_str!("../data/catalog.json");
const DEFAULT_PALETTE_DATA: &str = include_str!("../data/palette.json");

pub type LevelId = u32;
pub type WorldId = u32;

/// A validated, playable level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub world_id: WorldId,
    pub number: u32,
    pub name: String,
    pub mechanic: MechanicKind,
    pub target_count: u32,
    pub max_wrong_attempts: u32,
    pub time_limit_seconds: Option<u32>,
}

impl Level {
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_seconds
            .map(|secs| Duration::from_secs(u64::from(secs)))
    }
}

/// A world groups consecutive levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub id: WorldId,
    pub name: String,
    pub is_premium: bool,
    pub levels: Vec<Level>,
}

impl World {
    #[must_use]
    pub fn first_level(&self) -> Option<&Level> {
        self.levels.iter().min_by_key(|level| level.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSwatch {
    pub id: String,
    pub name: String,
    pub hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeDef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDef {
    pub id: String,
    pub name: String,
    pub emoji: String,
}

/// Attribute pools the generators draw from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub colors: Vec<ColorSwatch>,
    pub shapes: Vec<ShapeDef>,
    pub objects: Vec<ObjectDef>,
    pub sizes: Vec<u32>,
}

impl Default for Palette {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_PALETTE_DATA).unwrap_or_else(|_| Self {
            colors: ["red", "blue", "green", "yellow", "purple", "orange"]
                .into_iter()
                .map(|id| ColorSwatch {
                    id: id.to_string(),
                    name: id.to_string(),
                    hex: String::from("#000000"),
                })
                .collect(),
            shapes: ["circle", "square", "triangle", "star", "heart", "diamond"]
                .into_iter()
                .map(|id| ShapeDef {
                    id: id.to_string(),
                    name: id.to_string(),
                })
                .collect(),
            objects: Vec::new(),
            sizes: vec![50, 70, 90, 110],
        })
    }
}

impl Palette {
    /// Load a palette from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn color_ids(&self) -> Vec<&str> {
        self.colors.iter().map(|c| c.id.as_str()).collect()
    }

    #[must_use]
    pub fn shape_ids(&self) -> Vec<&str> {
        self.shapes.iter().map(|s| s.id.as_str()).collect()
    }

    /// Number of pairwise-distinct sizes in the pool.
    #[must_use]
    pub fn distinct_sizes(&self) -> usize {
        let mut sizes = self.sizes.clone();
        sizes.sort_unstable();
        sizes.dedup();
        sizes.len()
    }
}

// Raw shapes as they appear in the catalog asset. Counts are signed so that
// zero and negative values surface as configuration errors instead of parse
// failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LevelDef {
    id: LevelId,
    #[serde(default)]
    number: Option<u32>,
    name: String,
    #[serde(alias = "mechanic")]
    mechanic_type: String,
    target_count: i64,
    max_wrong_attempts: i64,
    #[serde(default, alias = "timeLimit")]
    time_limit_seconds: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldDef {
    id: WorldId,
    name: String,
    #[serde(default)]
    is_premium: bool,
    #[serde(default)]
    levels: Vec<LevelDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogDef {
    worlds: Vec<WorldDef>,
}

impl LevelDef {
    fn into_level(self, world_id: WorldId) -> Result<Level, ConfigError> {
        let mechanic: MechanicKind = self.mechanic_type.parse()?;
        let target_count = u32::try_from(self.target_count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(ConfigError::NonPositiveTarget {
                level: self.id,
                value: self.target_count,
            })?;
        let max_wrong_attempts = u32::try_from(self.max_wrong_attempts)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(ConfigError::NonPositiveMistakes {
                level: self.id,
                value: self.max_wrong_attempts,
            })?;
        let time_limit_seconds = self.time_limit_seconds.filter(|secs| *secs > 0);
        if mechanic.is_timed() && time_limit_seconds.is_none() {
            return Err(ConfigError::MissingTimeLimit {
                level: self.id,
                kind: mechanic,
            });
        }
        Ok(Level {
            id: self.id,
            world_id,
            number: self.number.unwrap_or(self.id),
            name: self.name,
            mechanic,
            target_count,
            max_wrong_attempts,
            time_limit_seconds,
        })
    }
}

/// Validated catalog. Levels whose definition is invalid are kept out of
/// their world and remembered with the error that disabled them.
#[derive(Debug, Clone)]
pub struct Catalog {
    worlds: Vec<World>,
    palette: Arc<Palette>,
    unavailable: BTreeMap<LevelId, ConfigError>,
}

impl Catalog {
    /// Parse and validate a catalog against a palette and the registered
    /// mechanics.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or duplicate level ids. Per-level
    /// problems do not fail the catalog; they mark the level unavailable.
    pub fn from_json(
        json: &str,
        palette: Palette,
        registry: &MechanicRegistry,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        let def: CatalogDef = serde_json::from_str(json)?;
        let mut seen = BTreeMap::new();
        let mut unavailable = BTreeMap::new();
        let mut worlds = Vec::with_capacity(def.worlds.len());

        for world_def in def.worlds {
            let mut levels = Vec::with_capacity(world_def.levels.len());
            for level_def in world_def.levels {
                let id = level_def.id;
                if seen.insert(id, world_def.id).is_some() {
                    return Err(ConfigError::DuplicateLevel(id));
                }
                let checked = level_def
                    .into_level(world_def.id)
                    .and_then(|level| registry.validate(&level, &palette, config).map(|()| level));
                match checked {
                    Ok(level) => levels.push(level),
                    Err(err) => {
                        log::warn!("level {id} unavailable: {err}");
                        unavailable.insert(id, err);
                    }
                }
            }
            levels.sort_by_key(|level| level.id);
            worlds.push(World {
                id: world_def.id,
                name: world_def.name,
                is_premium: world_def.is_premium,
                levels,
            });
        }
        worlds.sort_by_key(|world| world.id);

        Ok(Self {
            worlds,
            palette: Arc::new(palette),
            unavailable,
        })
    }

    /// The catalog and palette shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded assets fail to parse.
    pub fn embedded(
        registry: &MechanicRegistry,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        let palette = Palette::from_json(DEFAULT_PALETTE_DATA)?;
        Self::from_json(DEFAULT_CATALOG_DATA, palette, registry, config)
    }

    #[must_use]
    pub fn worlds(&self) -> &[World] {
        &self.worlds
    }

    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[must_use]
    pub fn shared_palette(&self) -> Arc<Palette> {
        Arc::clone(&self.palette)
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.worlds.iter().flat_map(|world| world.levels.iter())
    }

    #[must_use]
    pub fn world(&self, id: WorldId) -> Option<&World> {
        self.worlds.iter().find(|world| world.id == id)
    }

    #[must_use]
    pub fn world_of(&self, level_id: LevelId) -> Option<&World> {
        self.worlds
            .iter()
            .find(|world| world.levels.iter().any(|level| level.id == level_id))
    }

    /// Errors for levels that were disabled during validation.
    #[must_use]
    pub fn unavailable(&self) -> &BTreeMap<LevelId, ConfigError> {
        &self.unavailable
    }

    /// Look up a playable level.
    ///
    /// # Errors
    ///
    /// Returns the configuration error that disabled the level, or
    /// [`StateError::UnknownLevel`] when no such level exists.
    pub fn level(&self, id: LevelId) -> Result<&Level, GameError> {
        if let Some(err) = self.unavailable.get(&id) {
            return Err(err.clone().into());
        }
        self.levels()
            .find(|level| level.id == id)
            .ok_or_else(|| StateError::UnknownLevel(id).into())
    }

    /// Next playable level after `id` in catalog order.
    #[must_use]
    pub fn next_level(&self, id: LevelId) -> Option<&Level> {
        self.levels().filter(|level| level.id > id).min_by_key(|level| level.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(json: &str) -> Catalog {
        Catalog::from_json(
            json,
            Palette::default(),
            &MechanicRegistry::default(),
            &EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn embedded_catalog_has_no_unavailable_levels() {
        let catalog =
            Catalog::embedded(&MechanicRegistry::default(), &EngineConfig::default()).unwrap();
        assert!(catalog.unavailable().is_empty(), "{:?}", catalog.unavailable());
        assert_eq!(catalog.worlds().len(), 3);
        assert_eq!(catalog.levels().count(), 30);
        assert!(catalog.world(3).unwrap().is_premium);
        let boss = catalog.level(10).unwrap();
        assert_eq!(boss.mechanic, MechanicKind::BossMixed);
        assert_eq!(boss.world_id, 1);
        assert_eq!(boss.time_limit(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn invalid_levels_are_unavailable_not_guessed() {
        let catalog = load(
            r#"{"worlds":[{"id":1,"name":"W","levels":[
                {"id":1,"name":"ok","mechanicType":"tap-color",
                 "targetCount":3,"maxWrongAttempts":3},
                {"id":2,"name":"zero","mechanicType":"tap-color",
                 "targetCount":0,"maxWrongAttempts":3},
                {"id":3,"name":"mystery","mechanicType":"juggle",
                 "targetCount":3,"maxWrongAttempts":3},
                {"id":4,"name":"untimed","mechanicType":"boss-mixed",
                 "targetCount":3,"maxWrongAttempts":3}
            ]}]}"#,
        );
        assert!(catalog.level(1).is_ok());
        assert!(matches!(
            catalog.level(2),
            Err(GameError::Config(ConfigError::NonPositiveTarget { level: 2, value: 0 }))
        ));
        assert!(matches!(
            catalog.level(3),
            Err(GameError::Config(ConfigError::UnknownMechanic(_)))
        ));
        assert!(matches!(
            catalog.level(4),
            Err(GameError::Config(ConfigError::MissingTimeLimit { .. }))
        ));
        assert!(matches!(
            catalog.level(99),
            Err(GameError::State(StateError::UnknownLevel(99)))
        ));
        assert_eq!(catalog.world(1).unwrap().levels.len(), 1);
    }

    #[test]
    fn duplicate_level_ids_fail_the_catalog() {
        let err = Catalog::from_json(
            r#"{"worlds":[{"id":1,"name":"W","levels":[
                {"id":1,"name":"a","mechanicType":"tap-color","targetCount":3,"maxWrongAttempts":3},
                {"id":1,"name":"b","mechanicType":"tap-shape","targetCount":3,"maxWrongAttempts":3}
            ]}]}"#,
            Palette::default(),
            &MechanicRegistry::default(),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateLevel(1));
    }

    #[test]
    fn match_pairs_needs_enough_objects() {
        let catalog = load(
            r#"{"worlds":[{"id":1,"name":"W","levels":[
                {"id":1,"name":"huge","mechanicType":"match-pairs",
                 "targetCount":500,"maxWrongAttempts":3}
            ]}]}"#,
        );
        assert!(matches!(
            catalog.level(1),
            Err(GameError::Config(ConfigError::PaletteTooSmall { .. }))
        ));
    }

    #[test]
    fn next_level_follows_catalog_order() {
        let catalog =
            Catalog::embedded(&MechanicRegistry::default(), &EngineConfig::default()).unwrap();
        assert_eq!(catalog.next_level(10).map(|l| l.id), Some(11));
        assert!(catalog.next_level(30).is_none());
        assert_eq!(catalog.world_of(11).map(|w| w.id), Some(2));
    }
}
