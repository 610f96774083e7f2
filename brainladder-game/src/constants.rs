//! Centralized tuning constants for Brain Ladder progression logic.
//!
//! Values here are the fallbacks used when the embedded tuning asset is
//! missing a field. Gameplay math reads them through `EngineConfig`.

use std::time::Duration;

// Progression ---------------------------------------------------------------
pub const FIRST_LEVEL_ID: u32 = 1;
pub const FIRST_WORLD_ID: u32 = 1;
pub const MAX_STARS: u8 = 3;

// Scoring -------------------------------------------------------------------
pub const SCORE_PER_HIT: u32 = 100;
pub const THREE_STAR_PCT: u32 = 90;
pub const TWO_STAR_PCT: u32 = 70;

// Persistence ---------------------------------------------------------------
pub const DEFAULT_WRITE_RETRIES: u32 = 1;
pub const SAVE_FILE_VERSION: u32 = 1;
pub const SINGLE_PROFILE_ID: u32 = 1;
pub const SETTING_PREMIUM_UNLOCKED: &str = "premium_unlocked";

// Round generation ----------------------------------------------------------
pub(crate) const MAX_REDRAWS: u32 = 64;

// Timers --------------------------------------------------------------------
pub const LOW_TIME_THRESHOLD: Duration = Duration::from_secs(10);
