/// Session construction parameters, cosmetic settings and per-user paths.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entities::{GameMode, PlayField};
use crate::error::{ConfigError, StorageError};
use crate::snapshot::SessionSnapshot;
use crate::storage::write_atomic;

// ── Menu presets ──────────────────────────────────────────────────────────────

pub const ARCANE_INITIAL_SPEED: f64 = 1.5;
pub const VERSUS_INITIAL_SPEED: f64 = 2.0;

pub const FAULT_LIMIT_CHOICES: [i64; 4] = [5, 10, 15, 20];
pub const DEFAULT_FAULT_LIMIT: i64 = 10;

/// Versus is decided by the clock, so the fault limit is effectively off.
pub const VERSUS_FAULT_LIMIT: i64 = 999;

pub const TIME_LIMIT_CHOICES_MINUTES: [i64; 4] = [1, 2, 3, 5];
pub const DEFAULT_TIME_LIMIT_MINUTES: i64 = 2;

/// Virtual play field. Positions are simulated in these units and scaled to
/// the terminal by the display layer.
pub const DEFAULT_FIELD: PlayField = PlayField {
    width: 800.0,
    height: 600.0,
    glyph_size: 50.0,
};

// ── Session parameters ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub mode: GameMode,
    pub initial_speed: f64,
    pub fault_limit: i64,
    /// 0 means unlimited.
    pub time_limit_seconds: i64,
    /// Versus only: a wrong keypress also hands the turn to the other player.
    pub alternate_turn_on_wrong_key: bool,
    pub field: PlayField,
}

impl SessionConfig {
    /// Single-player preset.
    pub fn arcane(fault_limit: i64) -> Self {
        Self {
            mode: GameMode::SinglePlayer,
            initial_speed: ARCANE_INITIAL_SPEED,
            fault_limit,
            time_limit_seconds: 0,
            alternate_turn_on_wrong_key: false,
            field: DEFAULT_FIELD,
        }
    }

    /// Two-player preset.
    pub fn versus(time_limit_minutes: i64) -> Self {
        Self {
            mode: GameMode::Versus,
            initial_speed: VERSUS_INITIAL_SPEED,
            fault_limit: VERSUS_FAULT_LIMIT,
            time_limit_seconds: time_limit_minutes.saturating_mul(60),
            alternate_turn_on_wrong_key: false,
            field: DEFAULT_FIELD,
        }
    }

    /// Parameters of a resumed game. Limits that are missing or out of range
    /// in the save fall back to the mode's preset. The initial speed is always
    /// the preset's, so a restart begins like a fresh game; the live speed
    /// comes back through `GameSession::resume_from`.
    pub fn from_saved(mode: GameMode, snapshot: &SessionSnapshot, field: PlayField) -> Self {
        let preset = match mode {
            GameMode::SinglePlayer => Self::arcane(DEFAULT_FAULT_LIMIT),
            GameMode::Versus => Self::versus(0),
        };
        Self {
            fault_limit: snapshot
                .fault_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(preset.fault_limit),
            time_limit_seconds: snapshot
                .time_limit_seconds
                .filter(|secs| *secs >= 0)
                .unwrap_or(preset.time_limit_seconds),
            field,
            ..preset
        }
    }

    pub fn with_field(mut self, field: PlayField) -> Self {
        self.field = field;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fault_limit <= 0 {
            return Err(ConfigError::FaultLimit(self.fault_limit));
        }
        if self.time_limit_seconds < 0 {
            return Err(ConfigError::TimeLimit(self.time_limit_seconds));
        }
        if !self.initial_speed.is_finite() || self.initial_speed <= 0.0 {
            return Err(ConfigError::InitialSpeed(self.initial_speed));
        }
        let field = &self.field;
        if !(field.width > 0.0 && field.height > 0.0) {
            return Err(ConfigError::PlayField {
                width: field.width,
                height: field.height,
            });
        }
        Ok(())
    }
}

// ── Cosmetic settings ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterColor {
    White,
    Cyan,
    Green,
    Yellow,
    Magenta,
}

impl LetterColor {
    pub const ALL: [LetterColor; 5] = [
        LetterColor::White,
        LetterColor::Cyan,
        LetterColor::Green,
        LetterColor::Yellow,
        LetterColor::Magenta,
    ];

    pub fn next(self) -> LetterColor {
        let i = LetterColor::ALL.iter().position(|c| *c == self).unwrap_or(0);
        LetterColor::ALL[(i + 1) % LetterColor::ALL.len()]
    }
}

/// Menu choices remembered between runs. Opaque to the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub letter_color: LetterColor,
    pub fps_cap: u32,
    pub fault_limit: i64,
    pub time_limit_minutes: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            letter_color: LetterColor::Cyan,
            fps_cap: 30,
            fault_limit: DEFAULT_FAULT_LIMIT,
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&s) {
            Ok(v) => return v,
            Err(e) => warn!("ignoring unreadable settings at {}: {}", path.display(), e),
        }
    }
    Settings::default()
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), StorageError> {
    write_atomic(path, &serde_json::to_vec_pretty(settings)?)
}

// ── Paths ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Paths {
    pub saves: PathBuf,
    pub high_scores: PathBuf,
    pub settings: PathBuf,
    pub log: PathBuf,
}

impl Paths {
    /// Per-user data directory, created if missing.
    pub fn resolve() -> Result<Paths, StorageError> {
        let proj = ProjectDirs::from("com", "letter_rain", "LetterRain").ok_or(StorageError::NoDataDir)?;
        let dir = proj.data_local_dir();
        fs::create_dir_all(dir)?;
        Ok(Paths::in_dir(dir))
    }

    pub fn in_dir(dir: &Path) -> Paths {
        Paths {
            saves: dir.join("saves.json"),
            high_scores: dir.join("highscores.json"),
            settings: dir.join("settings.json"),
            log: dir.join("letter_rain.log"),
        }
    }
}
