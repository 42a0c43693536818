/// JSON persistence: save slots and the high-score table.
///
/// Reads never fail. A missing file is an empty list; a file that does not
/// parse is treated the same way (an unreadable save file is also removed so
/// the next save starts clean). Writes go through a temp file and a rename.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::entities::GameMode;
use crate::error::StorageError;
use crate::snapshot::{SaveRecord, SessionSnapshot};

pub const MAX_SAVE_SLOTS: usize = 5;
pub const MAX_HIGH_SCORES: usize = 5;
pub const MAX_NAME_LEN: usize = 3;

pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

// ── Save slots ────────────────────────────────────────────────────────────────

/// Where a session's "save and exit" goes.
pub trait SaveSink {
    /// Stores `state`, replacing the slot stamped `replace` if it still exists.
    /// Returns the timestamp the state now lives under.
    fn store(
        &mut self,
        mode: GameMode,
        state: &SessionSnapshot,
        replace: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, StorageError>;
}

#[derive(Clone, Debug)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All slots, most recent first.
    pub fn load(&self) -> Vec<SaveRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        let entries = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => items,
            Ok(single @ serde_json::Value::Object(_)) => vec![single],
            Ok(_) | Err(_) => {
                warn!("save file {} is unreadable, removing it", self.path.display());
                let _ = fs::remove_file(&self.path);
                return Vec::new();
            }
        };
        let mut records: Vec<SaveRecord> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<SaveRecord>(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("skipping bad save entry: {}", e);
                    None
                }
            })
            .collect();
        sort_recent_first(&mut records);
        records
    }

    pub fn save(
        &self,
        mode: GameMode,
        state: &SessionSnapshot,
        replace: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, StorageError> {
        let mut records = self.load();
        let now = next_stamp(&records);
        let existing = replace.and_then(|ts| records.iter_mut().find(|r| r.timestamp == ts));
        match existing {
            Some(record) => {
                record.timestamp = now;
                record.mode = mode;
                record.state = state.clone();
            }
            None => records.push(SaveRecord {
                timestamp: now,
                mode,
                state: state.clone(),
            }),
        }
        sort_recent_first(&mut records);
        records.truncate(MAX_SAVE_SLOTS);
        self.write(&records)?;
        info!("saved {} game at {}", mode.label(), now);
        Ok(now)
    }

    /// Removes the slot stamped `timestamp`. Returns `true` when one was removed.
    pub fn delete(&self, timestamp: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| r.timestamp != timestamp);
        if records.len() == before {
            return Ok(false);
        }
        self.write(&records)?;
        Ok(true)
    }

    fn write(&self, records: &[SaveRecord]) -> Result<(), StorageError> {
        write_atomic(&self.path, &serde_json::to_vec_pretty(records)?)
    }
}

impl SaveSink for SaveStore {
    fn store(
        &mut self,
        mode: GameMode,
        state: &SessionSnapshot,
        replace: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, StorageError> {
        self.save(mode, state, replace)
    }
}

fn sort_recent_first(records: &mut [SaveRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Current time, nudged past the newest stored stamp so slots keep distinct,
/// correctly ordered timestamps even when saved within one clock tick.
fn next_stamp(records: &[SaveRecord]) -> DateTime<Utc> {
    let now = Utc::now();
    match records.iter().map(|r| r.timestamp).max() {
        Some(newest) if newest >= now => newest + chrono::Duration::microseconds(1),
        _ => now,
    }
}

// ── High scores ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScore {
    #[serde(rename = "nombre")]
    pub name: String,
    pub score: u32,
}

/// Top scores, highest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighScoreTable {
    entries: Vec<HighScore>,
}

impl HighScoreTable {
    pub fn load(path: &Path) -> Self {
        let mut entries = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<HighScore>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("high-score file {} is unreadable: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_HIGH_SCORES);
        Self { entries }
    }

    pub fn entries(&self) -> &[HighScore] {
        &self.entries
    }

    pub fn qualifies(&self, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        self.entries.len() < MAX_HIGH_SCORES
            || self.entries.last().map_or(true, |lowest| score > lowest.score)
    }

    /// Inserts a score, keeping the table sorted and capped. Earlier entries
    /// win ties. Returns the 0-based rank, or `None` when it did not make it.
    pub fn insert(&mut self, name: &str, score: u32) -> Option<usize> {
        let rank = self
            .entries
            .iter()
            .position(|e| score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            rank,
            HighScore {
                name: name.to_ascii_uppercase(),
                score,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        (rank < MAX_HIGH_SCORES).then_some(rank)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        write_atomic(path, &serde_json::to_vec_pretty(&self.entries)?)
    }
}

/// Accepts 1 to 3 ASCII letters and returns them upper-cased.
pub fn normalize_initials(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_NAME_LEN || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}
