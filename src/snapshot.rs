/// Serializable session state and the save-slot record around it.
///
/// Field names follow the save-file format. Everything except the first
/// player's score is optional on read so saves written by older builds still
/// load; the session fills the gaps with fresh state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{FallingLetter, GameMode, PlayerId};
use crate::letters::LetterPool;
use crate::level::LevelState;
use crate::powerups::PowerUpController;
use crate::score::ScoreTracker;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Effective fall speed, i.e. already halved while slow is active.
    #[serde(rename = "velocidad", default)]
    pub speed: f64,
    /// Game-relative seconds played so far.
    #[serde(rename = "tiempo_transcurrido", default)]
    pub elapsed: f64,
    #[serde(rename = "fallos_limit", default, skip_serializing_if = "Option::is_none")]
    pub fault_limit: Option<i64>,

    #[serde(rename = "score_manager_j1", default)]
    pub score_j1: ScoreTracker,
    #[serde(rename = "score_manager_j2", default, skip_serializing_if = "Option::is_none")]
    pub score_j2: Option<ScoreTracker>,

    #[serde(rename = "keyboard_layout_manager", default, skip_serializing_if = "Option::is_none")]
    pub letter_pool: Option<LetterPool>,
    #[serde(rename = "power_ups_activos", default)]
    pub power_ups: PowerUpController,
    #[serde(rename = "game_level_manager", default)]
    pub level: LevelState,

    // Single player.
    #[serde(rename = "letras_en_pantalla", default, skip_serializing_if = "Vec::is_empty")]
    pub letters: Vec<FallingLetter>,

    // Versus.
    #[serde(rename = "current_turn_player", default, skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_letter: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_letter_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_letter_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<i64>,
}

impl SessionSnapshot {
    pub fn tracker(&self, player: PlayerId) -> Option<&ScoreTracker> {
        match player {
            PlayerId::J1 => Some(&self.score_j1),
            PlayerId::J2 => self.score_j2.as_ref(),
        }
    }
}

/// One save slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub mode: GameMode,
    pub state: SessionSnapshot,
}

impl SaveRecord {
    /// One-line description for the slot browser.
    pub fn summary_line(&self) -> String {
        let local = self.timestamp.with_timezone(&chrono::Local);
        let minutes = (self.state.elapsed.max(0.0) / 60.0).floor() as u64;
        let seconds = self.state.elapsed.max(0.0) as u64 % 60;
        match self.state.score_j2.as_ref() {
            Some(j2) => format!(
                "{}  {:<11}  J1 {:>4} - J2 {:<4}  {:02}:{:02}",
                local.format("%Y-%m-%d %H:%M"),
                self.mode.label(),
                self.state.score_j1.score(),
                j2.score(),
                minutes,
                seconds
            ),
            None => format!(
                "{}  {:<11}  score {:>4}  level {}  {:02}:{:02}",
                local.format("%Y-%m-%d %H:%M"),
                self.mode.label(),
                self.state.score_j1.score(),
                self.state.level.current_level,
                minutes,
                seconds
            ),
        }
    }
}

/// RFC 3339 on write; on read also accepts a bare `YYYY-MM-DDTHH:MM:SS[.f]`
/// and takes it as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}
