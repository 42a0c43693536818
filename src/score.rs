/// Per-player score bookkeeping.
///
/// Pure state transitions: hits add points and extend the streak, misses
/// always break the streak and are counted unless a shield absorbed them.

use serde::{Deserialize, Serialize};

/// Field names match the `score_manager_j*` records in the save file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTracker {
    score: u32,
    #[serde(rename = "aciertos")]
    hits: u32,
    #[serde(rename = "fallos")]
    misses: u32,
    #[serde(rename = "racha_actual")]
    streak: u32,
    #[serde(rename = "is_double_score_active")]
    double_score_active: bool,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hit and returns the points it was worth.
    pub fn add_hit(&mut self) -> u32 {
        let points = if self.double_score_active { 2 } else { 1 };
        self.score += points;
        self.hits += 1;
        self.streak += 1;
        points
    }

    pub fn add_miss(&mut self, shielded: bool) {
        if !shielded {
            self.misses += 1;
        }
        self.streak = 0;
    }

    pub fn activate_double_score(&mut self) {
        self.double_score_active = true;
    }

    pub fn deactivate_double_score(&mut self) {
        self.double_score_active = false;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn is_double_score_active(&self) -> bool {
        self.double_score_active
    }
}
