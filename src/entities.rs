/// Game entity types. Plain data with a few small accessors.

use serde::{Deserialize, Serialize};

// ── Players & modes ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerId {
    J1,
    J2,
}

impl PlayerId {
    pub fn other(self) -> PlayerId {
        match self {
            PlayerId::J1 => PlayerId::J2,
            PlayerId::J2 => PlayerId::J1,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PlayerId::J1 => 0,
            PlayerId::J2 => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerId::J1 => "J1",
            PlayerId::J2 => "J2",
        }
    }
}

/// Wire names follow the save file: single player is "arcane", two players "versus".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "arcane")]
    SinglePlayer,
    #[serde(rename = "versus")]
    Versus,
}

impl GameMode {
    pub fn num_players(self) -> usize {
        match self {
            GameMode::SinglePlayer => 1,
            GameMode::Versus => 2,
        }
    }

    pub fn players(self) -> &'static [PlayerId] {
        match self {
            GameMode::SinglePlayer => &[PlayerId::J1],
            GameMode::Versus => &[PlayerId::J1, PlayerId::J2],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GameMode::SinglePlayer => "Arcane (1P)",
            GameMode::Versus => "Versus (2P)",
        }
    }
}

// ── Power-ups ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Halves the global fall speed while active.
    #[serde(rename = "ralentizar")]
    Slow,
    /// Misses still break the streak but are not counted as faults.
    #[serde(rename = "escudo")]
    Shield,
    /// Every hit is worth two points.
    #[serde(rename = "doble_puntuacion")]
    DoubleScore,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::Slow,
        PowerUpKind::Shield,
        PowerUpKind::DoubleScore,
    ];

    /// Seconds of game time an activation lasts.
    pub fn duration_secs(self) -> f64 {
        match self {
            PowerUpKind::Slow => 10.0,
            PowerUpKind::Shield => 10.0,
            PowerUpKind::DoubleScore => 5.0,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PowerUpKind::Slow => 0,
            PowerUpKind::Shield => 1,
            PowerUpKind::DoubleScore => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PowerUpKind::Slow => "SLOW",
            PowerUpKind::Shield => "SHIELD",
            PowerUpKind::DoubleScore => "x2",
        }
    }
}

// ── Letters ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnStyle {
    /// Dropped from the top edge, falls straight down.
    FromTop,
    /// Towed in from the left edge, travels right while sinking.
    FromLeft,
    /// Towed in from the right edge, travels left while sinking.
    FromRight,
}

impl SpawnStyle {
    pub const ALL: [SpawnStyle; 3] = [
        SpawnStyle::FromTop,
        SpawnStyle::FromLeft,
        SpawnStyle::FromRight,
    ];
}

/// A letter moving through the play field.
///
/// `vx`/`vy` are direction factors; the distance covered per second is
/// `velocity * fall_speed * SPEED_UNIT` (see `session`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallingLetter {
    pub character: char,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub spawn_style: SpawnStyle,
}

impl FallingLetter {
    /// Where the towing carrier (helicopter above, vehicle behind) is drawn.
    /// Purely cosmetic.
    pub fn carrier_anchor(&self) -> (f64, f64) {
        match self.spawn_style {
            SpawnStyle::FromTop => (self.x, self.y - 1.0),
            SpawnStyle::FromLeft => (self.x - 2.0, self.y),
            SpawnStyle::FromRight => (self.x + 2.0, self.y),
        }
    }

    /// True once the letter has left the field through the bottom or a side edge.
    pub fn is_outside(&self, field: &PlayField) -> bool {
        self.y > field.height || self.x < 0.0 || self.x > field.width
    }
}

/// The single letter in play during a versus match.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveLetter {
    pub owner: PlayerId,
    pub letter: FallingLetter,
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Play-field dimensions in the same units as letter positions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayField {
    pub width: f64,
    pub height: f64,
    /// Size of one glyph; also the safety margin kept from the field edges.
    pub glyph_size: f64,
}

impl PlayField {
    pub fn new(width: f64, height: f64, glyph_size: f64) -> Self {
        Self {
            width,
            height,
            glyph_size,
        }
    }

    /// Horizontal spawn range for a versus player's half of the field.
    pub fn half_range(&self, player: PlayerId) -> (f64, f64) {
        let mid = self.width / 2.0;
        let margin = self.glyph_size;
        let (lo, hi) = match player {
            PlayerId::J1 => (margin, mid - margin),
            PlayerId::J2 => (mid + margin, self.width - margin),
        };
        ordered_range(lo, hi)
    }

    /// Horizontal spawn range over the whole field.
    pub fn full_range(&self) -> (f64, f64) {
        ordered_range(self.glyph_size, self.width - self.glyph_size)
    }
}

/// Collapses an inverted range to its midpoint so narrow fields still spawn.
fn ordered_range(lo: f64, hi: f64) -> (f64, f64) {
    if lo <= hi {
        (lo, hi)
    } else {
        let mid = (lo + hi) / 2.0;
        (mid, mid)
    }
}

// ── Session lifecycle ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    FaultLimitReached,
    TimeLimitReached,
    UserQuit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionStatus {
    Running,
    /// `since` is the wall-clock reading when the pause began.
    Paused { since: f64 },
    Ended(EndReason),
}

/// What the presentation layer should do after a session is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionExit {
    /// "menu_principal"
    MainMenu,
    /// "reiniciar": play again with the same configuration.
    Restart,
}

impl SessionExit {
    pub fn tag(self) -> &'static str {
        match self {
            SessionExit::MainMenu => "menu_principal",
            SessionExit::Restart => "reiniciar",
        }
    }
}

/// Gameplay occurrences, drained by the presentation layer to trigger
/// sounds and particles.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Hit {
        player: PlayerId,
        character: char,
        points: u32,
        x: f64,
        y: f64,
    },
    Miss {
        player: PlayerId,
        shielded: bool,
    },
    LetterEscaped {
        player: PlayerId,
        character: char,
    },
    PowerUpActivated {
        kind: PowerUpKind,
        player: PlayerId,
    },
    PowerUpExpired {
        kind: PowerUpKind,
    },
    LevelUp {
        level: u32,
    },
    TurnChanged {
        player: PlayerId,
    },
    Ended {
        reason: EndReason,
    },
}

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerTally {
    pub player: PlayerId,
    pub score: u32,
    pub hits: u32,
    pub misses: u32,
}

/// Final tallies for the game-over screen and the high-score check.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSummary {
    pub mode: GameMode,
    pub reason: Option<EndReason>,
    pub players: Vec<PlayerTally>,
}

impl GameSummary {
    pub fn tally(&self, player: PlayerId) -> Option<&PlayerTally> {
        self.players.iter().find(|t| t.player == player)
    }

    pub fn total_hits(&self) -> u32 {
        self.players.iter().map(|t| t.hits).sum()
    }

    pub fn total_misses(&self) -> u32 {
        self.players.iter().map(|t| t.misses).sum()
    }

    /// Versus winner; J1 keeps the win on a tie.
    pub fn winner(&self) -> Option<PlayerId> {
        if self.mode != GameMode::Versus {
            return None;
        }
        let j1 = self.tally(PlayerId::J1)?;
        let j2 = self.tally(PlayerId::J2)?;
        Some(if j1.score >= j2.score {
            PlayerId::J1
        } else {
            PlayerId::J2
        })
    }

    /// The score that competes for the single-player leaderboard.
    pub fn high_score_candidate(&self) -> Option<u32> {
        match self.mode {
            GameMode::SinglePlayer => self.tally(PlayerId::J1).map(|t| t.score),
            GameMode::Versus => None,
        }
    }
}
