/// One run of gameplay.
///
/// The session owns every piece of simulation state and advances it only
/// through `update(dt)` and `on_key_typed`. It never reads the real clock:
/// game time is built from the `dt` values it is fed. All randomness comes
/// through the injected `rng` so callers control determinism.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::entities::{
    ActiveLetter, EndReason, FallingLetter, GameMode, GameSummary, PlayField, PlayerId,
    PlayerTally, PowerUpKind, SessionEvent, SessionStatus, SpawnStyle,
};
use crate::error::ConfigError;
use crate::letters::LetterPool;
use crate::level::LevelController;
use crate::powerups::PowerUpController;
use crate::score::ScoreTracker;
use crate::snapshot::SessionSnapshot;
use crate::storage::SaveSink;

/// Field units a letter covers per second at fall speed 1.0.
pub const SPEED_UNIT: f64 = 60.0;

/// Seconds of game time the level-up banner stays up.
pub const LEVEL_BANNER_SECS: f64 = 2.0;

/// A power-up may spawn on every multiple of this many hits.
pub const POWER_UP_EVERY_HITS: u32 = 10;

/// Letters dropped at once when the screen empties (single player).
pub fn spawn_count(level: u32) -> usize {
    if level >= 3 {
        2
    } else {
        1
    }
}

// ── Game clock ────────────────────────────────────────────────────────────────

/// `wall` advances on every update, paused or not; pauses are subtracted
/// back out, and time carried over from a save is added on top.
#[derive(Clone, Debug, Default, PartialEq)]
struct GameClock {
    wall: f64,
    paused_total: f64,
    carried: f64,
}

impl GameClock {
    fn at(&self, wall: f64) -> f64 {
        self.carried + wall - self.paused_total
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct GameSession {
    config: SessionConfig,
    status: SessionStatus,
    clock: GameClock,
    trackers: [ScoreTracker; 2],
    pool: LetterPool,
    power_ups: PowerUpController,
    level: LevelController,
    /// 0.5 while slow is active, 1.0 otherwise.
    speed_scale: f64,
    letters: Vec<FallingLetter>,
    active: Option<ActiveLetter>,
    turn: PlayerId,
    banner_until: Option<f64>,
    /// Save slot this run was loaded from or last saved to.
    origin: Option<DateTime<Utc>>,
    events: Vec<SessionEvent>,
}

impl GameSession {
    pub fn new(config: SessionConfig, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut session = Self {
            pool: LetterPool::new(rng),
            level: LevelController::new(config.initial_speed),
            config,
            status: SessionStatus::Running,
            clock: GameClock::default(),
            trackers: [ScoreTracker::new(), ScoreTracker::new()],
            power_ups: PowerUpController::new(),
            speed_scale: 1.0,
            letters: Vec::new(),
            active: None,
            turn: PlayerId::J1,
            banner_until: None,
            origin: None,
            events: Vec::new(),
        };
        match session.config.mode {
            GameMode::SinglePlayer => session.refill_if_empty(rng),
            GameMode::Versus => session.spawn_active(PlayerId::J1, rng),
        }
        info!(
            "new {} session, speed {}, fault limit {}, time limit {}s",
            session.config.mode.label(),
            session.config.initial_speed,
            session.config.fault_limit,
            session.config.time_limit_seconds
        );
        Ok(session)
    }

    /// Rebuilds a session from a saved state. `origin` is the save slot it
    /// came from, so saving again overwrites that slot.
    pub fn resume_from(
        config: SessionConfig,
        snapshot: SessionSnapshot,
        origin: Option<DateTime<Utc>>,
        rng: &mut impl Rng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mode = config.mode;

        let mut pool = snapshot
            .letter_pool
            .unwrap_or_else(|| LetterPool::new(rng));
        pool.refill_empty(rng);

        let trackers = [
            snapshot.score_j1,
            match mode {
                GameMode::Versus => snapshot.score_j2.unwrap_or_default(),
                GameMode::SinglePlayer => ScoreTracker::new(),
            },
        ];
        let total_hits: u32 = mode.players().iter().map(|p| trackers[p.index()].hits()).sum();

        let power_ups = snapshot.power_ups;
        let speed_scale = if power_ups.is_active(PowerUpKind::Slow) {
            0.5
        } else {
            1.0
        };
        let mut level = LevelController::from_state(snapshot.level, total_hits);
        if snapshot.speed.is_finite() && snapshot.speed > 0.0 {
            level.restore_speed(snapshot.speed / speed_scale, total_hits);
        }

        let mut session = Self {
            status: SessionStatus::Running,
            clock: GameClock {
                carried: snapshot.elapsed.max(0.0),
                ..GameClock::default()
            },
            trackers,
            pool,
            power_ups,
            level,
            speed_scale,
            letters: Vec::new(),
            active: None,
            turn: snapshot.current_turn.unwrap_or(PlayerId::J1),
            banner_until: None,
            origin,
            events: Vec::new(),
            config,
        };

        let double = session.power_ups.is_active(PowerUpKind::DoubleScore);
        for tracker in session.trackers.iter_mut() {
            if double {
                tracker.activate_double_score();
            } else {
                tracker.deactivate_double_score();
            }
        }

        match mode {
            GameMode::SinglePlayer => {
                let field = session.config.field;
                session.letters = snapshot
                    .letters
                    .into_iter()
                    .filter(|l| !l.is_outside(&field))
                    .collect();
                session.refill_if_empty(rng);
            }
            GameMode::Versus => {
                match (snapshot.active_letter, snapshot.active_letter_x, snapshot.active_letter_y) {
                    (Some(character), Some(x), Some(y)) => {
                        session.active = Some(ActiveLetter {
                            owner: session.turn,
                            letter: FallingLetter {
                                character,
                                x,
                                y,
                                vx: 0.0,
                                vy: 1.0,
                                spawn_style: SpawnStyle::FromTop,
                            },
                        });
                    }
                    _ => session.spawn_active(session.turn, rng),
                }
            }
        }

        info!(
            "resumed {} session at {:.1}s, level {}, speed {:.2}",
            mode.label(),
            session.elapsed(),
            session.level.level(),
            session.fall_speed()
        );
        Ok(session)
    }

    // ── Per-frame update ──────────────────────────────────────────────────────

    /// Advances the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f64, rng: &mut impl Rng) {
        if matches!(self.status, SessionStatus::Ended(_)) {
            return;
        }
        self.clock.wall += dt.max(0.0);
        if matches!(self.status, SessionStatus::Paused { .. }) {
            return;
        }
        let now = self.elapsed();

        // ── 1. Power-up expiry ───────────────────────────────────────────────
        for kind in self.power_ups.tick(now) {
            self.revert_power_up(kind);
        }

        // ── 2. Level ─────────────────────────────────────────────────────────
        let total_hits = self.total_hits();
        if self.level.update(total_hits) {
            let level = self.level.level();
            self.banner_until = Some(now + LEVEL_BANNER_SECS);
            self.events.push(SessionEvent::LevelUp { level });
            info!(
                "level {} reached, target speed {:.1}",
                level,
                self.level.target_speed()
            );
        }
        if self.banner_until.map_or(false, |until| now > until) {
            self.banner_until = None;
        }

        // ── 3. Movement ──────────────────────────────────────────────────────
        let distance = self.fall_speed() * SPEED_UNIT * dt.max(0.0);
        match self.config.mode {
            GameMode::SinglePlayer => self.advance_letters(distance, rng),
            GameMode::Versus => self.advance_active(distance, rng),
        }

        // ── 4. Terminal conditions ───────────────────────────────────────────
        self.check_terminal();
    }

    fn advance_letters(&mut self, distance: f64, rng: &mut impl Rng) {
        let field = self.config.field;
        for letter in self.letters.iter_mut() {
            letter.x += letter.vx * distance;
            letter.y += letter.vy * distance;
        }
        let (escaped, kept): (Vec<FallingLetter>, Vec<FallingLetter>) =
            self.letters.drain(..).partition(|l| l.is_outside(&field));
        self.letters = kept;
        for letter in escaped {
            self.events.push(SessionEvent::LetterEscaped {
                player: PlayerId::J1,
                character: letter.character,
            });
            self.register_miss(PlayerId::J1);
        }
        self.refill_if_empty(rng);
    }

    fn advance_active(&mut self, distance: f64, rng: &mut impl Rng) {
        let field = self.config.field;
        let escaped = match self.active.as_mut() {
            Some(active) => {
                active.letter.x += active.letter.vx * distance;
                active.letter.y += active.letter.vy * distance;
                active.letter.is_outside(&field).then_some(active.letter.character)
            }
            None => None,
        };
        if let Some(character) = escaped {
            let player = self.turn;
            self.events.push(SessionEvent::LetterEscaped { player, character });
            self.register_miss(player);
            self.pass_turn(rng);
        } else if self.active.is_none() {
            self.spawn_active(self.turn, rng);
        }
    }

    fn check_terminal(&mut self) {
        if !matches!(self.status, SessionStatus::Running) {
            return;
        }
        let limit = self.config.fault_limit;
        let faulted = self
            .config
            .mode
            .players()
            .iter()
            .any(|p| i64::from(self.trackers[p.index()].misses()) >= limit);
        if faulted {
            self.end(EndReason::FaultLimitReached);
            return;
        }
        let time_limit = self.config.time_limit_seconds;
        if time_limit > 0 && self.elapsed() >= time_limit as f64 {
            self.end(EndReason::TimeLimitReached);
        }
    }

    fn end(&mut self, reason: EndReason) {
        self.status = SessionStatus::Ended(reason);
        self.events.push(SessionEvent::Ended { reason });
        let summary = self.summary();
        info!(
            "session ended ({:?}) after {:.1}s, hits {}, misses {}",
            reason,
            self.elapsed(),
            summary.total_hits(),
            summary.total_misses()
        );
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Handles one typed character. Keys outside the alphabet, and any key
    /// while not running, are ignored.
    pub fn on_key_typed(&mut self, typed: char, rng: &mut impl Rng) {
        if self.status != SessionStatus::Running {
            return;
        }
        let typed = typed.to_ascii_uppercase();
        if !self.pool.contains(typed) {
            return;
        }
        match self.config.mode {
            GameMode::SinglePlayer => self.key_single(typed, rng),
            GameMode::Versus => self.key_versus(typed, rng),
        }
        self.check_terminal();
    }

    fn key_single(&mut self, typed: char, rng: &mut impl Rng) {
        // Several letters may match; the one closest to the bottom goes first.
        let matched = self
            .letters
            .iter()
            .enumerate()
            .filter(|(_, l)| l.character == typed)
            .max_by(|(_, a), (_, b)| a.y.total_cmp(&b.y))
            .map(|(i, _)| i);
        match matched {
            Some(i) => {
                let letter = self.letters.remove(i);
                self.register_hit(PlayerId::J1, &letter, rng);
                self.refill_if_empty(rng);
            }
            None => self.register_miss(PlayerId::J1),
        }
    }

    fn key_versus(&mut self, typed: char, rng: &mut impl Rng) {
        let player = self.turn;
        let hit = match self.active.as_ref() {
            Some(active) if active.letter.character == typed => Some(active.letter.clone()),
            _ => None,
        };
        match hit {
            Some(letter) => {
                self.register_hit(player, &letter, rng);
                self.pass_turn(rng);
            }
            None => {
                self.register_miss(player);
                if self.config.alternate_turn_on_wrong_key {
                    self.pass_turn(rng);
                }
            }
        }
    }

    fn register_hit(&mut self, player: PlayerId, letter: &FallingLetter, rng: &mut impl Rng) {
        let points = self.trackers[player.index()].add_hit();
        self.events.push(SessionEvent::Hit {
            player,
            character: letter.character,
            points,
            x: letter.x,
            y: letter.y,
        });
        debug!("{} hit {} for {}", player.label(), letter.character, points);
        if self.level.check_gradual_speed_increase() {
            debug!("speed stepped to {:.1}", self.level.current_speed());
        }
        self.maybe_spawn_power_up(player, rng);
    }

    fn register_miss(&mut self, player: PlayerId) {
        let shielded = self.power_ups.is_active(PowerUpKind::Shield);
        self.trackers[player.index()].add_miss(shielded);
        self.events.push(SessionEvent::Miss { player, shielded });
        debug!("{} missed (shielded: {})", player.label(), shielded);
    }

    /// Hands the single versus letter to the other player.
    fn pass_turn(&mut self, rng: &mut impl Rng) {
        self.turn = self.turn.other();
        self.events.push(SessionEvent::TurnChanged { player: self.turn });
        self.spawn_active(self.turn, rng);
    }

    // ── Power-ups ─────────────────────────────────────────────────────────────

    fn maybe_spawn_power_up(&mut self, player: PlayerId, rng: &mut impl Rng) {
        let hits = self.trackers[player.index()].hits();
        if hits == 0 || hits % POWER_UP_EVERY_HITS != 0 || self.power_ups.any_active() {
            return;
        }
        let kind = PowerUpKind::ALL[rng.gen_range(0..PowerUpKind::ALL.len())];
        self.activate_power_up(kind, player);
    }

    /// Starts `kind` for its standard duration and applies its effect. A kind
    /// that is already running only has its timer restarted.
    pub fn activate_power_up(&mut self, kind: PowerUpKind, player: PlayerId) {
        let now = self.elapsed();
        let restarted = self.power_ups.activate(kind, kind.duration_secs(), now);
        if !restarted {
            match kind {
                PowerUpKind::Slow => self.speed_scale *= 0.5,
                PowerUpKind::Shield => {}
                PowerUpKind::DoubleScore => {
                    for tracker in self.trackers.iter_mut() {
                        tracker.activate_double_score();
                    }
                }
            }
        }
        self.events.push(SessionEvent::PowerUpActivated { kind, player });
        info!(
            "power-up {:?} for {} at {:.1}s (restarted: {})",
            kind,
            player.label(),
            now,
            restarted
        );
    }

    fn revert_power_up(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::Slow => self.speed_scale *= 2.0,
            PowerUpKind::Shield => {}
            PowerUpKind::DoubleScore => {
                for tracker in self.trackers.iter_mut() {
                    tracker.deactivate_double_score();
                }
            }
        }
        self.events.push(SessionEvent::PowerUpExpired { kind });
        info!("power-up {:?} expired", kind);
    }

    // ── Spawning ──────────────────────────────────────────────────────────────

    fn refill_if_empty(&mut self, rng: &mut impl Rng) {
        if !self.letters.is_empty() || self.config.mode != GameMode::SinglePlayer {
            return;
        }
        for _ in 0..spawn_count(self.level.level()) {
            let letter = self.spawn_letter(rng);
            self.letters.push(letter);
        }
    }

    fn spawn_letter(&mut self, rng: &mut impl Rng) -> FallingLetter {
        let character = self.pool.next_letter(GameMode::SinglePlayer, PlayerId::J1, rng);
        let style = if self.level.level() < 2 {
            SpawnStyle::FromTop
        } else {
            SpawnStyle::ALL[rng.gen_range(0..SpawnStyle::ALL.len())]
        };
        let letter = place_letter(character, style, &self.config.field, rng);
        debug!("spawned {} {:?} at ({:.0}, {:.0})", character, style, letter.x, letter.y);
        letter
    }

    fn spawn_active(&mut self, player: PlayerId, rng: &mut impl Rng) {
        let character = self.pool.next_letter(GameMode::Versus, player, rng);
        let x = pick(rng, self.config.field.half_range(player));
        self.active = Some(ActiveLetter {
            owner: player,
            letter: FallingLetter {
                character,
                x,
                y: 0.0,
                vx: 0.0,
                vy: 1.0,
                spawn_style: SpawnStyle::FromTop,
            },
        });
        debug!("{} gets {} at x {:.0}", player.label(), character, x);
    }

    // ── Pause / exit ──────────────────────────────────────────────────────────

    /// Freezes game time. Returns `false` when not running.
    pub fn pause(&mut self) -> bool {
        if self.status != SessionStatus::Running {
            return false;
        }
        self.status = SessionStatus::Paused {
            since: self.clock.wall,
        };
        debug!("paused at {:.1}s", self.elapsed());
        true
    }

    /// Returns `false` when not paused.
    pub fn resume(&mut self) -> bool {
        let SessionStatus::Paused { since } = self.status else {
            return false;
        };
        self.clock.paused_total += self.clock.wall - since;
        self.status = SessionStatus::Running;
        debug!("resumed at {:.1}s", self.elapsed());
        true
    }

    /// Writes the current state to `sink` and ends the run. A failed write is
    /// logged and the run ends anyway; the slot timestamp is returned on
    /// success.
    pub fn save_and_quit(&mut self, sink: &mut dyn SaveSink) -> Option<DateTime<Utc>> {
        if matches!(self.status, SessionStatus::Ended(_)) {
            return None;
        }
        let snapshot = self.snapshot();
        let saved = match sink.store(self.config.mode, &snapshot, self.origin) {
            Ok(ts) => {
                self.origin = Some(ts);
                Some(ts)
            }
            Err(e) => {
                warn!("save failed, leaving without saving: {}", e);
                None
            }
        };
        self.end(EndReason::UserQuit);
        saved
    }

    pub fn quit_without_saving(&mut self) {
        if !matches!(self.status, SessionStatus::Ended(_)) {
            self.end(EndReason::UserQuit);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let versus = self.config.mode == GameMode::Versus;
        let active = self.active.as_ref().filter(|_| versus);
        SessionSnapshot {
            speed: self.fall_speed(),
            elapsed: self.elapsed(),
            fault_limit: Some(self.config.fault_limit),
            score_j1: self.trackers[PlayerId::J1.index()].clone(),
            score_j2: versus.then(|| self.trackers[PlayerId::J2.index()].clone()),
            letter_pool: Some(self.pool.clone()),
            power_ups: self.power_ups.clone(),
            level: self.level.state().clone(),
            letters: if versus { Vec::new() } else { self.letters.clone() },
            current_turn: versus.then_some(self.turn),
            active_letter: active.map(|a| a.letter.character),
            active_letter_x: active.map(|a| a.letter.x),
            active_letter_y: active.map(|a| a.letter.y),
            time_limit_seconds: versus.then_some(self.config.time_limit_seconds),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Game-relative seconds; frozen while paused.
    pub fn elapsed(&self) -> f64 {
        match self.status {
            SessionStatus::Paused { since } => self.clock.at(since),
            _ => self.clock.at(self.clock.wall),
        }
    }

    /// Seconds left before the time limit, if there is one.
    pub fn time_remaining(&self) -> Option<f64> {
        let limit = self.config.time_limit_seconds;
        (limit > 0).then(|| (limit as f64 - self.elapsed()).max(0.0))
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        matches!(self.status, SessionStatus::Ended(_))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> GameMode {
        self.config.mode
    }

    pub fn field(&self) -> &PlayField {
        &self.config.field
    }

    /// Falling letters (single player).
    pub fn letters(&self) -> &[FallingLetter] {
        &self.letters
    }

    /// The letter in play (versus).
    pub fn active_letter(&self) -> Option<&ActiveLetter> {
        self.active.as_ref()
    }

    pub fn current_turn(&self) -> PlayerId {
        self.turn
    }

    pub fn tracker(&self, player: PlayerId) -> &ScoreTracker {
        &self.trackers[player.index()]
    }

    pub fn total_hits(&self) -> u32 {
        self.config
            .mode
            .players()
            .iter()
            .map(|p| self.trackers[p.index()].hits())
            .sum()
    }

    pub fn power_ups(&self) -> &PowerUpController {
        &self.power_ups
    }

    pub fn level(&self) -> &LevelController {
        &self.level
    }

    /// Effective fall speed: the level's current speed, halved while slow is on.
    pub fn fall_speed(&self) -> f64 {
        self.level.current_speed() * self.speed_scale
    }

    /// Level number to announce, while the banner window is open.
    pub fn banner(&self) -> Option<u32> {
        self.banner_until
            .filter(|until| self.elapsed() <= *until)
            .map(|_| self.level.level())
    }

    pub fn origin(&self) -> Option<DateTime<Utc>> {
        self.origin
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            mode: self.config.mode,
            reason: match self.status {
                SessionStatus::Ended(reason) => Some(reason),
                _ => None,
            },
            players: self
                .config
                .mode
                .players()
                .iter()
                .map(|&player| {
                    let t = &self.trackers[player.index()];
                    PlayerTally {
                        player,
                        score: t.score(),
                        hits: t.hits(),
                        misses: t.misses(),
                    }
                })
                .collect(),
        }
    }

    /// Takes the events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}

// ── Placement helpers ─────────────────────────────────────────────────────────

fn pick(rng: &mut impl Rng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Side letters cross the field in the time a top letter takes to fall,
/// sinking at half rate.
fn place_letter(
    character: char,
    style: SpawnStyle,
    field: &PlayField,
    rng: &mut impl Rng,
) -> FallingLetter {
    let across = field.width / field.height;
    let entry_y = || (0.0, field.height / 3.0);
    let (x, y, vx, vy) = match style {
        SpawnStyle::FromTop => (pick(rng, field.full_range()), 0.0, 0.0, 1.0),
        SpawnStyle::FromLeft => (0.0, pick(rng, entry_y()), across, 0.5),
        SpawnStyle::FromRight => (field.width, pick(rng, entry_y()), -across, 0.5),
    };
    FallingLetter {
        character,
        x,
        y,
        vx,
        vy,
        spawn_style: style,
    }
}
