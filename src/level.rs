/// Level progression and fall-speed ramp.
///
/// The level is the highest tier whose hit threshold has been reached. On a
/// level-up the target speed jumps to the tier's speed, but the current speed
/// only walks toward it in `SPEED_STEP` increments, spread evenly over the
/// hits that remain before the next threshold.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelTier {
    pub level: u32,
    /// Cumulative hits needed to enter this tier.
    pub threshold: u32,
    pub speed: f64,
}

pub const LEVEL_TABLE: [LevelTier; 5] = [
    LevelTier { level: 1, threshold: 0, speed: 2.0 },
    LevelTier { level: 2, threshold: 30, speed: 2.5 },
    LevelTier { level: 3, threshold: 80, speed: 3.0 },
    LevelTier { level: 4, threshold: 150, speed: 3.5 },
    LevelTier { level: 5, threshold: 250, speed: 4.0 },
];

pub const SPEED_STEP: f64 = 0.1;

/// Hits per speed step on the last tier, where no next threshold exists.
const HITS_PER_STEP_AT_MAX: u32 = 10;

/// Highest tier whose threshold is at or below `cumulative_hits`.
pub fn tier_for_hits(cumulative_hits: u32) -> LevelTier {
    LEVEL_TABLE
        .iter()
        .rev()
        .find(|t| cumulative_hits >= t.threshold)
        .copied()
        .unwrap_or(LEVEL_TABLE[0])
}

pub fn next_tier(level: u32) -> Option<LevelTier> {
    LEVEL_TABLE.iter().find(|t| t.level > level).copied()
}

pub fn max_level() -> u32 {
    LEVEL_TABLE[LEVEL_TABLE.len() - 1].level
}

/// Saved as the `game_level_manager` record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelState {
    pub current_level: u32,
    pub current_speed: f64,
    pub target_speed: f64,
    pub hits_since_speed_step: u32,
    /// 0 when the current speed already sits on the target.
    pub hits_per_speed_step: u32,
}

impl Default for LevelState {
    fn default() -> Self {
        Self {
            current_level: 1,
            current_speed: LEVEL_TABLE[0].speed,
            target_speed: LEVEL_TABLE[0].speed,
            hits_since_speed_step: 0,
            hits_per_speed_step: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelController {
    state: LevelState,
}

impl LevelController {
    pub fn new(initial_speed: f64) -> Self {
        let mut controller = Self {
            state: LevelState {
                current_speed: initial_speed,
                ..LevelState::default()
            },
        };
        controller.state.hits_per_speed_step = controller.compute_hits_per_step(0);
        controller
    }

    /// Rebuilds a controller from saved state, catching up on any tier the
    /// saved hit count already qualifies for.
    pub fn from_state(state: LevelState, cumulative_hits: u32) -> Self {
        let mut controller = Self { state };
        if controller.state.current_level == 0 {
            controller.state.current_level = 1;
        }
        controller.update(cumulative_hits);
        controller
    }

    /// Re-evaluates the level. Returns `true` on a level-up.
    pub fn update(&mut self, cumulative_hits: u32) -> bool {
        let tier = tier_for_hits(cumulative_hits);
        if tier.level <= self.state.current_level {
            return false;
        }
        self.state.current_level = tier.level;
        self.state.target_speed = tier.speed;
        self.state.hits_since_speed_step = 0;
        self.state.hits_per_speed_step = self.compute_hits_per_step(cumulative_hits);
        true
    }

    /// Counts one hit toward the next speed step and applies the step when due.
    /// Returns `true` when the speed changed.
    pub fn check_gradual_speed_increase(&mut self) -> bool {
        if self.state.hits_per_speed_step == 0 || self.steps_to_target() == 0 {
            return false;
        }
        self.state.hits_since_speed_step += 1;
        if self.state.hits_since_speed_step < self.state.hits_per_speed_step {
            return false;
        }
        self.state.hits_since_speed_step = 0;
        self.step_toward_target();
        true
    }

    pub fn level(&self) -> u32 {
        self.state.current_level
    }

    pub fn current_speed(&self) -> f64 {
        self.state.current_speed
    }

    pub fn target_speed(&self) -> f64 {
        self.state.target_speed
    }

    pub fn hits_per_speed_step(&self) -> u32 {
        self.state.hits_per_speed_step
    }

    pub fn state(&self) -> &LevelState {
        &self.state
    }

    /// Applies the `velocidad` value of a save. The saved ramp schedule is
    /// kept unless the speed disagrees with it or the schedule is missing.
    pub fn restore_speed(&mut self, speed: f64, cumulative_hits: u32) {
        let agrees = (self.state.current_speed - speed).abs() < 1e-9;
        if !agrees {
            self.state.current_speed = speed;
            self.state.hits_since_speed_step = 0;
        }
        if !agrees || self.state.hits_per_speed_step == 0 {
            self.state.hits_per_speed_step = self.compute_hits_per_step(cumulative_hits);
        }
    }

    fn steps_to_target(&self) -> u32 {
        ((self.state.target_speed - self.state.current_speed).abs() / SPEED_STEP).round() as u32
    }

    fn compute_hits_per_step(&self, cumulative_hits: u32) -> u32 {
        let steps = self.steps_to_target();
        if steps == 0 {
            return 0;
        }
        let remaining = match next_tier(self.state.current_level) {
            Some(next) => next.threshold.saturating_sub(cumulative_hits).max(1),
            None => HITS_PER_STEP_AT_MAX * steps,
        };
        (remaining / steps).max(1)
    }

    fn step_toward_target(&mut self) {
        let current = self.state.current_speed;
        let target = self.state.target_speed;
        let next = if target > current {
            round_tenths(current + SPEED_STEP).min(target)
        } else {
            round_tenths(current - SPEED_STEP).max(target)
        };
        self.state.current_speed = next;
    }
}

fn round_tenths(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
