/// Timed power-up effects.
///
/// At most one timer per kind, stored in a fixed kind-indexed table.
/// Timestamps are seconds of game time (see `GameSession::elapsed`), so a
/// paused or saved game never eats into an active effect.
///
/// The controller only keeps time; applying and reverting the effects
/// (speed, scoring multiplier) is the session's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::PowerUpKind;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerUpTimer {
    #[serde(rename = "tiempo_activado")]
    pub activated_at: f64,
    #[serde(rename = "duracion")]
    pub duration: f64,
}

impl PowerUpTimer {
    pub fn is_expired(&self, now: f64) -> bool {
        now - self.activated_at > self.duration
    }

    pub fn remaining(&self, now: f64) -> f64 {
        (self.duration - (now - self.activated_at)).max(0.0)
    }
}

/// Serialized as a `{ kind: { tiempo_activado, duracion } }` map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<PowerUpKind, PowerUpTimer>",
    into = "BTreeMap<PowerUpKind, PowerUpTimer>"
)]
pub struct PowerUpController {
    slots: [Option<PowerUpTimer>; 3],
}

impl PowerUpController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the timer for `kind`. Durations never stack.
    /// Returns `true` when an already-running timer was restarted.
    pub fn activate(&mut self, kind: PowerUpKind, duration: f64, now: f64) -> bool {
        let slot = &mut self.slots[kind.index()];
        let restarted = slot.is_some();
        *slot = Some(PowerUpTimer {
            activated_at: now,
            duration,
        });
        restarted
    }

    /// Removes and reports every timer that has run out. A kind is reported
    /// exactly once per activation.
    pub fn tick(&mut self, now: f64) -> Vec<PowerUpKind> {
        let mut expired = Vec::new();
        for kind in PowerUpKind::ALL {
            let slot = &mut self.slots[kind.index()];
            if slot.map_or(false, |t| t.is_expired(now)) {
                *slot = None;
                expired.push(kind);
            }
        }
        expired
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn any_active(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Seconds left on `kind`'s timer, 0 when inactive.
    pub fn remaining_secs(&self, kind: PowerUpKind, now: f64) -> f64 {
        self.slots[kind.index()].map_or(0.0, |t| t.remaining(now))
    }

    pub fn timer(&self, kind: PowerUpKind) -> Option<PowerUpTimer> {
        self.slots[kind.index()]
    }

    pub fn active(&self) -> impl Iterator<Item = (PowerUpKind, PowerUpTimer)> + '_ {
        PowerUpKind::ALL
            .into_iter()
            .filter_map(|kind| self.slots[kind.index()].map(|t| (kind, t)))
    }
}

impl From<BTreeMap<PowerUpKind, PowerUpTimer>> for PowerUpController {
    fn from(map: BTreeMap<PowerUpKind, PowerUpTimer>) -> Self {
        let mut controller = PowerUpController::new();
        for (kind, timer) in map {
            controller.slots[kind.index()] = Some(timer);
        }
        controller
    }
}

impl From<PowerUpController> for BTreeMap<PowerUpKind, PowerUpTimer> {
    fn from(controller: PowerUpController) -> Self {
        controller.active().collect()
    }
}
