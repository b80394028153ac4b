//! The accumulator-driven fixed-timestep integrator.
//!
//! Each wall-clock poll adds elapsed milliseconds to an accumulator and
//! drains it in whole physics-tick increments. Each increment turns held
//! keys into a unit direction (diagonals normalized to unit length),
//! scales by the fixed speed, and clamps the position to map bounds. The
//! loop runs much finer-grained than the broadcast cadence; its only
//! external contract is that positions are current for proximity checks.

use arbiter_types::HeldKeys;

use crate::actor::clamp_axis;
use crate::roster::Roster;

/// Physics tick length, milliseconds (about 60 Hz).
pub const SIM_STEP_MS: f64 = 16.6667;

/// Movement speed, distance units per physics tick.
pub const SPEED: f64 = 4.0;

/// Accumulator state for the fixed-timestep loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integrator {
    accumulator_ms: f64,
}

impl Integrator {
    /// Create an integrator with an empty accumulator.
    pub const fn new() -> Self {
        Self { accumulator_ms: 0.0 }
    }

    /// Add elapsed wall time and apply as many whole physics steps as
    /// the accumulator allows. Returns the number of steps applied.
    pub fn advance(&mut self, roster: &mut Roster, elapsed_ms: f64) -> u32 {
        self.accumulator_ms += elapsed_ms.max(0.0);
        let mut steps = 0u32;
        while self.accumulator_ms >= SIM_STEP_MS {
            step(roster);
            self.accumulator_ms -= SIM_STEP_MS;
            steps = steps.saturating_add(1);
        }
        steps
    }

    /// Milliseconds currently buffered below one whole step.
    pub const fn pending_ms(&self) -> f64 {
        self.accumulator_ms
    }
}

/// Apply one physics step to every actor.
fn step(roster: &mut Roster) {
    let bounds = *roster.bounds();
    let radius = bounds.actor_radius;
    let ids: Vec<_> = roster.iter().map(|actor| actor.id.clone()).collect();
    for id in ids {
        if let Some(actor) = roster.get_mut(&id) {
            let (dx, dy) = direction(actor.keys);
            actor.vx = dx * SPEED;
            actor.vy = dy * SPEED;
            actor.x = clamp_axis(actor.x + actor.vx, radius, bounds.width);
            actor.y = clamp_axis(actor.y + actor.vy, radius, bounds.height);
        }
    }
}

/// Unit movement direction from held keys; diagonal input is normalized
/// so diagonal motion is no faster than axis-aligned motion.
fn direction(keys: HeldKeys) -> (f64, f64) {
    let dx = f64::from(i32::from(keys.d)) - f64::from(i32::from(keys.a));
    let dy = f64::from(i32::from(keys.s)) - f64::from(i32::from(keys.w));
    if dx != 0.0 && dy != 0.0 {
        let inv = core::f64::consts::FRAC_1_SQRT_2;
        (dx * inv, dy * inv)
    } else {
        (dx, dy)
    }
}
