//! One actor's mutable world state and deterministic spawn placement.
//!
//! The first actor spawns at the map center; each subsequent actor lands
//! on a golden-angle (137.508 degree) ring of radius 140 around it, with
//! a small jitter seeded from the actor id so the same id always spawns
//! at the same point. Positions are clamped so the actor radius stays
//! inside the map.

use std::hash::{DefaultHasher, Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use arbiter_types::{ActorId, HeldKeys, MapBounds};

/// Golden angle between successive spawn positions, in degrees.
const SPAWN_ANGLE_DEG: f64 = 137.508;

/// Radius of the spawn ring around the map center.
const SPAWN_RING_R: f64 = 140.0;

/// Maximum jitter applied to a spawn position, per axis.
const SPAWN_JITTER: f64 = 18.0;

/// An ephemeral chat overlay displayed above an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    /// Sanitized chat text.
    pub chat: String,
    /// Wall-clock expiry, epoch milliseconds.
    pub expires_at_ms: u64,
    /// The per-actor overlay sequence number this overlay was given.
    pub seq: u64,
}

/// One actor's mutable world state.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// The actor's identifier.
    pub id: ActorId,
    /// Position, x coordinate.
    pub x: f64,
    /// Position, y coordinate.
    pub y: f64,
    /// Velocity from the last integrator step, x component.
    pub vx: f64,
    /// Velocity from the last integrator step, y component.
    pub vy: f64,
    /// Currently held movement keys.
    pub keys: HeldKeys,
    /// Health in `[0.0, 1.0]`; 1.0 at spawn.
    pub health: f64,
    /// At most one pending display overlay.
    pub overlay: Option<Overlay>,
    /// Monotonically increasing overlay sequence counter.
    pub overlay_seq: u64,
}

impl Actor {
    /// Spawn a new actor at its deterministic ring position.
    ///
    /// `index` is the actor's join order (0 spawns at the map center).
    pub fn spawn(id: ActorId, index: usize, bounds: &MapBounds) -> Self {
        let center_x = bounds.width / 2.0;
        let center_y = bounds.height / 2.0;

        let (base_x, base_y) = if index == 0 {
            (center_x, center_y)
        } else {
            let angle = index_to_f64(index) * SPAWN_ANGLE_DEG * core::f64::consts::PI / 180.0;
            (
                center_x + angle.cos() * SPAWN_RING_R,
                center_y + angle.sin() * SPAWN_RING_R,
            )
        };

        let mut rng = StdRng::seed_from_u64(seed_for(&id));
        let jitter_x: f64 = rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER);
        let jitter_y: f64 = rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER);

        Self {
            id,
            x: clamp_axis(base_x + jitter_x, bounds.actor_radius, bounds.width),
            y: clamp_axis(base_y + jitter_y, bounds.actor_radius, bounds.height),
            vx: 0.0,
            vy: 0.0,
            keys: HeldKeys::default(),
            health: 1.0,
            overlay: None,
            overlay_seq: 0,
        }
    }

    /// Apply a signed health delta, clamped to `[0.0, 1.0]`.
    pub fn adjust_health(&mut self, delta: f64) -> f64 {
        self.health = (self.health + delta).clamp(0.0, 1.0);
        self.health
    }
}

/// Clamp a coordinate so the actor radius stays inside `[0, extent]`.
pub fn clamp_axis(value: f64, radius: f64, extent: f64) -> f64 {
    value.clamp(radius, extent - radius)
}

fn seed_for(id: &ActorId) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.as_str().hash(&mut hasher);
    hasher.finish()
}

#[allow(clippy::cast_precision_loss)]
fn index_to_f64(index: usize) -> f64 {
    // Join indices stay far below 2^52; the conversion is exact.
    index as f64
}
