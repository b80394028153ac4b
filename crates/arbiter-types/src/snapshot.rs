//! The periodic world-state broadcast payload.
//!
//! Snapshots carry everything a client needs to render the world: map
//! bounds, actor positions with inventory views, and unexpired chat
//! overlays with their per-actor sequence numbers.

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;
use crate::ids::ActorId;

/// Map dimensions and the actor collision radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    /// Map width in distance units.
    pub width: f64,
    /// Map height in distance units.
    pub height: f64,
    /// Actor radius; positions are clamped to stay this far from edges.
    pub actor_radius: f64,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            width: 10_000.0,
            height: 8_000.0,
            actor_radius: 10.0,
        }
    }
}

/// One actor's position and inventory view in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    /// The actor's identifier.
    pub id: ActorId,
    /// Position, x coordinate.
    pub x: f64,
    /// Position, y coordinate.
    pub y: f64,
    /// Spendable inventory (reserved items excluded).
    pub inventory: Bundle,
}

/// An unexpired chat overlay attached to an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    /// The actor displaying the overlay.
    pub actor_id: ActorId,
    /// The sanitized chat text.
    pub chat: String,
    /// Per-actor monotonically increasing overlay sequence number.
    pub overlay_sequence: u64,
}

/// The periodic world-state broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Wall-clock timestamp of the snapshot, epoch milliseconds.
    pub timestamp_ms: u64,
    /// Map bounds.
    pub bounds: MapBounds,
    /// All known actors.
    pub actors: Vec<ActorSnapshot>,
    /// All unexpired overlays.
    pub overlays: Vec<OverlaySnapshot>,
}
