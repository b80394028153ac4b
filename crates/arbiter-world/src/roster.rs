//! The actor roster: lazy creation, chat overlays, and proximity math.
//!
//! The roster is owned by the game-master aggregate and mutated only from
//! the single-writer loop. Actors are created on first reference from any
//! message; an unknown actor in a distance query yields an infinite
//! distance so range checks fail closed.

use std::collections::BTreeMap;

use tracing::info;

use arbiter_types::{ActorId, HeldKeys, MapBounds, OverlaySnapshot};

use crate::actor::{Actor, Overlay};

/// Default display time-to-live for a chat overlay, in milliseconds.
pub const DEFAULT_OVERLAY_TTL_MS: u64 = 1500;

/// Maximum chat length before truncation.
const MAX_CHAT_LEN: usize = 160;

/// All known actors plus the map bounds they move within.
#[derive(Debug, Clone)]
pub struct Roster {
    actors: BTreeMap<ActorId, Actor>,
    bounds: MapBounds,
}

impl Roster {
    /// Create an empty roster for the given map bounds.
    pub const fn new(bounds: MapBounds) -> Self {
        Self {
            actors: BTreeMap::new(),
            bounds,
        }
    }

    /// The map bounds actors move within.
    pub const fn bounds(&self) -> &MapBounds {
        &self.bounds
    }

    /// Whether the roster already knows this actor.
    pub fn contains(&self, id: &ActorId) -> bool {
        self.actors.contains_key(id)
    }

    /// Look up an actor.
    pub fn get(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    /// Look up an actor mutably.
    pub fn get_mut(&mut self, id: &ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    /// Get the actor, spawning it lazily on first reference.
    ///
    /// Returns `true` in the second tuple slot when the actor was just
    /// created, so the caller can seed inventory and mirror the upsert.
    pub fn ensure(&mut self, id: &ActorId) -> (&mut Actor, bool) {
        let created = if self.actors.contains_key(id) {
            false
        } else {
            let index = self.actors.len();
            let actor = Actor::spawn(id.clone(), index, &self.bounds);
            info!(actor = %id, x = actor.x, y = actor.y, "actor joined");
            self.actors.insert(id.clone(), actor);
            true
        };
        // The entry is guaranteed present; fall back to a fresh spawn to
        // keep this total without panicking paths.
        let actor = self
            .actors
            .entry(id.clone())
            .or_insert_with(|| Actor::spawn(id.clone(), 0, &self.bounds));
        (actor, created)
    }

    /// Replace an actor's held movement keys.
    pub fn set_keys(&mut self, id: &ActorId, keys: HeldKeys) {
        if let Some(actor) = self.actors.get_mut(id) {
            actor.keys = keys;
        }
    }

    /// Attach a chat overlay to an actor, bumping its overlay sequence.
    ///
    /// Chat is sanitized: trimmed, dropped when empty, truncated at 160
    /// characters with an ellipsis. Returns the new sequence number when
    /// an overlay was set.
    pub fn set_overlay(
        &mut self,
        id: &ActorId,
        chat: &str,
        ttl_ms: Option<u64>,
        now_ms: u64,
    ) -> Option<u64> {
        let chat = sanitize_chat(chat)?;
        let actor = self.actors.get_mut(id)?;
        actor.overlay_seq = actor.overlay_seq.saturating_add(1);
        let ttl = ttl_ms.unwrap_or(DEFAULT_OVERLAY_TTL_MS);
        actor.overlay = Some(Overlay {
            chat,
            expires_at_ms: now_ms.saturating_add(ttl),
            seq: actor.overlay_seq,
        });
        Some(actor.overlay_seq)
    }

    /// Collect unexpired overlays, clearing expired ones (lazy expiry).
    pub fn collect_overlays(&mut self, now_ms: u64) -> Vec<OverlaySnapshot> {
        let mut out = Vec::new();
        for actor in self.actors.values_mut() {
            match &actor.overlay {
                Some(overlay) if overlay.expires_at_ms > now_ms => {
                    out.push(OverlaySnapshot {
                        actor_id: actor.id.clone(),
                        chat: overlay.chat.clone(),
                        overlay_sequence: overlay.seq,
                    });
                }
                Some(_) => actor.overlay = None,
                None => {}
            }
        }
        out
    }

    /// Euclidean distance between two actors; infinite when either is
    /// unknown, so range checks fail closed.
    pub fn distance(&self, a: &ActorId, b: &ActorId) -> f64 {
        match (self.actors.get(a), self.actors.get(b)) {
            (Some(actor_a), Some(actor_b)) => {
                (actor_a.x - actor_b.x).hypot(actor_a.y - actor_b.y)
            }
            _ => f64::INFINITY,
        }
    }

    /// Whether two actors are within `radius` distance units.
    pub fn in_range(&self, a: &ActorId, b: &ActorId, radius: f64) -> bool {
        self.distance(a, b) <= radius
    }

    /// Iterate all actors in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Number of known actors.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether no actors are known.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Trim, drop empty, and truncate chat text at the display limit.
fn sanitize_chat(chat: &str) -> Option<String> {
    let trimmed = chat.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() > MAX_CHAT_LEN {
        let cut: String = trimmed.chars().take(MAX_CHAT_LEN.saturating_sub(1)).collect();
        Some(format!("{cut}\u{2026}"))
    } else {
        Some(trimmed.to_owned())
    }
}
