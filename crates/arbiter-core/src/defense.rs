//! Armed counter-defense windows.
//!
//! Arming a counter records {item, expiry} for the acting actor. The
//! window is consulted only when an incoming attack resolves against
//! that actor; expired windows are treated as absent (lazy expiry, no
//! background timers).

use std::collections::BTreeMap;

use arbiter_types::ActorId;
use tracing::debug;

/// Default duration of an armed defense window, in milliseconds.
pub const DEFENSE_WINDOW_MS: u64 = 1_000;

/// One armed counter-defense record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefenseWindow {
    /// The defensive item armed.
    pub item: String,
    /// Wall-clock expiry, epoch milliseconds.
    pub expires_at_ms: u64,
}

/// Per-actor armed defense windows.
#[derive(Debug, Clone, Default)]
pub struct DefenseWindows {
    windows: BTreeMap<ActorId, DefenseWindow>,
}

impl DefenseWindows {
    /// Create an empty window table.
    pub const fn new() -> Self {
        Self {
            windows: BTreeMap::new(),
        }
    }

    /// Arm a defense window for `actor`, replacing any previous one.
    pub fn arm(&mut self, actor: &ActorId, item: &str, now_ms: u64, window_ms: u64) {
        debug!(actor = %actor, item, window_ms, "counter-defense armed");
        self.windows.insert(
            actor.clone(),
            DefenseWindow {
                item: item.to_owned(),
                expires_at_ms: now_ms.saturating_add(window_ms),
            },
        );
    }

    /// The item armed by `actor`, when the window is still open.
    ///
    /// An expired window is removed and reported as absent.
    pub fn active_item(&mut self, actor: &ActorId, now_ms: u64) -> Option<String> {
        match self.windows.get(actor) {
            Some(window) if now_ms <= window.expires_at_ms => Some(window.item.clone()),
            Some(_) => {
                self.windows.remove(actor);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bob() -> ActorId {
        ActorId::from("bob")
    }

    #[test]
    fn armed_window_exposes_item_until_expiry() {
        let mut windows = DefenseWindows::new();
        windows.arm(&bob(), "plate_iron", 1_000, DEFENSE_WINDOW_MS);

        assert_eq!(windows.active_item(&bob(), 1_500).as_deref(), Some("plate_iron"));
        assert_eq!(windows.active_item(&bob(), 2_000).as_deref(), Some("plate_iron"));
        assert!(windows.active_item(&bob(), 2_001).is_none());
    }

    #[test]
    fn expired_window_stays_absent() {
        let mut windows = DefenseWindows::new();
        windows.arm(&bob(), "plate_iron", 0, DEFENSE_WINDOW_MS);
        assert!(windows.active_item(&bob(), 5_000).is_none());
        // Removed on first expired lookup, still absent afterwards.
        assert!(windows.active_item(&bob(), 500).is_none());
    }

    #[test]
    fn rearming_replaces_the_window() {
        let mut windows = DefenseWindows::new();
        windows.arm(&bob(), "plate_iron", 0, DEFENSE_WINDOW_MS);
        windows.arm(&bob(), "buckler", 900, DEFENSE_WINDOW_MS);
        assert_eq!(windows.active_item(&bob(), 1_500).as_deref(), Some("buckler"));
    }

    #[test]
    fn unknown_actor_has_no_window() {
        let mut windows = DefenseWindows::new();
        assert!(windows.active_item(&bob(), 0).is_none());
    }
}
