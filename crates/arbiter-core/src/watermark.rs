//! Replay suppression via per (consumer, actor) sequence watermarks.
//!
//! Each logical consumer keeps its own watermark line per actor, so two
//! subsystems can independently deduplicate the same incoming sequence
//! stream. A message whose declared sequence is at or below the stored
//! watermark is an already-seen duplicate and must be dropped without
//! side effects. Integer overflow of sequence numbers is an accepted
//! boundary: sequences are u64 and never wrap in practice.

use std::collections::BTreeMap;

use arbiter_types::ActorId;
use tracing::trace;

/// Per (consumer, actor) last-accepted sequence numbers.
#[derive(Debug, Clone, Default)]
pub struct WatermarkRegistry {
    lines: BTreeMap<String, BTreeMap<ActorId, u64>>,
}

impl WatermarkRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            lines: BTreeMap::new(),
        }
    }

    /// Gate `seq` against the watermark for (`consumer`, `actor`).
    ///
    /// Returns `false` and changes nothing when `seq` is at or below
    /// the stored watermark; otherwise advances the watermark to `seq`
    /// and returns `true`.
    pub fn accept(&mut self, consumer: &str, actor: &ActorId, seq: u64) -> bool {
        let line = self.lines.entry(consumer.to_owned()).or_default();
        match line.get(actor) {
            Some(mark) if seq <= *mark => {
                trace!(consumer, actor = %actor, seq, mark, "duplicate sequence dropped");
                false
            }
            _ => {
                line.insert(actor.clone(), seq);
                true
            }
        }
    }

    /// The last-accepted sequence for (`consumer`, `actor`), if any.
    pub fn last_seen(&self, consumer: &str, actor: &ActorId) -> Option<u64> {
        self.lines.get(consumer)?.get(actor).copied()
    }
}
