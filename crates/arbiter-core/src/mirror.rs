//! The async persistence-mirror channel.
//!
//! In-memory state is authoritative; the mirror is a lagging, best-effort
//! copy. The game master emits [`MirrorOp`]s over an unbounded channel and
//! never waits on them, so persistence writes cannot block the
//! command-processing or simulation step. Tests (and shutdown) can await
//! mirror completion with [`MirrorHandle::flush`], which round-trips a
//! one-shot acknowledgement through the writer task.

use arbiter_types::{ActorId, DeltaMap};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// One durable-storage mutation requested by the game master.
#[derive(Debug)]
pub enum MirrorOp {
    /// Create or update an actor row with its kind and position.
    UpsertActor {
        /// The actor to upsert.
        id: ActorId,
        /// Actor kind, e.g. `"player"`.
        kind: String,
        /// Position, x coordinate.
        x: f64,
        /// Position, y coordinate.
        y: f64,
    },
    /// Apply signed inventory deltas for one actor.
    AdjustInventory {
        /// The actor whose inventory changes.
        id: ActorId,
        /// Item -> signed quantity delta.
        deltas: DeltaMap,
    },
    /// Apply a signed health delta for one actor.
    AdjustHealth {
        /// The actor whose health changes.
        id: ActorId,
        /// Signed health delta (negative for damage).
        delta: f64,
    },
    /// Record a skill mastery level for one actor.
    SetSkillMastery {
        /// The learning actor.
        id: ActorId,
        /// The skill type.
        skill: String,
        /// The mastery level granted.
        mastery: u32,
    },
    /// Acknowledge once every previously sent op has been applied.
    Flush(oneshot::Sender<()>),
}

/// Sending side of the mirror channel.
#[derive(Debug, Clone)]
pub struct MirrorHandle {
    tx: mpsc::UnboundedSender<MirrorOp>,
}

impl MirrorHandle {
    /// Create a handle and the receiver a writer task consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MirrorOp>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Send one mirror op, fire-and-forget.
    ///
    /// A closed channel means the writer task is gone; the write is
    /// dropped with a warning, matching the best-effort contract.
    pub fn send(&self, op: MirrorOp) {
        if self.tx.send(op).is_err() {
            warn!("mirror channel closed; dropping persistence write");
        }
    }

    /// Wait until every op sent before this call has been applied.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(MirrorOp::Flush(ack_tx));
        // A dropped ack means the writer is gone; nothing left to wait on.
        let _ = ack_rx.await;
    }
}

/// Consume and discard mirror ops, acknowledging flushes.
///
/// Used when the engine runs without a persistence backend.
pub async fn run_discard(mut rx: mpsc::UnboundedReceiver<MirrorOp>) {
    while let Some(op) = rx.recv().await {
        if let MirrorOp::Flush(ack) = op {
            let _ = ack.send(());
        }
    }
}
