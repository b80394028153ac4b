//! The single-writer runtime loop.
//!
//! One task owns the [`GameMaster`] and everything that mutates it: all
//! inbound messages, the fixed-timestep simulation poll, and the
//! broadcast tick are multiplexed through one `select!` loop, so no
//! state is shared and no locks exist. Outbound messages leave through
//! a bounded in-memory outbox drained a fixed batch at a time on each
//! broadcast tick.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use arbiter_core::{GameMaster, Outbox};
use arbiter_types::{ActorId, CommandKind, Inbound, OutboundMessage, Reason, Reply};
use arbiter_world::Integrator;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// One unit of work entering the single-writer loop.
#[derive(Debug)]
pub enum Inlet {
    /// A well-formed inbound message.
    Message(Inbound),
    /// A payload that named an actor but carried no recognizable
    /// message shape. Answered with an `error` reply.
    Malformed {
        /// The actor the payload named.
        actor_id: ActorId,
        /// What the parser objected to.
        detail: String,
    },
}

/// Loop timing and outbox sizing, lifted from the runtime config.
#[derive(Debug, Clone, Copy)]
pub struct LoopTuning {
    /// Broadcast and drain cadence, milliseconds.
    pub broadcast_interval_ms: u64,
    /// Simulation poll cadence, milliseconds.
    pub sim_poll_ms: u64,
    /// Outbox capacity before overflow drops.
    pub outbox_cap: usize,
    /// Messages drained per broadcast tick.
    pub outbox_batch: usize,
}

/// Milliseconds since the Unix epoch, saturating.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Run the single-writer loop until the inlet channel closes.
///
/// Inbound messages are processed as they arrive. Every `sim_poll_ms`
/// the integrator drains whole physics steps from accumulated wall
/// time. Every `broadcast_interval_ms` expired offers are swept, one
/// world snapshot is enqueued, and up to `outbox_batch` outbound
/// messages are handed to the writer task.
pub async fn run(
    mut gm: GameMaster,
    tuning: LoopTuning,
    mut inlet_rx: mpsc::UnboundedReceiver<Inlet>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
) {
    let mut integrator = Integrator::new();
    let mut outbox = Outbox::new(tuning.outbox_cap);

    let mut sim_tick = time::interval(Duration::from_millis(tuning.sim_poll_ms.max(1)));
    sim_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut broadcast_tick =
        time::interval(Duration::from_millis(tuning.broadcast_interval_ms.max(1)));
    broadcast_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_sim = Instant::now();

    loop {
        tokio::select! {
            inlet = inlet_rx.recv() => {
                let Some(inlet) = inlet else {
                    info!("inlet channel closed, runtime loop stopping");
                    break;
                };
                if let Some(reply) = handle_inlet(&mut gm, inlet) {
                    outbox.push(OutboundMessage::CommandStatus(reply));
                }
            }
            _ = sim_tick.tick() => {
                let elapsed_ms = last_sim.elapsed().as_secs_f64() * 1000.0;
                last_sim = Instant::now();
                let steps = integrator.advance(gm.roster_mut(), elapsed_ms);
                if steps > 1 {
                    debug!(steps, "simulation poll drained multiple steps");
                }
            }
            _ = broadcast_tick.tick() => {
                let now = now_ms();
                gm.sweep_expired(now);
                outbox.push(OutboundMessage::WorldSnapshot(gm.snapshot(now)));
                for message in outbox.drain_batch(tuning.outbox_batch) {
                    if outbound_tx.send(message).is_err() {
                        info!("outbound channel closed, runtime loop stopping");
                        return;
                    }
                }
            }
        }
    }

    // Drain whatever replies are still queued before shutting down.
    while !outbox.is_empty() {
        for message in outbox.drain_batch(tuning.outbox_batch) {
            if outbound_tx.send(message).is_err() {
                return;
            }
        }
    }
}

/// Apply one inlet to the game master, producing at most one reply.
fn handle_inlet(gm: &mut GameMaster, inlet: Inlet) -> Option<Reply> {
    match inlet {
        Inlet::Message(Inbound::Movement { actor_id, keys }) => {
            gm.handle_movement(&actor_id, keys);
            None
        }
        Inlet::Message(Inbound::Overlay(overlay)) => gm.handle_overlay(&overlay, now_ms()),
        Inlet::Message(Inbound::Command(envelope)) => gm.process_envelope(&envelope, now_ms()),
        Inlet::Malformed { actor_id, detail } => Some(Reply::error(
            CommandKind::Unknown,
            actor_id,
            Reason::UnknownCommand,
            Some(detail),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arbiter_core::{MirrorHandle, Tuning, mirror};
    use arbiter_types::{Command, Envelope, HeldKeys, Rulebook, Status};

    use super::*;

    fn game_master() -> GameMaster {
        let (mirror, rx) = MirrorHandle::channel();
        tokio::spawn(mirror::run_discard(rx));
        GameMaster::new(
            Rulebook::default(),
            arbiter_types::MapBounds::default(),
            Tuning::default(),
            mirror,
        )
    }

    #[tokio::test]
    async fn malformed_inlet_yields_an_unknown_command_error() {
        let mut gm = game_master();
        let reply = handle_inlet(
            &mut gm,
            Inlet::Malformed {
                actor_id: ActorId::from("alice"),
                detail: "no recognizable shape".to_owned(),
            },
        )
        .unwrap();
        assert_eq!(reply.status, Status::Error);
        assert_eq!(reply.command_kind, CommandKind::Unknown);
        assert_eq!(reply.reason, Some(Reason::UnknownCommand));
    }

    #[tokio::test]
    async fn movement_inlet_produces_no_reply() {
        let mut gm = game_master();
        let reply = handle_inlet(
            &mut gm,
            Inlet::Message(Inbound::Movement {
                actor_id: ActorId::from("alice"),
                keys: HeldKeys {
                    w: true,
                    ..HeldKeys::default()
                },
            }),
        );
        assert!(reply.is_none());
        assert!(gm.roster().get(&ActorId::from("alice")).is_some());
    }

    #[tokio::test]
    async fn command_envelope_inlet_is_dispatched_and_replay_dropped() {
        let mut gm = game_master();
        let envelope = Envelope {
            actor_id: ActorId::from("alice"),
            seq: 1,
            command: Command::Craft {
                item: "plank".to_owned(),
                count: None,
            },
        };

        let reply = handle_inlet(&mut gm, Inlet::Message(Inbound::Command(envelope.clone())))
            .unwrap();
        assert_eq!(reply.command_kind, CommandKind::Craft);

        // Same sequence number again: below the watermark, no reply.
        let replay = handle_inlet(&mut gm, Inlet::Message(Inbound::Command(envelope)));
        assert!(replay.is_none());
    }

    #[tokio::test]
    async fn run_broadcasts_snapshots_and_stops_on_inlet_close() {
        let gm = game_master();
        let (inlet_tx, inlet_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let tuning = LoopTuning {
            broadcast_interval_ms: 1,
            sim_poll_ms: 1,
            outbox_cap: 16,
            outbox_batch: 8,
        };
        let handle = tokio::spawn(run(gm, tuning, inlet_rx, outbound_tx));

        let first = outbound_rx.recv().await.unwrap();
        assert!(matches!(first, OutboundMessage::WorldSnapshot(_)));

        drop(inlet_tx);
        handle.await.unwrap();
    }
}
