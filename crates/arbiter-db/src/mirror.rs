//! The mirror writer task: applies [`MirrorOp`]s to `PostgreSQL`.
//!
//! Writes are best-effort: a failed write is logged and skipped, and the
//! already-applied in-memory effect is not rolled back. In-memory state
//! is therefore always ahead of or equal to the durable copy, never
//! behind.

use arbiter_core::MirrorOp;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::postgres::PostgresPool;
use crate::store::ActorStore;

/// Consume mirror ops until the channel closes, applying each to the
/// database and acknowledging flushes.
pub async fn run_mirror(pool: PostgresPool, mut rx: UnboundedReceiver<MirrorOp>) {
    let store = ActorStore::new(pool.pool());
    while let Some(op) = rx.recv().await {
        match op {
            MirrorOp::UpsertActor { id, kind, x, y } => {
                if let Err(error) = store.upsert_actor(&id, &kind, x, y).await {
                    warn!(actor = %id, %error, "mirror upsert failed; continuing");
                }
            }
            MirrorOp::AdjustInventory { id, deltas } => {
                if let Err(error) = store.adjust_inventory_bulk(&id, &deltas).await {
                    warn!(actor = %id, %error, "mirror inventory write failed; continuing");
                }
            }
            MirrorOp::AdjustHealth { id, delta } => {
                if let Err(error) = store.adjust_health(&id, delta).await {
                    warn!(actor = %id, %error, "mirror health write failed; continuing");
                }
            }
            MirrorOp::SetSkillMastery { id, skill, mastery } => {
                if let Err(error) = store.set_skill_mastery(&id, &skill, mastery).await {
                    warn!(actor = %id, %error, "mirror skill write failed; continuing");
                }
            }
            MirrorOp::Flush(ack) => {
                // Ops are applied in channel order; reaching the marker
                // means everything before it is done.
                let _ = ack.send(());
            }
        }
    }
    debug!("mirror channel closed; writer exiting");
}
