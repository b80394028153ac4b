//! The authoritative game-master state engine for Arbiter.
//!
//! This crate owns all shared mutable world state (positions via the
//! roster, inventories via the ledger, pending offers, defense windows)
//! and resolves structured player intents into deterministic state
//! deltas, enforcing proximity rules, replay protection, atomic escrow,
//! and time-bounded offer lifecycles. All mutation happens from a single
//! writer; the persistence mirror is a lagging, best-effort copy.
//!
//! # Modules
//!
//! - [`watermark`] -- Per (consumer, actor) sequence watermarks for replay
//!   suppression.
//! - [`offers`] -- Pending bilateral offers (trade, learn, teach) with TTL.
//! - [`combat`] -- The pure attack resolver over the combat rule table.
//! - [`defense`] -- Armed counter-defense windows with lazy expiry.
//! - [`craft`] -- All-or-nothing recipe application.
//! - [`gm`] -- The [`GameMaster`] aggregate and command dispatcher.
//! - [`mirror`] -- The async persistence-mirror channel and flush handshake.
//! - [`outbox`] -- The bounded outbound reply queue.
//! - [`config`] -- Engine configuration loaded from `arbiter-config.yaml`.
//!
//! [`GameMaster`]: gm::GameMaster

pub mod combat;
pub mod config;
pub mod craft;
pub mod defense;
pub mod gm;
pub mod mirror;
pub mod offers;
pub mod outbox;
pub mod watermark;

pub use config::{ConfigError, EngineConfig};
pub use gm::{GameMaster, Tuning, CONSUMER_CHAT, CONSUMER_COMMAND, PROXIMITY_RADIUS};
pub use mirror::{MirrorHandle, MirrorOp};
pub use offers::{Offer, OfferBook, OfferTerms, OFFER_TTL_MS};
pub use outbox::{Outbox, DRAIN_BATCH, OUTBOX_CAP};
pub use watermark::WatermarkRegistry;
