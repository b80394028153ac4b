//! Shared type definitions for the Arbiter game-master engine.
//!
//! This crate is the single source of truth for every type that crosses a
//! crate boundary in the Arbiter workspace: identifiers, asset bundles, the
//! command and reply envelopes, state-delta effects, the periodic world
//! snapshot, and the static rulebook (combat rule table + crafting recipes).
//!
//! # Modules
//!
//! - [`ids`] -- Opaque actor identifiers and generator-assigned transaction ids
//! - [`bundle`] -- Item/quantity maps and the skill-grant shape
//! - [`command`] -- Incoming message envelopes and the structured command enum
//! - [`reply`] -- Outbound status replies, reason codes, and effects
//! - [`snapshot`] -- The periodic world-state broadcast payload
//! - [`rules`] -- The immutable combat rule table and recipe book

pub mod bundle;
pub mod command;
pub mod ids;
pub mod reply;
pub mod rules;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use bundle::{Bundle, DeltaMap, SkillGrant, credit_of, debit_of, merge_deltas};
pub use command::{Command, CommandKind, Envelope, HeldKeys, Inbound, OverlayMessage};
pub use ids::{ActorId, TxId};
pub use reply::{CombatDetail, Effects, OutboundMessage, Reason, Reply, Status};
pub use rules::{CombatRules, ItemTags, OppositionRow, Recipe, Rulebook, RulesError, TagRequirements};
pub use snapshot::{ActorSnapshot, MapBounds, OverlaySnapshot, WorldSnapshot};
