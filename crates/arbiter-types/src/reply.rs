//! Outbound reply envelopes, reason codes, and state-delta effects.
//!
//! Every command receives exactly one [`Reply`]. Effects are the sole
//! channel through which the core requests durable-storage mutation; the
//! in-memory state is authoritative and the mirror lags behind it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bundle::DeltaMap;
use crate::command::CommandKind;
use crate::ids::{ActorId, TxId};
use crate::snapshot::WorldSnapshot;

/// Outcome status of a processed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The command was accepted and a pending offer/window was created.
    Accepted,
    /// The command completed and produced state deltas.
    Matched,
    /// The command was well-formed but disallowed by current state.
    Rejected,
    /// The command was malformed or named an unknown transaction.
    Error,
}

/// Short machine-readable reason codes for rejections and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// Malformed trade command (empty give/want).
    BadTrade,
    /// Malformed learn command (empty pay or skill).
    BadLearn,
    /// Malformed teach command (empty pay or skill).
    BadTeach,
    /// Malformed attack command.
    BadAttack,
    /// Malformed counter command.
    BadCounter,
    /// Malformed craft command (zero count).
    BadCraft,
    /// The payer does not hold the required bundle.
    Insufficient,
    /// The parties are farther apart than the proximity radius.
    NotInRange,
    /// No pending offer exists for the given transaction id.
    UnknownTransaction,
    /// The offer's time-to-live elapsed before acceptance.
    Expired,
    /// The accepting actor is not a named party of the offer.
    NotCounterparty,
    /// Only the original proposer may cancel an offer.
    NotOwner,
    /// The weapon has no attack tag and the rule table requires one.
    InvalidWeapon,
    /// The item has no defense tag and the rule table requires one.
    InvalidDefense,
    /// No recipe exists for the requested output item.
    UnknownRecipe,
    /// Recipe requirements are not met by the current inventory.
    MissingRequirements,
    /// The message did not contain a recognizable command.
    UnknownCommand,
}

/// How an attack resolved, for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatDetail {
    /// The resolved attack tag (`"none"` when untagged).
    pub attack: String,
    /// The resolved defense tag (`"none"` when undefended).
    pub defense: String,
    /// The opposition multiplier that was applied.
    pub multiplier: f64,
}

/// State deltas produced by a matched command.
///
/// Only non-empty maps are serialized. These deltas describe what already
/// happened to in-memory state and what the persistence mirror must apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Effects {
    /// Per-actor inventory deltas (item -> signed quantity).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inventory: BTreeMap<ActorId, DeltaMap>,
    /// Per-actor health deltas (negative for damage).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub health: BTreeMap<ActorId, f64>,
    /// Per-actor skill grants (skill type -> mastery level).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skills: BTreeMap<ActorId, BTreeMap<String, u32>>,
    /// Combat resolution detail, present for attack commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatDetail>,
}

impl Effects {
    /// Whether no delta of any kind is present.
    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty()
            && self.health.is_empty()
            && self.skills.is_empty()
            && self.combat.is_none()
    }

    /// Record an inventory delta set for one actor, merging with any
    /// deltas already present for that actor.
    pub fn add_inventory(&mut self, actor: &ActorId, delta: DeltaMap) {
        let entry = self.inventory.entry(actor.clone()).or_default();
        crate::bundle::merge_deltas(entry, &delta);
    }
}

/// The status reply produced for every processed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Outcome status.
    pub status: Status,
    /// The command kind this reply answers.
    pub command_kind: CommandKind,
    /// The actor whose command produced this reply.
    pub actor_id: ActorId,
    /// The offer transaction this reply concerns, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<TxId>,
    /// Reason code for rejections and errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    /// Human-readable detail for malformed payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// State deltas, present for matched commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Effects>,
}

impl Reply {
    /// An `accepted` reply carrying the new offer's transaction id.
    pub const fn accepted(kind: CommandKind, actor_id: ActorId, txid: Option<TxId>) -> Self {
        Self {
            status: Status::Accepted,
            command_kind: kind,
            actor_id,
            txid,
            reason: None,
            detail: None,
            effects: None,
        }
    }

    /// A `matched` reply carrying state-delta effects.
    pub const fn matched(
        kind: CommandKind,
        actor_id: ActorId,
        txid: Option<TxId>,
        effects: Effects,
    ) -> Self {
        Self {
            status: Status::Matched,
            command_kind: kind,
            actor_id,
            txid,
            reason: None,
            detail: None,
            effects: Some(effects),
        }
    }

    /// A `rejected` reply with a reason code.
    pub const fn rejected(
        kind: CommandKind,
        actor_id: ActorId,
        reason: Reason,
        txid: Option<TxId>,
    ) -> Self {
        Self {
            status: Status::Rejected,
            command_kind: kind,
            actor_id,
            txid,
            reason: Some(reason),
            detail: None,
            effects: None,
        }
    }

    /// An `error` reply with a reason code and optional detail.
    pub const fn error(
        kind: CommandKind,
        actor_id: ActorId,
        reason: Reason,
        detail: Option<String>,
    ) -> Self {
        Self {
            status: Status::Error,
            command_kind: kind,
            actor_id,
            txid: None,
            reason: Some(reason),
            detail,
            effects: None,
        }
    }
}

/// Any message the engine publishes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// A per-command status reply.
    CommandStatus(Reply),
    /// The periodic world-state broadcast.
    WorldSnapshot(WorldSnapshot),
}
