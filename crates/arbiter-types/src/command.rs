//! Incoming message envelopes and the structured command enum.
//!
//! All commands arrive as externally tagged JSON (`"kind"` field,
//! kebab-case). Unknown kinds fail deserialization and are rejected
//! centrally by the dispatcher; field-shape validation is done by serde so
//! handlers only see well-formed commands. Semantic validation (empty
//! bundles, self-trades, etc.) stays in the handlers.

use serde::{Deserialize, Serialize};

use crate::bundle::{Bundle, SkillGrant};
use crate::ids::{ActorId, TxId};

/// One structured command from one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Command {
    /// Propose a bilateral trade: reserve `give`, ask the counterparty
    /// for `want`.
    MakeTrade {
        /// The counterparty actor.
        to: ActorId,
        /// Items offered by the proposer (reserved on propose).
        give: Bundle,
        /// Items wanted from the counterparty.
        want: Bundle,
    },
    /// Propose to learn a skill from `to`, paying `pay` (reserved from
    /// the proposer).
    MakeLearn {
        /// The teaching actor.
        to: ActorId,
        /// The skill requested.
        skill: SkillGrant,
        /// Payment offered by the learner (the proposer).
        pay: Bundle,
    },
    /// Propose to teach a skill to `to`, who pays `pay` (reserved from
    /// the counterparty).
    MakeTeach {
        /// The learning actor.
        to: ActorId,
        /// The skill offered.
        skill: SkillGrant,
        /// Payment asked of the learner (the counterparty).
        pay: Bundle,
    },
    /// Accept a pending offer by transaction id.
    Accept {
        /// The transaction to commit.
        txid: TxId,
    },
    /// Cancel a pending offer (proposer only).
    Cancel {
        /// The transaction to cancel.
        txid: TxId,
    },
    /// Attack a target with a weapon item.
    Attack {
        /// The defending actor.
        target: ActorId,
        /// The weapon item name.
        #[serde(rename = "with")]
        weapon: String,
    },
    /// Arm a short counter-defense window with a defensive item.
    ///
    /// The target hint is accepted for symmetry with attack commands but
    /// does not gate arming -- counters are self-targeted.
    Counter {
        /// Hint naming the expected attacker; not used for arming.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ActorId>,
        /// The defensive item name.
        #[serde(rename = "with")]
        item: String,
    },
    /// Craft an item from its recipe.
    Craft {
        /// The output item to craft.
        item: String,
        /// How many to craft; absent means "as many as possible".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },
}

impl Command {
    /// The wire name of this command's kind, as echoed in replies.
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::MakeTrade { .. } => CommandKind::MakeTrade,
            Self::MakeLearn { .. } => CommandKind::MakeLearn,
            Self::MakeTeach { .. } => CommandKind::MakeTeach,
            Self::Accept { .. } => CommandKind::Accept,
            Self::Cancel { .. } => CommandKind::Cancel,
            Self::Attack { .. } => CommandKind::Attack,
            Self::Counter { .. } => CommandKind::Counter,
            Self::Craft { .. } => CommandKind::Craft,
        }
    }
}

/// The command kind discriminant, echoed verbatim in every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    /// `make-trade`
    MakeTrade,
    /// `make-learn`
    MakeLearn,
    /// `make-teach`
    MakeTeach,
    /// `accept`
    Accept,
    /// `cancel`
    Cancel,
    /// `attack`
    Attack,
    /// `counter`
    Counter,
    /// `craft`
    Craft,
    /// Placeholder kind for messages that never reached a valid command
    /// variant (malformed payloads).
    Unknown,
}

/// The command envelope: one command from one actor, sequence-numbered
/// for replay suppression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The acting actor.
    pub actor_id: ActorId,
    /// Declared sequence number, gated by the watermark registry.
    pub seq: u64,
    /// The structured command.
    pub command: Command,
}

/// Held movement keys for one actor, as reported each input tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldKeys {
    /// Up (north) held.
    #[serde(default)]
    pub w: bool,
    /// Left (west) held.
    #[serde(default)]
    pub a: bool,
    /// Down (south) held.
    #[serde(default)]
    pub s: bool,
    /// Right (east) held.
    #[serde(default)]
    pub d: bool,
}

/// An overlay message: ephemeral chat and/or a structured command.
///
/// One overlay payload is examined by two independent watermark
/// consumers -- the chat fold and the command dispatch -- each keeping
/// its own per-actor sequence line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayMessage {
    /// The sending actor.
    pub actor_id: ActorId,
    /// Declared sequence number for this overlay stream.
    pub seq: u64,
    /// Ephemeral chat text to display over the actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<String>,
    /// Display time-to-live for the chat overlay, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
    /// A structured command to dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
}

/// Any inbound message accepted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Inbound {
    /// Per-tick held-key state for one actor. Not sequence-gated: the
    /// latest arrival wins.
    Movement {
        /// The moving actor.
        actor_id: ActorId,
        /// Currently held movement keys.
        keys: HeldKeys,
    },
    /// Chat and/or command overlay, sequence-gated per consumer.
    Overlay(OverlayMessage),
    /// A bare command envelope, sequence-gated on the command line.
    Command(Envelope),
}
