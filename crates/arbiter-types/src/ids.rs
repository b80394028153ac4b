//! Identifier types for actors and transactions.
//!
//! Actor identifiers are opaque strings assigned by the client side of the
//! protocol; the engine never parses them. Transaction identifiers are
//! generator-assigned UUID v7 values (time-ordered), created when an offer
//! is proposed and quoted back in accept/cancel commands.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for an actor (player or NPC).
///
/// Assigned by the connecting client, treated as an ordered map key
/// everywhere in the engine. Actors are created lazily on the first
/// message referencing an unknown id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a pending offer transaction.
///
/// Generated by the engine (UUID v7, time-ordered) when an offer is
/// proposed; unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub Uuid);

impl TxId {
    /// Create a fresh transaction identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for TxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
