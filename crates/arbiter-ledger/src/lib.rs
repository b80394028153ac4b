//! Inventory ledger and reservation escrow for the Arbiter engine.
//!
//! The [`Ledger`] is the single source of truth for spendable item
//! balances; the durable store is a lagging mirror of it, never the other
//! way around. The [`Escrow`] holds bundles removed from an inventory
//! against a pending offer, guaranteeing that reserved items are invisible
//! to the owner's spendable balance and are credited exactly once on any
//! terminal transition.
//!
//! # Modules
//!
//! - [`inventory`] -- the clamping add/bulk-add/has primitives
//! - [`escrow`] -- reserve/release/consume keyed by transaction id

pub mod escrow;
pub mod inventory;

pub use escrow::{Escrow, Reservation};
pub use inventory::Ledger;
