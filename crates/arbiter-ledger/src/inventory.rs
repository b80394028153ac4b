//! The inventory ledger: actor -> item -> quantity.
//!
//! Quantity mutation goes through a single clamping primitive: [`Ledger::add`]
//! accepts signed deltas and clamps the result to a minimum of zero. The
//! primitive itself never fails, so callers that need strict atomicity must
//! pre-check sufficiency with [`Ledger::has`] -- inside the single-writer
//! discipline that check-then-mutate pair is one uninterrupted step.
//! Quantity-zero entries are pruned to keep balance maps tidy.

use std::collections::BTreeMap;

use arbiter_types::{ActorId, Bundle, DeltaMap};

/// In-memory item balances for all actors.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: BTreeMap<ActorId, Bundle>,
}

impl Ledger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            balances: BTreeMap::new(),
        }
    }

    /// The spendable quantity of `item` held by `actor`.
    pub fn quantity(&self, actor: &ActorId, item: &str) -> u32 {
        self.balances
            .get(actor)
            .and_then(|inv| inv.get(item))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `actor` holds at least the requested quantity of every
    /// item in `bundle`. Zero-quantity requests are trivially satisfied.
    pub fn has(&self, actor: &ActorId, bundle: &Bundle) -> bool {
        bundle
            .iter()
            .all(|(item, qty)| self.quantity(actor, item) >= *qty)
    }

    /// Apply a signed delta to one item, clamping the result at zero.
    ///
    /// Used for both credits (positive delta) and debits (negative delta,
    /// with the caller responsible for having verified sufficiency when
    /// strictness matters).
    pub fn add(&mut self, actor: &ActorId, item: &str, delta: i64) {
        let inv = self.balances.entry(actor.clone()).or_default();
        let current = i64::from(inv.get(item).copied().unwrap_or(0));
        let next = current.saturating_add(delta).max(0);
        let next = u32::try_from(next).unwrap_or(u32::MAX);
        if next == 0 {
            inv.remove(item);
        } else {
            inv.insert(item.to_owned(), next);
        }
    }

    /// Apply a set of signed deltas to one actor's balances.
    pub fn bulk_add(&mut self, actor: &ActorId, deltas: &DeltaMap) {
        for (item, delta) in deltas {
            self.add(actor, item, *delta);
        }
    }

    /// Credit every item in `bundle` to `actor`.
    pub fn credit_bundle(&mut self, actor: &ActorId, bundle: &Bundle) {
        for (item, qty) in bundle {
            self.add(actor, item, i64::from(*qty));
        }
    }

    /// Debit every item in `bundle` from `actor`, clamping at zero.
    ///
    /// Callers needing all-or-nothing semantics must pre-check with
    /// [`Ledger::has`].
    pub fn debit_bundle(&mut self, actor: &ActorId, bundle: &Bundle) {
        for (item, qty) in bundle {
            self.add(actor, item, -i64::from(*qty));
        }
    }

    /// Seed an actor's balances from a starting bundle.
    pub fn seed(&mut self, actor: &ActorId, bundle: &Bundle) {
        self.credit_bundle(actor, bundle);
    }

    /// A snapshot view of one actor's balances (empty when unknown).
    pub fn balances(&self, actor: &ActorId) -> Bundle {
        self.balances.get(actor).cloned().unwrap_or_default()
    }
}
