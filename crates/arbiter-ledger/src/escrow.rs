//! Reservation escrow: bundles held out of an inventory against a
//! pending offer.
//!
//! A reservation moves items out of the owner's spendable balance the
//! moment an offer is proposed. Every reservation ends in exactly one of
//! two ways: released back to its owner (cancel/expire) or consumed to a
//! destination (commit). The escrow never credits a bundle twice and
//! never drops one silently.

use std::collections::BTreeMap;

use arbiter_types::{ActorId, Bundle, TxId};
use tracing::debug;

use crate::inventory::Ledger;

/// A bundle held in escrow for one pending offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// The actor whose inventory the bundle was debited from.
    pub owner: ActorId,
    /// The reserved items.
    pub bundle: Bundle,
}

/// The escrow bucket, keyed by offer transaction id.
#[derive(Debug, Clone, Default)]
pub struct Escrow {
    reservations: BTreeMap<TxId, Reservation>,
}

impl Escrow {
    /// Create an empty escrow bucket.
    pub const fn new() -> Self {
        Self {
            reservations: BTreeMap::new(),
        }
    }

    /// Move `bundle` from `owner`'s ledger balance into escrow under
    /// `txid`. Returns `false` (and changes nothing) when the owner does
    /// not hold the full bundle.
    pub fn reserve(
        &mut self,
        ledger: &mut Ledger,
        owner: &ActorId,
        txid: TxId,
        bundle: &Bundle,
    ) -> bool {
        if !ledger.has(owner, bundle) {
            return false;
        }
        ledger.debit_bundle(owner, bundle);
        self.reservations.insert(
            txid,
            Reservation {
                owner: owner.clone(),
                bundle: bundle.clone(),
            },
        );
        true
    }

    /// Return the reservation under `txid` to its owner's ledger balance.
    ///
    /// A no-op returning `None` when no reservation exists (already
    /// released or consumed). The released reservation is returned so the
    /// caller can mirror the credit.
    pub fn release(&mut self, ledger: &mut Ledger, txid: TxId) -> Option<Reservation> {
        let reservation = self.reservations.remove(&txid)?;
        debug!(%txid, owner = %reservation.owner, "releasing reservation");
        ledger.credit_bundle(&reservation.owner, &reservation.bundle);
        Some(reservation)
    }

    /// Finalize the reservation under `txid`, crediting the bundle to
    /// `grant_to` (or burning it when `None`). Returns the consumed
    /// reservation for effect reporting.
    pub fn consume(
        &mut self,
        ledger: &mut Ledger,
        txid: TxId,
        grant_to: Option<&ActorId>,
    ) -> Option<Reservation> {
        let reservation = self.reservations.remove(&txid)?;
        if let Some(destination) = grant_to {
            debug!(%txid, to = %destination, "consuming reservation");
            ledger.credit_bundle(destination, &reservation.bundle);
        }
        Some(reservation)
    }

    /// The reservation pending under `txid`, if any.
    pub fn get(&self, txid: TxId) -> Option<&Reservation> {
        self.reservations.get(&txid)
    }

    /// Number of outstanding reservations.
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    /// Whether no reservations are outstanding.
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn alice() -> ActorId {
        ActorId::from("alice")
    }

    fn bob() -> ActorId {
        ActorId::from("bob")
    }

    fn wood(n: u32) -> Bundle {
        Bundle::from([("wood".to_owned(), n)])
    }

    #[test]
    fn reserve_debits_spendable_balance() {
        let mut ledger = Ledger::new();
        let mut escrow = Escrow::new();
        ledger.add(&alice(), "wood", 3);

        assert!(escrow.reserve(&mut ledger, &alice(), TxId::new(), &wood(2)));
        assert_eq!(ledger.quantity(&alice(), "wood"), 1);
        assert_eq!(escrow.len(), 1);
    }

    #[test]
    fn reserve_fails_without_sufficiency() {
        let mut ledger = Ledger::new();
        let mut escrow = Escrow::new();
        ledger.add(&alice(), "wood", 1);

        assert!(!escrow.reserve(&mut ledger, &alice(), TxId::new(), &wood(2)));
        assert_eq!(ledger.quantity(&alice(), "wood"), 1);
        assert!(escrow.is_empty());
    }

    #[test]
    fn release_restores_owner_exactly() {
        let mut ledger = Ledger::new();
        let mut escrow = Escrow::new();
        ledger.add(&alice(), "wood", 3);

        let txid = TxId::new();
        assert!(escrow.reserve(&mut ledger, &alice(), txid, &wood(2)));
        escrow.release(&mut ledger, txid);

        assert_eq!(ledger.quantity(&alice(), "wood"), 3);
        assert!(escrow.is_empty());
    }

    #[test]
    fn reserve_then_release_conserves_balance() {
        // Conservation: any reserve/release sequence with no commit
        // leaves per-item quantities unchanged.
        let mut ledger = Ledger::new();
        let mut escrow = Escrow::new();
        ledger.add(&alice(), "wood", 5);
        ledger.add(&alice(), "rock", 2);

        for _ in 0..4 {
            let txid = TxId::new();
            let bundle = Bundle::from([("wood".to_owned(), 3), ("rock".to_owned(), 1)]);
            assert!(escrow.reserve(&mut ledger, &alice(), txid, &bundle));
            escrow.release(&mut ledger, txid);
        }

        assert_eq!(ledger.quantity(&alice(), "wood"), 5);
        assert_eq!(ledger.quantity(&alice(), "rock"), 2);
    }

    #[test]
    fn consume_credits_destination_once() {
        let mut ledger = Ledger::new();
        let mut escrow = Escrow::new();
        ledger.add(&alice(), "wood", 2);

        let txid = TxId::new();
        assert!(escrow.reserve(&mut ledger, &alice(), txid, &wood(2)));
        let consumed = escrow.consume(&mut ledger, txid, Some(&bob()));
        assert!(consumed.is_some());

        assert_eq!(ledger.quantity(&alice(), "wood"), 0);
        assert_eq!(ledger.quantity(&bob(), "wood"), 2);

        // Second consume is a no-op: credited exactly once, never twice.
        assert!(escrow.consume(&mut ledger, txid, Some(&bob())).is_none());
        assert_eq!(ledger.quantity(&bob(), "wood"), 2);
    }

    #[test]
    fn consume_without_destination_burns() {
        let mut ledger = Ledger::new();
        let mut escrow = Escrow::new();
        ledger.add(&alice(), "wood", 2);

        let txid = TxId::new();
        assert!(escrow.reserve(&mut ledger, &alice(), txid, &wood(2)));
        escrow.consume(&mut ledger, txid, None);

        assert_eq!(ledger.quantity(&alice(), "wood"), 0);
        assert_eq!(ledger.quantity(&bob(), "wood"), 0);
    }

    #[test]
    fn release_after_consume_is_noop() {
        let mut ledger = Ledger::new();
        let mut escrow = Escrow::new();
        ledger.add(&alice(), "wood", 2);

        let txid = TxId::new();
        assert!(escrow.reserve(&mut ledger, &alice(), txid, &wood(2)));
        escrow.consume(&mut ledger, txid, Some(&bob()));
        escrow.release(&mut ledger, txid);

        // Never both: the owner does not get the bundle back.
        assert_eq!(ledger.quantity(&alice(), "wood"), 0);
        assert_eq!(ledger.quantity(&bob(), "wood"), 2);
    }
}
