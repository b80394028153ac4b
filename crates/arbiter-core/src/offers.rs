//! Pending bilateral offers with TTL.
//!
//! Each pending offer has exactly one reservation bound to its
//! transaction id for as long as it is pending. An offer leaves the book
//! on exactly one terminal transition: matched, cancelled, or expired.
//! Rejected proposals never enter the book at all.

use std::collections::BTreeMap;

use arbiter_types::{ActorId, Bundle, SkillGrant, TxId};

/// Time-to-live for trade/learn/teach offers, in milliseconds.
pub const OFFER_TTL_MS: u64 = 5_000;

/// What a pending offer exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferTerms {
    /// A bilateral item trade.
    Trade {
        /// Items reserved from the proposer, granted to the counterparty
        /// on commit.
        give: Bundle,
        /// Items the proposer wants from the counterparty.
        want: Bundle,
    },
    /// A skill transfer paid in items.
    Skill {
        /// The skill granted to the learner on commit.
        grant: SkillGrant,
        /// Payment, reserved from the payer at propose time.
        pay: Bundle,
        /// The party whose inventory funds the payment (the learner).
        payer: ActorId,
        /// The party who receives the skill.
        learner: ActorId,
    },
}

/// One pending bilateral offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    /// The generator-assigned transaction id.
    pub txid: TxId,
    /// The actor who proposed the offer.
    pub proposer: ActorId,
    /// The actor named as the other party.
    pub counterparty: ActorId,
    /// What the offer exchanges.
    pub terms: OfferTerms,
    /// Creation time, epoch milliseconds.
    pub created_at_ms: u64,
    /// Time-to-live, milliseconds.
    pub ttl_ms: u64,
}

impl Offer {
    /// Whether the offer's TTL has elapsed at `now_ms`.
    pub const fn expired(&self, now_ms: u64) -> bool {
        now_ms > self.created_at_ms.saturating_add(self.ttl_ms)
    }

    /// Whether `actor` is one of the two named parties.
    pub fn involves(&self, actor: &ActorId) -> bool {
        self.proposer == *actor || self.counterparty == *actor
    }
}

/// All pending offers, keyed by transaction id.
#[derive(Debug, Clone, Default)]
pub struct OfferBook {
    offers: BTreeMap<TxId, Offer>,
}

impl OfferBook {
    /// Create an empty offer book.
    pub const fn new() -> Self {
        Self {
            offers: BTreeMap::new(),
        }
    }

    /// Insert a freshly proposed offer.
    pub fn insert(&mut self, offer: Offer) {
        self.offers.insert(offer.txid, offer);
    }

    /// Look up a pending offer.
    pub fn get(&self, txid: TxId) -> Option<&Offer> {
        self.offers.get(&txid)
    }

    /// Remove an offer on a terminal transition.
    pub fn remove(&mut self, txid: TxId) -> Option<Offer> {
        self.offers.remove(&txid)
    }

    /// Remove and return every offer whose TTL has elapsed.
    ///
    /// Housekeeping only: the caller releases the reservations; no reply
    /// is generated because there is no requester.
    pub fn sweep_expired(&mut self, now_ms: u64) -> Vec<Offer> {
        let expired: Vec<TxId> = self
            .offers
            .values()
            .filter(|offer| offer.expired(now_ms))
            .map(|offer| offer.txid)
            .collect();
        expired
            .into_iter()
            .filter_map(|txid| self.offers.remove(&txid))
            .collect()
    }

    /// Number of pending offers.
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// Whether no offers are pending.
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn trade_offer(created_at_ms: u64) -> Offer {
        Offer {
            txid: TxId::new(),
            proposer: ActorId::from("alice"),
            counterparty: ActorId::from("bob"),
            terms: OfferTerms::Trade {
                give: Bundle::from([("bread".to_owned(), 1)]),
                want: Bundle::from([("wood".to_owned(), 1)]),
            },
            created_at_ms,
            ttl_ms: OFFER_TTL_MS,
        }
    }

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let offer = trade_offer(1_000);
        assert!(!offer.expired(6_000));
        assert!(offer.expired(6_001));
    }

    #[test]
    fn sweep_removes_only_expired_offers() {
        let mut book = OfferBook::new();
        let stale = trade_offer(0);
        let fresh = trade_offer(10_000);
        let stale_txid = stale.txid;
        book.insert(stale);
        book.insert(fresh);

        let swept = book.sweep_expired(10_000);
        assert_eq!(swept.len(), 1);
        assert_eq!(swept.first().map(|offer| offer.txid), Some(stale_txid));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn involves_names_both_parties() {
        let offer = trade_offer(0);
        assert!(offer.involves(&ActorId::from("alice")));
        assert!(offer.involves(&ActorId::from("bob")));
        assert!(!offer.involves(&ActorId::from("mallory")));
    }

    #[test]
    fn remove_is_terminal() {
        let mut book = OfferBook::new();
        let offer = trade_offer(0);
        let txid = offer.txid;
        book.insert(offer);

        assert!(book.remove(txid).is_some());
        assert!(book.remove(txid).is_none());
        assert!(book.get(txid).is_none());
    }
}
