//! The game-master aggregate and command dispatcher.
//!
//! [`GameMaster`] owns every piece of shared mutable world state and is
//! mutated only from the single-writer loop; that discipline is the sole
//! concurrency-safety mechanism for the ledger, offer book, and defense
//! windows. Every processed command yields exactly one [`Reply`].
//! Handlers structure mutation as single uninterrupted steps so a fault
//! cannot leave a half-applied reservation. Ledger and health mutations
//! are applied in memory synchronously and mirrored to persistence
//! asynchronously, so in-memory state is always ahead of or equal to the
//! durable copy.

use std::collections::{BTreeMap, VecDeque};

use arbiter_ledger::{Escrow, Ledger};
use arbiter_types::{
    credit_of, debit_of, merge_deltas, ActorId, ActorSnapshot, Bundle, Command, CommandKind,
    Effects, Envelope, HeldKeys, MapBounds, OverlayMessage, Reason, Reply, Rulebook, SkillGrant,
    TxId, WorldSnapshot,
};
use arbiter_world::Roster;
use tracing::{debug, info};

use crate::combat;
use crate::craft;
use crate::defense::{DefenseWindows, DEFENSE_WINDOW_MS};
use crate::mirror::{MirrorHandle, MirrorOp};
use crate::offers::{Offer, OfferBook, OfferTerms, OFFER_TTL_MS};
use crate::watermark::WatermarkRegistry;

/// Maximum distance for trades, skill transfers, and attacks.
pub const PROXIMITY_RADIUS: f64 = 220.0;

/// Watermark consumer folding chat overlays into display state.
pub const CONSUMER_CHAT: &str = "overlay-chat";

/// Watermark consumer acting on structured commands.
pub const CONSUMER_COMMAND: &str = "command";

/// Actor kind recorded in the persistence mirror.
const ACTOR_KIND_PLAYER: &str = "player";

/// How many expired transaction ids are remembered for reporting.
///
/// The sweep releases reservations before the accept handler runs, so
/// without this memory a just-expired txid would report as unknown
/// instead of expired.
const EXPIRED_MEMORY: usize = 64;

/// Runtime-tunable constants for the game master.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Maximum distance for bilateral interactions.
    pub proximity_radius: f64,
    /// Offer time-to-live, milliseconds.
    pub offer_ttl_ms: u64,
    /// Armed defense-window duration, milliseconds.
    pub defense_window_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            proximity_radius: PROXIMITY_RADIUS,
            offer_ttl_ms: OFFER_TTL_MS,
            defense_window_ms: DEFENSE_WINDOW_MS,
        }
    }
}

/// The authoritative world-state aggregate.
#[derive(Debug)]
pub struct GameMaster {
    roster: Roster,
    ledger: Ledger,
    escrow: Escrow,
    offers: OfferBook,
    defense: DefenseWindows,
    expired_recently: VecDeque<TxId>,
    watermarks: WatermarkRegistry,
    skills: BTreeMap<ActorId, BTreeMap<String, u32>>,
    rulebook: Rulebook,
    tuning: Tuning,
    mirror: MirrorHandle,
}

impl GameMaster {
    /// Create a game master over an empty world.
    pub fn new(rulebook: Rulebook, bounds: MapBounds, tuning: Tuning, mirror: MirrorHandle) -> Self {
        Self {
            roster: Roster::new(bounds),
            ledger: Ledger::new(),
            escrow: Escrow::new(),
            offers: OfferBook::new(),
            defense: DefenseWindows::new(),
            expired_recently: VecDeque::new(),
            watermarks: WatermarkRegistry::new(),
            skills: BTreeMap::new(),
            rulebook,
            tuning,
            mirror,
        }
    }

    /// The inventory ledger (spendable balances, escrow excluded).
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The actor roster.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Mutable roster access for the simulation loop.
    pub const fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    /// The pending offer book.
    pub const fn offers(&self) -> &OfferBook {
        &self.offers
    }

    /// Skill masteries recorded for `actor`.
    pub fn skills(&self, actor: &ActorId) -> Option<&BTreeMap<String, u32>> {
        self.skills.get(actor)
    }

    /// Credit `bundle` to `actor`, mirroring the write.
    pub fn grant(&mut self, actor: &ActorId, bundle: &Bundle) {
        self.ledger.credit_bundle(actor, bundle);
        self.mirror.send(MirrorOp::AdjustInventory {
            id: actor.clone(),
            deltas: credit_of(bundle),
        });
    }

    /// Spawn `id` lazily, seeding its starting inventory and mirroring
    /// the upsert on first sight.
    pub fn ensure_actor(&mut self, id: &ActorId) {
        let (x, y, created) = {
            let (actor, created) = self.roster.ensure(id);
            (actor.x, actor.y, created)
        };
        if created {
            self.mirror.send(MirrorOp::UpsertActor {
                id: id.clone(),
                kind: ACTOR_KIND_PLAYER.to_owned(),
                x,
                y,
            });
            let starter = self.rulebook.starting_inventory.clone();
            if !starter.is_empty() {
                self.grant(id, &starter);
            }
        }
    }

    /// Record held movement keys for `actor`.
    ///
    /// Not sequence-gated: the latest arrival wins.
    pub fn handle_movement(&mut self, actor: &ActorId, keys: HeldKeys) {
        self.ensure_actor(actor);
        self.roster.set_keys(actor, keys);
    }

    /// Process an overlay message: fold chat into display state and
    /// dispatch an embedded command, each gated by its own watermark line.
    ///
    /// Returns `None` when no command reply was produced (chat-only
    /// message, or a duplicate dropped without side effects).
    pub fn handle_overlay(&mut self, msg: &OverlayMessage, now_ms: u64) -> Option<Reply> {
        self.ensure_actor(&msg.actor_id);
        if let Some(chat) = &msg.chat {
            if self.watermarks.accept(CONSUMER_CHAT, &msg.actor_id, msg.seq) {
                self.roster.set_overlay(&msg.actor_id, chat, msg.ttl_ms, now_ms);
            }
        }
        let command = msg.command.as_ref()?;
        if self.watermarks.accept(CONSUMER_COMMAND, &msg.actor_id, msg.seq) {
            Some(self.process_command(&msg.actor_id, command, now_ms))
        } else {
            debug!(actor = %msg.actor_id, seq = msg.seq, "duplicate command dropped");
            None
        }
    }

    /// Process a sequence-numbered command envelope.
    ///
    /// Returns `None` when the envelope is a replay.
    pub fn process_envelope(&mut self, envelope: &Envelope, now_ms: u64) -> Option<Reply> {
        if self
            .watermarks
            .accept(CONSUMER_COMMAND, &envelope.actor_id, envelope.seq)
        {
            Some(self.process_command(&envelope.actor_id, &envelope.command, now_ms))
        } else {
            debug!(actor = %envelope.actor_id, seq = envelope.seq, "duplicate command dropped");
            None
        }
    }

    /// Route one command to its handler, yielding exactly one reply.
    ///
    /// Expired offers are swept first; a just-expired transaction id is
    /// answered from the tombstone memory rather than racing its own
    /// expiry inside a handler.
    pub fn process_command(&mut self, actor: &ActorId, command: &Command, now_ms: u64) -> Reply {
        self.sweep_expired(now_ms);
        self.ensure_actor(actor);
        match command {
            Command::MakeTrade { to, give, want } => {
                self.make_trade(actor, to, give, want, now_ms)
            }
            Command::MakeLearn { to, skill, pay } => {
                self.make_skill_offer(CommandKind::MakeLearn, actor, to, skill, pay, now_ms)
            }
            Command::MakeTeach { to, skill, pay } => {
                self.make_skill_offer(CommandKind::MakeTeach, actor, to, skill, pay, now_ms)
            }
            Command::Accept { txid } => self.accept(actor, *txid),
            Command::Cancel { txid } => self.cancel(actor, *txid),
            Command::Attack { target, weapon } => self.attack(actor, target, weapon, now_ms),
            Command::Counter { item, .. } => self.counter(actor, item, now_ms),
            Command::Craft { item, count } => self.craft(actor, item, *count),
        }
    }

    /// Release every reservation whose offer outlived its TTL.
    ///
    /// Pure housekeeping: no reply is generated because there is no
    /// requester.
    pub fn sweep_expired(&mut self, now_ms: u64) {
        for offer in self.offers.sweep_expired(now_ms) {
            debug!(txid = %offer.txid, proposer = %offer.proposer, "offer expired");
            self.release_reservation(offer.txid);
            self.expired_recently.push_back(offer.txid);
            while self.expired_recently.len() > EXPIRED_MEMORY {
                self.expired_recently.pop_front();
            }
        }
    }

    /// Assemble the periodic world-state broadcast.
    pub fn snapshot(&mut self, now_ms: u64) -> WorldSnapshot {
        let actors = self
            .roster
            .iter()
            .map(|actor| ActorSnapshot {
                id: actor.id.clone(),
                x: actor.x,
                y: actor.y,
                inventory: self.ledger.balances(&actor.id),
            })
            .collect();
        WorldSnapshot {
            timestamp_ms: now_ms,
            bounds: *self.roster.bounds(),
            actors,
            overlays: self.roster.collect_overlays(now_ms),
        }
    }

    // --- offer lifecycle ---

    fn make_trade(
        &mut self,
        proposer: &ActorId,
        to: &ActorId,
        give: &Bundle,
        want: &Bundle,
        now_ms: u64,
    ) -> Reply {
        let kind = CommandKind::MakeTrade;
        if give.is_empty() || want.is_empty() {
            return Reply::rejected(kind, proposer.clone(), Reason::BadTrade, None);
        }
        self.ensure_actor(to);
        let txid = TxId::new();
        if !self.reserve(proposer, txid, give) {
            return Reply::rejected(kind, proposer.clone(), Reason::Insufficient, None);
        }
        self.offers.insert(Offer {
            txid,
            proposer: proposer.clone(),
            counterparty: to.clone(),
            terms: OfferTerms::Trade {
                give: give.clone(),
                want: want.clone(),
            },
            created_at_ms: now_ms,
            ttl_ms: self.tuning.offer_ttl_ms,
        });
        info!(txid = %txid, proposer = %proposer, to = %to, "trade proposed");

        let mut reply = Reply::accepted(kind, proposer.clone(), Some(txid));
        let mut effects = Effects::default();
        effects.add_inventory(proposer, debit_of(give));
        reply.effects = Some(effects);
        reply
    }

    fn make_skill_offer(
        &mut self,
        kind: CommandKind,
        proposer: &ActorId,
        to: &ActorId,
        grant: &SkillGrant,
        pay: &Bundle,
        now_ms: u64,
    ) -> Reply {
        let bad = if kind == CommandKind::MakeLearn {
            Reason::BadLearn
        } else {
            Reason::BadTeach
        };
        if grant.skill_type.is_empty() || pay.is_empty() {
            return Reply::rejected(kind, proposer.clone(), bad, None);
        }
        self.ensure_actor(to);
        // The learner funds the payment: the proposer of a learn offer,
        // the counterparty of a teach offer.
        let payer = if kind == CommandKind::MakeLearn {
            proposer.clone()
        } else {
            to.clone()
        };
        let learner = payer.clone();
        let txid = TxId::new();
        if !self.reserve(&payer, txid, pay) {
            return Reply::rejected(kind, proposer.clone(), Reason::Insufficient, None);
        }
        self.offers.insert(Offer {
            txid,
            proposer: proposer.clone(),
            counterparty: to.clone(),
            terms: OfferTerms::Skill {
                grant: grant.clone(),
                pay: pay.clone(),
                payer: payer.clone(),
                learner,
            },
            created_at_ms: now_ms,
            ttl_ms: self.tuning.offer_ttl_ms,
        });
        info!(txid = %txid, proposer = %proposer, to = %to, skill = %grant.skill_type, "skill offer proposed");

        let mut reply = Reply::accepted(kind, proposer.clone(), Some(txid));
        let mut effects = Effects::default();
        effects.add_inventory(&payer, debit_of(pay));
        reply.effects = Some(effects);
        reply
    }

    fn accept(&mut self, acceptor: &ActorId, txid: TxId) -> Reply {
        let kind = CommandKind::Accept;
        // The sweep at the start of this call already released any offer
        // whose TTL elapsed, so an expired txid is reported from the
        // tombstone memory rather than found in the book.
        let Some(offer) = self.offers.get(txid).cloned() else {
            if self.expired_recently.contains(&txid) {
                return Reply::rejected(kind, acceptor.clone(), Reason::Expired, Some(txid));
            }
            return Reply::error(kind, acceptor.clone(), Reason::UnknownTransaction, None);
        };
        match &offer.terms {
            OfferTerms::Trade { give, want } => self.commit_trade(acceptor, &offer, give, want),
            OfferTerms::Skill {
                grant,
                pay,
                payer,
                learner,
            } => self.commit_skill(acceptor, &offer, grant, pay, payer, learner),
        }
    }

    fn commit_trade(
        &mut self,
        acceptor: &ActorId,
        offer: &Offer,
        give: &Bundle,
        want: &Bundle,
    ) -> Reply {
        let kind = CommandKind::Accept;
        let txid = offer.txid;
        if *acceptor != offer.counterparty {
            return Reply::rejected(kind, acceptor.clone(), Reason::NotCounterparty, Some(txid));
        }
        if !self.in_range(&offer.proposer, &offer.counterparty) {
            return Reply::rejected(kind, acceptor.clone(), Reason::NotInRange, Some(txid));
        }
        if !self.ledger.has(&offer.counterparty, want) {
            return Reply::rejected(kind, acceptor.clone(), Reason::Insufficient, Some(txid));
        }

        // Commit: one uninterrupted step, sufficiency already verified.
        self.offers.remove(txid);
        self.debit(&offer.counterparty, want);
        self.consume_reservation(txid, &offer.counterparty);
        self.grant(&offer.proposer, want);
        info!(txid = %txid, proposer = %offer.proposer, counterparty = %offer.counterparty, "trade matched");

        let mut effects = Effects::default();
        effects.add_inventory(&offer.proposer, credit_of(want));
        let mut counterparty_delta = debit_of(want);
        merge_deltas(&mut counterparty_delta, &credit_of(give));
        effects.add_inventory(&offer.counterparty, counterparty_delta);
        Reply::matched(kind, acceptor.clone(), Some(txid), effects)
    }

    fn commit_skill(
        &mut self,
        acceptor: &ActorId,
        offer: &Offer,
        grant: &SkillGrant,
        pay: &Bundle,
        payer: &ActorId,
        learner: &ActorId,
    ) -> Reply {
        let kind = CommandKind::Accept;
        let txid = offer.txid;
        if !offer.involves(acceptor) {
            return Reply::rejected(kind, acceptor.clone(), Reason::NotCounterparty, Some(txid));
        }
        if !self.in_range(&offer.proposer, &offer.counterparty) {
            return Reply::rejected(kind, acceptor.clone(), Reason::NotInRange, Some(txid));
        }

        // The payment goes to the non-paying party; it is never returned
        // to the payer on a successful commit.
        let payee = if *payer == offer.proposer {
            offer.counterparty.clone()
        } else {
            offer.proposer.clone()
        };
        self.offers.remove(txid);
        self.consume_reservation(txid, &payee);

        let mastery = grant.mastery_or_default();
        self.skills
            .entry(learner.clone())
            .or_default()
            .insert(grant.skill_type.clone(), mastery);
        self.mirror.send(MirrorOp::SetSkillMastery {
            id: learner.clone(),
            skill: grant.skill_type.clone(),
            mastery,
        });
        info!(txid = %txid, learner = %learner, skill = %grant.skill_type, mastery, "skill transfer matched");

        let mut effects = Effects::default();
        effects.add_inventory(&payee, credit_of(pay));
        effects
            .skills
            .entry(learner.clone())
            .or_default()
            .insert(grant.skill_type.clone(), mastery);
        Reply::matched(kind, acceptor.clone(), Some(txid), effects)
    }

    fn cancel(&mut self, actor: &ActorId, txid: TxId) -> Reply {
        let kind = CommandKind::Cancel;
        let Some(offer) = self.offers.get(txid) else {
            if self.expired_recently.contains(&txid) {
                return Reply::rejected(kind, actor.clone(), Reason::Expired, Some(txid));
            }
            return Reply::error(kind, actor.clone(), Reason::UnknownTransaction, None);
        };
        if offer.proposer != *actor {
            return Reply::rejected(kind, actor.clone(), Reason::NotOwner, Some(txid));
        }
        self.offers.remove(txid);
        let restored = self.release_reservation(txid);
        info!(txid = %txid, proposer = %actor, "offer cancelled");

        let mut effects = Effects::default();
        if let Some((owner, bundle)) = restored {
            effects.add_inventory(&owner, credit_of(&bundle));
        }
        Reply::matched(kind, actor.clone(), Some(txid), effects)
    }

    // --- combat ---

    fn attack(&mut self, attacker: &ActorId, target: &ActorId, weapon: &str, now_ms: u64) -> Reply {
        let kind = CommandKind::Attack;
        if weapon.is_empty() {
            return Reply::rejected(kind, attacker.clone(), Reason::BadAttack, None);
        }
        self.ensure_actor(target);
        if !self.in_range(attacker, target) {
            return Reply::rejected(kind, attacker.clone(), Reason::NotInRange, None);
        }
        let defense_item = self.defense.active_item(target, now_ms);
        let Some(hit) = combat::resolve(&self.rulebook.combat, weapon, defense_item.as_deref())
        else {
            return Reply::rejected(kind, attacker.clone(), Reason::InvalidWeapon, None);
        };

        let delta = -hit.damage;
        if let Some(actor) = self.roster.get_mut(target) {
            actor.adjust_health(delta);
        }
        self.mirror.send(MirrorOp::AdjustHealth {
            id: target.clone(),
            delta,
        });
        info!(
            attacker = %attacker,
            target = %target,
            weapon,
            damage = hit.damage,
            attack = %hit.detail.attack,
            defense = %hit.detail.defense,
            "attack resolved"
        );

        let mut effects = Effects::default();
        effects.health.insert(target.clone(), delta);
        effects.combat = Some(hit.detail);
        Reply::matched(kind, attacker.clone(), None, effects)
    }

    fn counter(&mut self, actor: &ActorId, item: &str, now_ms: u64) -> Reply {
        let kind = CommandKind::Counter;
        if item.is_empty() {
            return Reply::rejected(kind, actor.clone(), Reason::BadCounter, None);
        }
        let rules = &self.rulebook.combat;
        if rules.requires.defense_power
            && rules.defense_tag(Some(item)) == arbiter_types::rules::NO_DEFENSE_TAG
        {
            return Reply::rejected(kind, actor.clone(), Reason::InvalidDefense, None);
        }
        self.defense
            .arm(actor, item, now_ms, self.tuning.defense_window_ms);
        Reply::accepted(kind, actor.clone(), None)
    }

    // --- crafting ---

    fn craft(&mut self, actor: &ActorId, item: &str, count: Option<u32>) -> Reply {
        let kind = CommandKind::Craft;
        if count == Some(0) {
            return Reply::rejected(kind, actor.clone(), Reason::BadCraft, None);
        }
        let Some(recipe) = self.rulebook.recipe(item).cloned() else {
            return Reply::rejected(kind, actor.clone(), Reason::UnknownRecipe, None);
        };
        let produced = match count {
            Some(n) => {
                if craft::apply_times(&mut self.ledger, actor, &recipe, n) {
                    n
                } else {
                    0
                }
            }
            None => craft::apply_max(&mut self.ledger, actor, &recipe),
        };
        if produced == 0 {
            return Reply::rejected(kind, actor.clone(), Reason::MissingRequirements, None);
        }

        let mut deltas = debit_of(&craft::scale(&recipe.consumes, produced));
        merge_deltas(&mut deltas, &credit_of(&craft::scale(&recipe.produces, produced)));
        self.mirror.send(MirrorOp::AdjustInventory {
            id: actor.clone(),
            deltas: deltas.clone(),
        });
        info!(actor = %actor, item, produced, "craft applied");

        let mut effects = Effects::default();
        effects.add_inventory(actor, deltas);
        Reply::matched(kind, actor.clone(), None, effects)
    }

    // --- mirrored ledger primitives ---

    fn reserve(&mut self, owner: &ActorId, txid: TxId, bundle: &Bundle) -> bool {
        if !self.escrow.reserve(&mut self.ledger, owner, txid, bundle) {
            return false;
        }
        self.mirror.send(MirrorOp::AdjustInventory {
            id: owner.clone(),
            deltas: debit_of(bundle),
        });
        true
    }

    fn release_reservation(&mut self, txid: TxId) -> Option<(ActorId, Bundle)> {
        let reservation = self.escrow.release(&mut self.ledger, txid)?;
        self.mirror.send(MirrorOp::AdjustInventory {
            id: reservation.owner.clone(),
            deltas: credit_of(&reservation.bundle),
        });
        Some((reservation.owner, reservation.bundle))
    }

    fn consume_reservation(&mut self, txid: TxId, grant_to: &ActorId) {
        if let Some(reservation) = self.escrow.consume(&mut self.ledger, txid, Some(grant_to)) {
            self.mirror.send(MirrorOp::AdjustInventory {
                id: grant_to.clone(),
                deltas: credit_of(&reservation.bundle),
            });
        }
    }

    fn debit(&mut self, actor: &ActorId, bundle: &Bundle) {
        self.ledger.debit_bundle(actor, bundle);
        self.mirror.send(MirrorOp::AdjustInventory {
            id: actor.clone(),
            deltas: debit_of(bundle),
        });
    }

    fn in_range(&self, a: &ActorId, b: &ActorId) -> bool {
        self.roster.in_range(a, b, self.tuning.proximity_radius)
    }
}
