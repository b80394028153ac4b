//! End-to-end command scenarios against the game-master aggregate.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use arbiter_core::{GameMaster, MirrorHandle, MirrorOp, Tuning};
use arbiter_types::{
    ActorId, Bundle, Command, CommandKind, Envelope, MapBounds, Reason, Rulebook, SkillGrant,
    Status,
};
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    gm: GameMaster,
    // Kept alive so mirror sends do not log as dropped.
    mirror_rx: UnboundedReceiver<MirrorOp>,
}

fn rulebook() -> Rulebook {
    serde_json::from_str(
        r#"{
            "combat": {
                "items": {
                    "knife": {"attack": "pierce", "damage": 5},
                    "plate_iron": {"defense": "plate"},
                    "stick": {}
                },
                "opposition": {
                    "pierce": {"vs": {"plate": 0.5, "none": 1.0}}
                },
                "base_damage": 1,
                "requires": {"attack_power": true, "defense_power": true}
            },
            "recipes": {
                "plank": {
                    "requires": {"wood": 2},
                    "consumes": {"wood": 2},
                    "produces": {"plank": 1}
                }
            },
            "starting_inventory": {}
        }"#,
    )
    .unwrap()
}

fn harness() -> Harness {
    let (mirror, rx) = MirrorHandle::channel();
    let gm = GameMaster::new(rulebook(), MapBounds::default(), Tuning::default(), mirror);
    Harness {
        gm,
        mirror_rx: rx,
    }
}

fn alice() -> ActorId {
    ActorId::from("alice")
}

fn bob() -> ActorId {
    ActorId::from("bob")
}

fn bundle(item: &str, qty: u32) -> Bundle {
    Bundle::from([(item.to_owned(), qty)])
}

fn propose_trade(h: &mut Harness, give: Bundle, want: Bundle, now_ms: u64) -> arbiter_types::TxId {
    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeTrade {
            to: bob(),
            give,
            want,
        },
        now_ms,
    );
    assert_eq!(reply.status, Status::Accepted);
    reply.txid.unwrap()
}

#[test]
fn bread_for_wood_trade_matches() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());
    h.gm.grant(&alice(), &bundle("bread", 1));
    h.gm.grant(&bob(), &bundle("wood", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);

    // The give bundle is reserved immediately: spendable balance drops.
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 0);
    assert_eq!(h.gm.offers().len(), 1);

    let reply = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 2_000);
    assert_eq!(reply.status, Status::Matched);
    assert_eq!(reply.command_kind, CommandKind::Accept);
    assert_eq!(reply.txid, Some(txid));

    assert_eq!(h.gm.ledger().quantity(&alice(), "wood"), 1);
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 0);
    assert_eq!(h.gm.ledger().quantity(&bob(), "bread"), 1);
    assert_eq!(h.gm.ledger().quantity(&bob(), "wood"), 0);
    assert!(h.gm.offers().is_empty());

    let effects = reply.effects.unwrap();
    assert_eq!(
        effects.inventory.get(&alice()).unwrap().get("wood").copied(),
        Some(1)
    );
    assert_eq!(
        effects.inventory.get(&bob()).unwrap().get("wood").copied(),
        Some(-1)
    );
}

#[test]
fn accept_with_unknown_txid_is_an_error() {
    let mut h = harness();
    h.gm.grant(&bob(), &bundle("wood", 1));

    let reply = h.gm.process_command(
        &bob(),
        &Command::Accept {
            txid: arbiter_types::TxId::new(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.reason, Some(Reason::UnknownTransaction));
    assert_eq!(h.gm.ledger().quantity(&bob(), "wood"), 1);
}

#[test]
fn matched_offer_cannot_be_accepted_twice() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());
    h.gm.grant(&alice(), &bundle("bread", 1));
    h.gm.grant(&bob(), &bundle("wood", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);
    let first = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 2_000);
    assert_eq!(first.status, Status::Matched);

    let second = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 2_100);
    assert_eq!(second.status, Status::Error);
    assert_eq!(second.reason, Some(Reason::UnknownTransaction));
    assert_eq!(h.gm.ledger().quantity(&bob(), "bread"), 1);
}

#[test]
fn expired_offer_rejects_and_restores_reservation() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("bread", 1));
    h.gm.grant(&bob(), &bundle("wood", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 0);

    // TTL is 5000 ms; the sweep releases the reservation and the accept
    // reports the offer as expired.
    let reply = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 7_000);
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::Expired));
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 1);
    assert!(h.gm.offers().is_empty());
}

#[test]
fn accept_just_after_the_ttl_boundary_reports_expired() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("bread", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);

    // Expiry is strictly after created + ttl.
    let reply = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 6_001);
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::Expired));
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 1);

    // Cancelling an already-expired offer reports expired too.
    let reply = h
        .gm
        .process_command(&alice(), &Command::Cancel { txid }, 6_100);
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::Expired));
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 1);
}

#[test]
fn only_the_counterparty_may_accept_a_trade() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("bread", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);
    let reply = h.gm.process_command(
        &ActorId::from("mallory"),
        &Command::Accept { txid },
        2_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::NotCounterparty));
    assert_eq!(h.gm.offers().len(), 1);
}

#[test]
fn out_of_range_accept_leaves_the_offer_pending() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("bread", 1));
    h.gm.grant(&bob(), &bundle("wood", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);

    // Walk bob out past the proximity radius.
    let bob_y = h.gm.roster().get(&bob()).unwrap().y;
    h.gm.roster_mut().get_mut(&bob()).unwrap().x = 9_000.0;
    h.gm.roster_mut().get_mut(&bob()).unwrap().y = bob_y;

    let reply = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 2_000);
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::NotInRange));
    assert_eq!(h.gm.offers().len(), 1);

    // Walk back within range; the offer is still committable.
    let alice_pos = {
        let actor = h.gm.roster().get(&alice()).unwrap();
        (actor.x, actor.y)
    };
    let actor = h.gm.roster_mut().get_mut(&bob()).unwrap();
    actor.x = alice_pos.0 + 10.0;
    actor.y = alice_pos.1;

    let reply = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 3_000);
    assert_eq!(reply.status, Status::Matched);
}

#[test]
fn counterparty_without_wanted_bundle_is_insufficient() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("bread", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);
    let reply = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 2_000);
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::Insufficient));
    assert_eq!(h.gm.offers().len(), 1);
}

#[test]
fn proposer_without_give_bundle_is_rejected() {
    let mut h = harness();
    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeTrade {
            to: bob(),
            give: bundle("bread", 1),
            want: bundle("wood", 1),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::Insufficient));
    assert!(h.gm.offers().is_empty());
}

#[test]
fn one_sided_trade_offers_are_rejected() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("bread", 1));

    // Giving nothing for something.
    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeTrade {
            to: bob(),
            give: Bundle::new(),
            want: bundle("wood", 1),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::BadTrade));

    // Giving something for nothing.
    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeTrade {
            to: bob(),
            give: bundle("bread", 1),
            want: Bundle::new(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::BadTrade));

    // Nothing entered the book and nothing was reserved.
    assert!(h.gm.offers().is_empty());
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 1);
}

#[test]
fn zero_payment_skill_offers_are_rejected() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());

    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeTeach {
            to: bob(),
            skill: SkillGrant {
                skill_type: "brew".to_owned(),
                mastery: Some(2),
            },
            pay: Bundle::new(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::BadTeach));

    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeLearn {
            to: bob(),
            skill: SkillGrant {
                skill_type: "brew".to_owned(),
                mastery: None,
            },
            pay: Bundle::new(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::BadLearn));
    assert!(h.gm.offers().is_empty());
}

#[test]
fn only_the_proposer_may_cancel() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("bread", 1));

    let txid = propose_trade(&mut h, bundle("bread", 1), bundle("wood", 1), 1_000);

    let reply = h
        .gm
        .process_command(&bob(), &Command::Cancel { txid }, 2_000);
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::NotOwner));
    assert_eq!(h.gm.offers().len(), 1);

    let reply = h
        .gm
        .process_command(&alice(), &Command::Cancel { txid }, 2_000);
    assert_eq!(reply.status, Status::Matched);
    assert_eq!(h.gm.ledger().quantity(&alice(), "bread"), 1);
    assert!(h.gm.offers().is_empty());
}

#[test]
fn teach_offer_reserves_from_the_learner() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());
    h.gm.grant(&bob(), &bundle("gold", 2));

    // Alice teaches bob; bob (the learner) pays.
    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeTeach {
            to: bob(),
            skill: SkillGrant {
                skill_type: "brew".to_owned(),
                mastery: Some(3),
            },
            pay: bundle("gold", 2),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Accepted);
    let txid = reply.txid.unwrap();
    assert_eq!(h.gm.ledger().quantity(&bob(), "gold"), 0);

    let reply = h
        .gm
        .process_command(&bob(), &Command::Accept { txid }, 2_000);
    assert_eq!(reply.status, Status::Matched);

    // Payment lands with the teacher, never back with the payer.
    assert_eq!(h.gm.ledger().quantity(&alice(), "gold"), 2);
    assert_eq!(h.gm.ledger().quantity(&bob(), "gold"), 0);
    assert_eq!(h.gm.skills(&bob()).unwrap().get("brew").copied(), Some(3));

    let effects = reply.effects.unwrap();
    assert_eq!(
        effects.skills.get(&bob()).unwrap().get("brew").copied(),
        Some(3)
    );
}

#[test]
fn learn_offer_reserves_from_the_proposer_and_either_party_may_accept() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());
    h.gm.grant(&alice(), &bundle("gold", 1));

    // Alice wants to learn from bob; alice pays. Mastery defaults to 1.
    let reply = h.gm.process_command(
        &alice(),
        &Command::MakeLearn {
            to: bob(),
            skill: SkillGrant {
                skill_type: "weave".to_owned(),
                mastery: None,
            },
            pay: bundle("gold", 1),
        },
        1_000,
    );
    let txid = reply.txid.unwrap();
    assert_eq!(h.gm.ledger().quantity(&alice(), "gold"), 0);

    // The proposer herself may close the deal.
    let reply = h
        .gm
        .process_command(&alice(), &Command::Accept { txid }, 2_000);
    assert_eq!(reply.status, Status::Matched);
    assert_eq!(h.gm.ledger().quantity(&bob(), "gold"), 1);
    assert_eq!(h.gm.skills(&alice()).unwrap().get("weave").copied(), Some(1));
}

#[test]
fn knife_attack_on_undefended_target_deals_full_damage() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());

    let reply = h.gm.process_command(
        &alice(),
        &Command::Attack {
            target: bob(),
            weapon: "knife".to_owned(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Matched);

    let effects = reply.effects.unwrap();
    assert!((effects.health.get(&bob()).unwrap() + 5.0).abs() < f64::EPSILON);
    let detail = effects.combat.unwrap();
    assert_eq!(detail.attack, "pierce");
    assert_eq!(detail.defense, "none");
    assert!((detail.multiplier - 1.0).abs() < f64::EPSILON);

    // Health is clamped to the unit interval in the roster.
    assert!(h.gm.roster().get(&bob()).unwrap().health.abs() < f64::EPSILON);
}

#[test]
fn armed_counter_defense_scales_damage_within_its_window() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());

    let reply = h.gm.process_command(
        &bob(),
        &Command::Counter {
            target: None,
            item: "plate_iron".to_owned(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Accepted);

    // Inside the 1000 ms window: 5 * 0.5 = 2.5 rounds to 2 (ties to even).
    let reply = h.gm.process_command(
        &alice(),
        &Command::Attack {
            target: bob(),
            weapon: "knife".to_owned(),
        },
        1_500,
    );
    let effects = reply.effects.unwrap();
    assert!((effects.health.get(&bob()).unwrap() + 2.0).abs() < f64::EPSILON);
    assert_eq!(effects.combat.unwrap().defense, "plate");

    // Outside the window the defense is absent again.
    let reply = h.gm.process_command(
        &alice(),
        &Command::Attack {
            target: bob(),
            weapon: "knife".to_owned(),
        },
        2_500,
    );
    let effects = reply.effects.unwrap();
    assert!((effects.health.get(&bob()).unwrap() + 5.0).abs() < f64::EPSILON);
}

#[test]
fn untagged_weapon_and_untagged_defense_are_rejected() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.ensure_actor(&bob());

    let reply = h.gm.process_command(
        &alice(),
        &Command::Attack {
            target: bob(),
            weapon: "stick".to_owned(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::InvalidWeapon));

    let reply = h.gm.process_command(
        &bob(),
        &Command::Counter {
            target: None,
            item: "stick".to_owned(),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::InvalidDefense));
}

#[test]
fn craft_without_inputs_is_rejected_and_mutates_nothing() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("wood", 1));

    let reply = h.gm.process_command(
        &alice(),
        &Command::Craft {
            item: "plank".to_owned(),
            count: Some(1),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::MissingRequirements));
    assert_eq!(h.gm.ledger().quantity(&alice(), "wood"), 1);
    assert_eq!(h.gm.ledger().quantity(&alice(), "plank"), 0);
}

#[test]
fn craft_max_produces_until_inputs_run_out() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("wood", 5));

    let reply = h.gm.process_command(
        &alice(),
        &Command::Craft {
            item: "plank".to_owned(),
            count: None,
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Matched);
    assert_eq!(h.gm.ledger().quantity(&alice(), "wood"), 1);
    assert_eq!(h.gm.ledger().quantity(&alice(), "plank"), 2);

    let effects = reply.effects.unwrap();
    let deltas = effects.inventory.get(&alice()).unwrap();
    assert_eq!(deltas.get("wood").copied(), Some(-4));
    assert_eq!(deltas.get("plank").copied(), Some(2));
}

#[test]
fn unknown_recipe_is_rejected() {
    let mut h = harness();
    let reply = h.gm.process_command(
        &alice(),
        &Command::Craft {
            item: "sword".to_owned(),
            count: None,
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Rejected);
    assert_eq!(reply.reason, Some(Reason::UnknownRecipe));
}

#[test]
fn ledger_mutations_are_translated_into_mirror_ops() {
    let mut h = harness();
    h.gm.ensure_actor(&alice());
    h.gm.grant(&alice(), &bundle("wood", 4));

    let reply = h.gm.process_command(
        &alice(),
        &Command::Craft {
            item: "plank".to_owned(),
            count: Some(1),
        },
        1_000,
    );
    assert_eq!(reply.status, Status::Matched);

    let mut ops = Vec::new();
    while let Ok(op) = h.mirror_rx.try_recv() {
        ops.push(op);
    }

    // First sight of alice upserts her row; the grant and the craft
    // each adjust her inventory.
    assert!(matches!(&ops[0], MirrorOp::UpsertActor { id, .. } if *id == alice()));
    match &ops[1] {
        MirrorOp::AdjustInventory { id, deltas } => {
            assert_eq!(*id, alice());
            assert_eq!(deltas.get("wood").copied(), Some(4));
        }
        other => panic!("wrong op: {other:?}"),
    }
    match &ops[2] {
        MirrorOp::AdjustInventory { id, deltas } => {
            assert_eq!(*id, alice());
            assert_eq!(deltas.get("wood").copied(), Some(-2));
            assert_eq!(deltas.get("plank").copied(), Some(1));
        }
        other => panic!("wrong op: {other:?}"),
    }
    assert_eq!(ops.len(), 3);
}

#[test]
fn replayed_envelope_is_dropped_without_side_effects() {
    let mut h = harness();
    h.gm.grant(&alice(), &bundle("wood", 4));

    let envelope = Envelope {
        actor_id: alice(),
        seq: 1,
        command: Command::Craft {
            item: "plank".to_owned(),
            count: Some(1),
        },
    };
    let first = h.gm.process_envelope(&envelope, 1_000);
    assert!(first.is_some());
    assert_eq!(h.gm.ledger().quantity(&alice(), "plank"), 1);

    let replay = h.gm.process_envelope(&envelope, 1_100);
    assert!(replay.is_none());
    assert_eq!(h.gm.ledger().quantity(&alice(), "plank"), 1);
    assert_eq!(h.gm.ledger().quantity(&alice(), "wood"), 2);
}
