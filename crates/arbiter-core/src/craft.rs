//! All-or-nothing recipe application against the inventory ledger.
//!
//! Application is two-phase: a fast sufficiency pre-check, then a second
//! check immediately before the debit/credit pair. Under the single-writer
//! discipline the pair is one uninterrupted step, so a recipe either
//! applies fully or not at all.

use arbiter_ledger::Ledger;
use arbiter_types::{ActorId, Bundle, Recipe};

/// Scale every quantity in `bundle` by `count`, saturating.
pub fn scale(bundle: &Bundle, count: u32) -> Bundle {
    bundle
        .iter()
        .map(|(item, qty)| (item.clone(), qty.saturating_mul(count)))
        .collect()
}

/// Apply `recipe` once. Returns `false` with no mutation when the
/// requirements or consumed inputs are not held.
pub fn apply_once(ledger: &mut Ledger, actor: &ActorId, recipe: &Recipe) -> bool {
    if !ledger.has(actor, &recipe.requires) {
        return false;
    }
    // Second check, same uninterrupted step as the mutation.
    if !ledger.has(actor, &recipe.requires) || !ledger.has(actor, &recipe.consumes) {
        return false;
    }
    ledger.debit_bundle(actor, &recipe.consumes);
    ledger.credit_bundle(actor, &recipe.produces);
    true
}

/// Apply `recipe` exactly `count` times, all-or-nothing.
///
/// Consumed inputs are scaled up front; either every application happens
/// or none does.
pub fn apply_times(ledger: &mut Ledger, actor: &ActorId, recipe: &Recipe, count: u32) -> bool {
    let consumes = scale(&recipe.consumes, count);
    if !ledger.has(actor, &recipe.requires) || !ledger.has(actor, &consumes) {
        return false;
    }
    if !ledger.has(actor, &recipe.requires) || !ledger.has(actor, &consumes) {
        return false;
    }
    ledger.debit_bundle(actor, &consumes);
    ledger.credit_bundle(actor, &scale(&recipe.produces, count));
    true
}

/// Apply `recipe` as many times as possible, returning the count
/// actually produced.
pub fn apply_max(ledger: &mut Ledger, actor: &ActorId, recipe: &Recipe) -> u32 {
    if recipe.consumes.is_empty() {
        // A recipe that consumes nothing would never stop; craft once.
        return u32::from(apply_once(ledger, actor, recipe));
    }
    let mut produced = 0u32;
    while apply_once(ledger, actor, recipe) {
        produced = produced.saturating_add(1);
    }
    produced
}
