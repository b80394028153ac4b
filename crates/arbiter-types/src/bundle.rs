//! Asset bundles: item/quantity maps exchanged, reserved, and crafted.
//!
//! Item names are opaque strings defined by the rulebook. Quantities in a
//! [`Bundle`] are non-negative; [`DeltaMap`] carries signed deltas as they
//! appear in reply effects and persistence-mirror operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A map of item name to non-negative quantity.
///
/// Used for inventories, offer terms (give/want/pay), reservation escrow,
/// and recipe inputs/outputs.
pub type Bundle = BTreeMap<String, u32>;

/// A map of item name to signed quantity delta.
///
/// The shape of inventory effects in replies and of mirror writes.
pub type DeltaMap = BTreeMap<String, i64>;

/// Negate a bundle into a delta map (for debits).
pub fn debit_of(bundle: &Bundle) -> DeltaMap {
    bundle
        .iter()
        .map(|(item, qty)| (item.clone(), -i64::from(*qty)))
        .collect()
}

/// Widen a bundle into a delta map (for credits).
pub fn credit_of(bundle: &Bundle) -> DeltaMap {
    bundle
        .iter()
        .map(|(item, qty)| (item.clone(), i64::from(*qty)))
        .collect()
}

/// Accumulate `delta` into `into`, summing per-item values.
pub fn merge_deltas(into: &mut DeltaMap, delta: &DeltaMap) {
    for (item, value) in delta {
        let entry = into.entry(item.clone()).or_insert(0);
        *entry = entry.saturating_add(*value);
    }
}

/// A skill transfer requested by a learn or teach offer.
///
/// The mastery level granted on commit defaults to 1 when not supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGrant {
    /// The skill being transferred (e.g. `"brew"`, `"weave"`).
    #[serde(rename = "type")]
    pub skill_type: String,
    /// Mastery level granted to the learner; defaults to 1 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastery: Option<u32>,
}

impl SkillGrant {
    /// The mastery level to grant, defaulting to 1.
    pub fn mastery_or_default(&self) -> u32 {
        self.mastery.unwrap_or(1)
    }
}
