//! The pure attack resolver.
//!
//! Damage is a deterministic function of (weapon, defender's armed
//! defense item, rule table): resolve the weapon's attack tag, resolve
//! the defense tag (the literal `"none"` when undefended), look up the
//! opposition multiplier, scale the weapon's base damage, round (ties
//! to even), and clamp at zero. Proximity is checked by the dispatcher
//! before this resolver runs.

use arbiter_types::rules::NO_DEFENSE_TAG;
use arbiter_types::{CombatDetail, CombatRules};

/// A resolved attack: the damage to apply and the detail record.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Damage to subtract from the defender's health, already rounded
    /// and clamped at zero.
    pub damage: f64,
    /// Resolved tags and multiplier, for observability.
    pub detail: CombatDetail,
}

/// Resolve an attack with `weapon` against a defender whose armed
/// defense item is `defense_item` (`None` when undefended).
///
/// Returns `None` when the rule table requires a tagged weapon and the
/// weapon has no attack tag. An undefended target is always hittable;
/// the defense-tag requirement gates counter-arming only.
pub fn resolve(rules: &CombatRules, weapon: &str, defense_item: Option<&str>) -> Option<Hit> {
    let attack_tag = rules.attack_tag(weapon);
    if attack_tag.is_none() && rules.requires.attack_power {
        return None;
    }
    let attack = attack_tag.unwrap_or(NO_DEFENSE_TAG);
    let defense = rules.defense_tag(defense_item);
    let multiplier = rules.multiplier(attack, defense);
    let damage = (rules.base_damage(weapon) * multiplier)
        .round_ties_even()
        .max(0.0);
    Some(Hit {
        damage,
        detail: CombatDetail {
            attack: attack.to_owned(),
            defense: defense.to_owned(),
            multiplier,
        },
    })
}
