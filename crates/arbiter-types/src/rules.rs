//! The rulebook: the immutable combat rule table, crafting recipes, and
//! starting inventory, loaded once at startup from a JSON file.
//!
//! The combat block maps item names to attack/defense tags and base damage,
//! plus an opposition matrix giving the damage multiplier for each
//! (attack tag, defense tag) pair. Missing tags default to the literal
//! `"none"` for defense and to an absent attack tag; missing matrix cells
//! default to a multiplier of `1.0`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::bundle::Bundle;

/// The defense tag of an undefended (or untagged) party.
pub const NO_DEFENSE_TAG: &str = "none";

/// Errors that can occur when loading the rulebook.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// Failed to read the rulebook file from disk.
    #[error("failed to read rulebook file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse the rulebook JSON.
    #[error("failed to parse rulebook JSON: {source}")]
    Json {
        /// The underlying JSON parse error.
        #[from]
        source: serde_json::Error,
    },
}

/// Attack/defense tags and base damage for one item.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ItemTags {
    /// Attack tag when this item is used as a weapon.
    #[serde(default)]
    pub attack: Option<String>,
    /// Defense tag when this item arms a counter-defense window.
    #[serde(default)]
    pub defense: Option<String>,
    /// Base damage override; falls back to the table-wide default.
    #[serde(default)]
    pub damage: Option<f64>,
}

/// One row of the opposition matrix: multipliers for a given attack tag
/// against each defense tag.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OppositionRow {
    /// Defense tag -> damage multiplier.
    #[serde(default)]
    pub vs: BTreeMap<String, f64>,
}

/// Flags requiring tagged weapons and/or defenses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TagRequirements {
    /// When set, attacks with untagged weapons are rejected.
    #[serde(default)]
    pub attack_power: bool,
    /// When set, counters with untagged items are rejected.
    ///
    /// This gates arming only: an attack against an undefended target
    /// always proceeds with defense tag `"none"`.
    #[serde(default)]
    pub defense_power: bool,
}

/// The immutable combat rule table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CombatRules {
    /// Per-item attack/defense tags and base damage.
    #[serde(default)]
    pub items: BTreeMap<String, ItemTags>,
    /// Opposition multiplier matrix, keyed by attack tag.
    #[serde(default)]
    pub opposition: BTreeMap<String, OppositionRow>,
    /// Table-wide default base damage for items without an override.
    #[serde(default = "default_base_damage")]
    pub base_damage: f64,
    /// Tag requirement flags.
    #[serde(default)]
    pub requires: TagRequirements,
}

const fn default_base_damage() -> f64 {
    1.0
}

impl CombatRules {
    /// The attack tag of `item`, or `None` when the item is untagged.
    pub fn attack_tag(&self, item: &str) -> Option<&str> {
        self.items
            .get(item)
            .and_then(|tags| tags.attack.as_deref())
            .filter(|tag| !tag.is_empty())
    }

    /// The defense tag of `item`, defaulting to [`NO_DEFENSE_TAG`].
    ///
    /// `None` means "no item armed" and also resolves to the default.
    pub fn defense_tag(&self, item: Option<&str>) -> &str {
        item.and_then(|name| self.items.get(name))
            .and_then(|tags| tags.defense.as_deref())
            .filter(|tag| !tag.is_empty())
            .unwrap_or(NO_DEFENSE_TAG)
    }

    /// Base damage of `item`, falling back to the table-wide default.
    pub fn base_damage(&self, item: &str) -> f64 {
        self.items
            .get(item)
            .and_then(|tags| tags.damage)
            .unwrap_or(self.base_damage)
    }

    /// The opposition multiplier for an (attack tag, defense tag) pair.
    ///
    /// Defaults to `1.0` when either tag is absent from the matrix.
    pub fn multiplier(&self, attack: &str, defense: &str) -> f64 {
        self.opposition
            .get(attack)
            .and_then(|row| row.vs.get(defense))
            .copied()
            .unwrap_or(1.0)
    }
}

/// A crafting recipe.
///
/// `requires` is checked for sufficiency; `consumes` is debited;
/// `produces` is credited. In most recipes requires equals consumes, but
/// the table permits pure prerequisites (e.g. a tool that is not used up).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Recipe {
    /// Items that must be present to apply the recipe.
    #[serde(default)]
    pub requires: Bundle,
    /// Items removed from the inventory on application.
    #[serde(default)]
    pub consumes: Bundle,
    /// Items added to the inventory on application.
    #[serde(default)]
    pub produces: Bundle,
}

/// The complete static configuration: combat rules, recipes, and the
/// starting inventory granted to lazily-created actors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Rulebook {
    /// The combat rule table.
    #[serde(default)]
    pub combat: CombatRules,
    /// Crafting recipes, keyed by output item name.
    #[serde(default)]
    pub recipes: BTreeMap<String, Recipe>,
    /// Inventory granted on first sight of an unknown actor.
    #[serde(default)]
    pub starting_inventory: Bundle,
}

impl Rulebook {
    /// Load the rulebook from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Io`] when the file cannot be read and
    /// [`RulesError::Json`] when the content does not parse.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The recipe for `item`, when one exists.
    pub fn recipe(&self, item: &str) -> Option<&Recipe> {
        self.recipes.get(item)
    }
}
