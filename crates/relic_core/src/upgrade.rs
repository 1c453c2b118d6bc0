//! Squad upgrade effects and the eras that gate them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// Thematic era of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Era {
    /// Spears, shields and bows.
    Ancient,
    /// Swords, crossbows and cavalry.
    Medieval,
    /// Rifles, machine guns and armor.
    #[serde(rename = "WWII", alias = "Wwii", alias = "WorldWarTwo")]
    WorldWarTwo,
    /// Energy weapons and drones.
    Future,
}

impl Era {
    /// All eras in chronological order.
    pub const ALL: [Self; 4] = [
        Self::Ancient,
        Self::Medieval,
        Self::WorldWarTwo,
        Self::Future,
    ];

    /// Get the display name for this era.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Ancient => "Ancient",
            Self::Medieval => "Medieval",
            Self::WorldWarTwo => "WWII",
            Self::Future => "Future",
        }
    }

    /// Parse an era name case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|era| era.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which eras an upgrade may be offered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EraFilter {
    /// Available in every era.
    #[default]
    AllEras,
    /// Available only in one era.
    Specific(Era),
}

impl EraFilter {
    /// Check whether the filter admits `era`.
    #[must_use]
    pub fn allows(self, era: Era) -> bool {
        match self {
            Self::AllEras => true,
            Self::Specific(only) => only == era,
        }
    }
}

/// An immutable upgrade that can be stacked onto a squad.
///
/// Authored files name the upgrade; the id defaults to a slug of the
/// name when omitted.
///
/// # Example RON
///
/// ```ron
/// (
///     name: "Veteran Marksmen",
///     hit_chance_multiplier: 1.15,
///     era: Some(Medieval),
///     max_stacks: 2,
///     exclusive_with: ["berserkers"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UpgradeDefinition")]
pub struct UpgradeEffect {
    id: String,
    display_name: String,
    description: Option<String>,
    #[serde(with = "decimal_serde")]
    hit_chance_multiplier: Fixed,
    #[serde(with = "decimal_serde")]
    damage_multiplier: Fixed,
    #[serde(with = "decimal_serde")]
    elevation_bonus: Fixed,
    era_filter: EraFilter,
    max_stacks: u32,
    exclusive_with: Vec<String>,
    cost: u32,
}

/// Authored form of an [`UpgradeEffect`].
#[derive(Debug, Clone, Deserialize)]
struct UpgradeDefinition {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(with = "decimal_serde", default = "one")]
    hit_chance_multiplier: Fixed,
    #[serde(with = "decimal_serde", default = "one")]
    damage_multiplier: Fixed,
    #[serde(with = "decimal_serde", default)]
    elevation_bonus: Fixed,
    #[serde(default)]
    era: Option<Era>,
    #[serde(default = "default_max_stacks")]
    max_stacks: u32,
    #[serde(default)]
    exclusive_with: Vec<String>,
    #[serde(default)]
    cost: u32,
}

fn one() -> Fixed {
    Fixed::ONE
}

const fn default_max_stacks() -> u32 {
    1
}

impl From<UpgradeDefinition> for UpgradeEffect {
    fn from(def: UpgradeDefinition) -> Self {
        let id = def
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slugify(&def.name));
        Self {
            id,
            display_name: def.name,
            description: def.description,
            hit_chance_multiplier: def.hit_chance_multiplier,
            damage_multiplier: def.damage_multiplier,
            elevation_bonus: def.elevation_bonus,
            era_filter: def.era.map_or(EraFilter::AllEras, EraFilter::Specific),
            max_stacks: def.max_stacks,
            exclusive_with: def.exclusive_with,
            cost: def.cost,
        }
    }
}

/// Lowercase a display name into an identifier (`"Iron Will"` -> `"iron_will"`).
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

impl UpgradeEffect {
    /// Create a neutral upgrade (multipliers 1, no elevation bonus, one stack).
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: None,
            hit_chance_multiplier: Fixed::ONE,
            damage_multiplier: Fixed::ONE,
            elevation_bonus: Fixed::ZERO,
            era_filter: EraFilter::AllEras,
            max_stacks: 1,
            exclusive_with: Vec::new(),
            cost: 0,
        }
    }

    /// Builder method to set the hit chance multiplier.
    #[must_use]
    pub fn with_hit_chance_multiplier(mut self, multiplier: Fixed) -> Self {
        self.hit_chance_multiplier = multiplier;
        self
    }

    /// Builder method to set the damage multiplier.
    #[must_use]
    pub fn with_damage_multiplier(mut self, multiplier: Fixed) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    /// Builder method to set the flat elevation bonus.
    #[must_use]
    pub fn with_elevation_bonus(mut self, bonus: Fixed) -> Self {
        self.elevation_bonus = bonus;
        self
    }

    /// Builder method to set the maximum stack count.
    #[must_use]
    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    /// Builder method to restrict the upgrade to one era.
    #[must_use]
    pub fn with_era(mut self, era: Era) -> Self {
        self.era_filter = EraFilter::Specific(era);
        self
    }

    /// Builder method to declare an upgrade this one cannot coexist with.
    #[must_use]
    pub fn exclusive_with(mut self, other_id: impl Into<String>) -> Self {
        self.exclusive_with.push(other_id.into());
        self
    }

    /// Builder method to set the purchase cost.
    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name shown to players.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Description, if authored.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Multiplier applied to the attacker's hit chance.
    #[must_use]
    pub const fn hit_chance_multiplier(&self) -> Fixed {
        self.hit_chance_multiplier
    }

    /// Multiplier applied to damage per hit.
    #[must_use]
    pub const fn damage_multiplier(&self) -> Fixed {
        self.damage_multiplier
    }

    /// Flat bonus added to the high-ground factor.
    #[must_use]
    pub const fn elevation_bonus(&self) -> Fixed {
        self.elevation_bonus
    }

    /// Era restriction.
    #[must_use]
    pub const fn era_filter(&self) -> EraFilter {
        self.era_filter
    }

    /// How many times one squad may stack this upgrade.
    #[must_use]
    pub const fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    /// Purchase cost.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Ids this upgrade declares itself exclusive with.
    #[must_use]
    pub fn exclusions(&self) -> &[String] {
        &self.exclusive_with
    }

    /// Check if this upgrade is available in an era.
    #[must_use]
    pub fn is_available_in(&self, era: Era) -> bool {
        self.era_filter.allows(era)
    }

    /// Check if either upgrade declares the other exclusive.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.exclusive_with.iter().any(|id| id == other.id())
            || other.exclusive_with.iter().any(|id| id == self.id())
    }

    /// Collect every rule this upgrade violates.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("upgrade id must not be empty".to_string());
        }
        if self.display_name.trim().is_empty() {
            errors.push("upgrade name must not be empty".to_string());
        }
        if self.hit_chance_multiplier < Fixed::ZERO {
            errors.push(format!(
                "hit_chance_multiplier must not be negative, got {}",
                self.hit_chance_multiplier
            ));
        }
        if self.damage_multiplier < Fixed::ZERO {
            errors.push(format!(
                "damage_multiplier must not be negative, got {}",
                self.damage_multiplier
            ));
        }
        if self.max_stacks < 1 {
            errors.push("max_stacks must be at least 1".to_string());
        }
        if self.exclusive_with.iter().any(|id| id == &self.id) {
            errors.push(format!("upgrade '{}' cannot exclude itself", self.id));
        }

        errors
    }

    /// Conventions that are not enforced but usually indicate a typo.
    #[must_use]
    pub fn convention_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.elevation_bonus < -Fixed::ONE || self.elevation_bonus > Fixed::ONE {
            warnings.push(format!(
                "elevation_bonus {} is outside the conventional [-1, 1]",
                self.elevation_bonus
            ));
        }
        warnings
    }
}
