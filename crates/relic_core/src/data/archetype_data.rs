//! Unit archetype definitions.

use serde::{Deserialize, Serialize};

use crate::ai::DEFAULT_DETECTION_RADIUS;
use crate::math::{decimal_serde, Fixed};
use crate::weapon::WeaponProfile;

/// Highest authored health.
pub const MAX_BASE_HEALTH: u32 = 10_000;

/// Highest authored armor percentage.
pub const MAX_ARMOR: u8 = 99;

/// Data-driven unit type.
///
/// An archetype either references a weapon by name (`weapon`), carries its
/// own (`weapon_stats`), or has neither and is a non-combatant.
///
/// # Example RON
///
/// ```ron
/// (
///     id: "hoplite",
///     name: "Hoplite",
///     base_health: 120,
///     base_move_speed: 3.5,
///     armor: 30,
///     weapon: "bronze_spear",
///     prefab: "Units/Ancient/Hoplite",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "UnitArchetype")]
pub struct ArchetypeData {
    /// Unique identifier, referenced by spawn requests.
    pub id: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Maximum health.
    pub base_health: u32,

    /// Movement speed in units per second.
    #[serde(with = "decimal_serde")]
    pub base_move_speed: Fixed,

    /// Name of a registered weapon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,

    /// Weapon owned by this archetype alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_stats: Option<WeaponProfile>,

    /// Host-side visual asset path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefab: Option<String>,

    /// Percentage damage reduction.
    #[serde(default)]
    pub armor: u8,

    /// AI detection radius.
    #[serde(with = "decimal_serde", default = "default_detection_radius")]
    pub detection_radius: Fixed,
}

fn default_detection_radius() -> Fixed {
    DEFAULT_DETECTION_RADIUS
}

impl ArchetypeData {
    /// Display name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Whether the archetype carries any weapon.
    #[must_use]
    pub fn is_combatant(&self) -> bool {
        self.weapon.is_some() || self.weapon_stats.is_some()
    }

    /// Validate the archetype data for consistency.
    ///
    /// Returns a list of validation errors, or empty if valid. Weapon
    /// references are resolved later, against the content registry.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("archetype id must not be empty".to_string());
        }
        if self.base_health == 0 || self.base_health > MAX_BASE_HEALTH {
            errors.push(format!(
                "base_health must be within [1, {MAX_BASE_HEALTH}], got {}",
                self.base_health
            ));
        }
        if self.base_move_speed < Fixed::ZERO || self.base_move_speed > Fixed::from_num(100) {
            errors.push(format!(
                "base_move_speed must be within [0, 100], got {}",
                self.base_move_speed
            ));
        }
        if self.armor > MAX_ARMOR {
            errors.push(format!(
                "armor must be at most {MAX_ARMOR}, got {}",
                self.armor
            ));
        }
        if self.detection_radius <= Fixed::ZERO {
            errors.push(format!(
                "detection_radius must be positive, got {}",
                self.detection_radius
            ));
        }
        if self.weapon.is_some() && self.weapon_stats.is_some() {
            errors.push("set either weapon or weapon_stats, not both".to_string());
        }
        if let Some(stats) = &self.weapon_stats {
            for problem in stats.validate() {
                errors.push(format!("weapon_stats: {problem}"));
            }
        }

        errors
    }

    /// Conventions that are not enforced but usually indicate a typo.
    #[must_use]
    pub fn convention_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.is_combatant() {
            warnings.push(format!(
                "archetype '{}' has no weapon and will never attack",
                self.id
            ));
        }
        if let Some(stats) = &self.weapon_stats {
            for warning in stats.convention_warnings() {
                warnings.push(format!("weapon_stats: {warning}"));
            }
        }
        warnings
    }
}
