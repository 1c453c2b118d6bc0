//! Era definitions bundling archetypes, weapons and upgrades.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::archetype_data::ArchetypeData;
use crate::upgrade::{Era, UpgradeEffect};
use crate::weapon::WeaponProfile;

/// Complete content for one era.
///
/// # Example RON
///
/// ```ron
/// (
///     name: "Ancient",
///     description: "Bronze age warriors",
///     weapons: [(name: "bronze_spear", shots_per_burst: 1, fire_rate: 1,
///                base_hit_chance: 0.8, base_damage: 25, effective_range: 2)],
///     archetypes: [(id: "spearman", base_health: 100, base_move_speed: 5,
///                   weapon: "bronze_spear")],
///     upgrades: [(name: "Veterans", hit_chance_multiplier: 1.2)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "EraConfig")]
pub struct EraData {
    /// Era name.
    pub name: String,

    /// Era this content belongs to. Inferred from `name` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<Era>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Host-side visual theme key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<String>,

    /// Unit types fielded in this era.
    pub archetypes: Vec<ArchetypeData>,

    /// Upgrades offered in this era.
    #[serde(default)]
    pub upgrades: Vec<UpgradeEffect>,

    /// Weapons referenced by this era's archetypes.
    #[serde(default)]
    pub weapons: Vec<WeaponProfile>,
}

impl EraData {
    /// The era, explicit or inferred from the name.
    #[must_use]
    pub fn resolved_era(&self) -> Option<Era> {
        self.era.or_else(|| Era::parse(&self.name))
    }

    /// Get an archetype by id.
    #[must_use]
    pub fn get_archetype(&self, id: &str) -> Option<&ArchetypeData> {
        self.archetypes.iter().find(|a| a.id == id)
    }

    /// Get a weapon by name.
    #[must_use]
    pub fn get_weapon(&self, name: &str) -> Option<&WeaponProfile> {
        self.weapons.iter().find(|w| w.name() == name)
    }

    /// Weapon names referenced by archetypes but not defined in this era.
    #[must_use]
    pub fn external_weapon_refs(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self
            .archetypes
            .iter()
            .filter_map(|a| a.weapon.as_deref())
            .filter(|name| self.get_weapon(name).is_none())
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }

    /// Validate the era and everything nested in it.
    ///
    /// Returns a list of validation errors, or empty if valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("era name must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for (index, weapon) in self.weapons.iter().enumerate() {
            if !seen.insert(weapon.name()) {
                errors.push(format!("Duplicate weapon '{}'", weapon.name()));
            }
            for problem in weapon.validate() {
                errors.push(format!("weapons[{index}] ({}): {problem}", weapon.name()));
            }
        }

        let mut seen = HashSet::new();
        for (index, archetype) in self.archetypes.iter().enumerate() {
            if !seen.insert(archetype.id.as_str()) {
                errors.push(format!("Duplicate archetype '{}'", archetype.id));
            }
            for problem in archetype.validate() {
                errors.push(format!("archetypes[{index}] ({}): {problem}", archetype.id));
            }
        }

        let mut seen = HashSet::new();
        for (index, upgrade) in self.upgrades.iter().enumerate() {
            if !seen.insert(upgrade.id()) {
                errors.push(format!("Duplicate upgrade '{}'", upgrade.id()));
            }
            for problem in upgrade.validate() {
                errors.push(format!("upgrades[{index}] ({}): {problem}", upgrade.id()));
            }
            if let (Some(era), crate::upgrade::EraFilter::Specific(only)) =
                (self.resolved_era(), upgrade.era_filter())
            {
                if era != only {
                    errors.push(format!(
                        "Upgrade '{}' is restricted to {only} but listed in {era}",
                        upgrade.id()
                    ));
                }
            }
        }

        errors
    }

    /// Conventions that are not enforced but usually indicate a typo.
    #[must_use]
    pub fn convention_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.resolved_era().is_none() {
            warnings.push(format!(
                "era '{}' does not name a known era; set `era` explicitly",
                self.name
            ));
        }
        for weapon in &self.weapons {
            for warning in weapon.convention_warnings() {
                warnings.push(format!("weapon '{}': {warning}", weapon.name()));
            }
        }
        for archetype in &self.archetypes {
            for warning in archetype.convention_warnings() {
                warnings.push(format!("archetype '{}': {warning}", archetype.id));
            }
        }
        for upgrade in &self.upgrades {
            for warning in upgrade.convention_warnings() {
                warnings.push(format!("upgrade '{}': {warning}", upgrade.id()));
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ContentFormat;

    const ANCIENT: &str = r#"(
        name: "Ancient",
        weapons: [(name: "bronze_spear", shots_per_burst: 1, fire_rate: 1,
                   base_hit_chance: 0.8, base_damage: 25, effective_range: 2)],
        archetypes: [
            (id: "spearman", base_health: 100, base_move_speed: 5, weapon: "bronze_spear"),
            (id: "archer", base_health: 60, base_move_speed: 5, weapon: "short_bow"),
        ],
        upgrades: [(name: "Veterans", hit_chance_multiplier: 1.2)],
    )"#;

    #[test]
    fn test_parse_era() {
        let era: EraData = ContentFormat::Ron.parse(ANCIENT).unwrap();
        assert_eq!(era.resolved_era(), Some(Era::Ancient));
        assert_eq!(era.archetypes.len(), 2);
        assert_eq!(era.upgrades[0].id(), "veterans");
        assert!(era.validate().is_empty(), "{:?}", era.validate());
    }

    #[test]
    fn test_external_weapon_refs() {
        let era: EraData = ContentFormat::Ron.parse(ANCIENT).unwrap();
        assert_eq!(era.external_weapon_refs(), vec!["short_bow"]);
    }

    #[test]
    fn test_duplicates_are_reported() {
        let mut era: EraData = ContentFormat::Ron.parse(ANCIENT).unwrap();
        let copy = era.archetypes[0].clone();
        era.archetypes.push(copy);
        let errors = era.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate archetype 'spearman'")));
    }

    #[test]
    fn test_era_restricted_upgrade_in_wrong_era() {
        let mut era: EraData = ContentFormat::Ron.parse(ANCIENT).unwrap();
        era.upgrades
            .push(UpgradeEffect::new("radio", "Radio").with_era(Era::WorldWarTwo));
        assert_eq!(era.validate().len(), 1);
    }

    #[test]
    fn test_unknown_era_name_warns() {
        let mut era: EraData = ContentFormat::Ron.parse(ANCIENT).unwrap();
        era.name = "Bronze".to_string();
        assert!(era
            .convention_warnings()
            .iter()
            .any(|w| w.contains("does not name a known era")));
    }
}
