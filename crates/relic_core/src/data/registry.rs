//! In-memory registry of loaded content.
//!
//! Registration is all-or-nothing: a document that fails validation,
//! collides with an existing id, or references an unknown weapon leaves
//! the registry unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::archetype_data::ArchetypeData;
use super::era_data::EraData;
use super::validation::ContentDocument;
use super::{DataLoadError, DataLoadResult};
use crate::math::{Fixed, Vec3Fixed};
use crate::unit::{TeamId, UnitSpawnParams};
use crate::upgrade::{Era, UpgradeEffect};
use crate::weapon::WeaponProfile;

/// A unit type with its weapon resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archetype {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Era the archetype was registered under, if any.
    pub era: Option<Era>,
    /// Maximum health.
    pub max_health: u32,
    /// Movement speed in units per second.
    pub move_speed: Fixed,
    /// Percentage damage reduction.
    pub armor: u8,
    /// AI detection radius.
    pub detection_radius: Fixed,
    /// Shared weapon; `None` for non-combatants.
    pub weapon: Option<Arc<WeaponProfile>>,
    /// Host-side visual asset path.
    pub prefab: Option<String>,
}

impl Archetype {
    /// Spawn parameters for a unit of this archetype.
    #[must_use]
    pub fn spawn_params(&self, team_id: TeamId, position: Vec3Fixed) -> UnitSpawnParams {
        UnitSpawnParams {
            team_id,
            position,
            max_health: self.max_health,
            armor: self.armor,
            move_speed: self.move_speed,
            weapon: self.weapon.clone(),
            detection_radius: Some(self.detection_radius),
        }
    }
}

/// Summary of a registered era.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraInfo {
    /// Era name as authored.
    pub name: String,
    /// Resolved era.
    pub era: Era,
    /// Free-form description.
    pub description: Option<String>,
    /// Host-side visual theme key.
    pub visual_style: Option<String>,
    /// Archetype ids in authored order.
    pub archetypes: Vec<String>,
    /// Upgrade ids in authored order.
    pub upgrades: Vec<String>,
}

/// Registry of all loaded content, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    eras: BTreeMap<Era, EraInfo>,
    weapons: BTreeMap<String, Arc<WeaponProfile>>,
    upgrades: BTreeMap<String, Arc<UpgradeEffect>>,
    archetypes: BTreeMap<String, Archetype>,
}

impl ContentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register any content document.
    ///
    /// # Errors
    ///
    /// See the kind-specific `register_*` methods.
    pub fn register(&mut self, document: ContentDocument) -> DataLoadResult<()> {
        match document {
            ContentDocument::Era(era) => self.register_era(era),
            ContentDocument::Archetype(archetype) => self.register_archetype(archetype, None),
            ContentDocument::Weapon(weapon) => self.register_weapon(weapon).map(|_| ()),
            ContentDocument::Upgrade(upgrade) => self.register_upgrade(upgrade).map(|_| ()),
        }
    }

    /// Register a weapon.
    ///
    /// # Errors
    ///
    /// Returns an error if the weapon is invalid or its name is taken.
    pub fn register_weapon(&mut self, weapon: WeaponProfile) -> DataLoadResult<Arc<WeaponProfile>> {
        check_valid("weapon", weapon.name(), weapon.validate())?;
        if self.weapons.contains_key(weapon.name()) {
            return Err(duplicate("weapon", weapon.name()));
        }
        let weapon = Arc::new(weapon);
        self.weapons
            .insert(weapon.name().to_string(), Arc::clone(&weapon));
        Ok(weapon)
    }

    /// Register an upgrade.
    ///
    /// # Errors
    ///
    /// Returns an error if the upgrade is invalid or its id is taken.
    pub fn register_upgrade(&mut self, upgrade: UpgradeEffect) -> DataLoadResult<Arc<UpgradeEffect>> {
        check_valid("upgrade", upgrade.id(), upgrade.validate())?;
        if self.upgrades.contains_key(upgrade.id()) {
            return Err(duplicate("upgrade", upgrade.id()));
        }
        let upgrade = Arc::new(upgrade);
        self.upgrades
            .insert(upgrade.id().to_string(), Arc::clone(&upgrade));
        Ok(upgrade)
    }

    /// Register an archetype, resolving its weapon reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the archetype is invalid, its id is taken, or
    /// it references a weapon that is not registered.
    pub fn register_archetype(&mut self, data: ArchetypeData, era: Option<Era>) -> DataLoadResult<()> {
        check_valid("archetype", &data.id, data.validate())?;
        if self.archetypes.contains_key(&data.id) {
            return Err(duplicate("archetype", &data.id));
        }
        let archetype = self.resolve_archetype(data, era, &BTreeMap::new())?;
        self.archetypes.insert(archetype.id.clone(), archetype);
        Ok(())
    }

    /// Register a whole era.
    ///
    /// Weapons are registered first so the era's archetypes can reference
    /// them; archetypes may also reference weapons registered earlier.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of the era is invalid, duplicates
    /// existing content, or references an unknown weapon. Nothing is
    /// registered in that case.
    pub fn register_era(&mut self, data: EraData) -> DataLoadResult<()> {
        check_valid("era", &data.name, data.validate())?;
        let Some(era) = data.resolved_era() else {
            return Err(DataLoadError::ValidationError {
                kind: "era".to_string(),
                id: data.name.clone(),
                errors: vec![format!("'{}' does not name a known era", data.name)],
            });
        };

        if self.eras.contains_key(&era) {
            return Err(duplicate("era", era.display_name()));
        }
        if let Some(weapon) = data.weapons.iter().find(|w| self.weapons.contains_key(w.name())) {
            return Err(duplicate("weapon", weapon.name()));
        }
        if let Some(upgrade) = data.upgrades.iter().find(|u| self.upgrades.contains_key(u.id())) {
            return Err(duplicate("upgrade", upgrade.id()));
        }
        if let Some(archetype) = data
            .archetypes
            .iter()
            .find(|a| self.archetypes.contains_key(&a.id))
        {
            return Err(duplicate("archetype", &archetype.id));
        }

        let local_weapons: BTreeMap<String, Arc<WeaponProfile>> = data
            .weapons
            .into_iter()
            .map(|w| (w.name().to_string(), Arc::new(w)))
            .collect();

        let mut archetypes = Vec::with_capacity(data.archetypes.len());
        for archetype in data.archetypes {
            archetypes.push(self.resolve_archetype(archetype, Some(era), &local_weapons)?);
        }

        let info = EraInfo {
            name: data.name,
            era,
            description: data.description,
            visual_style: data.visual_style,
            archetypes: archetypes.iter().map(|a| a.id.clone()).collect(),
            upgrades: data.upgrades.iter().map(|u| u.id().to_string()).collect(),
        };

        tracing::info!(
            era = %era,
            weapons = local_weapons.len(),
            archetypes = archetypes.len(),
            upgrades = data.upgrades.len(),
            "Registered era"
        );

        self.weapons.extend(local_weapons);
        for upgrade in data.upgrades {
            self.upgrades
                .insert(upgrade.id().to_string(), Arc::new(upgrade));
        }
        for archetype in archetypes {
            self.archetypes.insert(archetype.id.clone(), archetype);
        }
        self.eras.insert(era, info);
        Ok(())
    }

    fn resolve_archetype(
        &self,
        data: ArchetypeData,
        era: Option<Era>,
        local_weapons: &BTreeMap<String, Arc<WeaponProfile>>,
    ) -> DataLoadResult<Archetype> {
        let weapon = match (&data.weapon, data.weapon_stats) {
            (Some(name), _) => Some(
                local_weapons
                    .get(name)
                    .or_else(|| self.weapons.get(name))
                    .cloned()
                    .ok_or_else(|| DataLoadError::MissingWeapon {
                        archetype: data.id.clone(),
                        weapon: name.clone(),
                    })?,
            ),
            (None, Some(stats)) => Some(Arc::new(stats)),
            (None, None) => None,
        };

        Ok(Archetype {
            name: data.name.unwrap_or_else(|| data.id.clone()),
            id: data.id,
            era,
            max_health: data.base_health,
            move_speed: data.base_move_speed,
            armor: data.armor,
            detection_radius: data.detection_radius,
            weapon,
            prefab: data.prefab,
        })
    }

    /// Get a weapon by name.
    #[must_use]
    pub fn weapon(&self, name: &str) -> Option<Arc<WeaponProfile>> {
        self.weapons.get(name).cloned()
    }

    /// Get an upgrade by id.
    #[must_use]
    pub fn upgrade(&self, id: &str) -> Option<Arc<UpgradeEffect>> {
        self.upgrades.get(id).cloned()
    }

    /// Get an archetype by id.
    #[must_use]
    pub fn archetype(&self, id: &str) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    /// Get era information.
    #[must_use]
    pub fn era(&self, era: Era) -> Option<&EraInfo> {
        self.eras.get(&era)
    }

    /// Every upgrade available in `era`, sorted by id.
    #[must_use]
    pub fn upgrades_for_era(&self, era: Era) -> Vec<Arc<UpgradeEffect>> {
        self.upgrades
            .values()
            .filter(|u| u.is_available_in(era))
            .cloned()
            .collect()
    }

    /// Number of registered eras.
    #[must_use]
    pub fn era_count(&self) -> usize {
        self.eras.len()
    }

    /// Number of registered weapons.
    #[must_use]
    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }

    /// Number of registered upgrades.
    #[must_use]
    pub fn upgrade_count(&self) -> usize {
        self.upgrades.len()
    }

    /// Number of registered archetypes.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.eras.is_empty()
            && self.weapons.is_empty()
            && self.upgrades.is_empty()
            && self.archetypes.is_empty()
    }
}

fn check_valid(kind: &str, id: &str, errors: Vec<String>) -> DataLoadResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(DataLoadError::ValidationError {
        kind: kind.to_string(),
        id: id.to_string(),
        errors,
    })
}

fn duplicate(kind: &str, id: &str) -> DataLoadError {
    DataLoadError::DuplicateId {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}
