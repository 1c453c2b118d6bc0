//! Reference host loop for the combat core.
//!
//! The battlefield owns every unit, squad and AI controller on one
//! tabletop and advances them with a fixed system order. Engines that
//! already own their units can skip this module and drive
//! [`UnitAi`] and [`CombatResolver`] through their own [`AiHost`].
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - All randomness comes from the resolver's seeded generator
//! - Units are processed in ascending id order
//!
//! # Example
//!
//! ```
//! use relic_core::battlefield::Battlefield;
//! use relic_core::math::{Fixed, Vec3Fixed};
//! use relic_core::unit::UnitSpawnParams;
//!
//! let mut field = Battlefield::new(7);
//! let scout = field.spawn_unit(UnitSpawnParams {
//!     move_speed: Fixed::from_num(2),
//!     ..Default::default()
//! });
//!
//! assert!(field.order_move(scout, Vec3Fixed::from_ints(4, 0, 0)).unwrap());
//! field.tick(Fixed::ONE);
//! field.tick(Fixed::ONE);
//! assert_eq!(field.unit(scout).unwrap().position, Vec3Fixed::from_ints(4, 0, 0));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ai::{
    AiEvent, AiHost, AiState, Pathfinder, SpatialQuery, UnitAi, UnitInfo, DEFAULT_DETECTION_RADIUS,
};
use crate::combat::{CombatResolver, CombatResult};
use crate::data::{Archetype, ContentRegistry};
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec3Fixed};
use crate::squad::{Squad, SquadEvent, SquadId, SquadRegistry};
use crate::unit::{TeamId, Unit, UnitEvent, UnitId, UnitSpawnParams};
use crate::upgrade::UpgradeEffect;
use crate::weapon::WeaponProfile;

/// Storage for all units on the battlefield.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration
/// via sorted keys when running systems.
#[derive(Debug, Clone, Default)]
pub struct UnitStorage {
    units: HashMap<UnitId, Unit>,
    next_id: UnitId,
}

impl UnitStorage {
    /// Create empty unit storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new unit and return its assigned id.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        unit.set_id(id);
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Put back a unit previously taken with [`remove`](Self::remove),
    /// keeping its id.
    fn restore(&mut self, unit: Unit) {
        self.units.insert(unit.id(), unit);
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit ids in ascending order for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all units (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }
}

/// Rectangular tabletop area. Accepts any destination inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaBounds {
    /// Minimum corner in the table plane (`x`, `z`).
    pub min: (Fixed, Fixed),
    /// Maximum corner in the table plane (`x`, `z`).
    pub max: (Fixed, Fixed),
}

impl ArenaBounds {
    /// Bounds centered on the origin.
    #[must_use]
    pub fn centered(half_width: Fixed, half_depth: Fixed) -> Self {
        Self {
            min: (-half_width, -half_depth),
            max: (half_width, half_depth),
        }
    }

    /// Whether a point lies inside the bounds (edges included).
    #[must_use]
    pub fn contains(&self, point: Vec3Fixed) -> bool {
        (self.min.0..=self.max.0).contains(&point.x) && (self.min.1..=self.max.1).contains(&point.z)
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self::centered(Fixed::from_num(50), Fixed::from_num(50))
    }
}

impl Pathfinder for ArenaBounds {
    fn request_move(&mut self, _unit: UnitId, destination: Vec3Fixed) -> bool {
        self.contains(destination)
    }
}

/// Events generated during a battlefield tick.
///
/// The game layer uses these to drive health bars, effects and sounds.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Health changes and deaths, in unit id order.
    pub unit_events: Vec<UnitEvent>,
    /// Squad membership and upgrade changes.
    pub squad_events: Vec<SquadEvent>,
    /// AI state changes and bursts, in unit id order.
    pub ai_events: Vec<AiEvent>,
    /// Units removed this tick because they died.
    pub deaths: Vec<UnitId>,
}

impl TickEvents {
    /// Bursts fired this tick.
    pub fn bursts(&self) -> impl Iterator<Item = (UnitId, UnitId, CombatResult)> + '_ {
        self.ai_events.iter().filter_map(|event| match *event {
            AiEvent::BurstFired {
                unit,
                target,
                result,
            } => Some((unit, target, result)),
            AiEvent::StateChanged { .. } => None,
        })
    }
}

/// A tabletop battle: units, squads, AI and the resolver.
///
/// # System Execution Order
///
/// Each tick, systems run in this order:
/// 1. **Movement** - Move `Moving` units straight toward their destination
/// 2. **AI** - Update every controller; bursts resolve immediately
/// 3. **Events** - Drain unit, squad and AI notifications
/// 4. **Cleanup** - Despawn dead units
#[derive(Debug)]
pub struct Battlefield<P = ArenaBounds> {
    tick: u64,
    units: UnitStorage,
    squads: SquadRegistry,
    controllers: HashMap<UnitId, UnitAi>,
    resolver: CombatResolver,
    pathfinder: P,
}

impl Battlefield<ArenaBounds> {
    /// Create an empty battlefield with default arena bounds.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_pathfinder(seed, ArenaBounds::default())
    }
}

impl<P: Pathfinder> Battlefield<P> {
    /// Create an empty battlefield with a custom pathfinder.
    #[must_use]
    pub fn with_pathfinder(seed: u64, pathfinder: P) -> Self {
        Self {
            tick: 0,
            units: UnitStorage::new(),
            squads: SquadRegistry::new(),
            controllers: HashMap::new(),
            resolver: CombatResolver::from_seed(seed),
            pathfinder,
        }
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// All units.
    #[must_use]
    pub fn units(&self) -> &UnitStorage {
        &self.units
    }

    /// Get a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// All squads.
    #[must_use]
    pub fn squads(&self) -> &SquadRegistry {
        &self.squads
    }

    /// Get a squad by id.
    #[must_use]
    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(id)
    }

    /// AI controller of a unit.
    #[must_use]
    pub fn controller(&self, id: UnitId) -> Option<&UnitAi> {
        self.controllers.get(&id)
    }

    /// Spawn a unit with an AI controller.
    ///
    /// Armed units auto-engage enemies in their detection radius.
    pub fn spawn_unit(&mut self, params: UnitSpawnParams) -> UnitId {
        let id = self.units.insert(params.build());
        if let Some(unit) = self.units.get(id) {
            let radius = params.detection_radius.unwrap_or(DEFAULT_DETECTION_RADIUS);
            let ai = UnitAi::new(unit, radius).with_auto_engage(unit.weapon.is_some());
            self.controllers.insert(id, ai);
        }
        tracing::debug!(unit = id, team = params.team_id, "Unit spawned");
        id
    }

    /// Spawn a unit from a loaded archetype.
    pub fn spawn_from_archetype(
        &mut self,
        archetype: &Archetype,
        team_id: TeamId,
        position: Vec3Fixed,
    ) -> UnitId {
        self.spawn_unit(archetype.spawn_params(team_id, position))
    }

    /// Spawn a unit from an archetype registered in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ArchetypeNotFound`] for an unknown id and
    /// [`GameError::InvalidConfig`] if the archetype carries a weapon that
    /// fails validation.
    pub fn spawn_archetype(
        &mut self,
        registry: &ContentRegistry,
        id: &str,
        team_id: TeamId,
        position: Vec3Fixed,
    ) -> Result<UnitId> {
        let archetype = registry
            .archetype(id)
            .ok_or_else(|| GameError::ArchetypeNotFound(id.to_string()))?;
        if let Some(weapon) = &archetype.weapon {
            weapon.ensure_valid()?;
        }
        Ok(self.spawn_from_archetype(archetype, team_id, position))
    }

    /// Remove a unit, its AI and its squad membership.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit doesn't exist.
    pub fn despawn_unit(&mut self, id: UnitId) -> Result<()> {
        self.units.remove(id).ok_or(GameError::UnitNotFound(id))?;
        self.squads.remove_unit(id);
        self.controllers.remove(&id);
        Ok(())
    }

    /// Create an empty squad for a team.
    pub fn create_squad(&mut self, team_id: TeamId) -> SquadId {
        self.squads.create_squad(team_id)
    }

    /// Move a unit into a squad, leaving any previous squad.
    ///
    /// Returns `Ok(false)` if the unit is already in that squad.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit or squad doesn't exist, or if the
    /// squad belongs to another team.
    pub fn assign_to_squad(&mut self, unit: UnitId, squad: SquadId) -> Result<bool> {
        let team = self
            .units
            .get(unit)
            .ok_or(GameError::UnitNotFound(unit))?
            .team_id;
        let squad_team = self
            .squads
            .get(squad)
            .ok_or(GameError::SquadNotFound(squad))?
            .team_id();
        if squad_team != team {
            return Err(GameError::InvalidState(format!(
                "Unit {unit} (team {team}) cannot join squad {squad} (team {squad_team})"
            )));
        }

        if !self.squads.assign(unit, squad) {
            return Ok(false);
        }
        if let Some(u) = self.units.get_mut(unit) {
            u.set_squad(Some(squad));
        }
        Ok(true)
    }

    /// Take a unit out of its squad.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit doesn't exist.
    pub fn remove_from_squad(&mut self, unit: UnitId) -> Result<Option<SquadId>> {
        let u = self
            .units
            .get_mut(unit)
            .ok_or(GameError::UnitNotFound(unit))?;
        u.set_squad(None);
        Ok(self.squads.remove_unit(unit))
    }

    /// Disband a squad, releasing every member.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] if the squad doesn't exist.
    pub fn disband_squad(&mut self, squad: SquadId) -> Result<()> {
        let members: Vec<_> = self
            .squads
            .get(squad)
            .ok_or(GameError::SquadNotFound(squad))?
            .members()
            .collect();
        self.squads.destroy(squad);
        for id in members {
            if let Some(unit) = self.units.get_mut(id) {
                unit.set_squad(None);
            }
        }
        Ok(())
    }

    /// Disband every squad (match reset).
    pub fn reset_squads(&mut self) {
        self.squads.reset();
        for id in self.units.sorted_ids() {
            if let Some(unit) = self.units.get_mut(id) {
                unit.set_squad(None);
            }
        }
    }

    /// Stack an upgrade onto a squad.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] if the squad doesn't exist.
    pub fn apply_upgrade(&mut self, squad: SquadId, effect: Arc<UpgradeEffect>) -> Result<bool> {
        let squad_ref = self
            .squads
            .get_mut(squad)
            .ok_or(GameError::SquadNotFound(squad))?;
        Ok(squad_ref.apply_upgrade(effect))
    }

    /// Remove one stack of an upgrade from a squad.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SquadNotFound`] if the squad doesn't exist.
    pub fn remove_upgrade(&mut self, squad: SquadId, effect: &UpgradeEffect) -> Result<bool> {
        let squad_ref = self
            .squads
            .get_mut(squad)
            .ok_or(GameError::SquadNotFound(squad))?;
        Ok(squad_ref.remove_upgrade(effect))
    }

    /// Order a unit to move. `Ok(false)` if the pathfinder refuses.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit has no controller.
    pub fn order_move(&mut self, unit: UnitId, destination: Vec3Fixed) -> Result<bool> {
        let ai = self
            .controllers
            .get_mut(&unit)
            .ok_or(GameError::UnitNotFound(unit))?;
        Ok(ai.move_to(destination, &mut self.pathfinder))
    }

    /// Order a unit to attack another. `Ok(false)` if the target is not
    /// a living enemy.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if either unit doesn't exist.
    pub fn order_attack(&mut self, unit: UnitId, target: UnitId) -> Result<bool> {
        let target_ref = self
            .units
            .get(target)
            .ok_or(GameError::UnitNotFound(target))?;
        let ai = self
            .controllers
            .get_mut(&unit)
            .ok_or(GameError::UnitNotFound(unit))?;
        Ok(ai.set_target(Some(target_ref)))
    }

    /// Order a unit to stop.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit has no controller.
    pub fn order_stop(&mut self, unit: UnitId) -> Result<()> {
        self.controllers
            .get_mut(&unit)
            .ok_or(GameError::UnitNotFound(unit))?
            .stop();
        Ok(())
    }

    /// Freeze or resume a unit's AI.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit has no controller.
    pub fn set_ai_enabled(&mut self, unit: UnitId, enabled: bool) -> Result<()> {
        self.controllers
            .get_mut(&unit)
            .ok_or(GameError::UnitNotFound(unit))?
            .set_enabled(enabled);
        Ok(())
    }

    /// Replace a unit's weapon. Its AI picks up the new fire rate on the
    /// next tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit doesn't exist.
    pub fn equip_weapon(
        &mut self,
        unit: UnitId,
        weapon: Option<Arc<WeaponProfile>>,
    ) -> Result<()> {
        let target = self
            .units
            .get_mut(unit)
            .ok_or(GameError::UnitNotFound(unit))?;
        tracing::debug!(
            unit,
            weapon = weapon.as_ref().map(|w| w.name()),
            "Weapon equipped"
        );
        target.weapon = weapon;
        Ok(())
    }

    /// Deal raw damage to a unit outside of combat (scripted hazards).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit doesn't exist.
    pub fn damage_unit(&mut self, unit: UnitId, raw: Fixed) -> Result<u32> {
        Ok(self
            .units
            .get_mut(unit)
            .ok_or(GameError::UnitNotFound(unit))?
            .apply_damage(raw))
    }

    /// Heal a unit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit doesn't exist.
    pub fn heal_unit(&mut self, unit: UnitId, amount: u32) -> Result<u32> {
        Ok(self
            .units
            .get_mut(unit)
            .ok_or(GameError::UnitNotFound(unit))?
            .heal(amount))
    }

    /// Advance the battlefield by `delta_seconds`.
    pub fn tick(&mut self, delta_seconds: Fixed) -> TickEvents {
        let mut events = TickEvents::default();
        let unit_ids = self.units.sorted_ids();

        // 1. Movement
        self.run_movement_system(&unit_ids, delta_seconds);

        // 2. AI
        for &id in &unit_ids {
            if let Some(mut ai) = self.controllers.remove(&id) {
                ai.update(delta_seconds, self);
                events.ai_events.extend(ai.drain_events());
                self.controllers.insert(id, ai);
            }
        }

        // 3. Events
        for &id in &unit_ids {
            if let Some(unit) = self.units.get_mut(id) {
                events.unit_events.extend(unit.drain_events());
            }
        }

        // 4. Cleanup
        for &id in &unit_ids {
            if self.units.get(id).is_some_and(|unit| !unit.is_alive()) {
                self.squads.remove_unit(id);
                self.units.remove(id);
                self.controllers.remove(&id);
                events.deaths.push(id);
            }
        }
        events.squad_events = self.squads.drain_events();

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Battlefield state hash");
        }

        events
    }

    fn run_movement_system(&mut self, unit_ids: &[UnitId], delta_seconds: Fixed) {
        for &id in unit_ids {
            let Some(ai) = self.controllers.get_mut(&id) else {
                continue;
            };
            let (AiState::Moving, Some(destination)) = (ai.state(), ai.destination()) else {
                continue;
            };
            let Some(unit) = self.units.get_mut(id).filter(|unit| unit.is_alive()) else {
                continue;
            };

            let step = unit.move_speed.saturating_mul(delta_seconds.max(Fixed::ZERO));
            unit.position = unit.position.move_towards(destination, step);
            if unit.position == destination {
                ai.on_move_complete();
            }
        }
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        for unit in self.units.iter() {
            let health = unit.health();
            debug_assert!(health.current <= health.max, "unit {} overhealed", unit.id());
            debug_assert_eq!(
                unit.squad(),
                self.squads.squad_of(unit.id()),
                "unit {} squad link out of sync",
                unit.id()
            );
        }
    }

    /// Hash of the current state, for determinism checks.
    ///
    /// Two battlefields with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);

        let ids = self.units.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            let Some(unit) = self.units.get(id) else {
                continue;
            };
            id.hash(&mut hasher);
            unit.team_id.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.health().hash(&mut hasher);
            unit.squad().hash(&mut hasher);

            if let Some(ai) = self.controllers.get(&id) {
                ai.state().hash(&mut hasher);
                ai.current_target().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

impl<P> SpatialQuery for Battlefield<P> {
    fn find_nearest_enemy(&self, from: UnitId, radius: Fixed) -> Option<UnitId> {
        let origin = self.units.get(from)?;
        let radius_sq = radius.saturating_mul(radius);

        self.units
            .iter()
            .filter(|unit| unit.is_alive() && unit.team_id != origin.team_id)
            .map(|unit| {
                (
                    unit.position.horizontal_distance_squared(origin.position),
                    unit.id(),
                )
            })
            .filter(|&(distance_sq, _)| distance_sq <= radius_sq)
            .min()
            .map(|(_, id)| id)
    }
}

impl<P> AiHost for Battlefield<P> {
    fn unit_info(&self, id: UnitId) -> Option<UnitInfo> {
        self.units.get(id).map(UnitInfo::from)
    }

    fn fire(&mut self, attacker: UnitId, target: UnitId) -> Option<CombatResult> {
        if attacker == target {
            return None;
        }
        let weapon = self.units.get(attacker)?.weapon.clone()?;
        let mut victim = self.units.remove(target)?;

        let result = self.units.get(attacker).map(|shooter| {
            self.resolver
                .resolve_combat(Some(shooter), Some(&mut victim), Some(&weapon), &self.squads)
        });

        self.units.restore(victim);
        result
    }
}
