//! Squads: unit groupings that share stacked upgrade modifiers.
//!
//! A squad's modifiers are folded from its applied upgrades every time
//! they are read, so they always reflect the current upgrade set. All
//! rejected operations return `false` and leave the squad untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::math::Fixed;
use crate::unit::{TeamId, UnitId};
use crate::upgrade::UpgradeEffect;

/// Unique identifier for squads.
pub type SquadId = u32;

/// Notifications emitted by squad mutations, drained by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquadEvent {
    /// A unit joined the squad.
    MemberAdded {
        /// Squad that changed.
        squad: SquadId,
        /// Unit that joined.
        unit: UnitId,
    },
    /// A unit left the squad.
    MemberRemoved {
        /// Squad that changed.
        squad: SquadId,
        /// Unit that left.
        unit: UnitId,
    },
    /// An upgrade stack was added.
    UpgradeApplied {
        /// Squad that changed.
        squad: SquadId,
        /// Upgrade id.
        upgrade: String,
        /// Stack count after the change.
        stacks: u32,
    },
    /// An upgrade stack was removed.
    UpgradeRemoved {
        /// Squad that changed.
        squad: SquadId,
        /// Upgrade id.
        upgrade: String,
        /// Stack count after the change.
        stacks: u32,
    },
}

/// A group of units sharing upgrade modifiers.
#[derive(Debug, Clone)]
pub struct Squad {
    id: SquadId,
    team_id: TeamId,
    members: BTreeSet<UnitId>,
    upgrades: Vec<Arc<UpgradeEffect>>,
    events: Vec<SquadEvent>,
}

impl Squad {
    /// Create an empty squad.
    #[must_use]
    pub fn new(id: SquadId, team_id: TeamId) -> Self {
        Self {
            id,
            team_id,
            members: BTreeSet::new(),
            upgrades: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Squad identifier.
    #[must_use]
    pub const fn id(&self) -> SquadId {
        self.id
    }

    /// Owning team.
    #[must_use]
    pub const fn team_id(&self) -> TeamId {
        self.team_id
    }

    /// Add a unit. Duplicates are rejected.
    pub fn add_member(&mut self, unit: UnitId) -> bool {
        if !self.members.insert(unit) {
            return false;
        }
        self.events.push(SquadEvent::MemberAdded {
            squad: self.id,
            unit,
        });
        true
    }

    /// Remove a unit. Units that are not members are rejected.
    pub fn remove_member(&mut self, unit: UnitId) -> bool {
        if !self.members.remove(&unit) {
            return false;
        }
        self.events.push(SquadEvent::MemberRemoved {
            squad: self.id,
            unit,
        });
        true
    }

    /// Check if a unit is a member.
    #[must_use]
    pub fn contains(&self, unit: UnitId) -> bool {
        self.members.contains(&unit)
    }

    /// Members in ascending id order.
    pub fn members(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.members.iter().copied()
    }

    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Whether the squad has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Stack an upgrade onto the squad.
    ///
    /// Rejected when the upgrade is already at `max_stacks` or when any
    /// applied upgrade is mutually exclusive with it.
    pub fn apply_upgrade(&mut self, effect: Arc<UpgradeEffect>) -> bool {
        let stacks = self.upgrade_stack_count(&effect);
        if stacks >= effect.max_stacks() {
            tracing::debug!(
                squad = self.id,
                upgrade = effect.id(),
                stacks,
                "Upgrade rejected: stack limit reached"
            );
            return false;
        }

        if let Some(conflict) = self
            .upgrades
            .iter()
            .find(|applied| applied.id() != effect.id() && applied.conflicts_with(&effect))
        {
            tracing::debug!(
                squad = self.id,
                upgrade = effect.id(),
                conflict = conflict.id(),
                "Upgrade rejected: mutually exclusive"
            );
            return false;
        }

        let upgrade = effect.id().to_string();
        self.upgrades.push(effect);
        self.events.push(SquadEvent::UpgradeApplied {
            squad: self.id,
            upgrade,
            stacks: stacks + 1,
        });
        true
    }

    /// Remove one stack of an upgrade, if any is applied.
    pub fn remove_upgrade(&mut self, effect: &UpgradeEffect) -> bool {
        let Some(index) = self
            .upgrades
            .iter()
            .rposition(|applied| applied.id() == effect.id())
        else {
            return false;
        };

        self.upgrades.remove(index);
        self.events.push(SquadEvent::UpgradeRemoved {
            squad: self.id,
            upgrade: effect.id().to_string(),
            stacks: self.upgrade_stack_count(effect),
        });
        true
    }

    /// Current stack count of an upgrade; 0 when not applied.
    #[must_use]
    pub fn upgrade_stack_count(&self, effect: &UpgradeEffect) -> u32 {
        self.stack_count_by_id(effect.id())
    }

    /// Current stack count of an upgrade id.
    #[must_use]
    pub fn stack_count_by_id(&self, upgrade_id: &str) -> u32 {
        let count = self
            .upgrades
            .iter()
            .filter(|applied| applied.id() == upgrade_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Total applied stacks across all upgrades.
    #[must_use]
    pub fn upgrade_count(&self) -> usize {
        self.upgrades.len()
    }

    /// Stack counts per upgrade id, sorted by id.
    #[must_use]
    pub fn upgrade_stacks(&self) -> BTreeMap<&str, u32> {
        let mut stacks = BTreeMap::new();
        for applied in &self.upgrades {
            *stacks.entry(applied.id()).or_insert(0) += 1;
        }
        stacks
    }

    /// Product of every stack's hit chance multiplier; exactly 1 when empty.
    #[must_use]
    pub fn hit_chance_multiplier(&self) -> Fixed {
        self.upgrades
            .iter()
            .fold(Fixed::ONE, |acc, u| acc.saturating_mul(u.hit_chance_multiplier()))
    }

    /// Product of every stack's damage multiplier; exactly 1 when empty.
    #[must_use]
    pub fn damage_multiplier(&self) -> Fixed {
        self.upgrades
            .iter()
            .fold(Fixed::ONE, |acc, u| acc.saturating_mul(u.damage_multiplier()))
    }

    /// Sum of every stack's elevation bonus; exactly 0 when empty.
    #[must_use]
    pub fn elevation_bonus_flat(&self) -> Fixed {
        self.upgrades
            .iter()
            .fold(Fixed::ZERO, |acc, u| acc.saturating_add(u.elevation_bonus()))
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<SquadEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Owner of every live squad, keyed by id.
///
/// Keeps the one-squad-per-unit invariant: assigning a unit to a squad
/// first removes it from whichever squad held it.
#[derive(Debug, Clone, Default)]
pub struct SquadRegistry {
    squads: BTreeMap<SquadId, Squad>,
    membership: BTreeMap<UnitId, SquadId>,
    next_id: SquadId,
    events: Vec<SquadEvent>,
}

impl SquadRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            squads: BTreeMap::new(),
            membership: BTreeMap::new(),
            next_id: 1,
            events: Vec::new(),
        }
    }

    /// Create an empty squad and return its id.
    pub fn create_squad(&mut self, team_id: TeamId) -> SquadId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.squads.insert(id, Squad::new(id, team_id));
        tracing::debug!(squad = id, team = team_id, "Squad created");
        id
    }

    /// Get a squad by id.
    #[must_use]
    pub fn get(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(&id)
    }

    /// Get a mutable squad by id.
    pub fn get_mut(&mut self, id: SquadId) -> Option<&mut Squad> {
        self.squads.get_mut(&id)
    }

    /// Squad currently holding a unit.
    #[must_use]
    pub fn squad_of(&self, unit: UnitId) -> Option<SquadId> {
        self.membership.get(&unit).copied()
    }

    /// Move a unit into a squad, leaving its previous squad first.
    ///
    /// Returns `false` if the squad does not exist or already holds the unit.
    pub fn assign(&mut self, unit: UnitId, squad: SquadId) -> bool {
        if !self.squads.contains_key(&squad) || self.squad_of(unit) == Some(squad) {
            return false;
        }
        self.remove_unit(unit);

        let Some(target) = self.squads.get_mut(&squad) else {
            return false;
        };
        if !target.add_member(unit) {
            return false;
        }
        self.membership.insert(unit, squad);
        true
    }

    /// Remove a unit from whichever squad holds it.
    ///
    /// A squad left empty is destroyed. Returns the squad the unit left.
    pub fn remove_unit(&mut self, unit: UnitId) -> Option<SquadId> {
        let squad_id = self.membership.remove(&unit)?;
        let now_empty = match self.squads.get_mut(&squad_id) {
            Some(squad) => {
                squad.remove_member(unit);
                squad.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.destroy(squad_id);
        }
        Some(squad_id)
    }

    /// Destroy a squad, releasing all its members.
    pub fn destroy(&mut self, id: SquadId) -> bool {
        let Some(mut squad) = self.squads.remove(&id) else {
            return false;
        };
        for unit in squad.members().collect::<Vec<_>>() {
            self.membership.remove(&unit);
            squad.remove_member(unit);
        }
        self.events.extend(squad.drain_events());
        tracing::debug!(squad = id, "Squad destroyed");
        true
    }

    /// Destroy every squad (match reset).
    pub fn reset(&mut self) {
        let ids: Vec<_> = self.squads.keys().copied().collect();
        for id in ids {
            self.destroy(id);
        }
    }

    /// Number of live squads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.squads.len()
    }

    /// Whether there are no live squads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.squads.is_empty()
    }

    /// Iterate squads in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Squad> {
        self.squads.values()
    }

    /// Take pending notifications from the registry and every squad.
    pub fn drain_events(&mut self) -> Vec<SquadEvent> {
        let mut events = std::mem::take(&mut self.events);
        for squad in self.squads.values_mut() {
            events.extend(squad.drain_events());
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marksmen() -> Arc<UpgradeEffect> {
        Arc::new(
            UpgradeEffect::new("marksmen", "Marksmen")
                .with_hit_chance_multiplier(Fixed::from_num(1.5))
                .with_max_stacks(2),
        )
    }

    fn heavy_rounds() -> Arc<UpgradeEffect> {
        Arc::new(
            UpgradeEffect::new("heavy_rounds", "Heavy Rounds")
                .with_damage_multiplier(Fixed::from_num(2))
                .with_elevation_bonus(Fixed::from_num(0.25)),
        )
    }

    #[test]
    fn test_empty_squad_is_neutral() {
        let squad = Squad::new(1, 0);
        assert_eq!(squad.hit_chance_multiplier(), Fixed::ONE);
        assert_eq!(squad.damage_multiplier(), Fixed::ONE);
        assert_eq!(squad.elevation_bonus_flat(), Fixed::ZERO);
    }

    #[test]
    fn test_membership() {
        let mut squad = Squad::new(1, 0);
        assert!(squad.add_member(10));
        assert!(!squad.add_member(10));
        assert_eq!(squad.member_count(), 1);

        assert!(squad.remove_member(10));
        assert!(!squad.remove_member(10));
        assert!(squad.is_empty());

        assert_eq!(
            squad.drain_events(),
            vec![
                SquadEvent::MemberAdded { squad: 1, unit: 10 },
                SquadEvent::MemberRemoved { squad: 1, unit: 10 },
            ]
        );
        assert!(squad.drain_events().is_empty());
    }

    #[test]
    fn test_modifiers_fold_over_stacks() {
        let mut squad = Squad::new(1, 0);
        assert!(squad.apply_upgrade(marksmen()));
        assert!(squad.apply_upgrade(marksmen()));
        assert!(squad.apply_upgrade(heavy_rounds()));

        assert_eq!(squad.hit_chance_multiplier(), Fixed::from_num(2.25));
        assert_eq!(squad.damage_multiplier(), Fixed::from_num(2));
        assert_eq!(squad.elevation_bonus_flat(), Fixed::from_num(0.25));
        assert_eq!(squad.upgrade_count(), 3);
    }

    #[test]
    fn test_stack_limit() {
        let mut squad = Squad::new(1, 0);
        let upgrade = heavy_rounds();
        assert!(squad.apply_upgrade(Arc::clone(&upgrade)));
        assert!(!squad.apply_upgrade(Arc::clone(&upgrade)));
        assert_eq!(squad.upgrade_stack_count(&upgrade), 1);
        assert_eq!(squad.upgrade_count(), 1);
    }

    #[test]
    fn test_mutual_exclusion_in_both_directions() {
        let rage = Arc::new(UpgradeEffect::new("rage", "Rage").exclusive_with("discipline"));
        let discipline = Arc::new(UpgradeEffect::new("discipline", "Discipline"));

        let mut first = Squad::new(1, 0);
        assert!(first.apply_upgrade(Arc::clone(&rage)));
        assert!(!first.apply_upgrade(Arc::clone(&discipline)));

        let mut second = Squad::new(2, 0);
        assert!(second.apply_upgrade(discipline));
        assert!(!second.apply_upgrade(rage));
    }

    #[test]
    fn test_remove_upgrade_restores_modifiers() {
        let mut squad = Squad::new(1, 0);
        let upgrade = marksmen();
        squad.apply_upgrade(Arc::clone(&upgrade));
        squad.drain_events();

        assert!(squad.remove_upgrade(&upgrade));
        assert!(!squad.remove_upgrade(&upgrade));
        assert_eq!(squad.hit_chance_multiplier(), Fixed::ONE);
        assert_eq!(
            squad.drain_events(),
            vec![SquadEvent::UpgradeRemoved {
                squad: 1,
                upgrade: "marksmen".to_string(),
                stacks: 0,
            }]
        );
    }

    #[test]
    fn test_registry_keeps_one_squad_per_unit() {
        let mut registry = SquadRegistry::new();
        let alpha = registry.create_squad(0);
        let bravo = registry.create_squad(0);

        assert!(registry.assign(7, alpha));
        assert!(registry.assign(8, alpha));
        assert!(registry.assign(7, bravo));

        assert_eq!(registry.squad_of(7), Some(bravo));
        assert!(!registry.get(alpha).unwrap().contains(7));
        assert!(registry.get(bravo).unwrap().contains(7));
        assert!(!registry.assign(7, bravo));
    }

    #[test]
    fn test_registry_destroys_empty_squads() {
        let mut registry = SquadRegistry::new();
        let alpha = registry.create_squad(0);
        registry.assign(7, alpha);

        assert_eq!(registry.remove_unit(7), Some(alpha));
        assert!(registry.get(alpha).is_none());
        assert_eq!(registry.remove_unit(7), None);
    }

    #[test]
    fn test_registry_reset_reports_departures() {
        let mut registry = SquadRegistry::new();
        let alpha = registry.create_squad(1);
        registry.assign(1, alpha);
        registry.assign(2, alpha);
        registry.drain_events();

        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.squad_of(1), None);
        let removed = registry
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SquadEvent::MemberRemoved { .. }))
            .count();
        assert_eq!(removed, 2);
    }
}
