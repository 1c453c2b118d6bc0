//! Per-unit AI: an `Idle / Moving / Attacking` state machine.
//!
//! The AI decides when and at whom its unit fires. It never touches other
//! units directly; everything it knows about the world comes through an
//! [`AiHost`], and firing is delegated back to the host, which owns the
//! units and the [`CombatResolver`](crate::combat::CombatResolver).
//!
//! # Transitions
//!
//! | From | To | Trigger |
//! |---|---|---|
//! | Idle | Attacking | [`UnitAi::set_target`] with a valid enemy, or auto-engage |
//! | Attacking | Idle | [`UnitAi::clear_target`], or target lost with no replacement |
//! | Idle, Attacking | Moving | [`UnitAi::move_to`] accepted by the pathfinder |
//! | Moving | Idle | [`UnitAi::on_move_complete`], [`UnitAi::stop`], owner death |
//! | any | Idle | [`UnitAi::stop`] |

use serde::{Deserialize, Serialize};

use crate::combat::CombatResult;
use crate::math::{Fixed, Vec3Fixed};
use crate::unit::{TeamId, Unit, UnitId};

/// Detection radius used when an archetype does not author one.
pub const DEFAULT_DETECTION_RADIUS: Fixed = Fixed::const_from_int(15);

/// Behavior state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    /// Holding position.
    #[default]
    Idle,
    /// Travelling to a destination.
    Moving,
    /// Firing at a target.
    Attacking,
}

/// Notifications emitted by the AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiEvent {
    /// The state changed.
    StateChanged {
        /// Unit whose AI changed.
        unit: UnitId,
        /// New state.
        state: AiState,
    },
    /// A burst was fired.
    BurstFired {
        /// Firing unit.
        unit: UnitId,
        /// Unit fired upon.
        target: UnitId,
        /// Outcome of the burst.
        result: CombatResult,
    },
}

/// What the AI may know about another unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitInfo {
    /// Unit identifier.
    pub id: UnitId,
    /// Owning team.
    pub team_id: TeamId,
    /// Current position.
    pub position: Vec3Fixed,
    /// Whether the unit has health left.
    pub alive: bool,
    /// Seconds between bursts of the current weapon; `Fixed::MAX` unarmed.
    pub fire_interval: Fixed,
}

impl From<&Unit> for UnitInfo {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id(),
            team_id: unit.team_id,
            position: unit.position,
            alive: unit.is_alive(),
            fire_interval: unit
                .weapon
                .as_ref()
                .map_or(Fixed::MAX, |weapon| weapon.time_between_shots()),
        }
    }
}

/// Nearest-enemy search.
pub trait SpatialQuery {
    /// Closest living unit within `radius` of `from` on a different team.
    ///
    /// Distance is measured in the table plane. Ties go to the lower id.
    fn find_nearest_enemy(&self, from: UnitId, radius: Fixed) -> Option<UnitId>;
}

/// Path planning. Only acceptance is reported here; arrival comes back
/// through [`UnitAi::on_move_complete`].
pub trait Pathfinder {
    /// Ask for `unit` to travel to `destination`.
    fn request_move(&mut self, unit: UnitId, destination: Vec3Fixed) -> bool;
}

/// The world as seen by an AI controller.
pub trait AiHost: SpatialQuery {
    /// Look up a unit. `None` if it does not exist.
    fn unit_info(&self, id: UnitId) -> Option<UnitInfo>;

    /// Resolve one burst from `attacker` at `target`.
    ///
    /// Returns `None` if the burst could not be fired at all (for example
    /// the attacker has no weapon).
    fn fire(&mut self, attacker: UnitId, target: UnitId) -> Option<CombatResult>;
}

/// AI controller for one unit.
#[derive(Debug, Clone)]
pub struct UnitAi {
    unit: UnitId,
    team_id: TeamId,
    state: AiState,
    target: Option<UnitId>,
    destination: Option<Vec3Fixed>,
    detection_radius: Fixed,
    fire_interval: Fixed,
    /// Seconds until the next burst may fire.
    cooldown: Fixed,
    enabled: bool,
    auto_engage: bool,
    events: Vec<AiEvent>,
}

impl UnitAi {
    /// Create a controller for `owner`.
    ///
    /// The burst cadence follows whatever weapon the owner carries at each
    /// update; an unarmed owner never fires. A non-positive radius falls back to
    /// [`DEFAULT_DETECTION_RADIUS`].
    #[must_use]
    pub fn new(owner: &Unit, detection_radius: Fixed) -> Self {
        let fire_interval = UnitInfo::from(owner).fire_interval;
        let detection_radius = if detection_radius > Fixed::ZERO {
            detection_radius
        } else {
            DEFAULT_DETECTION_RADIUS
        };

        Self {
            unit: owner.id(),
            team_id: owner.team_id,
            state: AiState::Idle,
            target: None,
            destination: None,
            detection_radius,
            fire_interval,
            cooldown: Fixed::ZERO,
            enabled: true,
            auto_engage: true,
            events: Vec::new(),
        }
    }

    /// Builder method to toggle scanning for enemies while idle.
    #[must_use]
    pub fn with_auto_engage(mut self, auto_engage: bool) -> Self {
        self.auto_engage = auto_engage;
        self
    }

    /// Owner unit.
    #[must_use]
    pub const fn unit(&self) -> UnitId {
        self.unit
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AiState {
        self.state
    }

    /// Current target, if any.
    #[must_use]
    pub const fn current_target(&self) -> Option<UnitId> {
        self.target
    }

    /// Current move destination, if any.
    #[must_use]
    pub const fn destination(&self) -> Option<Vec3Fixed> {
        self.destination
    }

    /// Detection radius.
    #[must_use]
    pub const fn detection_radius(&self) -> Fixed {
        self.detection_radius
    }

    /// Seconds between bursts.
    #[must_use]
    pub const fn fire_interval(&self) -> Fixed {
        self.fire_interval
    }

    /// Whether [`update`](Self::update) runs.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Freeze or resume the controller. Freezing keeps all state.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether an idle unit engages the nearest enemy on its own.
    #[must_use]
    pub const fn auto_engage(&self) -> bool {
        self.auto_engage
    }

    /// Toggle idle auto-engagement.
    pub fn set_auto_engage(&mut self, auto_engage: bool) {
        self.auto_engage = auto_engage;
    }

    /// Change state. Setting the current state again does nothing and
    /// emits nothing.
    pub fn set_state(&mut self, state: AiState) {
        if self.state == state {
            return;
        }
        tracing::debug!(unit = self.unit, from = ?self.state, to = ?state, "AI state changed");
        self.state = state;
        self.events.push(AiEvent::StateChanged {
            unit: self.unit,
            state,
        });
    }

    /// Attack `target`.
    ///
    /// Rejected for `None`, dead units, teammates and the owner itself.
    pub fn set_target(&mut self, target: Option<&Unit>) -> bool {
        let Some(target) = target else {
            return false;
        };
        if !self.is_hostile(&UnitInfo::from(target)) {
            return false;
        }
        self.engage(target.id());
        true
    }

    /// Drop the current target. An attacking unit goes idle.
    pub fn clear_target(&mut self) {
        self.target = None;
        if self.state == AiState::Attacking {
            self.set_state(AiState::Idle);
        }
    }

    /// Travel to `destination`. Leaves state untouched if the pathfinder
    /// refuses.
    pub fn move_to(&mut self, destination: Vec3Fixed, pathfinder: &mut impl Pathfinder) -> bool {
        if !pathfinder.request_move(self.unit, destination) {
            return false;
        }
        self.target = None;
        self.destination = Some(destination);
        self.set_state(AiState::Moving);
        true
    }

    /// Arrival notification from the host.
    pub fn on_move_complete(&mut self) {
        if self.state == AiState::Moving {
            self.destination = None;
            self.set_state(AiState::Idle);
        }
    }

    /// Halt everything and go idle.
    pub fn stop(&mut self) {
        self.target = None;
        self.destination = None;
        self.set_state(AiState::Idle);
    }

    /// Whether any enemy is within the detection radius.
    #[must_use]
    pub fn is_enemy_in_range(&self, host: &impl SpatialQuery) -> bool {
        host.find_nearest_enemy(self.unit, self.detection_radius)
            .is_some()
    }

    /// Advance by `delta_seconds`.
    pub fn update(&mut self, delta_seconds: Fixed, host: &mut impl AiHost) {
        if !self.enabled {
            return;
        }

        let Some(owner) = host.unit_info(self.unit).filter(|owner| owner.alive) else {
            self.stop();
            return;
        };
        self.fire_interval = owner.fire_interval;

        self.cooldown = self
            .cooldown
            .saturating_sub(delta_seconds.max(Fixed::ZERO))
            .max(Fixed::ZERO);

        match self.state {
            AiState::Moving => {}
            AiState::Idle => {
                if self.auto_engage {
                    if let Some(enemy) = host.find_nearest_enemy(self.unit, self.detection_radius)
                    {
                        self.engage(enemy);
                        self.attack(&owner, host);
                    }
                }
            }
            AiState::Attacking => self.attack(&owner, host),
        }
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<AiEvent> {
        std::mem::take(&mut self.events)
    }

    fn engage(&mut self, target: UnitId) {
        self.target = Some(target);
        self.destination = None;
        self.set_state(AiState::Attacking);
    }

    fn attack(&mut self, owner: &UnitInfo, host: &mut impl AiHost) {
        let current = self.target.filter(|&id| {
            host.unit_info(id)
                .is_some_and(|info| self.is_hostile(&info) && self.in_range(owner, &info))
        });

        let target = match current {
            Some(target) => target,
            None => match host.find_nearest_enemy(self.unit, self.detection_radius) {
                Some(replacement) => {
                    tracing::debug!(unit = self.unit, target = replacement, "AI re-targeted");
                    self.target = Some(replacement);
                    replacement
                }
                None => {
                    self.clear_target();
                    return;
                }
            },
        };

        if self.cooldown > Fixed::ZERO {
            return;
        }
        if let Some(result) = host.fire(self.unit, target) {
            self.cooldown = self.fire_interval;
            self.events.push(AiEvent::BurstFired {
                unit: self.unit,
                target,
                result,
            });
        }
    }

    fn is_hostile(&self, other: &UnitInfo) -> bool {
        other.alive && other.id != self.unit && other.team_id != self.team_id
    }

    fn in_range(&self, owner: &UnitInfo, other: &UnitInfo) -> bool {
        let radius_sq = self.detection_radius.saturating_mul(self.detection_radius);
        owner.position.horizontal_distance_squared(other.position) <= radius_sq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::WeaponProfile;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// Minimal host: units on a line, every burst kills.
    #[derive(Default)]
    struct LineHost {
        units: BTreeMap<UnitId, Unit>,
        fired: Vec<(UnitId, UnitId)>,
    }

    impl LineHost {
        fn add(&mut self, id: UnitId, team: TeamId, x: i32) {
            let unit = Unit::new(id, team, 10).with_position(Vec3Fixed::from_ints(x, 0, 0));
            self.units.insert(id, unit);
        }
    }

    impl SpatialQuery for LineHost {
        fn find_nearest_enemy(&self, from: UnitId, radius: Fixed) -> Option<UnitId> {
            let from = self.units.get(&from)?;
            self.units
                .values()
                .filter(|u| u.is_alive() && u.team_id != from.team_id)
                .map(|u| (u.position.horizontal_distance_squared(from.position), u.id()))
                .filter(|&(d, _)| d <= radius * radius)
                .min()
                .map(|(_, id)| id)
        }
    }

    impl AiHost for LineHost {
        fn unit_info(&self, id: UnitId) -> Option<UnitInfo> {
            self.units.get(&id).map(UnitInfo::from)
        }

        fn fire(&mut self, attacker: UnitId, target: UnitId) -> Option<CombatResult> {
            self.fired.push((attacker, target));
            Some(CombatResult::default())
        }
    }

    struct Accepting(bool);

    impl Pathfinder for Accepting {
        fn request_move(&mut self, _unit: UnitId, _destination: Vec3Fixed) -> bool {
            self.0
        }
    }

    fn armed(id: UnitId) -> Unit {
        let weapon = WeaponProfile::new(
            "rifle",
            1,
            Fixed::from_num(2),
            Fixed::from_num(0.5),
            Fixed::from_num(5),
            Fixed::from_num(10),
        );
        Unit::new(id, 0, 10).with_weapon(Arc::new(weapon))
    }

    fn ai(id: UnitId) -> UnitAi {
        UnitAi::new(&armed(id), Fixed::from_num(10)).with_auto_engage(false)
    }

    #[test]
    fn test_set_state_is_idempotent() {
        let mut ai = ai(1);
        ai.set_state(AiState::Idle);
        assert!(ai.drain_events().is_empty());

        ai.set_state(AiState::Moving);
        ai.set_state(AiState::Moving);
        assert_eq!(
            ai.drain_events(),
            vec![AiEvent::StateChanged {
                unit: 1,
                state: AiState::Moving
            }]
        );
    }

    #[test]
    fn test_set_target_rejects_invalid_targets() {
        let mut ai = ai(1);
        let teammate = Unit::new(2, 0, 10);
        let mut corpse = Unit::new(3, 1, 10);
        corpse.apply_damage(Fixed::from_num(100));

        assert!(!ai.set_target(None));
        assert!(!ai.set_target(Some(&teammate)));
        assert!(!ai.set_target(Some(&corpse)));
        assert!(!ai.set_target(Some(&armed(1))));
        assert_eq!(ai.state(), AiState::Idle);

        assert!(ai.set_target(Some(&Unit::new(4, 1, 10))));
        assert_eq!(ai.state(), AiState::Attacking);
        assert_eq!(ai.current_target(), Some(4));
    }

    #[test]
    fn test_move_to_depends_on_pathfinder() {
        let mut ai = ai(1);
        let destination = Vec3Fixed::from_ints(5, 0, 5);

        assert!(!ai.move_to(destination, &mut Accepting(false)));
        assert_eq!(ai.state(), AiState::Idle);

        assert!(ai.move_to(destination, &mut Accepting(true)));
        assert_eq!(ai.state(), AiState::Moving);
        assert_eq!(ai.destination(), Some(destination));

        ai.on_move_complete();
        assert_eq!(ai.state(), AiState::Idle);
        assert_eq!(ai.destination(), None);
    }

    #[test]
    fn test_stop_clears_everything() {
        let mut ai = ai(1);
        ai.set_target(Some(&Unit::new(2, 1, 10)));
        ai.stop();
        assert_eq!(ai.state(), AiState::Idle);
        assert_eq!(ai.current_target(), None);
    }

    #[test]
    fn test_fires_at_cadence() {
        let mut host = LineHost::default();
        host.units.insert(1, armed(1));
        host.add(2, 1, 5);
        let mut ai = ai(1);
        ai.set_target(host.units.get(&2));

        // Interval 0.5s: fire at t=0, t=0.5, t=1.0 over five 0.25s ticks.
        for _ in 0..5 {
            ai.update(Fixed::from_num(0.25), &mut host);
        }
        assert_eq!(host.fired.len(), 3);
    }

    #[test]
    fn test_cadence_follows_weapon_swap() {
        let mut host = LineHost::default();
        host.units.insert(1, armed(1));
        host.add(2, 1, 5);
        let mut ai = ai(1);
        ai.set_target(host.units.get(&2));

        let slow = WeaponProfile::new(
            "musket",
            1,
            Fixed::from_num(0.5),
            Fixed::from_num(0.5),
            Fixed::from_num(5),
            Fixed::from_num(10),
        );
        host.units.get_mut(&1).unwrap().weapon = Some(Arc::new(slow));

        // Interval is now 2s: only the opening burst fits in 1.25s.
        for _ in 0..5 {
            ai.update(Fixed::from_num(0.25), &mut host);
        }
        assert_eq!(host.fired.len(), 1);
        assert_eq!(ai.fire_interval(), Fixed::from_num(2));
    }

    #[test]
    fn test_retargets_nearest_when_target_dies() {
        let mut host = LineHost::default();
        host.units.insert(1, armed(1));
        host.add(2, 1, 3);
        host.add(3, 1, 8);
        let mut ai = ai(1);
        ai.set_target(host.units.get(&2));

        host.units.get_mut(&2).unwrap().apply_damage(Fixed::from_num(100));
        ai.update(Fixed::from_num(0.1), &mut host);
        assert_eq!(ai.current_target(), Some(3));
        assert_eq!(ai.state(), AiState::Attacking);
    }

    #[test]
    fn test_goes_idle_when_no_enemy_left() {
        let mut host = LineHost::default();
        host.units.insert(1, armed(1));
        host.add(2, 1, 3);
        host.add(3, 1, 50);
        let mut ai = ai(1);
        ai.set_target(host.units.get(&2));

        host.units.get_mut(&2).unwrap().apply_damage(Fixed::from_num(100));
        ai.update(Fixed::from_num(0.1), &mut host);
        assert_eq!(ai.current_target(), None);
        assert_eq!(ai.state(), AiState::Idle);
        assert!(!ai.is_enemy_in_range(&host));
    }

    #[test]
    fn test_disabled_ai_is_frozen() {
        let mut host = LineHost::default();
        host.units.insert(1, armed(1));
        host.add(2, 1, 3);
        let mut ai = ai(1);
        ai.set_target(host.units.get(&2));
        ai.set_enabled(false);

        ai.update(Fixed::ONE, &mut host);
        assert!(host.fired.is_empty());
        assert_eq!(ai.state(), AiState::Attacking);
    }

    #[test]
    fn test_auto_engage_from_idle() {
        let mut host = LineHost::default();
        host.units.insert(1, armed(1));
        host.add(2, 1, 4);
        let mut ai = ai(1).with_auto_engage(true);

        ai.update(Fixed::from_num(0.1), &mut host);
        assert_eq!(ai.state(), AiState::Attacking);
        assert_eq!(host.fired, vec![(1, 2)]);
    }

    #[test]
    fn test_dead_owner_goes_idle() {
        let mut host = LineHost::default();
        host.units.insert(1, armed(1));
        let mut ai = ai(1);
        ai.move_to(Vec3Fixed::from_ints(9, 0, 0), &mut Accepting(true));

        host.units.get_mut(&1).unwrap().apply_damage(Fixed::from_num(100));
        ai.update(Fixed::from_num(0.1), &mut host);
        assert_eq!(ai.state(), AiState::Idle);
    }
}
