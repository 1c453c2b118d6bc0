//! Units: health, armor, position and the damage rule.
//!
//! Units never despawn themselves. Health changes are queued as
//! [`UnitEvent`]s and the host drains them once per tick.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec3Fixed};
use crate::squad::SquadId;
use crate::weapon::WeaponProfile;

/// Unique identifier for units.
pub type UnitId = u64;

/// Team identifier. Units on the same team never target each other.
pub type TeamId = u8;

/// Hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create health at full. A zero maximum is raised to 1.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        let max = if max == 0 { 1 } else { max };
        Self { current: max, max }
    }

    /// Check if health is depleted.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Check if at full health.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Health as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        let percent = u64::from(self.current) * 100 / u64::from(self.max.max(1));
        u32::try_from(percent).unwrap_or(100)
    }
}

/// Notifications emitted by health changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitEvent {
    /// Health changed by `delta` (negative for damage).
    HealthChanged {
        /// Unit that changed.
        unit: UnitId,
        /// Health after the change.
        current: u32,
        /// Maximum health.
        max: u32,
        /// Signed change.
        delta: i64,
    },
    /// Health reached zero. Emitted exactly once per unit.
    Died {
        /// Unit that died.
        unit: UnitId,
    },
}

/// A combatant on the battlefield.
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    /// Owning team.
    pub team_id: TeamId,
    /// Position; `y` is elevation.
    pub position: Vec3Fixed,
    /// Percentage damage reduction (0-99 by convention).
    pub armor: u8,
    /// Movement speed in units per second.
    pub move_speed: Fixed,
    /// Equipped weapon, shared with every unit of the archetype.
    pub weapon: Option<Arc<WeaponProfile>>,
    health: Health,
    squad: Option<SquadId>,
    events: Vec<UnitEvent>,
}

impl Unit {
    /// Create a unit at full health with no weapon, armor or squad.
    #[must_use]
    pub fn new(id: UnitId, team_id: TeamId, max_health: u32) -> Self {
        Self {
            id,
            team_id,
            position: Vec3Fixed::ZERO,
            armor: 0,
            move_speed: Fixed::ZERO,
            weapon: None,
            health: Health::new(max_health),
            squad: None,
            events: Vec::new(),
        }
    }

    /// Builder method to set position.
    #[must_use]
    pub fn with_position(mut self, position: Vec3Fixed) -> Self {
        self.position = position;
        self
    }

    /// Builder method to set armor.
    #[must_use]
    pub fn with_armor(mut self, armor: u8) -> Self {
        self.armor = armor;
        self
    }

    /// Builder method to equip a weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: Arc<WeaponProfile>) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Builder method to set movement speed.
    #[must_use]
    pub fn with_move_speed(mut self, move_speed: Fixed) -> Self {
        self.move_speed = move_speed;
        self
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: UnitId) {
        self.id = id;
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Whether the unit has health left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Height above the table plane.
    #[must_use]
    pub const fn elevation(&self) -> Fixed {
        self.position.y
    }

    /// Squad this unit belongs to, if any.
    #[must_use]
    pub const fn squad(&self) -> Option<SquadId> {
        self.squad
    }

    /// Update the squad back-reference. Membership itself is owned by
    /// [`SquadRegistry`](crate::squad::SquadRegistry).
    pub fn set_squad(&mut self, squad: Option<SquadId>) {
        self.squad = squad;
    }

    /// Health removed by a hit of `raw` damage after armor, before the
    /// health floor. Any positive hit removes at least 1.
    #[must_use]
    pub fn mitigated_damage(&self, raw: Fixed) -> u32 {
        if raw <= Fixed::ZERO {
            return 0;
        }
        let armor = Fixed::from_num(self.armor.min(100));
        let hundred = Fixed::from_num(100);
        let kept = hundred - armor;
        // Very large hits scale down first so the product cannot saturate.
        let reduced = raw
            .checked_mul(kept)
            .map_or_else(|| (raw / hundred).saturating_mul(kept), |scaled| scaled / hundred);
        reduced.round().saturating_to_num::<u32>().max(1)
    }

    /// Apply one hit of `raw` damage and return the health removed.
    ///
    /// Dead units and non-positive hits are ignored.
    pub fn apply_damage(&mut self, raw: Fixed) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let damage = self.mitigated_damage(raw);
        if damage == 0 {
            return 0;
        }

        let removed = damage.min(self.health.current);
        self.health.current -= removed;
        self.events.push(UnitEvent::HealthChanged {
            unit: self.id,
            current: self.health.current,
            max: self.health.max,
            delta: -i64::from(removed),
        });

        if self.health.is_dead() {
            tracing::debug!(unit = self.id, "Unit died");
            self.events.push(UnitEvent::Died { unit: self.id });
        }
        removed
    }

    /// Restore up to `amount` health and return what was restored.
    ///
    /// Dead units cannot be healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let actual = amount.min(self.health.max.saturating_sub(self.health.current));
        if actual == 0 {
            return 0;
        }

        self.health.current += actual;
        self.events.push(UnitEvent::HealthChanged {
            unit: self.id,
            current: self.health.current,
            max: self.health.max,
            delta: i64::from(actual),
        });
        actual
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<UnitEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Parameters for spawning a unit into a battlefield.
#[derive(Debug, Clone)]
pub struct UnitSpawnParams {
    /// Owning team.
    pub team_id: TeamId,
    /// Initial position.
    pub position: Vec3Fixed,
    /// Maximum health (unit starts at full health).
    pub max_health: u32,
    /// Armor percentage.
    pub armor: u8,
    /// Movement speed in units per second.
    pub move_speed: Fixed,
    /// Equipped weapon.
    pub weapon: Option<Arc<WeaponProfile>>,
    /// AI detection radius; `None` uses the AI default.
    pub detection_radius: Option<Fixed>,
}

impl Default for UnitSpawnParams {
    fn default() -> Self {
        Self {
            team_id: 0,
            position: Vec3Fixed::ZERO,
            max_health: 100,
            armor: 0,
            move_speed: Fixed::ZERO,
            weapon: None,
            detection_radius: None,
        }
    }
}

impl UnitSpawnParams {
    pub(crate) fn build(&self) -> Unit {
        let mut unit = Unit::new(0, self.team_id, self.max_health)
            .with_position(self.position)
            .with_armor(self.armor)
            .with_move_speed(self.move_speed);
        unit.weapon = self.weapon.clone();
        unit
    }
}
