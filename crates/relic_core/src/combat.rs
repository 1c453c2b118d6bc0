//! Burst combat resolution.
//!
//! A burst is resolved shot by shot against a single target:
//!
//! 1. Combine the weapon's base chance with its range curve, the
//!    elevation curve plus any squad high-ground bonus, and the squad's
//!    hit chance multiplier.
//! 2. Clamp to [`MIN_HIT_CHANCE`, `MAX_HIT_CHANCE`] so no shot is ever
//!    certain either way.
//! 3. Roll once per shot; a roll below the chance hits.
//! 4. Each hit deals `base_damage × squad damage multiplier`, reduced by
//!    the target's armor (see [`Unit::mitigated_damage`]).
//! 5. The burst stops on the shot that kills the target.
//!
//! Resolution never fails: missing inputs or a dead target produce an
//! empty [`CombatResult`].

use std::cmp::Ordering;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};
use crate::squad::{Squad, SquadRegistry};
use crate::unit::Unit;
use crate::weapon::WeaponProfile;

/// Lowest per-shot hit chance after all modifiers (0.05).
pub const MIN_HIT_CHANCE: Fixed = Fixed::from_bits(214_748_365);

/// Highest per-shot hit chance after all modifiers (0.95).
pub const MAX_HIT_CHANCE: Fixed = Fixed::from_bits(4_080_218_931);

/// Outcome of one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatResult {
    /// Shots attempted, including the killing shot.
    pub shots_fired: u32,
    /// Shots that hit.
    pub shots_hit: u32,
    /// Health actually removed from the target.
    pub total_damage: u32,
    /// Whether this burst killed the target.
    pub target_destroyed: bool,
    /// Clamped per-shot hit chance used for every roll.
    #[serde(with = "fixed_serde")]
    pub hit_chance: Fixed,
}

impl CombatResult {
    /// Fraction of fired shots that hit; zero when nothing was fired.
    #[must_use]
    pub fn accuracy(&self) -> Fixed {
        if self.shots_fired == 0 {
            return Fixed::ZERO;
        }
        Fixed::from_num(self.shots_hit) / Fixed::from_num(self.shots_fired)
    }
}

/// Squad-derived modifiers for one attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquadModifiers {
    /// Product of hit chance multipliers.
    pub hit_chance_multiplier: Fixed,
    /// Product of damage multipliers.
    pub damage_multiplier: Fixed,
    /// Flat elevation bonus. A positive value applies when firing downhill,
    /// a negative one when firing uphill.
    pub elevation_bonus_flat: Fixed,
}

impl SquadModifiers {
    /// Modifiers of a unit outside any squad.
    pub const NEUTRAL: Self = Self {
        hit_chance_multiplier: Fixed::ONE,
        damage_multiplier: Fixed::ONE,
        elevation_bonus_flat: Fixed::ZERO,
    };

    /// Fold a squad's applied upgrades.
    #[must_use]
    pub fn from_squad(squad: &Squad) -> Self {
        Self {
            hit_chance_multiplier: squad.hit_chance_multiplier(),
            damage_multiplier: squad.damage_multiplier(),
            elevation_bonus_flat: squad.elevation_bonus_flat(),
        }
    }

    /// Modifiers for a unit, looked up through its squad back-reference.
    #[must_use]
    pub fn for_unit(unit: &Unit, squads: &SquadRegistry) -> Self {
        unit.squad()
            .and_then(|id| squads.get(id))
            .map_or(Self::NEUTRAL, Self::from_squad)
    }
}

impl Default for SquadModifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Every factor of a hit chance computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitChanceBreakdown {
    /// Horizontal distance between attacker and target.
    pub distance: Fixed,
    /// Attacker height minus target height.
    pub elevation: Fixed,
    /// Weapon base chance.
    pub base: Fixed,
    /// Range curve output.
    pub range_factor: Fixed,
    /// `max(0, 1 + elevation curve + squad elevation bonus)`.
    pub elevation_factor: Fixed,
    /// Squad hit chance multiplier.
    pub squad_factor: Fixed,
    /// Product of all factors.
    pub raw: Fixed,
    /// `raw` clamped to the hit chance bounds.
    pub clamped: Fixed,
}

/// Compute the per-shot hit chance of `attacker` against `target`.
#[must_use]
pub fn hit_breakdown(
    attacker: &Unit,
    target: &Unit,
    weapon: &WeaponProfile,
    modifiers: SquadModifiers,
) -> HitChanceBreakdown {
    let distance = attacker.position.horizontal_distance(target.position);
    let elevation = attacker.elevation() - target.elevation();

    // Split by sign so the factor never falls as the attacker climbs.
    let squad_bonus = match elevation.cmp(&Fixed::ZERO) {
        Ordering::Greater => modifiers.elevation_bonus_flat.max(Fixed::ZERO),
        Ordering::Less => modifiers.elevation_bonus_flat.min(Fixed::ZERO),
        Ordering::Equal => Fixed::ZERO,
    };
    let elevation_factor =
        (Fixed::ONE + weapon.elevation_bonus(elevation) + squad_bonus).max(Fixed::ZERO);

    let base = weapon.base_hit_chance();
    let range_factor = weapon.range_factor(distance);
    let squad_factor = modifiers.hit_chance_multiplier;
    let raw = base
        .saturating_mul(range_factor)
        .saturating_mul(elevation_factor)
        .saturating_mul(squad_factor);

    HitChanceBreakdown {
        distance,
        elevation,
        base,
        range_factor,
        elevation_factor,
        squad_factor,
        raw,
        clamped: raw.clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE),
    }
}

/// Resolves bursts using an owned random source.
///
/// Two resolvers built with the same seed produce identical results for
/// identical inputs.
#[derive(Debug, Clone)]
pub struct CombatResolver<R = ChaCha8Rng> {
    rng: R,
}

impl CombatResolver<ChaCha8Rng> {
    /// Create a resolver with a seeded ChaCha8 generator.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: RngCore> CombatResolver<R> {
    /// Create a resolver around any random source.
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Resolve one burst of `weapon` fired by `attacker` at `target`.
    ///
    /// Any missing input or a target that is already dead yields an
    /// empty result without consuming randomness.
    pub fn resolve_combat(
        &mut self,
        attacker: Option<&Unit>,
        target: Option<&mut Unit>,
        weapon: Option<&WeaponProfile>,
        squads: &SquadRegistry,
    ) -> CombatResult {
        let (Some(attacker), Some(target), Some(weapon)) = (attacker, target, weapon) else {
            return CombatResult::default();
        };
        let modifiers = SquadModifiers::for_unit(attacker, squads);
        self.resolve_with_modifiers(attacker, target, weapon, modifiers)
    }

    /// Resolve one burst with explicit squad modifiers.
    pub fn resolve_with_modifiers(
        &mut self,
        attacker: &Unit,
        target: &mut Unit,
        weapon: &WeaponProfile,
        modifiers: SquadModifiers,
    ) -> CombatResult {
        if !target.is_alive() {
            return CombatResult::default();
        }

        let breakdown = hit_breakdown(attacker, target, weapon, modifiers);
        let damage = weapon.damage_at(modifiers.damage_multiplier);
        let mut result = CombatResult {
            hit_chance: breakdown.clamped,
            ..CombatResult::default()
        };

        for shot in 0..weapon.shots_per_burst() {
            result.shots_fired += 1;
            let roll = self.roll();
            if roll >= breakdown.clamped {
                tracing::trace!(shot, %roll, "Shot missed");
                continue;
            }

            result.shots_hit += 1;
            result.total_damage += target.apply_damage(damage);
            tracing::trace!(shot, %roll, health = target.health().current, "Shot hit");

            if !target.is_alive() {
                result.target_destroyed = true;
                break;
            }
        }

        tracing::debug!(
            attacker = attacker.id(),
            target = target.id(),
            weapon = weapon.name(),
            hit_chance = %breakdown.clamped,
            fired = result.shots_fired,
            hit = result.shots_hit,
            damage = result.total_damage,
            destroyed = result.target_destroyed,
            "Burst resolved"
        );
        result
    }

    /// Uniform draw in `[0, 1)`.
    fn roll(&mut self) -> Fixed {
        Fixed::from_bits(i64::from(self.rng.next_u32()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use crate::math::Vec3Fixed;
    use rand::rngs::mock::StepRng;
    use std::sync::Arc;

    fn rifle() -> WeaponProfile {
        WeaponProfile::new(
            "rifle",
            3,
            Fixed::from_num(2),
            Fixed::from_num(0.7),
            Fixed::from_num(10),
            Fixed::from_num(20),
        )
        .with_range_curve(Curve::from_pairs(&[(0.0, 1.0), (1.0, 0.5)]))
    }

    fn pair(distance: i32) -> (Unit, Unit) {
        let attacker = Unit::new(1, 0, 100);
        let target = Unit::new(2, 1, 100).with_position(Vec3Fixed::from_ints(distance, 0, 0));
        (attacker, target)
    }

    /// Resolver whose every roll is zero, so every shot hits.
    fn always_hit() -> CombatResolver<StepRng> {
        CombatResolver::new(StepRng::new(0, 0))
    }

    /// Resolver whose every roll is just below one, so every shot misses.
    fn always_miss() -> CombatResolver<StepRng> {
        CombatResolver::new(StepRng::new(u64::from(u32::MAX), 0))
    }

    #[test]
    fn test_hit_chance_constants() {
        assert!((MIN_HIT_CHANCE - Fixed::from_num(0.05)).abs() < Fixed::from_num(0.000_001));
        assert!((MAX_HIT_CHANCE - Fixed::from_num(0.95)).abs() < Fixed::from_num(0.000_001));
    }

    #[test]
    fn test_breakdown_at_effective_range() {
        let (attacker, target) = pair(20);
        let b = hit_breakdown(&attacker, &target, &rifle(), SquadModifiers::NEUTRAL);
        assert_eq!(b.range_factor, Fixed::from_num(0.5));
        assert_eq!(b.elevation_factor, Fixed::ONE);
        assert_eq!(b.clamped, Fixed::from_num(0.7) * Fixed::from_num(0.5));
    }

    #[test]
    fn test_breakdown_clamps_both_ends() {
        let (attacker, target) = pair(0);
        let sure = WeaponProfile::new("sure", 1, Fixed::ONE, Fixed::ONE, Fixed::ONE, Fixed::ONE);
        assert_eq!(
            hit_breakdown(&attacker, &target, &sure, SquadModifiers::NEUTRAL).clamped,
            MAX_HIT_CHANCE
        );

        let hopeless = WeaponProfile::new("hopeless", 1, Fixed::ONE, Fixed::ZERO, Fixed::ONE, Fixed::ONE);
        assert_eq!(
            hit_breakdown(&attacker, &target, &hopeless, SquadModifiers::NEUTRAL).clamped,
            MIN_HIT_CHANCE
        );
    }

    #[test]
    fn test_high_ground_bonus_only_applies_downhill() {
        let weapon = rifle().with_elevation_curve(Curve::default());
        let modifiers = SquadModifiers {
            elevation_bonus_flat: Fixed::from_num(0.5),
            ..SquadModifiers::NEUTRAL
        };
        let target = Unit::new(2, 1, 100);

        let uphill = Unit::new(1, 0, 100).with_position(Vec3Fixed::from_ints(0, -2, 0));
        let level = Unit::new(1, 0, 100);
        let downhill = Unit::new(1, 0, 100).with_position(Vec3Fixed::from_ints(0, 2, 0));

        assert_eq!(hit_breakdown(&uphill, &target, &weapon, modifiers).elevation_factor, Fixed::ONE);
        assert_eq!(hit_breakdown(&level, &target, &weapon, modifiers).elevation_factor, Fixed::ONE);
        assert_eq!(
            hit_breakdown(&downhill, &target, &weapon, modifiers).elevation_factor,
            Fixed::from_num(1.5)
        );
    }

    #[test]
    fn test_elevation_penalty_only_applies_uphill() {
        let weapon = rifle().with_elevation_curve(Curve::default());
        let modifiers = SquadModifiers {
            elevation_bonus_flat: Fixed::from_num(-0.5),
            ..SquadModifiers::NEUTRAL
        };
        let target = Unit::new(2, 1, 100);

        let uphill = Unit::new(1, 0, 100).with_position(Vec3Fixed::from_ints(0, -2, 0));
        let level = Unit::new(1, 0, 100);
        let downhill = Unit::new(1, 0, 100).with_position(Vec3Fixed::from_ints(0, 2, 0));

        let factor =
            |attacker: &Unit| hit_breakdown(attacker, &target, &weapon, modifiers).elevation_factor;
        assert_eq!(factor(&uphill), Fixed::from_num(0.5));
        assert_eq!(factor(&level), Fixed::ONE);
        assert_eq!(factor(&downhill), Fixed::ONE);
    }

    #[test]
    fn test_elevation_factor_never_negative() {
        let weapon = rifle().with_elevation_curve(Curve::constant(Fixed::from_num(-3)));
        let (attacker, target) = pair(0);
        let b = hit_breakdown(&attacker, &target, &weapon, SquadModifiers::NEUTRAL);
        assert_eq!(b.elevation_factor, Fixed::ZERO);
        assert_eq!(b.clamped, MIN_HIT_CHANCE);
    }

    #[test]
    fn test_every_shot_hits_with_zero_rolls() {
        let (attacker, mut target) = pair(0);
        let result = always_hit().resolve_with_modifiers(
            &attacker,
            &mut target,
            &rifle(),
            SquadModifiers::NEUTRAL,
        );
        assert_eq!(result.shots_fired, 3);
        assert_eq!(result.shots_hit, 3);
        assert_eq!(result.total_damage, 30);
        assert_eq!(target.health().current, 70);
        assert_eq!(result.accuracy(), Fixed::ONE);
    }

    #[test]
    fn test_every_shot_misses_with_max_rolls() {
        let (attacker, mut target) = pair(0);
        let result = always_miss().resolve_with_modifiers(
            &attacker,
            &mut target,
            &rifle(),
            SquadModifiers::NEUTRAL,
        );
        assert_eq!(result.shots_fired, 3);
        assert_eq!(result.shots_hit, 0);
        assert_eq!(result.total_damage, 0);
        assert_eq!(result.accuracy(), Fixed::ZERO);
    }

    #[test]
    fn test_burst_stops_on_kill() {
        let attacker = Unit::new(1, 0, 100);
        let mut target = Unit::new(2, 1, 15);
        let result = always_hit().resolve_with_modifiers(
            &attacker,
            &mut target,
            &rifle(),
            SquadModifiers::NEUTRAL,
        );
        assert_eq!(result.shots_fired, 2);
        assert_eq!(result.total_damage, 15);
        assert!(result.target_destroyed);
    }

    #[test]
    fn test_damage_multiplier_applies() {
        let (attacker, mut target) = pair(0);
        let modifiers = SquadModifiers {
            damage_multiplier: Fixed::from_num(1.5),
            ..SquadModifiers::NEUTRAL
        };
        let result = always_hit().resolve_with_modifiers(&attacker, &mut target, &rifle(), modifiers);
        assert_eq!(result.total_damage, 45);
    }

    #[test]
    fn test_missing_inputs_yield_empty_result() {
        let squads = SquadRegistry::new();
        let weapon = rifle();
        let (attacker, mut target) = pair(0);
        let mut resolver = CombatResolver::from_seed(1);

        assert_eq!(
            resolver.resolve_combat(None, Some(&mut target), Some(&weapon), &squads),
            CombatResult::default()
        );
        assert_eq!(
            resolver.resolve_combat(Some(&attacker), None, Some(&weapon), &squads),
            CombatResult::default()
        );
        assert_eq!(
            resolver.resolve_combat(Some(&attacker), Some(&mut target), None, &squads),
            CombatResult::default()
        );
        assert_eq!(target.health().current, 100);
    }

    #[test]
    fn test_dead_target_is_not_fired_upon() {
        let (attacker, mut target) = pair(0);
        target.apply_damage(Fixed::from_num(1000));
        let result = always_hit().resolve_with_modifiers(
            &attacker,
            &mut target,
            &rifle(),
            SquadModifiers::NEUTRAL,
        );
        assert_eq!(result.shots_fired, 0);
    }

    #[test]
    fn test_squad_modifiers_come_from_registry() {
        let mut squads = SquadRegistry::new();
        let id = squads.create_squad(0);
        squads.assign(1, id);
        let upgrade = crate::upgrade::UpgradeEffect::new("ap", "AP Rounds")
            .with_damage_multiplier(Fixed::from_num(2));
        squads.get_mut(id).unwrap().apply_upgrade(Arc::new(upgrade));

        let (mut attacker, _) = pair(0);
        assert_eq!(
            SquadModifiers::for_unit(&attacker, &squads),
            SquadModifiers::NEUTRAL
        );
        attacker.set_squad(Some(id));
        assert_eq!(
            SquadModifiers::for_unit(&attacker, &squads).damage_multiplier,
            Fixed::from_num(2)
        );
    }
}
