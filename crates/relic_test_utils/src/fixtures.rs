//! Test fixtures and helpers.
//!
//! Pre-built weapons, units and content documents
//! for consistent testing.

use std::sync::Arc;

use fixed::types::I32F32;
use relic_core::curve::Curve;
use relic_core::data::{ContentFormat, EraData};
use relic_core::math::Vec3Fixed;
use relic_core::unit::{TeamId, Unit, UnitId, UnitSpawnParams};
use relic_core::upgrade::UpgradeEffect;
use relic_core::weapon::WeaponProfile;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A point on the ground plane.
#[must_use]
pub fn ground(x: i32, z: i32) -> Vec3Fixed {
    Vec3Fixed::from_ints(x, 0, z)
}

/// Three-round rifle: 2 bursts/s, 0.7 base hit, 10 damage, 20 range.
///
/// Range curve `[(0, 1), (1, 0.5)]`, so hit chance halves at full range.
#[must_use]
pub fn rifle() -> WeaponProfile {
    WeaponProfile::new("rifle", 3, fixed(2), fixed_f(0.7), fixed(10), fixed(20))
        .with_range_curve(Curve::from_pairs(&[(0.0, 1.0), (1.0, 0.5)]))
}

/// A weapon with a flat range curve and neutral elevation.
#[must_use]
pub fn flat_weapon(shots: u32, hit: f64, damage: i32, range: i32) -> WeaponProfile {
    WeaponProfile::new("flat", shots, fixed(1), fixed_f(hit), fixed(damage), fixed(range))
        .with_range_curve(Curve::constant(fixed(1)))
        .with_elevation_curve(Curve::constant(fixed(0)))
}

/// A hit-chance upgrade.
#[must_use]
pub fn accuracy_upgrade(id: &str, multiplier: f64, max_stacks: u32) -> Arc<UpgradeEffect> {
    Arc::new(
        UpgradeEffect::new(id, id)
            .with_hit_chance_multiplier(fixed_f(multiplier))
            .with_max_stacks(max_stacks),
    )
}

/// A damage upgrade.
#[must_use]
pub fn damage_upgrade(id: &str, multiplier: f64) -> Arc<UpgradeEffect> {
    Arc::new(UpgradeEffect::new(id, id).with_damage_multiplier(fixed_f(multiplier)))
}

/// A standalone unit at a ground position.
#[must_use]
pub fn unit_at(id: UnitId, team: TeamId, x: i32, z: i32, health: u32) -> Unit {
    Unit::new(id, team, health).with_position(ground(x, z))
}

/// Spawn parameters for an armed soldier on the ground plane.
#[must_use]
pub fn soldier(team: TeamId, x: i32, z: i32, weapon: &Arc<WeaponProfile>) -> UnitSpawnParams {
    UnitSpawnParams {
        team_id: team,
        position: ground(x, z),
        max_health: 100,
        move_speed: fixed(3),
        weapon: Some(Arc::clone(weapon)),
        ..Default::default()
    }
}

/// A small but complete era document in RON.
pub const SAMPLE_ERA_RON: &str = r#"(
    name: "World War II",
    era: Some(WWII),
    description: "Tabletop infantry skirmish",
    weapons: [
        (name: "m1_garand", shots_per_burst: 3, fire_rate: 1.5,
         base_hit_chance: 0.7, base_damage: 12, effective_range: 30,
         range_curve: [(0, 1), (0.5, 0.9), (1, 0.5)]),
        (name: "mg42", shots_per_burst: 10, fire_rate: 0.5,
         base_hit_chance: 0.35, base_damage: 8, effective_range: 40),
    ],
    archetypes: [
        (id: "rifleman", name: "Rifleman", base_health: 100, base_move_speed: 4,
         armor: 10, weapon: "m1_garand"),
        (id: "machine_gunner", base_health: 110, base_move_speed: 3,
         armor: 15, weapon: "mg42", detection_radius: 25),
        (id: "medic", base_health: 80, base_move_speed: 4.5),
    ],
    upgrades: [
        (name: "Marksman Training", hit_chance_multiplier: 1.15, max_stacks: 2),
        (name: "AP Rounds", damage_multiplier: 1.25, exclusive_with: ["hollow_points"]),
        (name: "Hollow Points", damage_multiplier: 1.1),
        (name: "High Ground Drill", elevation_bonus: 0.1, era: Some(WWII)),
    ],
)"#;

/// Parse [`SAMPLE_ERA_RON`].
///
/// # Panics
///
/// Panics if the sample no longer parses.
#[must_use]
pub fn sample_era() -> EraData {
    ContentFormat::Ron.parse(SAMPLE_ERA_RON).expect("sample era must parse")
}
