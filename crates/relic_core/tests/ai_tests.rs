//! Unit AI tests driven through the battlefield host.

use std::sync::Arc;

use relic_core::ai::{AiEvent, AiState, UnitAi};
use relic_core::battlefield::Battlefield;
use relic_core::math::Fixed;
use relic_core::unit::{TeamId, Unit, UnitId, UnitSpawnParams};
use relic_core::weapon::WeaponProfile;
use relic_test_utils::fixtures::{fixed, fixed_f, flat_weapon, ground, rifle, soldier};

fn spotter(
    field: &mut Battlefield,
    team: TeamId,
    x: i32,
    weapon: &Arc<WeaponProfile>,
    radius: i32,
) -> UnitId {
    field.spawn_unit(UnitSpawnParams {
        detection_radius: Some(fixed(radius)),
        ..soldier(team, x, 0, weapon)
    })
}

// =============================================================================
// Re-targeting
// =============================================================================

#[test]
fn dead_target_switches_to_nearest_enemy_in_radius() {
    let weapon = Arc::new(rifle());
    let mut field = Battlefield::new(1);
    let a = spotter(&mut field, 0, 0, &weapon, 10);
    let b = spotter(&mut field, 1, 5, &weapon, 10);
    let c = spotter(&mut field, 1, 8, &weapon, 10);

    assert!(field.order_attack(a, b).unwrap());
    field.damage_unit(b, fixed(10_000)).unwrap();

    let events = field.tick(fixed_f(0.1));
    let ai = field.controller(a).unwrap();
    assert_eq!(ai.current_target(), Some(c));
    assert_eq!(ai.state(), AiState::Attacking);
    assert!(events.deaths.contains(&b));
}

#[test]
fn dead_target_with_no_replacement_goes_idle() {
    let weapon = Arc::new(rifle());
    let mut field = Battlefield::new(1);
    let a = spotter(&mut field, 0, 0, &weapon, 10);
    let b = spotter(&mut field, 1, 5, &weapon, 10);
    spotter(&mut field, 1, 15, &weapon, 10);

    assert!(field.order_attack(a, b).unwrap());
    field.damage_unit(b, fixed(10_000)).unwrap();
    field.tick(fixed_f(0.1));

    let ai = field.controller(a).unwrap();
    assert_eq!(ai.current_target(), None);
    assert_eq!(ai.state(), AiState::Idle);
}

// =============================================================================
// Cadence
// =============================================================================

#[test]
fn bursts_follow_the_fire_rate() {
    // 1 burst per second, 1000 health target: nothing dies during the test.
    let weapon = Arc::new(flat_weapon(1, 0.5, 1, 20));
    let mut field = Battlefield::new(9);
    let a = field.spawn_unit(soldier(0, 0, 0, &weapon));
    let target = field.spawn_unit(UnitSpawnParams {
        max_health: 1000,
        ..soldier(1, 5, 0, &weapon)
    });
    field.set_ai_enabled(target, false).unwrap();

    let mut bursts = 0;
    for _ in 0..25 {
        bursts += field
            .tick(fixed_f(0.1))
            .bursts()
            .filter(|(attacker, _, _)| *attacker == a)
            .count();
    }
    // Fires at t=0, 1 and 2.
    assert_eq!(bursts, 3);
}

#[test]
fn bursts_follow_a_swapped_weapon() {
    let slow = Arc::new(flat_weapon(1, 0.5, 1, 20));
    let fast = Arc::new(WeaponProfile::new(
        "smg",
        1,
        fixed(4),
        fixed_f(0.5),
        fixed(1),
        fixed(20),
    ));
    let mut field = Battlefield::new(9);
    let a = field.spawn_unit(soldier(0, 0, 0, &slow));
    let target = field.spawn_unit(UnitSpawnParams {
        max_health: 1000,
        ..soldier(1, 5, 0, &slow)
    });
    field.set_ai_enabled(target, false).unwrap();
    field.equip_weapon(a, Some(fast)).unwrap();

    let mut bursts = 0;
    for _ in 0..8 {
        bursts += field
            .tick(fixed_f(0.25))
            .bursts()
            .filter(|(attacker, _, _)| *attacker == a)
            .count();
    }
    // Every 0.25s tick instead of once a second.
    assert_eq!(bursts, 8);
    assert_eq!(field.controller(a).unwrap().fire_interval(), fixed_f(0.25));
    assert!(field.equip_weapon(99, None).is_err());
}

#[test]
fn frozen_ai_keeps_its_state() {
    let weapon = Arc::new(rifle());
    let mut field = Battlefield::new(2);
    let a = field.spawn_unit(soldier(0, 0, 0, &weapon));
    let b = field.spawn_unit(soldier(1, 5, 0, &weapon));
    field.set_ai_enabled(b, false).unwrap();

    field.tick(fixed_f(0.1));
    assert_eq!(field.controller(a).unwrap().current_target(), Some(b));
    field.set_ai_enabled(a, false).unwrap();

    let events = field.tick(fixed_f(0.1));
    assert_eq!(events.bursts().count(), 0);
    assert_eq!(field.controller(a).unwrap().state(), AiState::Attacking);
    assert_eq!(field.controller(b).unwrap().state(), AiState::Idle);
}

// =============================================================================
// Orders
// =============================================================================

#[test]
fn move_then_stop() {
    let weapon = Arc::new(rifle());
    let mut field = Battlefield::new(3);
    let a = field.spawn_unit(soldier(0, 0, 0, &weapon));

    assert!(field.order_move(a, ground(10, 10)).unwrap());
    field.tick(Fixed::ONE);
    assert_eq!(field.controller(a).unwrap().state(), AiState::Moving);
    assert_ne!(field.unit(a).unwrap().position, ground(0, 0));

    field.order_stop(a).unwrap();
    let position = field.unit(a).unwrap().position;
    field.tick(Fixed::ONE);
    assert_eq!(field.controller(a).unwrap().state(), AiState::Idle);
    assert_eq!(field.unit(a).unwrap().position, position);
}

#[test]
fn attack_order_rejects_teammates() {
    let weapon = Arc::new(rifle());
    let mut field = Battlefield::new(4);
    let a = field.spawn_unit(soldier(0, 0, 0, &weapon));
    let friend = field.spawn_unit(soldier(0, 2, 0, &weapon));

    assert!(!field.order_attack(a, friend).unwrap());
    assert!(field.order_attack(a, 999).is_err());
}

// =============================================================================
// State notifications
// =============================================================================

#[test]
fn set_state_is_idempotent() {
    let owner = Unit::new(1, 0, 100);
    let mut ai = UnitAi::new(&owner, fixed(10));

    ai.set_state(AiState::Attacking);
    ai.set_state(AiState::Attacking);
    ai.set_state(AiState::Idle);
    ai.set_state(AiState::Idle);

    let changes: Vec<_> = ai
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            AiEvent::StateChanged { state, .. } => Some(state),
            AiEvent::BurstFired { .. } => None,
        })
        .collect();
    assert_eq!(changes, vec![AiState::Attacking, AiState::Idle]);
}
