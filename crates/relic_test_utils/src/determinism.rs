//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the battlefield and the combat
//! resolver produce identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Two devices replaying the same encounter must agree shot for shot.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`relic_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted unit ID order.
//!
//! - **System randomness**: Every roll comes from the resolver's seeded
//!   generator. Nothing reads the OS entropy pool.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Single bursts resolve identically for a seed
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battlefield scenarios are reproducible
//! 4. **Parallel tests**: Running N battlefields on threads all match

use std::thread;

use relic_core::battlefield::Battlefield;
use relic_core::combat::{CombatResolver, CombatResult, SquadModifiers};
use relic_core::math::Fixed;
use relic_core::unit::Unit;
use relic_core::weapon::WeaponProfile;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battlefield is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use relic_core::battlefield::Battlefield;
/// use relic_core::math::Fixed;
/// use relic_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     3,
///     10,
///     || Battlefield::new(1),
///     |field| {
///         field.tick(Fixed::ONE);
///     },
///     |field| field.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a battlefield twice with identical setup and compare final hashes.
pub fn verify_battlefield_determinism<F>(setup_fn: F, num_ticks: u64, delta: Fixed) -> bool
where
    F: Fn() -> Battlefield,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |field| {
            field.tick(delta);
        },
        |field| field.state_hash(),
    )
    .is_deterministic
}

/// Run N battlefields on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// or memory layout differences.
pub fn run_parallel_battlefields<F>(
    setup_fn: F,
    num_runs: usize,
    num_ticks: u64,
    delta: Fixed,
) -> DeterminismResult
where
    F: Fn() -> Battlefield + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    let mut field = setup_fn();
                    for _ in 0..num_ticks {
                        field.tick(delta);
                    }
                    field.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battlefield thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two battlefield runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, delta: Fixed) -> Option<u64>
where
    F: Fn() -> Battlefield,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick(delta);
        second.tick(delta);

        if first.state_hash() != second.state_hash() {
            tracing::warn!(tick, "Battlefields diverged");
            return Some(tick);
        }
    }

    None
}

/// Resolve `bursts` bursts from one seeded resolver and collect the results.
///
/// The target is cloned fresh for every burst so each result depends only
/// on the seed and the burst's position in the sequence.
#[must_use]
pub fn burst_sequence(
    seed: u64,
    attacker: &Unit,
    target: &Unit,
    weapon: &WeaponProfile,
    modifiers: SquadModifiers,
    bursts: usize,
) -> Vec<CombatResult> {
    let mut resolver = CombatResolver::from_seed(seed);
    (0..bursts)
        .map(|_| {
            let mut victim = target.clone();
            resolver.resolve_with_modifiers(attacker, &mut victim, weapon, modifiers)
        })
        .collect()
}

/// Proptest strategies for combat and determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use relic_core::combat::SquadModifiers;
    use relic_core::curve::Curve;
    use relic_core::math::{Fixed, Vec3Fixed};
    use relic_core::weapon::WeaponProfile;

    /// Generate a coordinate inside the default arena.
    ///
    /// Range: -50 to 50
    pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
        (-50i32..=50i32).prop_map(Fixed::from_num)
    }

    /// Generate a position with a small height range.
    pub fn arb_position() -> impl Strategy<Value = Vec3Fixed> {
        (arb_coordinate(), -10i32..=10i32, arb_coordinate())
            .prop_map(|(x, y, z)| Vec3Fixed::new(x, Fixed::from_num(y), z))
    }

    /// Generate a probability in thousandths.
    pub fn arb_probability() -> impl Strategy<Value = Fixed> {
        (0i32..=1000i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(1000))
    }

    /// Generate a multiplier in hundredths, 0 to 5.
    pub fn arb_multiplier() -> impl Strategy<Value = Fixed> {
        (0i32..=500i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(100))
    }

    /// Generate a health value.
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..10_000u32
    }

    /// Generate an armor percentage, including values past the cap.
    pub fn arb_armor() -> impl Strategy<Value = u8> {
        0u8..=120u8
    }

    /// Generate a raw damage amount.
    pub fn arb_damage() -> impl Strategy<Value = Fixed> {
        (0i32..5_000i32).prop_map(Fixed::from_num)
    }

    /// Generate a descending range curve on `[0, 2]`.
    pub fn arb_range_curve() -> impl Strategy<Value = Curve> {
        (50u32..=100u32, 0u32..=50u32, 0u32..=10u32).prop_map(|(near, mid, far)| {
            Curve::from_pairs(&[
                (0.0, f64::from(near) / 100.0),
                (1.0, f64::from(mid) / 100.0),
                (2.0, f64::from(far) / 100.0),
            ])
        })
    }

    /// Generate a valid weapon profile.
    pub fn arb_weapon() -> impl Strategy<Value = WeaponProfile> {
        (
            1u32..=12u32,
            1i32..=20i32,
            arb_probability(),
            1i32..=200i32,
            1i32..=60i32,
            arb_range_curve(),
        )
            .prop_map(|(shots, rate_tenths, hit, damage, range, curve)| {
                WeaponProfile::new(
                    "generated",
                    shots,
                    Fixed::from_num(rate_tenths) / Fixed::from_num(10),
                    hit,
                    Fixed::from_num(damage),
                    Fixed::from_num(range),
                )
                .with_range_curve(curve)
            })
    }

    /// Generate aggregated squad modifiers.
    pub fn arb_modifiers() -> impl Strategy<Value = SquadModifiers> {
        (arb_multiplier(), arb_multiplier(), -50i32..=50i32).prop_map(
            |(hit_chance_multiplier, damage_multiplier, bonus)| SquadModifiers {
                hit_chance_multiplier,
                damage_multiplier,
                elevation_bonus_flat: Fixed::from_num(bonus) / Fixed::from_num(100),
            },
        )
    }
}
