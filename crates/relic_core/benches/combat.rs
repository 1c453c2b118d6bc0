//! Combat benchmarks for relic_core.
//!
//! Run with: `cargo bench -p relic_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use relic_core::battlefield::Battlefield;
use relic_core::combat::{CombatResolver, SquadModifiers};
use relic_test_utils::fixtures::{fixed_f, flat_weapon, rifle, soldier, unit_at};

/// Single bursts through the resolver.
pub fn resolver_benchmark(c: &mut Criterion) {
    let attacker = unit_at(1, 0, 0, 0, 100);
    let target = unit_at(2, 1, 12, 0, u32::MAX);
    let weapon = flat_weapon(10, 0.6, 5, 30);
    let mut resolver = CombatResolver::from_seed(1);

    c.bench_function("resolve_burst_10_shots", |b| {
        b.iter_batched_ref(
            || target.clone(),
            |victim| {
                black_box(resolver.resolve_with_modifiers(
                    &attacker,
                    victim,
                    &weapon,
                    SquadModifiers::NEUTRAL,
                ))
            },
            BatchSize::SmallInput,
        );
    });
}

/// Full ticks of a 20 vs 20 skirmish.
pub fn battlefield_benchmark(c: &mut Criterion) {
    let rifle = Arc::new(rifle());
    let setup = || {
        let mut field = Battlefield::new(7);
        for i in 0..20 {
            field.spawn_unit(soldier(0, -8, i * 2 - 20, &rifle));
            field.spawn_unit(soldier(1, 8, i * 2 - 20, &rifle));
        }
        field
    };
    let delta = fixed_f(0.1);

    c.bench_function("battlefield_tick_40_units", |b| {
        b.iter_batched_ref(
            setup,
            |field| {
                for _ in 0..10 {
                    black_box(field.tick(delta));
                }
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("battlefield_state_hash", |b| {
        let field = setup();
        b.iter(|| black_box(field.state_hash()));
    });
}

criterion_group!(benches, resolver_benchmark, battlefield_benchmark);
criterion_main!(benches);
