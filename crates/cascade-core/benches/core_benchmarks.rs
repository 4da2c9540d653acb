//! Benchmarks for the reducer/batch hot path: a callback storm of duplicate
//! symmetric contacts collapsing into a handful of logical events.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cascade_core::batch::drain;
use cascade_core::prelude::*;

fn storm_setup() -> (CoinRegistry, InteractionTable, Vec<Contact>) {
    let table = InteractionTable::standard();
    let mut registry = CoinRegistry::new();

    let mut pairs = Vec::new();
    for i in 0..64 {
        let ore = registry.spawn(CoinKind::Ore, [i as f32, 0.5, 0.0]);
        let flux = registry.spawn(CoinKind::Flux, [i as f32, 0.5, 0.1]);
        pairs.push((ore, flux));
    }
    // Some inert coins to exercise the fast reject.
    for i in 0..64 {
        registry.spawn(CoinKind::Silver, [i as f32, 0.5, 1.0]);
    }

    // Eight sub-steps of symmetric callbacks per pair.
    let mut contacts = Vec::new();
    for _ in 0..8 {
        for &(a, b) in &pairs {
            for (x, y) in [(a, b), (b, a)] {
                contacts.push(Contact {
                    coin: x,
                    other: ContactBody::Coin(y),
                    relative_velocity: [1.0, 0.0, 0.0],
                    point: None,
                });
            }
        }
    }
    (registry, table, contacts)
}

fn bench_reducer_storm(c: &mut Criterion) {
    c.bench_function("reducer_observe_storm", |b| {
        let (registry, table, contacts) = storm_setup();
        b.iter(|| {
            let mut reducer = EventReducer::new();
            for contact in &contacts {
                reducer.observe(&registry, &table, black_box(contact));
            }
            black_box(reducer.take_batch())
        });
    });
}

fn bench_full_tick(c: &mut Criterion) {
    c.bench_function("reducer_and_drain_tick", |b| {
        b.iter_batched(
            storm_setup,
            |(mut registry, table, contacts)| {
                let mut reducer = EventReducer::new();
                for contact in &contacts {
                    reducer.observe(&registry, &table, contact);
                }
                black_box(drain(reducer.take_batch(), &mut registry))
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_reducer_storm, bench_full_tick);
criterion_main!(benches);
