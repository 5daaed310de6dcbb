//! Store throughput benchmarks: pool insert/remove churn, single and joined
//! iteration, and whole-world snapshot capture.
//!
//! Run with: `cargo bench --bench ecs_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use dream_ecs::prelude::*;

// ---------------------------------------------------------------------------
// Benchmark component types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}
dream_ecs::reflect!(Position { x, y });
dream_ecs::scene_component!(Position);

#[derive(Debug, Clone, Default, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}
dream_ecs::reflect!(Velocity { dx, dy });
dream_ecs::scene_component!(Velocity);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A world with `count` entities, every second one also moving.
fn setup_world(count: usize) -> (World, Vec<EntityId>) {
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Velocity>();
    let entities = (0..count)
        .map(|i| {
            let e = world.create_with((Position {
                x: i as f32,
                y: 0.0,
            },));
            if i % 2 == 0 {
                let _ = world.add(e, Velocity { dx: 1.0, dy: 0.5 });
            }
            e
        })
        .collect();
    (world, entities)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_insert_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_churn");
    for &count in &[1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (mut world, entities) = setup_world(count);
            b.iter(|| {
                for &e in &entities {
                    world.remove::<Position>(e);
                }
                for &e in &entities {
                    let _ = world.add(e, Position::default());
                }
                black_box(world.entity_count())
            });
        });
    }
    group.finish();
}

fn bench_each(c: &mut Criterion) {
    let mut group = c.benchmark_group("each");
    for &count in &[1_000usize, 10_000] {
        let (mut world, _) = setup_world(count);
        group.bench_with_input(BenchmarkId::new("single", count), &count, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                world.each::<Position>(|_, pos| sum += pos.x);
                black_box(sum)
            });
        });
        group.bench_with_input(BenchmarkId::new("joined", count), &count, |b, _| {
            b.iter(|| {
                world.each2::<Position, Velocity>(|_, pos, vel| {
                    pos.x += vel.dx;
                    pos.y += vel.dy;
                });
            });
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let (world, _) = setup_world(1_000);
    c.bench_function("capture_snapshot_1k", |b| {
        b.iter(|| black_box(world.capture_snapshot().len()));
    });
}

criterion_group!(benches, bench_insert_remove, bench_each, bench_snapshot);
criterion_main!(benches);
