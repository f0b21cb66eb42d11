//! Full-step benchmark under a busy arena.

use arena_sim::{Archetype, PlayerInput, Rect, SimWorld};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;

fn busy_world(enemies: usize) -> SimWorld {
    let mut sim = SimWorld::new();
    sim.set_walls(vec![
        Rect::from_xywh(300.0, 200.0, 40.0, 320.0),
        Rect::from_xywh(940.0, 200.0, 40.0, 320.0),
    ]);
    sim.spawn_player(Vec2::new(640.0, 360.0));
    for i in 0..enemies {
        let archetype = Archetype::ALL[i % Archetype::ALL.len()];
        let x = 60.0 + (i % 12) as f32 * 100.0;
        let y = 60.0 + (i / 12) as f32 * 120.0;
        sim.spawn_enemy(archetype, Vec2::new(x, y), false);
    }
    sim
}

fn bench_step(c: &mut Criterion) {
    for enemies in [16, 63] {
        let mut sim = busy_world(enemies);
        // Let the projectile arena fill up before measuring
        for _ in 0..120 {
            sim.step(1.0 / 60.0);
        }

        c.bench_function(&format!("step_{}_enemies", enemies), |b| {
            b.iter(|| {
                sim.set_player_input(PlayerInput {
                    aim: Some(1.0),
                    fire: true,
                    ..Default::default()
                });
                sim.step(black_box(1.0 / 60.0));
                sim.drain_events();
            })
        });
    }
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
