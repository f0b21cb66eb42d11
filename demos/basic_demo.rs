//! Basic demonstration of the arena simulation.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=debug to see spawns, reloads and dashes.

use arena_sim::{PlayerInput, Rect, Role, SimEvent, SimWorld};
use glam::Vec2;

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    println!("=== Arena Sim - Simulation Demo ===\n");

    let mut sim = SimWorld::new();
    sim.set_walls(vec![
        Rect::from_xywh(300.0, 200.0, 40.0, 320.0),
        Rect::from_xywh(940.0, 200.0, 40.0, 320.0),
        Rect::from_xywh(540.0, 120.0, 200.0, 30.0),
    ]);
    let player = sim.spawn_player(Vec2::new(640.0, 360.0));

    let zones = vec![
        Vec2::new(80.0, 80.0),
        Vec2::new(1200.0, 80.0),
        Vec2::new(80.0, 640.0),
        Vec2::new(1200.0, 640.0),
    ];
    sim.start_wave(1, &zones);

    // 30 seconds at 60 steps per second; the player circles and sprays
    let mut kills = 0;
    for step in 0..1800 {
        let t = step as f32 / 60.0;
        let aim = nearest_enemy_angle(&mut sim).unwrap_or(t);
        let empty = sim.player_weapon().map_or(false, |w| w.ammo == 0);
        sim.set_player_input(PlayerInput {
            movement: Vec2::new(t.cos(), t.sin()),
            aim: Some(aim),
            fire: true,
            reload: empty,
            dash: step % 240 == 0,
            ..Default::default()
        });
        sim.step(1.0 / 60.0);

        for event in sim.drain_events() {
            if let SimEvent::Death(death) = event {
                if death.victim == player {
                    println!("Player died at t={:.1}s", sim.current_time());
                    print_summary(&mut sim, kills);
                    return;
                }
                kills += 1;
            }
        }

        if sim.is_wave_complete() {
            let queued = sim.next_wave(&zones);
            println!(
                "--- Wave {} cleared at t={:.1}s, {} enemies incoming ---",
                sim.wave_number() - 1,
                sim.current_time(),
                queued
            );
        }

        if (step + 1) % 300 == 0 {
            print_summary(&mut sim, kills);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("snapshot failed: {}", err),
    }
}

fn nearest_enemy_angle(sim: &mut SimWorld) -> Option<f32> {
    let snapshot = sim.snapshot();
    let player = snapshot.combatants.iter().find(|c| c.role == Role::Player)?;
    let from = Vec2::new(player.x, player.y);
    snapshot
        .combatants
        .iter()
        .filter(|c| c.role == Role::Enemy)
        .map(|c| Vec2::new(c.x, c.y) - from)
        .min_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .map(|d| d.y.atan2(d.x))
}

fn print_summary(sim: &mut SimWorld, kills: usize) {
    let snapshot = sim.snapshot();
    println!(
        "--- Tick {} (t={:.1}s) wave {} | enemies {} queued {} | projectiles {} | kills {} ---",
        snapshot.tick,
        snapshot.time,
        snapshot.wave.wave,
        snapshot.wave.active,
        snapshot.wave.queued,
        snapshot.projectiles.len(),
        kills
    );
    for c in &snapshot.combatants {
        println!(
            "    #{:<3} {:?} {:<8} pos=({:.0}, {:.0}) hp={}/{}{}",
            c.id,
            c.role,
            c.archetype.map_or("-", |a| a.name()),
            c.x,
            c.y,
            c.health,
            c.health_max,
            if c.boss { " [boss]" } else { "" }
        );
    }
    if let Some(weapon) = snapshot.player_weapon {
        println!(
            "    weapon {} {}/{}{}",
            weapon.kind.name(),
            weapon.ammo,
            weapon.magazine_size,
            if weapon.reloading { " (reloading)" } else { "" }
        );
    }
}
