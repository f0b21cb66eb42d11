//! AI systems - target tracking and the decision pass.
//!
//! Decisions run on a per-combatant cadence (`AiTuning::decision_interval`).
//! Between decisions each combatant keeps executing its last `Intent`, so
//! the expensive perception work (spatial query, line of sight, incoming
//! projectile scan) only happens a few times per second per enemy.

use crate::behavior::*;
use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::projectile::ProjectileArena;
use crate::spatial::{SpatialEntry, SpatialGrid};
use crate::systems::movement::DeltaTime;
use crate::world::Walls;
use bevy_ecs::prelude::*;
use glam::Vec2;

/// System that records the designated target's velocity every step.
///
/// The target is the lowest-id living player.
pub fn target_history_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut history: ResMut<TargetHistory>,
    query: Query<(&CombatantId, &Role, &Health, &Velocity)>,
) {
    let target = query
        .iter()
        .filter(|(_, role, health, _)| **role == Role::Player && health.alive)
        .min_by_key(|(id, ..)| **id);

    match target {
        Some((id, _, _, vel)) => history.record(*id, vel.0, dt.0, config.ai.memory_duration),
        None => history.clear(),
    }
}

/// Nearest living player within `range`, ties broken by id.
fn nearest_player(grid: &SpatialGrid, position: Vec2, range: f32) -> Option<SpatialEntry> {
    let mut best: Option<(f32, SpatialEntry)> = None;

    for entry in grid.query(position, range) {
        if entry.role != Role::Player {
            continue;
        }
        let dist = entry.position.distance(position);
        if dist > range {
            continue;
        }
        if best.map_or(true, |(best_dist, _)| dist < best_dist) {
            best = Some((dist, entry));
        }
    }

    best.map(|(_, entry)| entry)
}

/// System that runs the archetype policies for every AI combatant whose
/// decision timer has run out.
///
/// Combatants are processed in id order so RNG consumption is reproducible.
#[allow(clippy::too_many_arguments)]
pub fn ai_decision_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    walls: Res<Walls>,
    grid: Res<SpatialGrid>,
    projectiles: Res<ProjectileArena>,
    history: Res<TargetHistory>,
    mut rng: ResMut<SimRng>,
    targets: Query<(&Facing, &Health)>,
    mut agents: Query<(
        Entity,
        &CombatantId,
        &Position,
        &Body,
        &Stats,
        &Health,
        &mut Brain,
        &mut Intent,
    )>,
) {
    let delta = dt.0;
    let tuning = &config.ai;

    let mut order: Vec<(CombatantId, Entity)> = agents
        .iter()
        .filter(|(.., health, _, _)| health.alive)
        .map(|(entity, id, ..)| (*id, entity))
        .collect();
    order.sort_unstable_by_key(|(id, _)| *id);

    for (_, entity) in order {
        let Ok((_, id, pos, body, stats, _, mut brain, mut intent)) = agents.get_mut(entity) else {
            continue;
        };

        brain.tick(delta);
        if !brain.decision_due() {
            continue;
        }
        brain.decision_timer = tuning.decision_interval;

        let position = pos.0;
        let target = nearest_player(&grid, position, stats.detection_range).and_then(|entry| {
            let (facing, health) = targets.get(entry.entity).ok()?;
            if !health.alive {
                return None;
            }
            let lead_velocity = if history.target == Some(entry.id) {
                history.lead_velocity(tuning.memory_samples)
            } else {
                Vec2::ZERO
            };
            Some(TargetView {
                position: entry.position,
                facing: facing.0,
                lead_velocity,
            })
        });

        let perceives = target.map_or(false, |t| {
            perceive(position, t.position, stats.detection_range, &walls.0)
        });

        let incoming = if brain.archetype == Archetype::Dodger {
            detect_incoming(
                position,
                *id,
                &projectiles,
                tuning.dodge_radius,
                tuning.dodge_dot_threshold,
            )
        } else {
            None
        };

        let ctx = DecisionContext {
            position,
            radius: body.radius,
            detection_range: stats.detection_range,
            tuning,
            target,
            perceives,
            incoming,
            walls: &walls.0,
            bounds: &config.arena,
        };

        let decision = decide(&mut brain, &ctx, &mut rng.0);
        *intent = Intent {
            movement: decision.movement,
            aim: decision.aim,
            fire: decision.fire,
        };
    }
}
