//! Combat systems - firing, projectile collision, contact and removal.
//!
//! ## Projectile hits
//!
//! Hit resolution has two phases:
//!
//! 1. **Gather** - for each live projectile, query the spatial grid and
//!    collect every overlapping non-owner, nearest first. Read-only, so it
//!    can run in parallel.
//! 2. **Apply** - walk the gathered list in projectile slot order and damage
//!    the first candidate still alive. Sequential, so the outcome never
//!    depends on thread scheduling.
//!
//! With `--features parallel` the gather phase uses rayon.

use crate::collision::{circle_intersects_walls, circles_overlap, resolve_circle_vs_circle};
use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::events::{DeathEvent, EventLog, HitEvent, HitTarget, SimEvent};
use crate::geometry::vector_from_angle;
use crate::projectile::{Projectile, ProjectileArena, ProjectileFate, ProjectileHandle};
use crate::spatial::SpatialGrid;
use crate::systems::movement::DeltaTime;
use crate::weapon::Loadout;
use crate::world::Walls;
use bevy_ecs::prelude::*;
use glam::Vec2;
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// System that integrates projectiles and culls expired or escaped ones.
pub fn projectile_advance_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut projectiles: ResMut<ProjectileArena>,
) {
    projectiles.step(dt.0, &config.arena);
}

/// System that turns fire intents into projectiles.
///
/// Projectiles appear `muzzle_offset` ahead of the shooter along its facing.
/// Shooters are processed in id order so spread rolls are reproducible.
pub fn weapon_fire_system(
    config: Res<SimConfig>,
    mut rng: ResMut<SimRng>,
    mut projectiles: ResMut<ProjectileArena>,
    mut query: Query<(
        Entity,
        &CombatantId,
        &Health,
        &Intent,
        &Position,
        &Facing,
        &mut Loadout,
    )>,
) {
    let mut shooters: Vec<(CombatantId, Entity)> = query
        .iter()
        .filter(|(_, _, health, intent, ..)| health.alive && intent.fire)
        .map(|(entity, id, ..)| (*id, entity))
        .collect();
    shooters.sort_unstable_by_key(|(id, _)| *id);

    for (_, entity) in shooters {
        let Ok((_, id, _, _, pos, facing, mut loadout)) = query.get_mut(entity) else {
            continue;
        };
        let Some(weapon) = loadout.active_weapon_mut() else {
            continue;
        };

        let origin = pos.0 + vector_from_angle(facing.0) * config.muzzle_offset;
        for spawn in weapon.fire(origin, facing.0, *id, &mut rng.0) {
            projectiles.spawn(Projectile::new(
                spawn,
                config.projectile_radius,
                config.projectile_lifetime,
            ));
        }
    }
}

/// System that stops projectiles touching a wall.
pub fn projectile_wall_system(
    walls: Res<Walls>,
    mut projectiles: ResMut<ProjectileArena>,
    mut events: ResMut<EventLog>,
) {
    if walls.0.is_empty() {
        return;
    }

    for (_, projectile) in projectiles.iter_mut() {
        if projectile.alive && circle_intersects_walls(projectile.position, projectile.radius, &walls.0) {
            projectile.kill(ProjectileFate::HitWall);
            events.push(SimEvent::Hit(HitEvent {
                position: projectile.position,
                owner: projectile.owner,
                target: HitTarget::Wall,
            }));
        }
    }
}

/// Read-only view of a projectile for the gather phase.
#[derive(Clone, Copy)]
struct LiveShot {
    handle: ProjectileHandle,
    position: Vec2,
    radius: f32,
    owner: CombatantId,
}

/// Every overlapping non-owner, nearest first (ties by id).
fn gather_candidates(grid: &SpatialGrid, shot: &LiveShot) -> Option<(ProjectileHandle, Vec<Entity>)> {
    let mut candidates: Vec<(f32, CombatantId, Entity)> = grid
        .query(shot.position, shot.radius)
        .into_iter()
        .filter(|e| e.id != shot.owner && circles_overlap(shot.position, shot.radius, e.position, e.radius))
        .map(|e| (e.position.distance_squared(shot.position), e.id, e.entity))
        .collect();

    if candidates.is_empty() {
        return None;
    }

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    Some((shot.handle, candidates.into_iter().map(|(_, _, e)| e).collect()))
}

/// System that resolves projectile vs combatant hits.
///
/// A projectile damages at most one combatant: the nearest living
/// non-owner it overlaps. Friendly fire is allowed. An invulnerable target
/// still stops the projectile; the hit event then reports 0 damage.
pub fn projectile_hit_system(
    grid: Res<SpatialGrid>,
    mut projectiles: ResMut<ProjectileArena>,
    mut events: ResMut<EventLog>,
    mut targets: Query<(&CombatantId, &mut Health, &mut Invulnerability, &mut LastHit)>,
) {
    let live_shots: Vec<LiveShot> = projectiles
        .iter()
        .filter(|(_, p)| p.alive)
        .map(|(handle, p)| LiveShot {
            handle,
            position: p.position,
            radius: p.radius,
            owner: p.owner,
        })
        .collect();

    let grid: &SpatialGrid = &grid;

    #[cfg(feature = "parallel")]
    let hits: Vec<_> = live_shots
        .par_iter()
        .filter_map(|shot| gather_candidates(grid, shot))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let hits: Vec<_> = live_shots
        .iter()
        .filter_map(|shot| gather_candidates(grid, shot))
        .collect();

    for (handle, candidates) in hits {
        let Some(projectile) = projectiles.get_mut(handle) else {
            continue;
        };

        for entity in candidates {
            let Ok((id, mut health, mut invuln, mut last_hit)) = targets.get_mut(entity) else {
                continue;
            };
            if !health.alive {
                continue;
            }

            let outcome = apply_damage(
                &mut health,
                &mut invuln,
                &mut last_hit,
                projectile.damage,
                Some(projectile.owner),
            );
            projectile.kill(ProjectileFate::HitEntity);
            events.push(SimEvent::Hit(HitEvent {
                position: projectile.position,
                owner: projectile.owner,
                target: HitTarget::Combatant {
                    id: *id,
                    damage: outcome.applied(),
                },
            }));
            break;
        }
    }
}

/// Most grid queries per enemy in one step.
const SEPARATION_PASSES: usize = 3;

/// System that pushes overlapping enemies apart, half each.
pub fn separation_system(
    grid: Res<SpatialGrid>,
    mut query: Query<(Entity, &CombatantId, &Role, &Health, &Body, &mut Position)>,
) {
    let mut bodies: Vec<(CombatantId, Entity, Vec2, f32)> = query
        .iter()
        .filter(|(_, _, role, health, ..)| **role == Role::Enemy && health.alive)
        .map(|(entity, id, _, _, body, pos)| (*id, entity, pos.0, body.radius))
        .collect();
    bodies.sort_unstable_by_key(|b| b.0);

    for i in 0..bodies.len() {
        let id = bodies[i].0;
        let mut resolved: Vec<CombatantId> = Vec::new();

        // Re-query after a push so bodies shoved into new cells are caught
        for _ in 0..SEPARATION_PASSES {
            let (_, _, position, radius) = bodies[i];
            let mut moved = false;

            for entry in grid.query(position, radius) {
                if entry.role != Role::Enemy || entry.id <= id || resolved.contains(&entry.id) {
                    continue;
                }
                let Ok(j) = bodies.binary_search_by_key(&entry.id, |b| b.0) else {
                    continue;
                };
                let (a, b) = resolve_circle_vs_circle(bodies[i].2, bodies[i].3, bodies[j].2, bodies[j].3);
                if a != bodies[i].2 {
                    resolved.push(entry.id);
                    moved = true;
                }
                bodies[i].2 = a;
                bodies[j].2 = b;
            }

            if !moved {
                break;
            }
        }
    }

    for (_, entity, position, _) in bodies {
        if let Ok((.., mut pos)) = query.get_mut(entity) {
            if pos.0 != position {
                pos.0 = position;
            }
        }
    }
}

/// System that handles player/enemy contact.
///
/// Overlapping pairs are pushed apart. Contact damage lands only when the
/// player's contact cooldown has run out and neither side is invulnerable.
pub fn contact_system(
    config: Res<SimConfig>,
    grid: Res<SpatialGrid>,
    players: Query<(Entity, &CombatantId), With<ContactCooldown>>,
    mut query: Query<(
        &CombatantId,
        &Role,
        &Body,
        &mut Position,
        &mut Health,
        &mut Invulnerability,
        &mut LastHit,
        Option<&mut ContactCooldown>,
    )>,
) {
    let mut player_list: Vec<(CombatantId, Entity)> =
        players.iter().map(|(entity, id)| (*id, entity)).collect();
    player_list.sort_unstable_by_key(|(id, _)| *id);

    for (_, player) in player_list {
        let Ok((_, _, body, pos, health, ..)) = query.get(player) else {
            continue;
        };
        if !health.alive {
            continue;
        }
        let candidates = grid.query(pos.0, body.radius);

        for entry in candidates {
            if entry.role != Role::Enemy {
                continue;
            }
            let Ok([player_item, enemy_item]) = query.get_many_mut([player, entry.entity]) else {
                continue;
            };
            let (_, _, p_body, mut p_pos, mut p_health, mut p_invuln, mut p_last, p_contact) = player_item;
            let (e_id, _, e_body, mut e_pos, e_health, e_invuln, _, _) = enemy_item;

            if !p_health.alive || !e_health.alive {
                continue;
            }
            if !circles_overlap(p_pos.0, p_body.radius, e_pos.0, e_body.radius) {
                continue;
            }

            if let Some(mut cooldown) = p_contact {
                if cooldown.remaining <= 0.0 && !p_invuln.is_active() && !e_invuln.is_active() {
                    apply_damage(
                        &mut p_health,
                        &mut p_invuln,
                        &mut p_last,
                        config.enemy.contact_damage,
                        Some(*e_id),
                    );
                    cooldown.remaining = config.enemy.contact_cooldown;
                }
            }

            let (a, b) = resolve_circle_vs_circle(p_pos.0, p_body.radius, e_pos.0, e_body.radius);
            p_pos.0 = a;
            e_pos.0 = b;
        }
    }
}

/// System that compacts the projectile arena and removes dead combatants,
/// emitting one death event each (in id order).
pub fn sweep_system(
    mut commands: Commands,
    mut projectiles: ResMut<ProjectileArena>,
    mut events: ResMut<EventLog>,
    query: Query<(Entity, &CombatantId, &Role, &Position, &Health, &LastHit)>,
) {
    projectiles.sweep();

    let mut dead: Vec<_> = query.iter().filter(|(.., health, _)| !health.alive).collect();
    dead.sort_unstable_by_key(|(_, id, ..)| **id);

    for (entity, id, role, pos, _, last_hit) in dead {
        events.push(SimEvent::Death(DeathEvent {
            victim: *id,
            killer: last_hit.attacker,
            role: *role,
            position: pos.0,
        }));
        info!(
            victim = id.0,
            killer = ?last_hit.attacker.map(|k| k.0),
            role = ?role,
            "combatant died"
        );
        commands.entity(entity).despawn();
    }
}
