//! Movement systems - player input, integration and wall resolution.

use crate::collision::resolve_circle_vs_walls;
use crate::components::*;
use crate::config::SimConfig;
use crate::geometry::vector_from_angle;
use crate::weapon::Loadout;
use crate::world::Walls;
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Player input for the next step, already mapped from devices.
///
/// `movement`, `aim` and `fire` are held state. `reload`, `switch_to`,
/// `next_weapon`, `previous_weapon` and `dash` are one-shot requests cleared
/// once consumed. A direct `switch_to` wins over cycling.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Desired direction; longer than 1 is clamped.
    pub movement: Vec2,
    /// Facing in radians.
    pub aim: Option<f32>,
    pub fire: bool,
    pub reload: bool,
    /// Weapon slot to switch to.
    pub switch_to: Option<usize>,
    #[serde(default)]
    pub next_weapon: bool,
    #[serde(default)]
    pub previous_weapon: bool,
    pub dash: bool,
}

/// System that copies external input into the player's intent and handles
/// the one-shot requests.
pub fn player_input_system(
    mut input: ResMut<PlayerInput>,
    config: Res<SimConfig>,
    mut query: Query<(
        &Role,
        &Health,
        &mut Intent,
        &mut Facing,
        &mut Loadout,
        &mut Dash,
        &mut Invulnerability,
    )>,
) {
    let movement = input.movement.clamp_length_max(1.0);

    for (role, health, mut intent, mut facing, mut loadout, mut dash, mut invuln) in query.iter_mut() {
        if *role != Role::Player || !health.alive {
            continue;
        }

        intent.movement = movement;
        intent.aim = input.aim;
        intent.fire = input.fire;
        if let Some(aim) = input.aim {
            facing.0 = aim;
        }

        let switched = match input.switch_to {
            Some(index) => loadout.switch(index),
            None if input.next_weapon => loadout.next_weapon(),
            None if input.previous_weapon => loadout.previous_weapon(),
            None => false,
        };
        if switched {
            debug!(slot = loadout.active, "weapon switched");
        }

        if input.reload {
            if let Some(weapon) = loadout.active_weapon_mut() {
                if weapon.start_reload() {
                    debug!(weapon = weapon.stats.kind.name(), "reload started");
                }
            }
        }

        if input.dash && dash.ready() {
            let tuning = &config.player.dash;
            dash.direction = if movement != Vec2::ZERO {
                movement.normalize_or_zero()
            } else {
                vector_from_angle(facing.0)
            };
            dash.remaining = tuning.duration;
            dash.cooldown = tuning.cooldown;
            invuln.grant(tuning.duration);
            debug!(dx = dash.direction.x, dy = dash.direction.y, "dash started");
        }
    }

    input.reload = false;
    input.switch_to = None;
    input.next_weapon = false;
    input.previous_weapon = false;
    input.dash = false;
}

/// System that integrates every living combatant.
///
/// Players accelerate toward their input with friction and a speed cap and
/// lose half their velocity when pushed out of a wall. A dashing player moves
/// at dash speed straight through walls. AI combatants move at full speed
/// along their intent. Everyone is clamped to the world bounds before wall
/// resolution.
pub fn movement_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    walls: Res<Walls>,
    mut query: Query<(
        &Health,
        &Intent,
        &Stats,
        &Body,
        &mut Position,
        &mut Velocity,
        &mut Facing,
        Option<&Dash>,
    )>,
) {
    let delta = dt.0;
    let bounds = config.arena;
    let epsilon = config.collision_epsilon;

    for (health, intent, stats, body, mut pos, mut vel, mut facing, dash) in query.iter_mut() {
        if !health.alive {
            continue;
        }

        if let Some(aim) = intent.aim {
            facing.0 = aim;
        }

        match dash {
            Some(dash) if dash.is_dashing() => {
                vel.0 = dash.direction * stats.speed * config.player.dash.speed_multiplier;
                pos.0 = bounds.clamp_circle(pos.0 + vel.0 * delta, body.radius);
            }
            Some(_) => {
                let tuning = &config.player;
                if intent.movement != Vec2::ZERO {
                    vel.0 += intent.movement * tuning.acceleration * delta;
                }
                vel.0 *= tuning.friction;
                vel.0 = vel.0.clamp_length_max(stats.speed);

                let moved = bounds.clamp_circle(pos.0 + vel.0 * delta, body.radius);
                let resolved = resolve_circle_vs_walls(moved, body.radius, &walls.0, epsilon);
                if resolved != moved {
                    vel.0 *= tuning.wall_damping;
                }
                pos.0 = resolved;
            }
            None => {
                vel.0 = intent.movement * stats.speed;
                let moved = bounds.clamp_circle(pos.0 + vel.0 * delta, body.radius);
                pos.0 = resolve_circle_vs_walls(moved, body.radius, &walls.0, epsilon);
            }
        }
    }
}
