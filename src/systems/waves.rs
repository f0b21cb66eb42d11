//! Wave spawning and break-time regeneration.

use crate::behavior::Brain;
use crate::collision::find_valid_spawn;
use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::systems::movement::DeltaTime;
use crate::wave::{enemy_bundle, WaveDirector};
use crate::world::{NextCombatantId, Walls};
use bevy_ecs::prelude::*;
use tracing::{debug, warn};

/// System that runs the wave director for one step.
///
/// During the break before a wave's first spawn, living players regenerate.
/// When the spawn countdown runs out the next queued enemy is placed at the
/// nearest valid position to its preferred point. If the arena is full the
/// oldest enemy is removed to make room.
#[allow(clippy::too_many_arguments)]
pub fn wave_spawn_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    walls: Res<Walls>,
    mut director: ResMut<WaveDirector>,
    mut rng: ResMut<SimRng>,
    mut next_id: ResMut<NextCombatantId>,
    mut players: Query<(&Role, &mut Health), Without<Brain>>,
    enemies: Query<(Entity, &CombatantId, &Health), With<Brain>>,
) {
    let heal = director.regen(dt.0, config.player.regen_rate);
    if heal > 0 {
        for (role, mut health) in players.iter_mut() {
            if *role == Role::Player {
                health.heal(heal);
            }
        }
    }

    let Some(entry) = director.tick(dt.0) else {
        return;
    };

    let population = players.iter().count() + enemies.iter().count();
    if population >= config.max_combatants {
        let oldest = enemies
            .iter()
            .filter(|(_, _, health)| health.alive)
            .min_by_key(|(_, id, _)| **id);
        match oldest {
            Some((entity, id, _)) => {
                warn!(evicted = id.0, cap = config.max_combatants, "combatant cap reached, evicting oldest enemy");
                commands.entity(entity).despawn();
            }
            None => {
                warn!(cap = config.max_combatants, "combatant cap reached, dropping spawn");
                return;
            }
        }
    }

    let mut radius = config.enemy.radius;
    if entry.boss {
        radius *= config.boss.radius_multiplier;
    }
    let position = find_valid_spawn(
        entry.position,
        radius,
        &config.arena,
        &walls.0,
        config.spawn_attempts,
        &mut rng.0,
    );

    let id = next_id.allocate();
    let mut spawned = commands.spawn(enemy_bundle(&config, id, entry.archetype, entry.boss, position));
    if entry.boss {
        spawned.insert(Boss);
    }

    debug!(
        id = id.0,
        archetype = entry.archetype.name(),
        boss = entry.boss,
        x = position.x,
        y = position.y,
        "enemy spawned"
    );
}
