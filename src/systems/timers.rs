//! End-of-step timer bookkeeping.

use crate::behavior::Brain;
use crate::components::*;
use crate::config::SimConfig;
use crate::systems::movement::DeltaTime;
use crate::weapon::Loadout;
use bevy_ecs::prelude::*;
use tracing::trace;

/// System that advances weapon, invulnerability, contact and dash timers.
///
/// AI combatants start a reload as soon as their magazine runs dry; the
/// player reloads only on request. Invulnerability is frozen while dashing,
/// and a finished dash keeps a fraction of its velocity.
pub fn timers_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut query: Query<(
        &CombatantId,
        &Health,
        &mut Loadout,
        &mut Invulnerability,
        &mut Velocity,
        Option<&mut ContactCooldown>,
        Option<&mut Dash>,
        Has<Brain>,
    )>,
) {
    let delta = dt.0;

    for (id, health, mut loadout, mut invuln, mut vel, contact, dash, is_ai) in query.iter_mut() {
        if !health.alive {
            continue;
        }

        if let Some(weapon) = loadout.active_weapon_mut() {
            weapon.update(delta);
            if is_ai && config.auto_reload && weapon.needs_reload() && weapon.start_reload() {
                trace!(id = id.0, "auto reload");
            }
        }

        if let Some(mut contact) = contact {
            if contact.remaining > 0.0 {
                contact.remaining = (contact.remaining - delta).max(0.0);
            }
        }

        let mut dashing = false;
        if let Some(mut dash) = dash {
            if dash.cooldown > 0.0 {
                dash.cooldown = (dash.cooldown - delta).max(0.0);
            }
            if dash.is_dashing() {
                dash.remaining -= delta;
                if dash.remaining <= 0.0 {
                    dash.remaining = 0.0;
                    vel.0 *= config.player.dash.end_momentum;
                } else {
                    dashing = true;
                }
            }
        }

        if !dashing {
            invuln.tick(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Archetype;
    use crate::wave::enemy_bundle;
    use crate::world::player_bundle;
    use glam::Vec2;

    fn timer_world(dt: f32) -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(DeltaTime(dt));
        world.insert_resource(SimConfig::default());
        let mut schedule = Schedule::default();
        schedule.add_systems(timers_system);
        (world, schedule)
    }

    #[test]
    fn test_ai_auto_reloads_player_does_not() {
        let (mut world, mut schedule) = timer_world(0.1);
        let config = SimConfig::default();
        let player = world
            .spawn(player_bundle(&config, CombatantId(1), Vec2::new(100.0, 100.0)))
            .id();
        let enemy = world
            .spawn(enemy_bundle(&config, CombatantId(2), Archetype::Rusher, false, Vec2::new(300.0, 300.0)))
            .id();

        for entity in [player, enemy] {
            if let Some(mut loadout) = world.get_mut::<Loadout>(entity) {
                if let Some(weapon) = loadout.active_weapon_mut() {
                    weapon.ammo = 0;
                }
            }
        }

        schedule.run(&mut world);

        let reloading = |world: &World, e: Entity| {
            world
                .get::<Loadout>(e)
                .and_then(|l| l.active_weapon())
                .map_or(false, |w| w.reloading)
        };
        assert!(!reloading(&world, player));
        assert!(reloading(&world, enemy));
    }

    #[test]
    fn test_dash_end_keeps_momentum_fraction() {
        let (mut world, mut schedule) = timer_world(0.1);
        let config = SimConfig::default();
        let player = world
            .spawn(player_bundle(&config, CombatantId(1), Vec2::new(100.0, 100.0)))
            .id();
        if let Some(mut dash) = world.get_mut::<Dash>(player) {
            dash.remaining = 0.05;
            dash.cooldown = 1.0;
        }
        if let Some(mut invuln) = world.get_mut::<Invulnerability>(player) {
            invuln.remaining = 0.5;
        }
        if let Some(mut vel) = world.get_mut::<Velocity>(player) {
            vel.0 = Vec2::new(2000.0, 0.0);
        }

        schedule.run(&mut world);

        let vel = world.get::<Velocity>(player).map(|v| v.0).unwrap_or_default();
        assert!((vel.x - 2000.0 * config.player.dash.end_momentum).abs() < 0.01);
        let dash = world.get::<Dash>(player).copied().unwrap_or_default();
        assert!(!dash.is_dashing());
        assert!((dash.cooldown - 0.9).abs() < 0.001);
        let invuln = world.get::<Invulnerability>(player).map(|i| i.remaining);
        assert!((invuln.unwrap_or_default() - 0.4).abs() < 0.001);
    }

    #[test]
    fn test_invulnerability_frozen_while_dashing() {
        let (mut world, mut schedule) = timer_world(0.05);
        let config = SimConfig::default();
        let player = world
            .spawn(player_bundle(&config, CombatantId(1), Vec2::new(100.0, 100.0)))
            .id();
        if let Some(mut dash) = world.get_mut::<Dash>(player) {
            dash.remaining = 0.2;
        }
        if let Some(mut invuln) = world.get_mut::<Invulnerability>(player) {
            invuln.remaining = 0.2;
        }

        schedule.run(&mut world);

        let invuln = world.get::<Invulnerability>(player).map(|i| i.remaining);
        assert!((invuln.unwrap_or_default() - 0.2).abs() < 0.001);
    }
}
