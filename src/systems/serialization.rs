//! Full-state serialization of combatants.
//!
//! `Snapshot` is a lossy view for rendering. `CombatantState` carries every
//! component a combatant owns, timers included, so a combatant captured from
//! one world and spawned into another steps identically from then on.

use crate::behavior::Brain;
use crate::components::*;
use crate::weapon::Loadout;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Every component of one combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantState {
    pub id: CombatantId,
    pub role: Role,
    pub boss: bool,
    pub position: Position,
    pub velocity: Velocity,
    pub facing: Facing,
    pub body: Body,
    pub health: Health,
    pub invulnerability: Invulnerability,
    pub last_hit: LastHit,
    pub stats: Stats,
    pub intent: Intent,
    pub loadout: Loadout,
    /// AI only.
    pub brain: Option<Brain>,
    /// Player only.
    pub dash: Option<Dash>,
    /// Player only.
    pub contact: Option<ContactCooldown>,
}

impl CombatantState {
    /// Read a combatant's components. `None` if the entity is missing or
    /// lacks any of the shared components.
    pub fn capture(world: &World, entity: Entity) -> Option<Self> {
        Some(Self {
            id: *world.get::<CombatantId>(entity)?,
            role: *world.get::<Role>(entity)?,
            boss: world.get::<Boss>(entity).is_some(),
            position: *world.get::<Position>(entity)?,
            velocity: *world.get::<Velocity>(entity)?,
            facing: *world.get::<Facing>(entity)?,
            body: *world.get::<Body>(entity)?,
            health: *world.get::<Health>(entity)?,
            invulnerability: *world.get::<Invulnerability>(entity)?,
            last_hit: *world.get::<LastHit>(entity)?,
            stats: *world.get::<Stats>(entity)?,
            intent: *world.get::<Intent>(entity)?,
            loadout: world.get::<Loadout>(entity)?.clone(),
            brain: world.get::<Brain>(entity).cloned(),
            dash: world.get::<Dash>(entity).copied(),
            contact: world.get::<ContactCooldown>(entity).copied(),
        })
    }

    /// Spawn a new entity carrying exactly this state.
    pub fn spawn(&self, world: &mut World) -> Entity {
        let mut entity = world.spawn(CombatantBundle {
            id: self.id,
            role: self.role,
            position: self.position,
            velocity: self.velocity,
            facing: self.facing,
            body: self.body,
            health: self.health,
            invulnerability: self.invulnerability,
            last_hit: self.last_hit,
            stats: self.stats,
            intent: self.intent,
            loadout: self.loadout.clone(),
        });

        if let Some(brain) = &self.brain {
            entity.insert(brain.clone());
        }
        if let Some(dash) = self.dash {
            entity.insert(dash);
        }
        if let Some(contact) = self.contact {
            entity.insert(contact);
        }
        if self.boss {
            entity.insert(Boss);
        }
        entity.id()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{AiState, Archetype};
    use crate::config::SimConfig;
    use crate::wave::enemy_bundle;
    use crate::world::player_bundle;
    use glam::Vec2;

    #[test]
    fn test_capture_then_spawn_preserves_components() {
        let config = SimConfig::default();
        let mut world = World::new();
        let boss = world
            .spawn(enemy_bundle(&config, CombatantId(4), Archetype::Sniper, true, Vec2::new(300.0, 200.0)))
            .insert(Boss)
            .id();
        if let Some(mut brain) = world.get_mut::<Brain>(boss) {
            brain.state = AiState::Retreat;
            brain.flank_waypoint = Some(Vec2::new(12.0, 34.0));
            brain.strafe_sign = -1.0;
        }

        let state = CombatantState::capture(&world, boss).expect("combatant");
        assert!(state.boss);
        assert!(state.dash.is_none());

        let copy = state.spawn(&mut world);
        assert!(world.get::<Boss>(copy).is_some());
        assert!(world.get::<Dash>(copy).is_none());
        assert_eq!(CombatantState::capture(&world, copy), Some(state));
    }

    #[test]
    fn test_player_state_json_roundtrip() {
        let config = SimConfig::default();
        let mut world = World::new();
        let player = world
            .spawn(player_bundle(&config, CombatantId(1), Vec2::new(10.0, 20.0)))
            .id();
        if let Some(mut dash) = world.get_mut::<Dash>(player) {
            dash.cooldown = 0.4;
        }
        if let Some(mut loadout) = world.get_mut::<Loadout>(player) {
            loadout.switch(1);
            if let Some(weapon) = loadout.active_weapon_mut() {
                weapon.ammo = 7;
                weapon.shots_fired = 23;
            }
        }

        let state = CombatantState::capture(&world, player).expect("combatant");
        let json = state.to_json().expect("serializes");
        let restored = CombatantState::from_json(&json).expect("deserializes");
        assert_eq!(restored, state);
        assert_eq!(restored.dash.map(|d| d.cooldown), Some(0.4));
        assert_eq!(restored.loadout.active, 1);
        assert!(restored.brain.is_none());
    }

    #[test]
    fn test_capture_missing_entity() {
        let mut world = World::new();
        let entity = world.spawn(Position::default()).id();
        assert!(CombatantState::capture(&world, entity).is_none());
    }
}
