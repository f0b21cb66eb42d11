//! World-level resources and the serializable snapshot.
//!
//! The `Snapshot` struct is a read-only view of the simulation state handed
//! to a renderer or HUD once per frame.

use crate::behavior::{AiState, Archetype, Brain};
use crate::components::*;
use crate::config::SimConfig;
use crate::geometry::Rect;
use crate::projectile::ProjectileArena;
use crate::wave::WaveDirector;
use crate::weapon::{Loadout, WeaponSnapshot};
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// RESOURCES
// ============================================================================

/// Static wall layout of the current arena.
#[derive(Resource, Debug, Clone, Default)]
pub struct Walls(pub Vec<Rect>);

/// Allocates combatant ids in spawn order, starting at 1.
#[derive(Resource, Debug, Clone, Default)]
pub struct NextCombatantId(pub u32);

impl NextCombatantId {
    pub fn allocate(&mut self) -> CombatantId {
        self.0 += 1;
        CombatantId(self.0)
    }
}

/// Components for the player.
pub fn player_bundle(config: &SimConfig, id: CombatantId, position: Vec2) -> PlayerBundle {
    let p = &config.player;
    PlayerBundle {
        combatant: CombatantBundle {
            id,
            role: Role::Player,
            position: Position(position),
            body: Body { radius: p.radius },
            health: Health::new(p.max_health),
            invulnerability: Invulnerability::new(0.0, p.hit_invulnerability),
            stats: Stats {
                speed: p.speed,
                detection_range: 0.0,
            },
            loadout: Loadout::from_stats(&config.player_weapons),
            ..Default::default()
        },
        contact: ContactCooldown::default(),
        dash: Dash::default(),
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Snapshot of a single combatant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub id: u32,
    pub role: Role,
    pub archetype: Option<Archetype>,
    pub state: Option<AiState>,
    pub boss: bool,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub facing: f32,
    pub radius: f32,
    pub health: i32,
    pub health_max: i32,
    pub invulnerable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub owner: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveSnapshot {
    pub wave: u32,
    /// Enemies still waiting in the spawn queue.
    pub queued: usize,
    /// Living enemies in the arena.
    pub active: usize,
    pub break_remaining: f32,
    pub complete: bool,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// Living combatants, ordered by id.
    pub combatants: Vec<CombatantSnapshot>,
    /// Live projectiles in arena slot order.
    pub projectiles: Vec<ProjectileSnapshot>,
    /// The player's active weapon, for the HUD.
    pub player_weapon: Option<WeaponSnapshot>,
    pub wave: WaveSnapshot,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut combatants = Vec::new();
        let mut player_weapon: Option<(CombatantId, WeaponSnapshot)> = None;

        let mut query = world.query::<(
            &CombatantId,
            &Role,
            &Position,
            &Velocity,
            &Facing,
            &Body,
            &Health,
            &Invulnerability,
            &Loadout,
            Option<&Brain>,
            Has<Boss>,
        )>();

        for (id, role, pos, vel, facing, body, health, invuln, loadout, brain, boss) in
            query.iter(world)
        {
            if !health.alive {
                continue;
            }

            if *role == Role::Player && player_weapon.as_ref().map_or(true, |(lowest, _)| id < lowest) {
                if let Some(weapon) = loadout.active_weapon() {
                    player_weapon = Some((*id, weapon.snapshot()));
                }
            }

            combatants.push(CombatantSnapshot {
                id: id.0,
                role: *role,
                archetype: brain.map(|b| b.archetype),
                state: brain.map(|b| b.state),
                boss,
                x: pos.0.x,
                y: pos.0.y,
                vx: vel.0.x,
                vy: vel.0.y,
                facing: facing.0,
                radius: body.radius,
                health: health.current,
                health_max: health.max,
                invulnerable: invuln.is_active(),
            });
        }
        combatants.sort_by_key(|c| c.id);

        let projectiles = world
            .get_resource::<ProjectileArena>()
            .map(|arena| {
                arena
                    .iter()
                    .filter(|(_, p)| p.alive)
                    .map(|(_, p)| ProjectileSnapshot {
                        x: p.position.x,
                        y: p.position.y,
                        vx: p.velocity.x,
                        vy: p.velocity.y,
                        radius: p.radius,
                        owner: p.owner.0,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let active = combatants.iter().filter(|c| c.role == Role::Enemy).count();
        let wave = world
            .get_resource::<WaveDirector>()
            .map(|director| WaveSnapshot {
                wave: director.wave(),
                queued: director.queue_len(),
                active,
                break_remaining: director.break_remaining().max(0.0),
                complete: director.is_queue_empty() && active == 0,
            })
            .unwrap_or_default();

        Self {
            tick,
            time,
            combatants,
            projectiles,
            player_weapon: player_weapon.map(|(_, weapon)| weapon),
            wave,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
