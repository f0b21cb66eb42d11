//! Public API for the simulation.
//!
//! This module provides the main interface for a game client (renderer,
//! input layer, HUD) to drive the simulation.
//!
//! ## Stepping
//!
//! `step(dt)` runs the whole schedule exactly once. `dt` is clamped to
//! `SimConfig::max_dt` so a long frame hitch can't tunnel projectiles through
//! walls; there is no accumulator or sub-stepping.
//!
//! ## Determinism
//!
//! All randomness comes from the seeded `SimRng`, and every system that
//! consumes it or emits ordered output walks combatants in id order. Two
//! worlds built from the same config and fed the same inputs produce
//! identical snapshots.

use crate::behavior::{Archetype, Brain, TargetHistory};
use crate::collision::find_valid_spawn;
use crate::components::*;
use crate::config::{ConfigError, SimConfig, SimRng};
use crate::events::{EventLog, SimEvent};
use crate::geometry::Rect;
use crate::projectile::{Projectile, ProjectileArena, ProjectileHandle};
use crate::spatial::{spatial_grid_refresh_system, spatial_grid_update_system, SpatialGrid};
use crate::systems::*;
use crate::wave::{enemy_bundle, SpawnSource, WaveDirector};
use crate::weapon::{Loadout, ProjectileSpawn, WeaponSnapshot};
use crate::world::{player_bundle, NextCombatantId, Snapshot, Walls};
use bevy_ecs::prelude::*;
use glam::Vec2;
use tracing::{debug, info};

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing the simulation
/// - Stepping the simulation forward
/// - Extracting state snapshots and events
/// - Driving waves and player input
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
}

impl SimWorld {
    /// Create a simulation world with the default configuration.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a simulation world with a custom configuration.
    pub fn with_config(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();

        info!(
            seed = config.seed,
            width = config.arena.width,
            height = config.arena.height,
            "simulation world created"
        );

        // Core resources
        world.insert_resource(DeltaTime(0.0));
        world.insert_resource(SimRng::from_seed(config.seed));
        world.insert_resource(SpatialGrid::new(config.cell_size));
        world.insert_resource(ProjectileArena::new(config.max_projectiles));
        world.insert_resource(Walls::default());
        world.insert_resource(NextCombatantId::default());

        // Per-step inputs and outputs
        world.insert_resource(PlayerInput::default());
        world.insert_resource(TargetHistory::default());
        world.insert_resource(EventLog::default());
        world.insert_resource(WaveDirector::default());
        world.insert_resource(config);

        // One fixed order, every step
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                wave_spawn_system,
                player_input_system,
                projectile_advance_system,
                spatial_grid_update_system,
                target_history_system,
                ai_decision_system,
                movement_system,
                weapon_fire_system,
                spatial_grid_refresh_system,
                projectile_wall_system,
                projectile_hit_system,
                separation_system,
                contact_system,
                sweep_system,
                timers_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
        }
    }

    // ========================================================================
    // STEPPING
    // ========================================================================

    /// Step the simulation forward by `dt` seconds (clamped to `max_dt`).
    pub fn step(&mut self, dt: f32) {
        let max_dt = self
            .world
            .get_resource::<SimConfig>()
            .map(|c| c.max_dt)
            .unwrap_or(1.0 / 30.0);
        let dt = if dt.is_finite() { dt.clamp(0.0, max_dt) } else { 0.0 };

        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }

        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    // ========================================================================
    // ARENA SETUP
    // ========================================================================

    /// Replace the wall layout.
    pub fn set_walls(&mut self, walls: Vec<Rect>) {
        self.world.insert_resource(Walls(walls));
    }

    pub fn walls(&self) -> &[Rect] {
        self.world
            .get_resource::<Walls>()
            .map(|w| w.0.as_slice())
            .unwrap_or(&[])
    }

    /// Input applied on the next step.
    pub fn set_player_input(&mut self, input: PlayerInput) {
        self.world.insert_resource(input);
    }

    /// Nearest valid position to `preferred` for a circle of `radius`.
    fn place(&mut self, preferred: Vec2, radius: f32) -> Vec2 {
        self.world.resource_scope(|world, mut rng: Mut<SimRng>| {
            let config = world.resource::<SimConfig>();
            let walls = world.resource::<Walls>();
            find_valid_spawn(
                preferred,
                radius,
                &config.arena,
                &walls.0,
                config.spawn_attempts,
                &mut rng.0,
            )
        })
    }

    fn allocate_id(&mut self) -> CombatantId {
        self.world.resource_mut::<NextCombatantId>().allocate()
    }

    /// Spawn the player at the nearest valid position to `position`.
    pub fn spawn_player(&mut self, position: Vec2) -> CombatantId {
        let radius = self.config().player.radius;
        let position = self.place(position, radius);
        let id = self.allocate_id();
        let bundle = player_bundle(self.config(), id, position);
        self.world.spawn(bundle);
        id
    }

    /// Spawn an enemy directly, bypassing the wave queue.
    pub fn spawn_enemy(&mut self, archetype: Archetype, position: Vec2, boss: bool) -> CombatantId {
        let mut radius = self.config().enemy.radius;
        if boss {
            radius *= self.config().boss.radius_multiplier;
        }
        let position = self.place(position, radius);
        let id = self.allocate_id();
        let bundle = enemy_bundle(self.config(), id, archetype, boss, position);
        let mut spawned = self.world.spawn(bundle);
        if boss {
            spawned.insert(Boss);
        }
        id
    }

    /// Inject a projectile, e.g. from a scripted hazard.
    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> ProjectileHandle {
        let (radius, lifetime) = {
            let config = self.config();
            (config.projectile_radius, config.projectile_lifetime)
        };
        self.world
            .resource_mut::<ProjectileArena>()
            .spawn(Projectile::new(spawn, radius, lifetime))
    }

    /// Entity for a combatant id, if it is still in the world.
    pub fn combatant_entity(&mut self, id: CombatantId) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &CombatantId)>();
        query
            .iter(&self.world)
            .find(|(_, cid)| **cid == id)
            .map(|(e, _)| e)
    }

    // ========================================================================
    // OUTPUT
    // ========================================================================

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Take every event emitted since the last drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world
            .get_resource_mut::<EventLog>()
            .map(|mut log| log.drain())
            .unwrap_or_default()
    }

    /// The lowest-id living player's active weapon.
    pub fn player_weapon(&mut self) -> Option<WeaponSnapshot> {
        let mut query = self.world.query::<(&CombatantId, &Role, &Health, &Loadout)>();
        query
            .iter(&self.world)
            .filter(|(_, role, health, _)| **role == Role::Player && health.alive)
            .min_by_key(|(id, ..)| **id)
            .and_then(|(.., loadout)| loadout.active_weapon().map(|w| w.snapshot()))
    }

    // ========================================================================
    // COMBATANT STATE
    // ========================================================================

    /// Full component state of one combatant.
    pub fn export_combatant(&mut self, id: CombatantId) -> Option<CombatantState> {
        let entity = self.combatant_entity(id)?;
        CombatantState::capture(&self.world, entity)
    }

    /// Full state of every combatant, ordered by id.
    pub fn export_combatants(&mut self) -> Vec<CombatantState> {
        let mut query = self.world.query::<(Entity, &CombatantId)>();
        let mut entities: Vec<(CombatantId, Entity)> =
            query.iter(&self.world).map(|(e, id)| (*id, e)).collect();
        entities.sort_by_key(|(id, _)| *id);

        entities
            .into_iter()
            .filter_map(|(_, entity)| CombatantState::capture(&self.world, entity))
            .collect()
    }

    /// Spawn a combatant from exported state, replacing any combatant that
    /// already has its id. Later allocations never reuse the id.
    pub fn restore_combatant(&mut self, state: &CombatantState) -> Entity {
        if let Some(existing) = self.combatant_entity(state.id) {
            self.world.despawn(existing);
        }

        let mut next = self.world.resource_mut::<NextCombatantId>();
        next.0 = next.0.max(state.id.0);

        debug!(id = state.id.0, role = ?state.role, "combatant restored");
        state.spawn(&mut self.world)
    }

    // ========================================================================
    // WAVES
    // ========================================================================

    /// Plan `wave` and start its break countdown. Returns the number of
    /// enemies queued.
    pub fn start_wave<S: SpawnSource + ?Sized>(&mut self, wave: u32, spawns: &S) -> usize {
        let queued = self.world.resource_scope(|world, mut director: Mut<WaveDirector>| {
            let tuning = world.resource::<SimConfig>().waves.clone();
            let mut rng = world.resource_mut::<SimRng>();
            director.start_wave(wave, &tuning, spawns, &mut rng.0)
        });

        let boss = WaveDirector::is_boss_wave(wave, &self.config().waves);
        info!(wave, enemies = queued, boss, "wave started");
        queued
    }

    /// Start the wave after the current one.
    pub fn next_wave<S: SpawnSource + ?Sized>(&mut self, spawns: &S) -> usize {
        let next = self.wave_number() + 1;
        self.start_wave(next, spawns)
    }

    pub fn wave_number(&self) -> u32 {
        self.world
            .get_resource::<WaveDirector>()
            .map(|d| d.wave())
            .unwrap_or(0)
    }

    /// Living enemies in the arena (not counting the spawn queue).
    pub fn active_enemy_count(&mut self) -> usize {
        let mut query = self.world.query_filtered::<&Health, With<Brain>>();
        query.iter(&self.world).filter(|h| h.alive).count()
    }

    pub fn spawn_queue_empty(&self) -> bool {
        self.world
            .get_resource::<WaveDirector>()
            .map_or(true, |d| d.is_queue_empty())
    }

    /// Queue empty and no enemies left.
    pub fn is_wave_complete(&mut self) -> bool {
        self.spawn_queue_empty() && self.active_enemy_count() == 0
    }

    // ========================================================================
    // DIRECT ACCESS
    // ========================================================================

    /// Get the spatial grid reference (for debugging/visualization).
    pub fn spatial_grid(&self) -> Option<&SpatialGrid> {
        self.world.get_resource::<SpatialGrid>()
    }

    pub fn projectiles(&self) -> Option<&ProjectileArena> {
        self.world.get_resource::<ProjectileArena>()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
