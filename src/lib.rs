//! Arena Sim - Combat Simulation Core
//!
//! A deterministic, single-threaded ECS simulation for a top-down arena
//! shooter: one player, waves of AI enemies, projectiles and static walls.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod behavior;
pub mod collision;
pub mod components;
pub mod config;
pub mod events;
pub mod geometry;
pub mod projectile;
pub mod spatial;
pub mod systems;
pub mod wave;
pub mod weapon;
pub mod world;

pub use api::SimWorld;
pub use behavior::{AiState, Archetype, Brain};
pub use components::*;
pub use config::{ConfigError, Difficulty, SimConfig};
pub use events::{DeathEvent, HitEvent, HitTarget, SimEvent};
pub use geometry::{Bounds, Rect};
pub use projectile::{Projectile, ProjectileArena, ProjectileHandle};
pub use spatial::{SpatialEntry, SpatialGrid};
pub use systems::*;
pub use wave::{SpawnSource, WaveDirector};
pub use weapon::{Loadout, ProjectileSpawn, Weapon, WeaponKind, WeaponSnapshot, WeaponStats};
pub use world::Snapshot;
