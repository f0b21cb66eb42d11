//! ECS systems for the arena simulation.
//!
//! Systems contain the game logic that operates on components. They run in
//! one fixed, chained order every step:
//!
//! 1. `wave_spawn_system` - spawn queue countdown, wave-break regeneration
//! 2. `player_input_system` - external input into the player's intent
//! 3. `projectile_advance_system` - integrate projectiles, expire and cull
//! 4. `spatial_grid_update_system` - rebuild the grid for perception
//! 5. `target_history_system` - record the target's velocity
//! 6. `ai_decision_system` - run the archetype policies on their cadence
//! 7. `movement_system` - integrate combatants, clamp, push out of walls
//! 8. `weapon_fire_system` - fire intents become projectiles
//! 9. `spatial_grid_refresh_system` - rebuild the grid at new positions
//! 10. `projectile_wall_system` - projectiles stop on walls
//! 11. `projectile_hit_system` - projectiles damage the nearest non-owner
//! 12. `separation_system` - enemies push each other apart
//! 13. `contact_system` - enemy contact damage and push-apart with the player
//! 14. `sweep_system` - compact projectiles, remove the dead
//! 15. `timers_system` - weapons, invulnerability, cooldowns, dash

pub mod ai;
pub mod combat;
pub mod movement;
pub mod serialization;
pub mod timers;
pub mod waves;

pub use ai::*;
pub use combat::*;
pub use movement::*;
pub use serialization::*;
pub use timers::*;
pub use waves::*;
