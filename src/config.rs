//! Simulation configuration.
//!
//! `SimConfig` is handed to the world once at construction and never mutated
//! afterward. Difficulty is resolved up front by [`SimConfig::for_difficulty`];
//! systems only ever read the final scalars.

use crate::behavior::Archetype;
use crate::geometry::Bounds;
use crate::weapon::WeaponStats;
use bevy_ecs::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} range is inverted: min {min} > max {max}")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("config parse failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { field, min, max })
    }
}

// ============================================================================
// TUNING SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub radius: f32,
    pub max_health: i32,
    /// Top speed (units per second).
    pub speed: f32,
    pub acceleration: f32,
    /// Velocity multiplier applied every step when there is no input.
    pub friction: f32,
    /// Velocity multiplier after a wall push-out.
    pub wall_damping: f32,
    /// Grace window after taking a hit.
    pub hit_invulnerability: f32,
    /// Health per second during the wave break.
    pub regen_rate: f32,
    pub dash: DashTuning,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: 12.0,
            max_health: 100,
            speed: 200.0,
            acceleration: 2000.0,
            friction: 0.85,
            wall_damping: 0.5,
            hit_invulnerability: 0.1,
            regen_rate: 10.0,
            dash: DashTuning::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashTuning {
    pub duration: f32,
    /// Dash speed as a multiple of the player's top speed.
    pub speed_multiplier: f32,
    pub cooldown: f32,
    /// Fraction of dash velocity kept when the dash ends.
    pub end_momentum: f32,
}

impl Default for DashTuning {
    fn default() -> Self {
        Self {
            duration: 0.15,
            speed_multiplier: 10.0,
            cooldown: 2.0,
            end_momentum: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub radius: f32,
    pub base_health: i32,
    pub spawn_invulnerability: f32,
    /// Damage dealt to the player on contact.
    pub contact_damage: i32,
    /// Seconds between contact hits on the player.
    pub contact_cooldown: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            radius: 12.0,
            base_health: 40,
            spawn_invulnerability: 1.0,
            contact_damage: 5,
            contact_cooldown: 0.5,
        }
    }
}

/// Base stats for one archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    pub speed: f32,
    /// Added to `EnemyTuning::base_health`.
    pub health_bonus: i32,
    pub detection_range: f32,
    pub weapon: WeaponStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeTable {
    pub rusher: ArchetypeProfile,
    pub sniper: ArchetypeProfile,
    pub dodger: ArchetypeProfile,
    pub flanker: ArchetypeProfile,
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self {
            rusher: ArchetypeProfile {
                speed: 150.0,
                health_bonus: 0,
                detection_range: 400.0,
                weapon: WeaponStats::smg(),
            },
            sniper: ArchetypeProfile {
                speed: 100.0,
                health_bonus: 10,
                detection_range: 600.0,
                weapon: WeaponStats::rifle(),
            },
            dodger: ArchetypeProfile {
                speed: 120.0,
                health_bonus: 20,
                detection_range: 350.0,
                weapon: WeaponStats::shotgun(),
            },
            flanker: ArchetypeProfile {
                speed: 130.0,
                health_bonus: 15,
                detection_range: 500.0,
                weapon: WeaponStats::rifle(),
            },
        }
    }
}

impl ArchetypeTable {
    pub fn get(&self, archetype: Archetype) -> &ArchetypeProfile {
        match archetype {
            Archetype::Rusher => &self.rusher,
            Archetype::Sniper => &self.sniper,
            Archetype::Dodger => &self.dodger,
            Archetype::Flanker => &self.flanker,
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut ArchetypeProfile> {
        [
            &mut self.rusher,
            &mut self.sniper,
            &mut self.dodger,
            &mut self.flanker,
        ]
        .into_iter()
    }
}

/// Decision-layer parameters shared by all archetypes plus the per-policy
/// ranges and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// Seconds between decisions.
    pub decision_interval: f32,
    /// Target velocity history window in seconds.
    pub memory_duration: f32,
    /// Number of latest samples averaged for lead prediction.
    pub memory_samples: usize,

    pub rusher_attack_range: f32,

    pub sniper_preferred_range: f32,
    /// Half-width of the band around the preferred range.
    pub sniper_range_band: f32,
    pub sniper_retreat_range: f32,
    /// Lead prediction horizon in seconds.
    pub sniper_lead_time: f32,

    pub dodger_attack_range: f32,
    pub dodge_radius: f32,
    /// Minimum dot product between projectile heading and the direction to
    /// the dodger for the projectile to count as incoming.
    pub dodge_dot_threshold: f32,
    /// Seconds between dodges. Zero lets a dodge fire on every decision.
    pub dodge_cooldown: f32,
    pub dodger_dash_cooldown: f32,
    pub strafe_interval_min: f32,
    pub strafe_interval_max: f32,
    /// Weight of the direct approach in the strafe blend.
    pub strafe_forward_weight: f32,

    pub flank_distance: f32,
    pub flank_refresh: f32,
    pub flank_engage_range: f32,
    /// Accepted angle between the target's facing and target-to-self (radians).
    pub flank_angle_min: f32,
    pub flank_angle_max: f32,
}

impl Default for AiTuning {
    fn default() -> Self {
        use std::f32::consts::PI;
        Self {
            decision_interval: 1.0 / 6.0,
            memory_duration: 2.0,
            memory_samples: 5,
            rusher_attack_range: 200.0,
            sniper_preferred_range: 400.0,
            sniper_range_band: 50.0,
            sniper_retreat_range: 300.0,
            sniper_lead_time: 0.5,
            dodger_attack_range: 200.0,
            dodge_radius: 100.0,
            dodge_dot_threshold: 0.7,
            dodge_cooldown: 0.0,
            dodger_dash_cooldown: 2.0,
            strafe_interval_min: 1.0,
            strafe_interval_max: 3.0,
            strafe_forward_weight: 0.7,
            flank_distance: 250.0,
            flank_refresh: 2.0,
            flank_engage_range: 300.0,
            flank_angle_min: PI / 3.0,
            flank_angle_max: 2.0 * PI / 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    pub base_enemies: u32,
    pub enemies_per_wave: u32,
    /// Scales the regular wave size.
    pub count_multiplier: f32,
    /// Seconds before the first spawn of a wave; the player regenerates
    /// meanwhile.
    pub break_time: f32,
    /// Every Nth wave is a boss wave.
    pub boss_interval: u32,
    pub spawn_delay_min: f32,
    pub spawn_delay_max: f32,
    pub escort_delay_min: f32,
    pub escort_delay_max: f32,
    pub boss_delay: f32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_enemies: 3,
            enemies_per_wave: 2,
            count_multiplier: 1.0,
            break_time: 5.0,
            boss_interval: 5,
            spawn_delay_min: 0.5,
            spawn_delay_max: 2.0,
            escort_delay_min: 1.5,
            escort_delay_max: 3.0,
            boss_delay: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    pub health_multiplier: f32,
    pub radius_multiplier: f32,
    pub speed_multiplier: f32,
    pub damage_multiplier: f32,
    pub fire_rate_multiplier: f32,
    pub detection_multiplier: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            health_multiplier: 3.0,
            radius_multiplier: 1.5,
            speed_multiplier: 0.8,
            damage_multiplier: 1.5,
            fire_rate_multiplier: 1.3,
            detection_multiplier: 1.5,
        }
    }
}

// ============================================================================
// SIM CONFIG
// ============================================================================

/// Complete simulation configuration.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the simulation RNG.
    pub seed: u64,
    /// Upper bound applied to every step's `dt`.
    pub max_dt: f32,
    pub arena: Bounds,
    /// Spatial grid cell size in world units.
    pub cell_size: f32,
    pub max_projectiles: usize,
    pub max_combatants: usize,
    pub projectile_radius: f32,
    /// Seconds a projectile lives.
    pub projectile_lifetime: f32,
    /// Distance ahead of the shooter's center where projectiles appear.
    pub muzzle_offset: f32,
    /// Extra push-out distance for wall resolution.
    pub collision_epsilon: f32,
    pub spawn_attempts: u32,
    /// Start a reload automatically when the active magazine runs dry.
    pub auto_reload: bool,
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
    pub archetypes: ArchetypeTable,
    pub ai: AiTuning,
    /// Pistol, SMG, shotgun, rifle.
    pub player_weapons: [WeaponStats; 4],
    pub waves: WaveTuning,
    pub boss: BossTuning,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            max_dt: 1.0 / 30.0,         // never integrate more than 2 frames at 60 Hz
            arena: Bounds::default(),   // 1280 x 720
            cell_size: 64.0,
            max_projectiles: 500,
            max_combatants: 64,
            projectile_radius: 4.0,
            projectile_lifetime: 3.0,
            muzzle_offset: 30.0,
            collision_epsilon: 0.1,
            spawn_attempts: 10,
            auto_reload: true,
            player: PlayerTuning::default(),
            enemy: EnemyTuning::default(),
            archetypes: ArchetypeTable::default(),
            ai: AiTuning::default(),
            player_weapons: [
                WeaponStats::pistol(),
                WeaponStats::smg(),
                WeaponStats::shotgun(),
                WeaponStats::rifle(),
            ],
            waves: WaveTuning::default(),
            boss: BossTuning::default(),
        }
    }
}

impl SimConfig {
    /// Default config with a difficulty preset resolved into it.
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let mut config = Self::default();
        config.apply_difficulty(difficulty);
        config
    }

    /// Scale the relevant scalars by the preset's multipliers.
    pub fn apply_difficulty(&mut self, difficulty: Difficulty) {
        let m = difficulty.modifiers();

        self.player.max_health = scale_i32(self.player.max_health, m.player_health);
        self.player.regen_rate *= m.player_regen;
        for weapon in self.player_weapons.iter_mut() {
            weapon.damage = scale_i32(weapon.damage, m.player_damage);
        }

        self.enemy.base_health = scale_i32(self.enemy.base_health, m.enemy_health);
        self.enemy.contact_damage = scale_i32(self.enemy.contact_damage, m.contact_damage);
        for profile in self.archetypes.iter_mut() {
            profile.health_bonus = ((profile.health_bonus as f32) * m.enemy_health).round() as i32;
            profile.speed *= m.enemy_speed;
            profile.weapon.damage = scale_i32(profile.weapon.damage, m.enemy_damage);
            profile.weapon.fire_rate *= m.enemy_fire_rate;
        }

        self.waves.count_multiplier *= m.wave_size;
        self.waves.boss_interval = m.boss_interval;
    }

    /// Parse a config from JSON and validate it. Missing fields take their
    /// defaults.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values that would break the simulation's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("max_dt", self.max_dt)?;
        positive("arena.width", self.arena.width)?;
        positive("arena.height", self.arena.height)?;
        positive("cell_size", self.cell_size)?;
        positive("max_projectiles", self.max_projectiles as f32)?;
        positive("max_combatants", self.max_combatants as f32)?;
        positive("projectile_radius", self.projectile_radius)?;
        positive("projectile_lifetime", self.projectile_lifetime)?;

        positive("player.radius", self.player.radius)?;
        positive("player.max_health", self.player.max_health as f32)?;
        positive("player.speed", self.player.speed)?;
        positive("enemy.radius", self.enemy.radius)?;
        positive("enemy.base_health", self.enemy.base_health as f32)?;

        positive("ai.decision_interval", self.ai.decision_interval)?;
        positive("ai.memory_duration", self.ai.memory_duration)?;
        positive("ai.memory_samples", self.ai.memory_samples as f32)?;
        ordered(
            "ai.strafe_interval",
            self.ai.strafe_interval_min,
            self.ai.strafe_interval_max,
        )?;
        ordered(
            "ai.flank_angle",
            self.ai.flank_angle_min,
            self.ai.flank_angle_max,
        )?;

        ordered(
            "waves.spawn_delay",
            self.waves.spawn_delay_min,
            self.waves.spawn_delay_max,
        )?;
        ordered(
            "waves.escort_delay",
            self.waves.escort_delay_min,
            self.waves.escort_delay_max,
        )?;
        positive("waves.boss_interval", self.waves.boss_interval as f32)?;

        let enemy_weapons = [
            &self.archetypes.rusher.weapon,
            &self.archetypes.sniper.weapon,
            &self.archetypes.dodger.weapon,
            &self.archetypes.flanker.weapon,
        ];
        for weapon in self.player_weapons.iter().chain(enemy_weapons) {
            positive("weapon.fire_rate", weapon.fire_rate)?;
            positive("weapon.projectile_speed", weapon.projectile_speed)?;
            positive("weapon.magazine_size", weapon.magazine_size as f32)?;
            positive("weapon.pellets", weapon.pellets as f32)?;
        }

        Ok(())
    }
}

fn scale_i32(value: i32, multiplier: f32) -> i32 {
    ((value as f32) * multiplier).round().max(1.0) as i32
}

// ============================================================================
// DIFFICULTY
// ============================================================================

/// Difficulty presets. Selecting one is a construction-time decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Nightmare,
}

/// Multipliers a preset applies to the base tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyModifiers {
    pub player_health: f32,
    pub player_damage: f32,
    pub player_regen: f32,
    pub enemy_health: f32,
    pub enemy_damage: f32,
    pub enemy_speed: f32,
    pub enemy_fire_rate: f32,
    pub wave_size: f32,
    pub contact_damage: f32,
    pub boss_interval: u32,
}

impl Difficulty {
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::Nightmare => "Nightmare",
        }
    }

    pub fn modifiers(&self) -> DifficultyModifiers {
        match self {
            Difficulty::Easy => DifficultyModifiers {
                player_health: 1.5,
                player_damage: 1.3,
                player_regen: 1.5,
                enemy_health: 0.7,
                enemy_damage: 0.7,
                enemy_speed: 0.8,
                enemy_fire_rate: 0.8,
                wave_size: 0.7,
                contact_damage: 0.5,
                boss_interval: 6,
            },
            Difficulty::Normal => DifficultyModifiers {
                player_health: 1.0,
                player_damage: 1.0,
                player_regen: 1.0,
                enemy_health: 1.0,
                enemy_damage: 1.0,
                enemy_speed: 1.0,
                enemy_fire_rate: 1.0,
                wave_size: 1.0,
                contact_damage: 1.0,
                boss_interval: 5,
            },
            Difficulty::Hard => DifficultyModifiers {
                player_health: 0.8,
                player_damage: 0.9,
                player_regen: 0.7,
                enemy_health: 1.3,
                enemy_damage: 1.3,
                enemy_speed: 1.15,
                enemy_fire_rate: 1.2,
                wave_size: 1.3,
                contact_damage: 1.5,
                boss_interval: 4,
            },
            Difficulty::Nightmare => DifficultyModifiers {
                player_health: 0.6,
                player_damage: 0.8,
                player_regen: 0.5,
                enemy_health: 1.8,
                enemy_damage: 1.6,
                enemy_speed: 1.3,
                enemy_fire_rate: 1.5,
                wave_size: 1.5,
                contact_damage: 2.0,
                boss_interval: 3,
            },
        }
    }
}

// ============================================================================
// RNG
// ============================================================================

/// The simulation's only source of randomness. Seeded from
/// [`SimConfig::seed`], so two worlds with the same seed and inputs produce
/// identical output.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}
