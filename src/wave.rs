//! Wave progression: spawn queue, enemy mix and enemy construction.
//!
//! A wave is planned up front by [`WaveDirector::start_wave`]; the wave spawn
//! system then pops one entry each time the countdown runs out. The first
//! spawn waits the full break time, every later spawn waits the delay of the
//! entry about to spawn.

use crate::behavior::{Archetype, Brain};
use crate::components::*;
use crate::config::{SimConfig, WaveTuning};
use crate::weapon::Loadout;
use bevy_ecs::prelude::*;
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Random offset applied around each spawn point so enemies don't stack.
const SPAWN_JITTER: f32 = 30.0;

/// Archetype weights from wave 4 on: rusher, sniper, dodger, flanker.
const LATE_WAVE_WEIGHTS: [(Archetype, f32); 4] = [
    (Archetype::Rusher, 0.30),
    (Archetype::Sniper, 0.30),
    (Archetype::Dodger, 0.25),
    (Archetype::Flanker, 0.15),
];

/// Supplies preferred spawn points. Positions are validated against walls
/// and bounds when the enemy actually spawns.
pub trait SpawnSource {
    fn spawn_position(&self, slot: usize, count: usize) -> Vec2;
}

/// Spawn zones. With fewer enemies than zones they go round-robin; with more
/// they are spread evenly across the zones in order.
impl SpawnSource for [Vec2] {
    fn spawn_position(&self, slot: usize, count: usize) -> Vec2 {
        if self.is_empty() {
            return Vec2::ZERO;
        }
        let zone = if count <= self.len() {
            slot % self.len()
        } else {
            (slot * self.len()) / count.max(1)
        };
        self[zone.min(self.len() - 1)]
    }
}

impl SpawnSource for Vec<Vec2> {
    fn spawn_position(&self, slot: usize, count: usize) -> Vec2 {
        self.as_slice().spawn_position(slot, count)
    }
}

/// One queued enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    pub archetype: Archetype,
    /// Preferred position, before validation.
    pub position: Vec2,
    /// Seconds to wait before this entry spawns (ignored for the first entry).
    pub delay: f32,
    pub boss: bool,
}

#[derive(Resource, Debug, Default, Clone)]
pub struct WaveDirector {
    wave: u32,
    queue: VecDeque<SpawnEntry>,
    spawn_timer: f32,
    break_remaining: f32,
    regen_carry: f32,
}

impl WaveDirector {
    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queue_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued(&self) -> impl Iterator<Item = &SpawnEntry> {
        self.queue.iter()
    }

    pub fn spawn_timer(&self) -> f32 {
        self.spawn_timer
    }

    /// Seconds of wave break left; the player regenerates while positive.
    pub fn break_remaining(&self) -> f32 {
        self.break_remaining
    }

    pub fn is_boss_wave(wave: u32, tuning: &WaveTuning) -> bool {
        wave > 0 && tuning.boss_interval > 0 && wave % tuning.boss_interval == 0
    }

    /// Number of enemies queued for `wave`.
    pub fn wave_size(wave: u32, tuning: &WaveTuning) -> usize {
        let w = wave.max(1);
        if Self::is_boss_wave(w, tuning) {
            (tuning.base_enemies + (w - 1) / 2).max(3) as usize
        } else {
            let base = tuning.base_enemies + (w - 1) * tuning.enemies_per_wave;
            ((base as f32) * tuning.count_multiplier).round().max(1.0) as usize
        }
    }

    /// Plan `wave`, replacing anything still queued. Returns the number of
    /// enemies queued.
    pub fn start_wave<S, R>(&mut self, wave: u32, tuning: &WaveTuning, spawns: &S, rng: &mut R) -> usize
    where
        S: SpawnSource + ?Sized,
        R: Rng + ?Sized,
    {
        let count = Self::wave_size(wave, tuning);
        let boss_wave = Self::is_boss_wave(wave, tuning);
        let mix = enemy_mix(wave, count, rng);

        self.wave = wave;
        self.queue.clear();

        for (slot, archetype) in mix.into_iter().enumerate() {
            let boss = boss_wave && slot == 0;
            let delay = if boss {
                tuning.boss_delay
            } else if boss_wave {
                rng.gen_range(tuning.escort_delay_min..=tuning.escort_delay_max)
            } else {
                rng.gen_range(tuning.spawn_delay_min..=tuning.spawn_delay_max)
            };
            let offset = Vec2::new(
                rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
                rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
            );

            self.queue.push_back(SpawnEntry {
                archetype,
                position: spawns.spawn_position(slot, count) + offset,
                delay,
                boss,
            });
        }

        self.spawn_timer = tuning.break_time;
        self.break_remaining = tuning.break_time;
        self.regen_carry = 0.0;
        self.queue.len()
    }

    /// Advance the spawn countdown. Returns the entry to spawn this step, if
    /// any.
    pub fn tick(&mut self, dt: f32) -> Option<SpawnEntry> {
        if self.spawn_timer > 0.0 {
            self.spawn_timer -= dt;
            return None;
        }

        let entry = self.queue.pop_front()?;
        if let Some(next) = self.queue.front() {
            self.spawn_timer = next.delay;
        }
        Some(entry)
    }

    /// Whole hit points of regeneration earned this step. Fractions carry
    /// over to the next step.
    pub fn regen(&mut self, dt: f32, rate: f32) -> i32 {
        if self.break_remaining <= 0.0 {
            return 0;
        }
        self.break_remaining -= dt;
        if self.break_remaining <= 0.0 {
            self.regen_carry = 0.0;
            return 0;
        }

        self.regen_carry += rate * dt;
        let whole = self.regen_carry.floor();
        self.regen_carry -= whole;
        whole as i32
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.spawn_timer = 0.0;
        self.break_remaining = 0.0;
        self.regen_carry = 0.0;
    }
}

/// Archetypes for a wave of `count` enemies, shuffled.
pub fn enemy_mix<R: Rng + ?Sized>(wave: u32, count: usize, rng: &mut R) -> Vec<Archetype> {
    let mut mix = Vec::with_capacity(count);

    match wave {
        0 | 1 => mix.resize(count, Archetype::Rusher),
        2 => {
            let rushers = count / 2;
            mix.resize(rushers, Archetype::Rusher);
            mix.resize(count, Archetype::Sniper);
        }
        3 => {
            let rushers = (count / 3).max(1);
            let snipers = (count / 3).max(1);
            let dodgers = count.saturating_sub(rushers + snipers).max(1);
            mix.resize(rushers, Archetype::Rusher);
            mix.resize(rushers + snipers, Archetype::Sniper);
            mix.resize(rushers + snipers + dodgers, Archetype::Dodger);
        }
        _ => {
            let total: f32 = LATE_WAVE_WEIGHTS.iter().map(|(_, w)| w).sum();
            for _ in 0..count {
                let mut roll = rng.gen_range(0.0..total);
                let mut picked = Archetype::Rusher;
                for &(archetype, weight) in LATE_WAVE_WEIGHTS.iter() {
                    if roll < weight {
                        picked = archetype;
                        break;
                    }
                    roll -= weight;
                }
                mix.push(picked);
            }
        }
    }

    mix.shuffle(rng);
    mix
}

/// Components for a freshly spawned enemy. Bosses get the boss multipliers
/// on health, size, speed, perception and weapon.
pub fn enemy_bundle(
    config: &SimConfig,
    id: CombatantId,
    archetype: Archetype,
    boss: bool,
    position: Vec2,
) -> EnemyBundle {
    let profile = config.archetypes.get(archetype);
    let mut max_health = config.enemy.base_health + profile.health_bonus;
    let mut radius = config.enemy.radius;
    let mut speed = profile.speed;
    let mut detection_range = profile.detection_range;
    let mut weapon = profile.weapon;

    if boss {
        let b = &config.boss;
        max_health = ((max_health as f32) * b.health_multiplier).round() as i32;
        radius *= b.radius_multiplier;
        speed *= b.speed_multiplier;
        detection_range *= b.detection_multiplier;
        weapon = weapon.boosted(b.damage_multiplier, b.fire_rate_multiplier);
    }

    EnemyBundle {
        combatant: CombatantBundle {
            id,
            role: Role::Enemy,
            position: Position(position),
            body: Body { radius },
            health: Health::new(max_health),
            invulnerability: Invulnerability::new(config.enemy.spawn_invulnerability, 0.0),
            stats: Stats {
                speed,
                detection_range,
            },
            loadout: Loadout::single(weapon),
            ..Default::default()
        },
        brain: Brain::new(archetype),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn zones() -> Vec<Vec2> {
        vec![
            Vec2::new(100.0, 100.0),
            Vec2::new(1180.0, 100.0),
            Vec2::new(100.0, 620.0),
            Vec2::new(1180.0, 620.0),
        ]
    }

    #[test]
    fn test_wave_sizes() {
        let tuning = WaveTuning::default();
        assert_eq!(WaveDirector::wave_size(1, &tuning), 3);
        assert_eq!(WaveDirector::wave_size(2, &tuning), 5);
        assert_eq!(WaveDirector::wave_size(4, &tuning), 9);
        // Boss waves: max(3, 3 + (w - 1) / 2)
        assert_eq!(WaveDirector::wave_size(5, &tuning), 5);
        assert_eq!(WaveDirector::wave_size(10, &tuning), 7);

        let scaled = WaveTuning {
            count_multiplier: 1.5,
            ..Default::default()
        };
        assert_eq!(WaveDirector::wave_size(2, &scaled), 8);
    }

    #[test]
    fn test_early_wave_mixes() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let one = enemy_mix(1, 3, &mut rng);
        assert!(one.iter().all(|a| *a == Archetype::Rusher));

        let two = enemy_mix(2, 5, &mut rng);
        assert_eq!(two.iter().filter(|a| **a == Archetype::Rusher).count(), 2);
        assert_eq!(two.iter().filter(|a| **a == Archetype::Sniper).count(), 3);

        let three = enemy_mix(3, 7, &mut rng);
        assert_eq!(three.iter().filter(|a| **a == Archetype::Rusher).count(), 2);
        assert_eq!(three.iter().filter(|a| **a == Archetype::Sniper).count(), 2);
        assert_eq!(three.iter().filter(|a| **a == Archetype::Dodger).count(), 3);
    }

    #[test]
    fn test_late_wave_mix_is_seeded() {
        let a = enemy_mix(8, 40, &mut ChaCha8Rng::seed_from_u64(9));
        let b = enemy_mix(8, 40, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.iter().any(|x| *x != Archetype::Rusher));
    }

    #[test]
    fn test_boss_wave_queue() {
        let tuning = WaveTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut director = WaveDirector::default();

        let queued = director.start_wave(5, &tuning, zones().as_slice(), &mut rng);
        assert_eq!(queued, 5);

        let entries: Vec<_> = director.queued().copied().collect();
        assert!(entries[0].boss);
        assert!((entries[0].delay - 1.0).abs() < 0.001);
        for escort in &entries[1..] {
            assert!(!escort.boss);
            assert!(escort.delay >= 1.5 && escort.delay <= 3.0);
        }
    }

    #[test]
    fn test_spawn_countdown() {
        let tuning = WaveTuning {
            break_time: 1.0,
            spawn_delay_min: 0.5,
            spawn_delay_max: 0.5,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut director = WaveDirector::default();
        director.start_wave(1, &tuning, zones().as_slice(), &mut rng);

        // Break time first
        assert!(director.tick(0.5).is_none());
        assert!(director.tick(0.5).is_none());
        assert!(director.tick(0.1).is_some());
        assert_eq!(director.queue_len(), 2);

        // Then each entry's own delay
        assert!(director.tick(0.25).is_none());
        assert!(director.tick(0.25).is_none());
        assert!(director.tick(0.1).is_some());
        assert!(director.tick(0.5).is_none());
        assert!(director.tick(0.1).is_some());
        assert!(director.is_queue_empty());
        assert!(director.tick(1.0).is_none());
    }

    #[test]
    fn test_regen_carries_fractions() {
        let tuning = WaveTuning {
            break_time: 1.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut director = WaveDirector::default();
        director.start_wave(1, &tuning, zones().as_slice(), &mut rng);

        let mut healed = 0;
        for _ in 0..8 {
            healed += director.regen(0.1, 10.0);
        }
        // 0.8 s at 10 hp/s, give or take float rounding on the carry
        assert!((7..=8).contains(&healed));

        for _ in 0..5 {
            director.regen(0.1, 10.0);
        }
        assert_eq!(director.regen(0.1, 10.0), 0);
    }

    #[test]
    fn test_spawn_zone_distribution() {
        let points = zones();
        assert_eq!(points.spawn_position(5, 3), points[1]);
        // More enemies than zones: spread evenly in order
        assert_eq!(points.spawn_position(0, 8), points[0]);
        assert_eq!(points.spawn_position(3, 8), points[1]);
        assert_eq!(points.spawn_position(7, 8), points[3]);
        assert_eq!(Vec::<Vec2>::new().spawn_position(0, 1), Vec2::ZERO);
    }

    #[test]
    fn test_boss_bundle_multipliers() {
        let config = SimConfig::default();
        let normal = enemy_bundle(&config, CombatantId(1), Archetype::Sniper, false, Vec2::ZERO);
        let boss = enemy_bundle(&config, CombatantId(2), Archetype::Sniper, true, Vec2::ZERO);

        assert_eq!(normal.combatant.health.max, 50);
        assert_eq!(boss.combatant.health.max, 150);
        assert!((boss.combatant.body.radius - 18.0).abs() < 0.001);
        assert!((boss.combatant.stats.speed - 80.0).abs() < 0.001);
        assert!((boss.combatant.stats.detection_range - 900.0).abs() < 0.001);

        let weapon = boss.combatant.loadout.active_weapon().map(|w| w.stats);
        assert_eq!(weapon.map(|s| s.damage), Some(52));
        assert!(normal.combatant.invulnerability.is_active());
    }
}
