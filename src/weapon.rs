//! Weapon model: firing cadence, ammo/reload state machine and spread.
//!
//! A weapon runs two independent timer-driven state machines:
//! `READY <-> COOLDOWN` on `fire_timer` and `LOADED <-> RELOADING` on
//! `reload_timer`. Firing never errors; a refused shot is an empty spawn list.

use crate::components::CombatantId;
use crate::geometry::vector_from_angle;
use bevy_ecs::prelude::*;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weapon archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeaponKind {
    #[default]
    Pistol,
    Smg,
    Shotgun,
    Rifle,
}

impl WeaponKind {
    pub fn name(&self) -> &'static str {
        match self {
            WeaponKind::Pistol => "Pistol",
            WeaponKind::Smg => "SMG",
            WeaponKind::Shotgun => "Shotgun",
            WeaponKind::Rifle => "Rifle",
        }
    }
}

/// Static weapon parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub kind: WeaponKind,
    /// Damage per projectile.
    pub damage: i32,
    /// Shots per second.
    pub fire_rate: f32,
    pub projectile_speed: f32,
    /// Total spread angle in radians, symmetric about the aim.
    pub spread: f32,
    pub magazine_size: u32,
    /// Seconds.
    pub reload_time: f32,
    /// Projectiles per shot.
    pub pellets: u32,
    /// Random per-pellet offset for multi-pellet weapons (radians).
    pub pellet_jitter: f32,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self::pistol()
    }
}

impl WeaponStats {
    pub fn pistol() -> Self {
        Self {
            kind: WeaponKind::Pistol,
            damage: 20,
            fire_rate: 3.0,
            projectile_speed: 500.0,
            spread: 0.05,
            magazine_size: 12,
            reload_time: 1.5,
            pellets: 1,
            pellet_jitter: 0.0,
        }
    }

    pub fn smg() -> Self {
        Self {
            kind: WeaponKind::Smg,
            damage: 10,
            fire_rate: 10.0,
            projectile_speed: 600.0,
            spread: 0.1,
            magazine_size: 30,
            reload_time: 2.0,
            pellets: 1,
            pellet_jitter: 0.0,
        }
    }

    pub fn shotgun() -> Self {
        Self {
            kind: WeaponKind::Shotgun,
            damage: 8,
            fire_rate: 1.0,
            projectile_speed: 400.0,
            spread: 0.3,
            magazine_size: 6,
            reload_time: 2.5,
            pellets: 8,
            pellet_jitter: 0.05,
        }
    }

    pub fn rifle() -> Self {
        Self {
            kind: WeaponKind::Rifle,
            damage: 35,
            fire_rate: 1.5,
            projectile_speed: 800.0,
            spread: 0.02,
            magazine_size: 10,
            reload_time: 2.0,
            pellets: 1,
            pellet_jitter: 0.0,
        }
    }

    /// Seconds between shots.
    #[inline]
    pub fn fire_cooldown(&self) -> f32 {
        if self.fire_rate > 0.0 {
            1.0 / self.fire_rate
        } else {
            f32::INFINITY
        }
    }

    /// Stats with damage and cadence scaled, e.g. for bosses.
    pub fn boosted(&self, damage_multiplier: f32, fire_rate_multiplier: f32) -> Self {
        Self {
            damage: ((self.damage as f32) * damage_multiplier).max(1.0) as i32,
            fire_rate: self.fire_rate * fire_rate_multiplier,
            ..*self
        }
    }
}

/// A request to create one projectile, produced by [`Weapon::fire`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: i32,
    pub owner: CombatantId,
}

/// HUD view of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponSnapshot {
    pub kind: WeaponKind,
    pub ammo: u32,
    pub magazine_size: u32,
    pub reloading: bool,
    /// 0.0 when not reloading, rising to 1.0 as the reload completes.
    pub reload_progress: f32,
}

/// A weapon instance with its runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub stats: WeaponStats,
    pub ammo: u32,
    pub reloading: bool,
    pub reload_timer: f32,
    pub fire_timer: f32,
    /// Trigger pulls that produced projectiles, pellets counted once.
    #[serde(default)]
    pub shots_fired: u32,
}

impl Weapon {
    pub fn new(stats: WeaponStats) -> Self {
        Self {
            stats,
            ammo: stats.magazine_size,
            reloading: false,
            reload_timer: 0.0,
            fire_timer: 0.0,
            shots_fired: 0,
        }
    }

    #[inline]
    pub fn can_fire(&self) -> bool {
        !self.reloading && self.ammo > 0 && self.fire_timer <= 0.0
    }

    pub fn is_empty(&self) -> bool {
        self.ammo == 0
    }

    pub fn needs_reload(&self) -> bool {
        self.ammo == 0 && !self.reloading
    }

    /// Fire toward `direction` (radians) from `origin`.
    ///
    /// Returns one spawn per pellet, or nothing if the weapon is reloading,
    /// empty, or still cooling down.
    pub fn fire<R: Rng + ?Sized>(
        &mut self,
        origin: Vec2,
        direction: f32,
        owner: CombatantId,
        rng: &mut R,
    ) -> Vec<ProjectileSpawn> {
        if !self.can_fire() {
            return Vec::new();
        }

        self.ammo -= 1;
        self.shots_fired = self.shots_fired.saturating_add(1);
        self.fire_timer = self.stats.fire_cooldown();

        let pellets = self.stats.pellets.max(1);
        let spread = self.stats.spread.max(0.0);
        let mut spawns = Vec::with_capacity(pellets as usize);

        for i in 0..pellets {
            let offset = if pellets == 1 {
                let half = spread * 0.5;
                rng.gen_range(-half..=half)
            } else {
                let jitter = self.stats.pellet_jitter.abs();
                let fan = -spread * 0.5 + spread * (i as f32 + 0.5) / pellets as f32;
                fan + rng.gen_range(-jitter..=jitter)
            };

            spawns.push(ProjectileSpawn {
                position: origin,
                velocity: vector_from_angle(direction + offset) * self.stats.projectile_speed,
                damage: self.stats.damage,
                owner,
            });
        }

        spawns
    }

    /// Begin reloading. No-op while reloading or with a full magazine.
    /// Returns whether a reload started.
    pub fn start_reload(&mut self) -> bool {
        if self.reloading || self.ammo >= self.stats.magazine_size {
            return false;
        }
        self.reloading = true;
        self.reload_timer = self.stats.reload_time;
        true
    }

    pub fn finish_reload(&mut self) {
        self.ammo = self.stats.magazine_size;
        self.reloading = false;
        self.reload_timer = 0.0;
    }

    /// Tick both timers; completes the reload when its timer runs out.
    pub fn update(&mut self, dt: f32) {
        if self.fire_timer > 0.0 {
            self.fire_timer -= dt;
        }

        if self.reloading {
            self.reload_timer -= dt;
            if self.reload_timer <= 0.0 {
                self.finish_reload();
            }
        }
    }

    pub fn reload_progress(&self) -> f32 {
        if !self.reloading || self.stats.reload_time <= 0.0 {
            return 0.0;
        }
        (1.0 - self.reload_timer / self.stats.reload_time).clamp(0.0, 1.0)
    }

    pub fn snapshot(&self) -> WeaponSnapshot {
        WeaponSnapshot {
            kind: self.stats.kind,
            ammo: self.ammo,
            magazine_size: self.stats.magazine_size,
            reloading: self.reloading,
            reload_progress: self.reload_progress(),
        }
    }
}

/// Weapons owned by a combatant. Only the active weapon's timers advance.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    pub weapons: Vec<Weapon>,
    pub active: usize,
}

impl Loadout {
    pub fn single(stats: WeaponStats) -> Self {
        Self {
            weapons: vec![Weapon::new(stats)],
            active: 0,
        }
    }

    pub fn from_stats(stats: &[WeaponStats]) -> Self {
        Self {
            weapons: stats.iter().copied().map(Weapon::new).collect(),
            active: 0,
        }
    }

    pub fn active_weapon(&self) -> Option<&Weapon> {
        self.weapons.get(self.active)
    }

    pub fn active_weapon_mut(&mut self) -> Option<&mut Weapon> {
        self.weapons.get_mut(self.active)
    }

    /// Make `index` the active weapon. Returns false for an out-of-range
    /// index or when it is already active.
    pub fn switch(&mut self, index: usize) -> bool {
        if index >= self.weapons.len() || index == self.active {
            return false;
        }
        self.active = index;
        true
    }

    /// Cycle to the next weapon, wrapping past the last slot.
    pub fn next_weapon(&mut self) -> bool {
        if self.weapons.len() < 2 {
            return false;
        }
        self.switch((self.active + 1) % self.weapons.len())
    }

    /// Cycle to the previous weapon, wrapping past the first slot.
    pub fn previous_weapon(&mut self) -> bool {
        let len = self.weapons.len();
        if len < 2 {
            return false;
        }
        self.switch((self.active + len - 1) % len)
    }

    pub fn total_shots_fired(&self) -> u32 {
        self.weapons.iter().map(|w| w.shots_fired).sum()
    }
}
