//! Projectile state, integration and storage.
//!
//! Projectiles live in a generational arena: dead slots are recycled by
//! index, and a [`ProjectileHandle`] carries the slot's generation so a
//! handle to a recycled slot resolves to `None` instead of a different
//! projectile.
//!
//! Lifecycle: `Alive -> {Expired | OutOfBounds | HitWall | HitEntity} -> removed`.
//! `step` only handles lifetime and bounds; wall and combatant hits are
//! decided by the combat systems so they can be ordered with everything
//! else that collides in a step.

use crate::components::CombatantId;
use crate::geometry::Bounds;
use crate::weapon::ProjectileSpawn;
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

/// Remaining lifetime at or below this counts as expired. Absorbs the f32
/// error of subtracting a non-binary `dt` (1/60, 0.1) once per step.
const LIFETIME_EPSILON: f32 = 1e-4;

/// Why a projectile stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileFate {
    Expired,
    OutOfBounds,
    HitWall,
    HitEntity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub damage: i32,
    pub owner: CombatantId,
    /// Seconds left before expiry.
    pub lifetime: f32,
    pub alive: bool,
    /// Set once, when `alive` goes false.
    pub fate: Option<ProjectileFate>,
}

impl Projectile {
    pub fn new(spawn: ProjectileSpawn, radius: f32, lifetime: f32) -> Self {
        Self {
            position: spawn.position,
            velocity: spawn.velocity,
            radius,
            damage: spawn.damage,
            owner: spawn.owner,
            lifetime,
            alive: true,
            fate: None,
        }
    }

    /// Integrate one step and apply expiry/bounds culling.
    pub fn step(&mut self, dt: f32, bounds: &Bounds) {
        if !self.alive {
            return;
        }

        self.position += self.velocity * dt;
        self.lifetime -= dt;

        if self.lifetime <= LIFETIME_EPSILON {
            self.kill(ProjectileFate::Expired);
        } else if bounds.is_outside(self.position, self.radius) {
            self.kill(ProjectileFate::OutOfBounds);
        }
    }

    /// Mark dead. The first fate recorded wins.
    pub fn kill(&mut self, fate: ProjectileFate) {
        if self.alive {
            self.alive = false;
            self.fate = Some(fate);
        }
    }

    /// Straight-line extrapolation.
    #[inline]
    pub fn predict_position(&self, time_ahead: f32) -> Vec2 {
        self.position + self.velocity * time_ahead
    }
}

/// Stable reference to a projectile slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileHandle {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    projectile: Option<Projectile>,
}

/// Owner of every projectile in the world.
#[derive(Resource, Debug)]
pub struct ProjectileArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Handles in spawn order, oldest first. May hold stale handles until
    /// the next sweep.
    order: VecDeque<ProjectileHandle>,
    capacity: usize,
    occupied: usize,
}

impl Default for ProjectileArena {
    fn default() -> Self {
        Self::new(500)
    }
}

impl ProjectileArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            occupied: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupied slots, including projectiles marked dead but not yet swept.
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn alive_count(&self) -> usize {
        self.iter().filter(|(_, p)| p.alive).count()
    }

    /// Store a projectile, evicting the oldest one first if the arena is full.
    pub fn spawn(&mut self, projectile: Projectile) -> ProjectileHandle {
        if self.occupied >= self.capacity {
            self.evict_oldest();
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.projectile = Some(projectile);
        self.occupied += 1;

        let handle = ProjectileHandle {
            index,
            generation: slot.generation,
        };
        self.order.push_back(handle);
        handle
    }

    fn evict_oldest(&mut self) {
        while let Some(handle) = self.order.pop_front() {
            if self.remove(handle).is_some() {
                warn!(
                    capacity = self.capacity,
                    "projectile cap reached, evicting oldest"
                );
                return;
            }
        }
    }

    /// Take a projectile out of the arena and recycle its slot.
    pub fn remove(&mut self, handle: ProjectileHandle) -> Option<Projectile> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let projectile = slot.projectile.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.occupied -= 1;
        Some(projectile)
    }

    pub fn get(&self, handle: ProjectileHandle) -> Option<&Projectile> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.projectile.as_ref()
    }

    pub fn get_mut(&mut self, handle: ProjectileHandle) -> Option<&mut Projectile> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.projectile.as_mut()
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ProjectileHandle, &Projectile)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.projectile.as_ref().map(|p| {
                (
                    ProjectileHandle {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    p,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ProjectileHandle, &mut Projectile)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.projectile.as_mut().map(|p| {
                (
                    ProjectileHandle {
                        index: i as u32,
                        generation,
                    },
                    p,
                )
            })
        })
    }

    /// Advance every live projectile.
    pub fn step(&mut self, dt: f32, bounds: &Bounds) {
        for (_, projectile) in self.iter_mut() {
            projectile.step(dt, bounds);
        }
    }

    /// Compaction pass: recycle the slots of dead projectiles. Returns how
    /// many were removed.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if matches!(&slot.projectile, Some(p) if !p.alive) {
                slot.projectile = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                removed += 1;
            }
        }
        self.occupied -= removed;

        let slots = &self.slots;
        self.order.retain(|h| {
            slots
                .get(h.index as usize)
                .map_or(false, |s| s.generation == h.generation && s.projectile.is_some())
        });

        removed
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.projectile.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free = (0..self.slots.len() as u32).rev().collect();
        self.order.clear();
        self.occupied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projectile(owner: u32, velocity: Vec2, lifetime: f32) -> Projectile {
        Projectile::new(
            ProjectileSpawn {
                position: Vec2::new(100.0, 100.0),
                velocity,
                damage: 10,
                owner: CombatantId(owner),
            },
            4.0,
            lifetime,
        )
    }

    #[test]
    fn test_lifetime_expires_exactly() {
        let bounds = Bounds::default();
        let mut p = projectile(1, Vec2::ZERO, 1.0);

        for _ in 0..3 {
            p.step(0.25, &bounds);
            assert!(p.alive);
        }
        p.step(0.25, &bounds);
        assert!(!p.alive);
        assert_eq!(p.fate, Some(ProjectileFate::Expired));
    }

    #[test]
    fn test_lifetime_expires_exactly_at_frame_dt() {
        let bounds = Bounds::default();
        for (lifetime, dt, steps) in [(1.0, 1.0 / 60.0, 60), (3.0, 1.0 / 60.0, 180), (0.3, 0.1, 3)] {
            let mut p = projectile(1, Vec2::ZERO, lifetime);
            for step in 1..steps {
                p.step(dt, &bounds);
                assert!(p.alive, "lifetime {} died early at step {}", lifetime, step);
            }
            p.step(dt, &bounds);
            assert!(!p.alive, "lifetime {} still alive after {} steps", lifetime, steps);
            assert_eq!(p.fate, Some(ProjectileFate::Expired));
        }
    }

    #[test]
    fn test_out_of_bounds_with_margin() {
        let bounds = Bounds::new(200.0, 200.0);
        let mut p = projectile(1, Vec2::new(100.0, 0.0), 3.0);

        p.step(1.0, &bounds); // x = 200, on the edge
        assert!(p.alive);
        p.step(0.03, &bounds); // x = 203, inside the radius margin
        assert!(p.alive);
        p.step(0.03, &bounds); // x = 206
        assert!(!p.alive);
        assert_eq!(p.fate, Some(ProjectileFate::OutOfBounds));
    }

    #[test]
    fn test_first_fate_wins() {
        let mut p = projectile(1, Vec2::ZERO, 1.0);
        p.kill(ProjectileFate::HitWall);
        p.kill(ProjectileFate::HitEntity);
        assert_eq!(p.fate, Some(ProjectileFate::HitWall));
    }

    #[test]
    fn test_predict_position() {
        let p = projectile(1, Vec2::new(10.0, -5.0), 1.0);
        let ahead = p.predict_position(2.0);
        assert!((ahead.x - 120.0).abs() < 0.001);
        assert!((ahead.y - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_stale_handle_after_sweep() {
        let mut arena = ProjectileArena::new(10);
        let handle = arena.spawn(projectile(1, Vec2::ZERO, 1.0));
        assert!(arena.get(handle).is_some());

        if let Some(p) = arena.get_mut(handle) {
            p.kill(ProjectileFate::HitWall);
        }
        assert_eq!(arena.sweep(), 1);
        assert!(arena.get(handle).is_none());
        assert!(arena.is_empty());

        // Slot is recycled with a new generation
        let reused = arena.spawn(projectile(2, Vec2::ZERO, 1.0));
        assert_eq!(reused.index, handle.index);
        assert_ne!(reused.generation, handle.generation);
        assert!(arena.get(handle).is_none());
        assert_eq!(arena.get(reused).map(|p| p.owner), Some(CombatantId(2)));
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut arena = ProjectileArena::new(3);
        let first = arena.spawn(projectile(1, Vec2::ZERO, 1.0));
        let second = arena.spawn(projectile(2, Vec2::ZERO, 1.0));
        arena.spawn(projectile(3, Vec2::ZERO, 1.0));
        let fourth = arena.spawn(projectile(4, Vec2::ZERO, 1.0));

        assert_eq!(arena.len(), 3);
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
        assert!(arena.get(fourth).is_some());

        arena.spawn(projectile(5, Vec2::ZERO, 1.0));
        assert!(arena.get(second).is_none());
    }

    #[test]
    fn test_arena_step_and_sweep() {
        let bounds = Bounds::default();
        let mut arena = ProjectileArena::new(10);
        arena.spawn(projectile(1, Vec2::ZERO, 0.1));
        arena.spawn(projectile(2, Vec2::ZERO, 1.0));

        arena.step(0.2, &bounds);
        assert_eq!(arena.alive_count(), 1);
        assert_eq!(arena.len(), 2);
        arena.sweep();
        assert_eq!(arena.len(), 1);
    }
}
