//! ECS components for the arena combat simulation.
//!
//! Components are pure data containers attached to combatant entities.
//! All game logic lives in systems that query these components; the few
//! methods here only maintain the component's own invariants.

use crate::behavior::Brain;
use crate::weapon::Loadout;
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World position of a combatant's center.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

/// Velocity in world units per second.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

/// Facing angle in radians. Weapons fire along it.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Facing(pub f32);

/// Collision footprint.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub radius: f32,
}

impl Default for Body {
    fn default() -> Self {
        Self { radius: 12.0 }
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Unique identifier for a combatant. Allocated in spawn order, so a smaller
/// id is always an older combatant.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct CombatantId(pub u32);

/// Which side a combatant plays for.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Player,
    Enemy,
}

impl Default for Role {
    fn default() -> Self {
        Self::Enemy
    }
}

/// Marks a boss spawn.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Boss;

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Result of routing damage through [`Health::apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target was already dead or the amount was not positive.
    Ignored,
    /// Health went down but stayed above zero.
    Damaged { applied: i32 },
    /// This hit took health to zero. Reported exactly once per combatant.
    Killed { applied: i32 },
}

impl DamageOutcome {
    pub fn applied(&self) -> i32 {
        match *self {
            Self::Ignored => 0,
            Self::Damaged { applied } | Self::Killed { applied } => applied,
        }
    }
}

/// Hit points. `0 <= current <= max` always holds.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
    pub alive: bool,
}

impl Health {
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            alive: true,
        }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0 {
            0.0
        } else {
            (self.current as f32 / self.max as f32).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Subtract `amount`, clamping at zero. The transition to dead happens at
    /// most once; later calls on a dead combatant are ignored.
    pub fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        if !self.alive || amount <= 0 {
            return DamageOutcome::Ignored;
        }

        let before = self.current;
        self.current = (self.current - amount).max(0);
        let applied = before - self.current;

        if self.current == 0 {
            self.alive = false;
            DamageOutcome::Killed { applied }
        } else {
            DamageOutcome::Damaged { applied }
        }
    }

    pub fn heal(&mut self, amount: i32) {
        if self.alive && amount > 0 {
            self.current = (self.current + amount).min(self.max);
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Countdown during which incoming damage is ignored.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Invulnerability {
    /// Seconds left in the current window.
    pub remaining: f32,
    /// Window granted after every damaging hit (0 disables it).
    pub on_hit: f32,
}

impl Invulnerability {
    pub fn new(remaining: f32, on_hit: f32) -> Self {
        Self { remaining, on_hit }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn grant(&mut self, seconds: f32) {
        self.remaining = self.remaining.max(seconds);
    }

    pub fn tick(&mut self, dt: f32) {
        if self.remaining > 0.0 {
            self.remaining = (self.remaining - dt).max(0.0);
        }
    }
}

/// Id of whoever dealt the most recent damage, for kill attribution.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LastHit {
    pub attacker: Option<CombatantId>,
}

/// Route damage through invulnerability and health. This is the single entry
/// point for every damage source.
pub fn apply_damage(
    health: &mut Health,
    invulnerability: &mut Invulnerability,
    last_hit: &mut LastHit,
    amount: i32,
    attacker: Option<CombatantId>,
) -> DamageOutcome {
    if invulnerability.is_active() {
        return DamageOutcome::Ignored;
    }

    let outcome = health.apply_damage(amount);
    if outcome != DamageOutcome::Ignored {
        last_hit.attacker = attacker;
        if invulnerability.on_hit > 0.0 {
            invulnerability.grant(invulnerability.on_hit);
        }
    }
    outcome
}

/// Movement and perception stats.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Top speed (units per second).
    pub speed: f32,
    /// Maximum perception range (units).
    pub detection_range: f32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            speed: 100.0,
            detection_range: 400.0,
        }
    }
}

/// What the combatant is trying to do. Written by the AI on decision ticks or
/// by player input every step, and executed every step.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Desired movement. Usually unit length or zero; a dodge dash doubles it.
    pub movement: Vec2,
    /// Desired facing in radians, if any.
    pub aim: Option<f32>,
    /// Pull the trigger this step.
    pub fire: bool,
}

// ============================================================================
// PLAYER COMPONENTS
// ============================================================================

/// Gate for enemy contact damage against the player.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactCooldown {
    pub remaining: f32,
}

/// Player dash ability state.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dash {
    /// Seconds left in the active dash (0 when not dashing).
    pub remaining: f32,
    /// Seconds until the next dash is allowed.
    pub cooldown: f32,
    pub direction: Vec2,
}

impl Dash {
    pub fn is_dashing(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn ready(&self) -> bool {
        self.cooldown <= 0.0 && !self.is_dashing()
    }
}

// ============================================================================
// BUNDLES
// ============================================================================

/// Components every combatant carries.
#[derive(Bundle, Default)]
pub struct CombatantBundle {
    pub id: CombatantId,
    pub role: Role,
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
}

/// Player-only extras.
#[derive(Bundle, Default)]
pub struct PlayerBundle {
    pub combatant: CombatantBundle,
    pub contact: ContactCooldown,
    pub dash: Dash,
}

/// AI-only extras.
#[derive(Bundle)]
pub struct EnemyBundle {
    pub combatant: CombatantBundle,
    pub brain: Brain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_clamps_at_zero_and_kills_once() {
        let mut health = Health::new(30);

        assert_eq!(health.apply_damage(20), DamageOutcome::Damaged { applied: 20 });
        assert_eq!(health.current, 10);

        assert_eq!(health.apply_damage(25), DamageOutcome::Killed { applied: 10 });
        assert_eq!(health.current, 0);
        assert!(!health.alive);

        // Already dead: nothing else happens
        assert_eq!(health.apply_damage(5), DamageOutcome::Ignored);
        assert_eq!(health.current, 0);
    }

    #[test]
    fn test_damage_matches_saturating_subtraction() {
        for before in [1, 5, 40, 100] {
            for amount in [0, 1, 7, 40, 150] {
                let mut health = Health::new(100);
                health.current = before;
                health.apply_damage(amount);
                assert_eq!(health.current, (before - amount).max(0));
                assert!(health.current >= 0 && health.current <= health.max);
            }
        }
    }

    #[test]
    fn test_invulnerability_blocks_damage() {
        let mut health = Health::new(100);
        let mut inv = Invulnerability::new(1.0, 0.0);
        let mut last = LastHit::default();

        let outcome = apply_damage(&mut health, &mut inv, &mut last, 50, Some(CombatantId(3)));
        assert_eq!(outcome, DamageOutcome::Ignored);
        assert_eq!(health.current, 100);
        assert!(last.attacker.is_none());

        inv.tick(1.0);
        let outcome = apply_damage(&mut health, &mut inv, &mut last, 50, Some(CombatantId(3)));
        assert_eq!(outcome, DamageOutcome::Damaged { applied: 50 });
        assert_eq!(last.attacker, Some(CombatantId(3)));
    }

    #[test]
    fn test_hit_grants_grace_window() {
        let mut health = Health::new(100);
        let mut inv = Invulnerability::new(0.0, 0.1);
        let mut last = LastHit::default();

        apply_damage(&mut health, &mut inv, &mut last, 10, None);
        assert!(inv.is_active());
        assert_eq!(
            apply_damage(&mut health, &mut inv, &mut last, 10, None),
            DamageOutcome::Ignored
        );
        assert_eq!(health.current, 90);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut health = Health::new(100);
        health.apply_damage(30);
        health.heal(50);
        assert_eq!(health.current, 100);
        assert!((health.fraction() - 1.0).abs() < 0.001);
    }
}
