//! AI decision layer.
//!
//! Each enemy owns a [`Brain`] whose archetype is fixed at spawn. On every
//! decision tick the AI system builds a [`DecisionContext`] and calls
//! [`decide`], which dispatches to one pure policy function per archetype.
//! Policies share the [`AiState`] vocabulary but nothing else.
//!
//! Between decision ticks the combatant keeps executing its last intent.

use crate::collision::is_position_valid;
use crate::components::CombatantId;
use crate::config::AiTuning;
use crate::geometry::{angle_of, angle_to, line_of_sight, vector_from_angle, Bounds, Rect};
use crate::projectile::ProjectileArena;
use bevy_ecs::prelude::*;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

// ============================================================================
// STATE VOCABULARY
// ============================================================================

/// AI personality, selected at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Charges straight in.
    Rusher,
    /// Holds a long preferred range and leads its shots.
    Sniper,
    /// Strafes on approach and sidesteps incoming fire.
    Dodger,
    /// Works around to the target's side.
    Flanker,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::Rusher,
        Archetype::Sniper,
        Archetype::Dodger,
        Archetype::Flanker,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Rusher => "rusher",
            Archetype::Sniper => "sniper",
            Archetype::Dodger => "dodger",
            Archetype::Flanker => "flanker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    #[default]
    Patrol,
    Chase,
    Attack,
    Retreat,
    Dodge,
}

/// Per-enemy AI memory and timers.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    pub archetype: Archetype,
    pub state: AiState,
    /// Seconds until the next decision. Decides immediately at spawn.
    pub decision_timer: f32,
    /// Where the target was last perceived.
    pub last_known_target: Option<Vec2>,
    pub dodge_cooldown: f32,
    pub dash_cooldown: f32,
    /// +1 or -1.
    pub strafe_sign: f32,
    pub strafe_timer: f32,
    pub flank_waypoint: Option<Vec2>,
    pub flank_timer: f32,
}

impl Brain {
    pub fn new(archetype: Archetype) -> Self {
        Self {
            archetype,
            state: AiState::Patrol,
            decision_timer: 0.0,
            last_known_target: None,
            dodge_cooldown: 0.0,
            dash_cooldown: 0.0,
            strafe_sign: 1.0,
            strafe_timer: 0.0,
            flank_waypoint: None,
            flank_timer: 0.0,
        }
    }

    /// Count down every timer by `dt`.
    pub fn tick(&mut self, dt: f32) {
        self.decision_timer -= dt;
        self.dodge_cooldown -= dt;
        self.dash_cooldown -= dt;
        self.strafe_timer -= dt;
        self.flank_timer -= dt;
    }

    #[inline]
    pub fn decision_due(&self) -> bool {
        self.decision_timer <= 0.0
    }
}

// ============================================================================
// DECISION INPUT / OUTPUT
// ============================================================================

/// What the AI knows about its target this decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    pub position: Vec2,
    /// Facing angle of the target in radians.
    pub facing: f32,
    /// Mean of the target's recent velocity samples.
    pub lead_velocity: Vec2,
}

/// Everything a policy may read.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub position: Vec2,
    pub radius: f32,
    pub detection_range: f32,
    pub tuning: &'a AiTuning,
    pub target: Option<TargetView>,
    /// Target within detection range with a clear line of sight.
    pub perceives: bool,
    /// Velocity of the first projectile detected heading this way.
    pub incoming: Option<Vec2>,
    pub walls: &'a [Rect],
    pub bounds: &'a Bounds,
}

/// One decision. Replaces the combatant's intent wholesale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: AiState,
    pub movement: Vec2,
    /// `None` keeps the current facing.
    pub aim: Option<f32>,
    pub fire: bool,
}

impl Decision {
    fn idle(state: AiState) -> Self {
        Self {
            state,
            movement: Vec2::ZERO,
            aim: None,
            fire: false,
        }
    }
}

fn aim_along(direction: Vec2) -> Option<f32> {
    (direction != Vec2::ZERO).then(|| angle_of(direction))
}

// ============================================================================
// PERCEPTION
// ============================================================================

/// Hard range cutoff plus line of sight.
pub fn perceive(from: Vec2, to: Vec2, range: f32, walls: &[Rect]) -> bool {
    from.distance(to) <= range && line_of_sight(from, to, walls)
}

/// Velocity of the first live projectile, not owned by `self_id`, that is
/// within `radius` and heading toward `position` (heading/offset dot product
/// above `dot_threshold`). Projectiles are visited in arena slot order.
pub fn detect_incoming(
    position: Vec2,
    self_id: CombatantId,
    projectiles: &ProjectileArena,
    radius: f32,
    dot_threshold: f32,
) -> Option<Vec2> {
    projectiles
        .iter()
        .map(|(_, p)| p)
        .filter(|p| p.alive && p.owner != self_id)
        .find(|p| {
            if p.position.distance(position) >= radius {
                return false;
            }
            let heading = p.velocity.normalize_or_zero();
            let toward = (position - p.position).normalize_or_zero();
            heading.dot(toward) > dot_threshold
        })
        .map(|p| p.velocity)
}

/// Rolling window of the target's velocity, used for linear lead.
#[derive(Resource, Debug, Default, Clone)]
pub struct TargetHistory {
    pub target: Option<CombatantId>,
    samples: VecDeque<(f32, Vec2)>,
    clock: f32,
}

impl TargetHistory {
    /// Record this step's sample and drop anything older than `window`.
    pub fn record(&mut self, target: CombatantId, velocity: Vec2, dt: f32, window: f32) {
        if self.target != Some(target) {
            self.target = Some(target);
            self.samples.clear();
        }

        self.clock += dt;
        self.samples.push_back((self.clock, velocity));
        while let Some(&(t, _)) = self.samples.front() {
            if self.clock - t >= window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.target = None;
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean of the latest `count` samples, zero when empty.
    pub fn lead_velocity(&self, count: usize) -> Vec2 {
        let n = count.min(self.samples.len());
        if n == 0 {
            return Vec2::ZERO;
        }
        let sum: Vec2 = self.samples.iter().rev().take(n).map(|&(_, v)| v).sum();
        sum / n as f32
    }
}

// ============================================================================
// POLICIES
// ============================================================================

/// Run one decision for `brain`'s archetype and update its state.
pub fn decide<R: Rng + ?Sized>(brain: &mut Brain, ctx: &DecisionContext, rng: &mut R) -> Decision {
    let decision = match ctx.target {
        None => Decision::idle(AiState::Patrol),
        Some(target) => {
            if ctx.perceives {
                brain.last_known_target = Some(target.position);
            }
            match brain.archetype {
                Archetype::Rusher => decide_rusher(brain, ctx, &target),
                Archetype::Sniper => decide_sniper(brain, ctx, &target),
                Archetype::Dodger => decide_dodger(brain, ctx, &target, rng),
                Archetype::Flanker => decide_flanker(brain, ctx, &target),
            }
        }
    };

    if decision.state != brain.state {
        trace!(
            archetype = brain.archetype.name(),
            from = ?brain.state,
            to = ?decision.state,
            "ai state change"
        );
    }
    brain.state = decision.state;
    decision
}

pub fn decide_rusher(brain: &Brain, ctx: &DecisionContext, target: &TargetView) -> Decision {
    let dist = ctx.position.distance(target.position);

    let state = if dist < ctx.tuning.rusher_attack_range && ctx.perceives {
        AiState::Attack
    } else if ctx.perceives || dist < ctx.detection_range {
        AiState::Chase
    } else {
        AiState::Patrol
    };

    let mut decision = Decision::idle(state);
    if matches!(state, AiState::Chase | AiState::Attack) {
        if let Some(last_known) = brain.last_known_target {
            let dir = (last_known - ctx.position).normalize_or_zero();
            decision.movement = dir;
            decision.aim = aim_along(dir);
        }
    }
    decision.fire = state == AiState::Attack && ctx.perceives;
    decision
}

pub fn decide_sniper(brain: &Brain, ctx: &DecisionContext, target: &TargetView) -> Decision {
    let t = ctx.tuning;
    let dist = ctx.position.distance(target.position);
    let in_band = dist > t.sniper_preferred_range - t.sniper_range_band
        && dist < t.sniper_preferred_range + t.sniper_range_band;

    let state = if dist < t.sniper_retreat_range && ctx.perceives {
        AiState::Retreat
    } else if in_band && ctx.perceives {
        AiState::Attack
    } else if ctx.perceives {
        AiState::Chase
    } else {
        AiState::Patrol
    };

    let mut decision = Decision::idle(state);
    let Some(last_known) = brain.last_known_target else {
        return decision;
    };

    match state {
        AiState::Retreat => {
            let away = (ctx.position - last_known).normalize_or_zero();
            decision.movement = away;
            decision.aim = aim_along(-away);
        }
        AiState::Chase => {
            let toward = (last_known - ctx.position).normalize_or_zero();
            if dist > t.sniper_preferred_range {
                decision.movement = toward;
            }
            decision.aim = aim_along(toward);
        }
        AiState::Attack => {
            let predicted = target.position + target.lead_velocity * t.sniper_lead_time;
            decision.aim = Some(angle_to(ctx.position, predicted));
            decision.fire = ctx.perceives;
        }
        _ => {}
    }
    decision
}

pub fn decide_dodger<R: Rng + ?Sized>(
    brain: &mut Brain,
    ctx: &DecisionContext,
    target: &TargetView,
    rng: &mut R,
) -> Decision {
    let t = ctx.tuning;
    let dist = ctx.position.distance(target.position);

    let dodge_from = ctx.incoming.filter(|_| brain.dodge_cooldown <= 0.0);
    let state = if dodge_from.is_some() {
        AiState::Dodge
    } else if dist < t.dodger_attack_range && ctx.perceives {
        AiState::Attack
    } else if ctx.perceives {
        AiState::Chase
    } else {
        AiState::Patrol
    };

    let mut decision = Decision::idle(state);

    if let Some(velocity) = dodge_from {
        let mut side = Vec2::new(-velocity.y, velocity.x).normalize_or_zero();
        if rng.gen_bool(0.5) {
            side = -side;
        }
        decision.movement = side;
        decision.aim = aim_along(-velocity);

        if brain.dash_cooldown <= 0.0 {
            decision.movement = side * 2.0;
            brain.dash_cooldown = t.dodger_dash_cooldown;
        }
        brain.dodge_cooldown = t.dodge_cooldown;
        return decision;
    }

    if matches!(state, AiState::Chase | AiState::Attack) {
        if let Some(last_known) = brain.last_known_target {
            let toward = (last_known - ctx.position).normalize_or_zero();

            if brain.strafe_timer <= 0.0 {
                brain.strafe_sign = -brain.strafe_sign;
                brain.strafe_timer = rng.gen_range(t.strafe_interval_min..=t.strafe_interval_max);
            }

            let strafe = Vec2::new(-toward.y, toward.x) * brain.strafe_sign;
            let w = t.strafe_forward_weight;
            decision.movement = (toward * w + strafe * (1.0 - w)).normalize_or_zero();
            decision.aim = aim_along(toward);
        }
    }
    decision.fire = state == AiState::Attack && ctx.perceives;
    decision
}

pub fn decide_flanker(brain: &mut Brain, ctx: &DecisionContext, target: &TargetView) -> Decision {
    let t = ctx.tuning;
    let dist = ctx.position.distance(target.position);

    if brain.flank_timer <= 0.0 {
        if let Some(anchor) = brain.last_known_target {
            brain.flank_waypoint = Some(flank_waypoint(ctx, anchor, target.facing));
            brain.flank_timer = t.flank_refresh;
        }
    }

    let state = if brain.flank_waypoint.is_some() && dist < t.flank_engage_range {
        let good = brain
            .last_known_target
            .map_or(false, |anchor| is_flanking(ctx.position, anchor, target.facing, t));
        if good {
            AiState::Attack
        } else {
            AiState::Chase
        }
    } else if ctx.perceives {
        AiState::Chase
    } else {
        AiState::Patrol
    };

    let mut decision = Decision::idle(state);
    match state {
        AiState::Chase => {
            if let Some(waypoint) = brain.flank_waypoint {
                let dir = (waypoint - ctx.position).normalize_or_zero();
                decision.movement = dir;
                decision.aim = aim_along(dir);
            }
        }
        AiState::Attack => {
            if let Some(anchor) = brain.last_known_target {
                decision.aim = aim_along(anchor - ctx.position);
                decision.fire = ctx.perceives;
            }
        }
        _ => {}
    }
    decision
}

/// Point `flank_distance` to the left or right of the target's facing line,
/// preferring the side farther from us. Falls back to the other side, then
/// to our own position, when blocked.
pub fn flank_waypoint(ctx: &DecisionContext, anchor: Vec2, facing: f32) -> Vec2 {
    use std::f32::consts::FRAC_PI_2;
    let d = ctx.tuning.flank_distance;
    let left = anchor + vector_from_angle(facing + FRAC_PI_2) * d;
    let right = anchor + vector_from_angle(facing - FRAC_PI_2) * d;

    let (first, second) = if ctx.position.distance(left) > ctx.position.distance(right) {
        (left, right)
    } else {
        (right, left)
    };

    [first, second]
        .into_iter()
        .find(|p| is_position_valid(*p, ctx.radius, ctx.bounds, ctx.walls))
        .unwrap_or(ctx.position)
}

/// True when the angle between the target's facing and target-to-self lies
/// strictly inside the configured band.
pub fn is_flanking(position: Vec2, anchor: Vec2, facing: f32, tuning: &AiTuning) -> bool {
    let to_self = (position - anchor).normalize_or_zero();
    let dot = vector_from_angle(facing).dot(to_self).clamp(-1.0, 1.0);
    let angle = dot.acos();
    angle > tuning.flank_angle_min && angle < tuning.flank_angle_max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projectile::Projectile;
    use crate::weapon::ProjectileSpawn;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx<'a>(
        position: Vec2,
        target: Option<TargetView>,
        perceives: bool,
        tuning: &'a AiTuning,
        bounds: &'a Bounds,
        walls: &'a [Rect],
    ) -> DecisionContext<'a> {
        DecisionContext {
            position,
            radius: 12.0,
            detection_range: 500.0,
            tuning,
            target,
            perceives,
            incoming: None,
            walls,
            bounds,
        }
    }

    fn still_target(position: Vec2) -> TargetView {
        TargetView {
            position,
            facing: 0.0,
            lead_velocity: Vec2::ZERO,
        }
    }

    #[test]
    fn test_no_target_patrols_in_place() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for archetype in Archetype::ALL {
            let mut brain = Brain::new(archetype);
            let c = ctx(Vec2::new(100.0, 100.0), None, false, &tuning, &bounds, &[]);
            let decision = decide(&mut brain, &c, &mut rng);
            assert_eq!(decision.state, AiState::Patrol);
            assert_eq!(decision.movement, Vec2::ZERO);
            assert!(!decision.fire);
        }
    }

    #[test]
    fn test_rusher_attacks_in_range() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut brain = Brain::new(Archetype::Rusher);

        let target = still_target(Vec2::new(250.0, 100.0));
        let c = ctx(Vec2::new(100.0, 100.0), Some(target), true, &tuning, &bounds, &[]);
        let decision = decide(&mut brain, &c, &mut rng);

        assert_eq!(decision.state, AiState::Attack);
        assert!(decision.fire);
        assert!((decision.movement.x - 1.0).abs() < 0.001);
        assert!(decision.aim.map_or(false, |a| a.abs() < 0.001));
    }

    #[test]
    fn test_rusher_chases_last_known_when_blind() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut brain = Brain::new(Archetype::Rusher);
        brain.last_known_target = Some(Vec2::new(100.0, 300.0));

        // Target moved behind a wall; still inside detection range
        let target = still_target(Vec2::new(400.0, 100.0));
        let c = ctx(Vec2::new(100.0, 100.0), Some(target), false, &tuning, &bounds, &[]);
        let decision = decide(&mut brain, &c, &mut rng);

        assert_eq!(decision.state, AiState::Chase);
        assert!(!decision.fire);
        assert!((decision.movement.y - 1.0).abs() < 0.001);
        assert_eq!(brain.last_known_target, Some(Vec2::new(100.0, 300.0)));
    }

    #[test]
    fn test_sniper_retreats_when_close() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut brain = Brain::new(Archetype::Sniper);

        let target = still_target(Vec2::new(300.0, 100.0));
        let c = ctx(Vec2::new(100.0, 100.0), Some(target), true, &tuning, &bounds, &[]);
        let decision = decide(&mut brain, &c, &mut rng);

        assert_eq!(decision.state, AiState::Retreat);
        assert!((decision.movement.x + 1.0).abs() < 0.001);
        // Faces the target while backing off
        assert!(decision.aim.map_or(false, |a| a.abs() < 0.001));
    }

    #[test]
    fn test_sniper_leads_moving_target() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut brain = Brain::new(Archetype::Sniper);

        let shooter = Vec2::new(100.0, 300.0);
        let target = TargetView {
            position: Vec2::new(500.0, 300.0),
            facing: 0.0,
            lead_velocity: Vec2::new(0.0, 120.0),
        };
        let c = ctx(shooter, Some(target), true, &tuning, &bounds, &[]);
        let decision = decide(&mut brain, &c, &mut rng);

        assert_eq!(decision.state, AiState::Attack);
        assert!(decision.fire);
        assert_eq!(decision.movement, Vec2::ZERO);

        let aim = decision.aim.expect("attack always aims");
        let direct = angle_to(shooter, target.position);
        assert!((aim - direct).abs() > 0.01);
        assert!((aim - angle_to(shooter, Vec2::new(500.0, 360.0))).abs() < 0.001);
    }

    #[test]
    fn test_sniper_band_edges() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for (distance, expected) in [
            (349.0, AiState::Chase),
            (351.0, AiState::Attack),
            (449.0, AiState::Attack),
            (451.0, AiState::Chase),
        ] {
            let mut brain = Brain::new(Archetype::Sniper);
            let target = still_target(Vec2::new(100.0 + distance, 300.0));
            let c = ctx(Vec2::new(100.0, 300.0), Some(target), true, &tuning, &bounds, &[]);
            assert_eq!(decide(&mut brain, &c, &mut rng).state, expected, "distance {}", distance);
        }
    }

    #[test]
    fn test_dodger_dodge_preempts_attack() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut brain = Brain::new(Archetype::Dodger);
        brain.state = AiState::Attack;

        let target = still_target(Vec2::new(200.0, 100.0));
        let mut c = ctx(Vec2::new(100.0, 100.0), Some(target), true, &tuning, &bounds, &[]);
        c.incoming = Some(Vec2::new(-500.0, 0.0));

        let decision = decide(&mut brain, &c, &mut rng);
        assert_eq!(decision.state, AiState::Dodge);
        assert!(!decision.fire);
        // Perpendicular to the projectile, doubled by the dash
        assert!(decision.movement.x.abs() < 0.001);
        assert!((decision.movement.length() - 2.0).abs() < 0.001);
        assert!((brain.dash_cooldown - 2.0).abs() < 0.001);

        // Dash is on cooldown now: plain sidestep
        let decision = decide(&mut brain, &c, &mut rng);
        assert_eq!(decision.state, AiState::Dodge);
        assert!((decision.movement.length() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_dodger_respects_dodge_cooldown() {
        let tuning = AiTuning {
            dodge_cooldown: 1.0,
            ..Default::default()
        };
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut brain = Brain::new(Archetype::Dodger);

        let target = still_target(Vec2::new(200.0, 100.0));
        let mut c = ctx(Vec2::new(100.0, 100.0), Some(target), true, &tuning, &bounds, &[]);
        c.incoming = Some(Vec2::new(-500.0, 0.0));

        assert_eq!(decide(&mut brain, &c, &mut rng).state, AiState::Dodge);
        assert_eq!(decide(&mut brain, &c, &mut rng).state, AiState::Attack);
        brain.tick(1.0);
        assert_eq!(decide(&mut brain, &c, &mut rng).state, AiState::Dodge);
    }

    #[test]
    fn test_dodger_strafe_blend() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut brain = Brain::new(Archetype::Dodger);

        let target = still_target(Vec2::new(400.0, 100.0));
        let c = ctx(Vec2::new(100.0, 100.0), Some(target), true, &tuning, &bounds, &[]);
        let decision = decide(&mut brain, &c, &mut rng);

        assert_eq!(decision.state, AiState::Chase);
        assert!((decision.movement.length() - 1.0).abs() < 0.001);
        assert!(decision.movement.x > 0.9);
        assert!(decision.movement.y.abs() > 0.3);
        assert!(brain.strafe_timer >= 1.0 && brain.strafe_timer <= 3.0);
        assert!((brain.strafe_sign + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_flank_waypoint_picks_far_side_then_falls_back() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let anchor = Vec2::new(640.0, 360.0);

        // Facing +x: left of facing is +y, right is -y. We sit above (-y).
        let me = Vec2::new(640.0, 200.0);
        let c = ctx(me, None, true, &tuning, &bounds, &[]);
        let wp = flank_waypoint(&c, anchor, 0.0);
        assert!((wp.y - 610.0).abs() < 0.01);

        // Block the far side: take the near side
        let walls = vec![Rect::from_xywh(600.0, 590.0, 80.0, 40.0)];
        let c = ctx(me, None, true, &tuning, &bounds, &walls);
        let wp = flank_waypoint(&c, anchor, 0.0);
        assert!((wp.y - 110.0).abs() < 0.01);

        // Block both: stay put
        let walls = vec![
            Rect::from_xywh(600.0, 590.0, 80.0, 40.0),
            Rect::from_xywh(600.0, 90.0, 80.0, 40.0),
        ];
        let c = ctx(me, None, true, &tuning, &bounds, &walls);
        assert_eq!(flank_waypoint(&c, anchor, 0.0), me);
    }

    #[test]
    fn test_flanker_attacks_from_side() {
        let tuning = AiTuning::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut brain = Brain::new(Archetype::Flanker);

        // Target faces +x; we stand directly to its side
        let target = still_target(Vec2::new(640.0, 360.0));
        let c = ctx(Vec2::new(640.0, 160.0), Some(target), true, &tuning, &bounds, &[]);
        let decision = decide(&mut brain, &c, &mut rng);

        assert!(brain.flank_waypoint.is_some());
        assert_eq!(decision.state, AiState::Attack);
        assert!(decision.fire);
        assert_eq!(decision.movement, Vec2::ZERO);

        // Directly in front of the target is not a flank
        let mut brain = Brain::new(Archetype::Flanker);
        let c = ctx(Vec2::new(840.0, 360.0), Some(target), true, &tuning, &bounds, &[]);
        let decision = decide(&mut brain, &c, &mut rng);
        assert_eq!(decision.state, AiState::Chase);
        assert!(decision.movement.length() > 0.99);
    }

    #[test]
    fn test_target_history_window_and_mean() {
        let mut history = TargetHistory::default();
        let id = CombatantId(1);
        for i in 0..10 {
            history.record(id, Vec2::new(i as f32, 0.0), 0.5, 2.0);
        }
        // Only samples younger than 2 s survive
        assert_eq!(history.len(), 4);
        // Mean of the latest five clips to what is stored: 6,7,8,9
        assert!((history.lead_velocity(5).x - 7.5).abs() < 0.001);
        assert!((history.lead_velocity(2).x - 8.5).abs() < 0.001);

        history.record(CombatantId(2), Vec2::new(1.0, 1.0), 0.5, 2.0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_detect_incoming_filters() {
        let mut arena = ProjectileArena::new(16);
        let me = Vec2::new(100.0, 100.0);
        let spawn = |position: Vec2, velocity: Vec2, owner: u32| {
            Projectile::new(
                ProjectileSpawn {
                    position,
                    velocity,
                    damage: 5,
                    owner: CombatantId(owner),
                },
                4.0,
                3.0,
            )
        };

        // Own projectile, heading away, too far
        arena.spawn(spawn(Vec2::new(50.0, 100.0), Vec2::new(400.0, 0.0), 7));
        arena.spawn(spawn(Vec2::new(50.0, 100.0), Vec2::new(-400.0, 0.0), 1));
        arena.spawn(spawn(Vec2::new(-50.0, 100.0), Vec2::new(400.0, 0.0), 1));
        assert!(detect_incoming(me, CombatantId(7), &arena, 100.0, 0.7).is_none());

        arena.spawn(spawn(Vec2::new(40.0, 100.0), Vec2::new(400.0, 0.0), 1));
        let incoming = detect_incoming(me, CombatantId(7), &arena, 100.0, 0.7);
        assert_eq!(incoming, Some(Vec2::new(400.0, 0.0)));
    }
}
