//! One-way notifications for observers outside the simulation (effects,
//! audio, score keeping). Nothing inside the simulation reads them back.

use crate::components::{CombatantId, Role};
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A combatant was removed by the sweep. Emitted exactly once per combatant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathEvent {
    pub victim: CombatantId,
    /// Whoever dealt the killing damage, if known.
    pub killer: Option<CombatantId>,
    pub role: Role,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitTarget {
    Wall,
    /// `damage` is what was actually applied; 0 when the target was
    /// invulnerable.
    Combatant { id: CombatantId, damage: i32 },
}

/// A projectile stopped against something.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    pub position: Vec2,
    pub owner: CombatantId,
    pub target: HitTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Death(DeathEvent),
    Hit(HitEvent),
}

/// Events accumulated since the last drain, in emission order.
#[derive(Resource, Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn deaths(&self) -> impl Iterator<Item = &DeathEvent> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Death(death) => Some(death),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_in_order() {
        let mut log = EventLog::default();
        log.push(SimEvent::Hit(HitEvent {
            position: Vec2::ZERO,
            owner: CombatantId(1),
            target: HitTarget::Wall,
        }));
        log.push(SimEvent::Death(DeathEvent {
            victim: CombatantId(2),
            killer: Some(CombatantId(1)),
            role: Role::Enemy,
            position: Vec2::new(5.0, 5.0),
        }));

        assert_eq!(log.deaths().count(), 1);
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], SimEvent::Hit(_)));
        assert!(log.is_empty());
    }
}
