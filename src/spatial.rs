//! Spatial partitioning for broad-phase collision and perception queries.
//!
//! Provides O(1) cell lookup and O(k) candidate queries where k is the number
//! of combatants in the touched cells, rather than O(n) for brute force.
//! The grid is rebuilt from scratch every step; nothing in it outlives the
//! step that built it.

use crate::components::{Body, CombatantId, Health, Position, Role};
use bevy_ecs::prelude::*;
use glam::Vec2;
use std::collections::HashMap;

/// Grid-based spatial partitioning structure.
///
/// Divides the world into square cells. A combatant is inserted into every
/// cell its bounding square overlaps, so queries only need to look at the
/// cells their own bounding square touches.
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    /// Cell size in world units.
    pub cell_size: f32,
    /// Map from cell coordinates to the entries overlapping that cell.
    cells: HashMap<(i32, i32), Vec<SpatialEntry>>,
    /// Number of distinct combatants inserted since the last clear.
    count: usize,
}

/// Entry in a spatial cell. A copy of the combatant's collision data at
/// insertion time plus a non-owning entity handle.
#[derive(Debug, Clone, Copy)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub id: CombatantId,
    pub role: Role,
    pub position: Vec2,
    pub radius: f32,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(64.0)
    }
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            count: 0,
        }
    }

    /// Convert world coordinates to cell coordinates.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Inclusive cell range covering the square of half-extent `radius`.
    #[inline]
    fn cell_range(&self, center: Vec2, radius: f32) -> ((i32, i32), (i32, i32)) {
        let lo = self.world_to_cell(center.x - radius, center.y - radius);
        let hi = self.world_to_cell(center.x + radius, center.y + radius);
        (lo, hi)
    }

    /// Clear all entries (call at start of each rebuild).
    pub fn clear(&mut self) {
        self.cells.clear();
        self.count = 0;
    }

    /// Insert an entry into every cell its bounding square overlaps.
    pub fn insert(&mut self, entry: SpatialEntry) {
        let ((x0, y0), (x1, y1)) = self.cell_range(entry.position, entry.radius);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(entry);
            }
        }
        self.count += 1;
    }

    /// Broad-phase query: every entry in any cell the query circle's bounding
    /// box touches, de-duplicated and ordered by combatant id.
    ///
    /// Callers still need an exact distance test.
    pub fn query(&self, center: Vec2, radius: f32) -> Vec<SpatialEntry> {
        let ((x0, y0), (x1, y1)) = self.cell_range(center, radius);
        let mut results = Vec::new();

        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(entries) = self.cells.get(&(cx, cy)) {
                    results.extend_from_slice(entries);
                }
            }
        }

        results.sort_by_key(|e| e.id);
        results.dedup_by_key(|e| e.id);
        results
    }

    /// Get count of entries in a cell.
    pub fn cell_count(&self, cell: (i32, i32)) -> usize {
        self.cells.get(&cell).map(|v| v.len()).unwrap_or(0)
    }

    /// Get total number of distinct combatants in the grid.
    pub fn total_count(&self) -> usize {
        self.count
    }
}

fn rebuild_grid(
    grid: &mut SpatialGrid,
    query: &Query<(Entity, &CombatantId, &Role, &Position, &Body, &Health)>,
) {
    grid.clear();

    for (entity, id, role, pos, body, health) in query.iter() {
        if !health.alive {
            continue;
        }

        grid.insert(SpatialEntry {
            entity,
            id: *id,
            role: *role,
            position: pos.0,
            radius: body.radius,
        });
    }
}

/// System that rebuilds the spatial grid before the AI pass.
pub fn spatial_grid_update_system(
    mut grid: ResMut<SpatialGrid>,
    query: Query<(Entity, &CombatantId, &Role, &Position, &Body, &Health)>,
) {
    rebuild_grid(&mut grid, &query);
}

/// System that rebuilds the spatial grid at post-movement positions, ahead of
/// the collision passes.
pub fn spatial_grid_refresh_system(
    mut grid: ResMut<SpatialGrid>,
    query: Query<(Entity, &CombatantId, &Role, &Position, &Body, &Health)>,
) {
    rebuild_grid(&mut grid, &query);
}
