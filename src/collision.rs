//! Narrow-phase collision tests and penetration resolution.
//!
//! Every function here is pure: the same inputs always give the same output
//! and nothing is cached between calls. Broad-phase culling lives in
//! [`crate::spatial`].

use crate::geometry::{Bounds, Rect};
use glam::Vec2;
use rand::Rng;
use tracing::warn;

pub use crate::geometry::line_of_sight;

/// True iff the distance from `center` to the closest point of `rect` is at
/// most `radius`.
#[inline]
pub fn circle_intersects_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    center.distance_squared(rect.closest_point(center)) <= radius * radius
}

/// True if the circle overlaps any wall.
pub fn circle_intersects_walls(center: Vec2, radius: f32, walls: &[Rect]) -> bool {
    walls.iter().any(|wall| circle_intersects_rect(center, radius, wall))
}

/// Strict circle overlap. Touching circles do not overlap.
#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let sum = radius_a + radius_b;
    a.distance_squared(b) < sum * sum
}

/// Push a circle out of every wall it overlaps.
///
/// Walls are visited in list order. Overlap and push direction are measured
/// against the input position and the pushes are summed, so the result is
/// stable but depends on wall order when several walls overlap at once.
///
/// A center lying inside a wall is pushed away from the wall's centroid. A
/// center exactly on the centroid has no defined direction and is left alone.
pub fn resolve_circle_vs_walls(position: Vec2, radius: f32, walls: &[Rect], epsilon: f32) -> Vec2 {
    let mut resolved = position;

    for wall in walls {
        if !circle_intersects_rect(position, radius, wall) {
            continue;
        }

        let mut away = position - wall.closest_point(position);
        if away == Vec2::ZERO {
            away = position - wall.center();
        }

        let dist = away.length();
        if dist > 0.0 {
            let push = radius - dist + epsilon;
            resolved += away / dist * push;
        }
    }

    resolved
}

/// Split the overlap of two circles evenly along the line between centers.
///
/// Separated or touching circles come back unchanged, and so do coincident
/// centers (there is no separation axis to push along).
pub fn resolve_circle_vs_circle(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> (Vec2, Vec2) {
    let delta = a - b;
    let dist = delta.length();
    let min_dist = radius_a + radius_b;

    if dist >= min_dist || dist <= 0.0 {
        return (a, b);
    }

    let normal = delta / dist;
    let half = (min_dist - dist) * 0.5;
    (a + normal * half, b - normal * half)
}

/// Inside the world and clear of every wall.
pub fn is_position_valid(position: Vec2, radius: f32, bounds: &Bounds, walls: &[Rect]) -> bool {
    bounds.contains_circle(position, radius) && !circle_intersects_walls(position, radius, walls)
}

/// Find somewhere to put a circle near `preferred`.
///
/// Tries the preferred point, then an expanding ring around it, then uniform
/// random points, then the world center. Always returns a position; the
/// final fallback is not checked and may itself be blocked.
pub fn find_valid_spawn<R: Rng + ?Sized>(
    preferred: Vec2,
    radius: f32,
    bounds: &Bounds,
    walls: &[Rect],
    max_attempts: u32,
    rng: &mut R,
) -> Vec2 {
    if is_position_valid(preferred, radius, bounds, walls) {
        return preferred;
    }

    let attempts = max_attempts.max(1);
    for i in 0..attempts {
        let angle = i as f32 / attempts as f32 * std::f32::consts::TAU;
        let dist = radius * 2.0 + i as f32 * radius;
        let candidate = preferred + Vec2::new(angle.cos(), angle.sin()) * dist;
        if is_position_valid(candidate, radius, bounds, walls) {
            return candidate;
        }
    }

    let max_x = (bounds.width - radius).max(radius);
    let max_y = (bounds.height - radius).max(radius);
    for _ in 0..attempts {
        let candidate = Vec2::new(rng.gen_range(radius..=max_x), rng.gen_range(radius..=max_y));
        if is_position_valid(candidate, radius, bounds, walls) {
            return candidate;
        }
    }

    let center = bounds.center();
    warn!(
        preferred_x = preferred.x,
        preferred_y = preferred.y,
        "no valid spawn found, using world center"
    );
    center
}
