//! Geometry helpers shared by the resolver, the AI layer and the systems.
//!
//! Everything here is a pure function of its inputs. Vectors are `glam::Vec2`;
//! walls are axis-aligned [`Rect`]s in world units with y pointing down.

use glam::Vec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// SHAPES
// ============================================================================

/// Axis-aligned rectangle. Used for walls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Build a rectangle from its top-left corner and size.
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Closest point on (or in) the rectangle to `point`.
    #[inline]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Point containment with half-open right/bottom edges.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }

    /// The four edges in clockwise order starting at the top.
    pub fn edges(&self) -> [(Vec2, Vec2); 4] {
        let tl = self.min;
        let tr = Vec2::new(self.max.x, self.min.y);
        let br = self.max;
        let bl = Vec2::new(self.min.x, self.max.y);
        [(tl, tr), (tr, br), (br, bl), (bl, tl)]
    }
}

/// World extent. The playable area is `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Clamp a circle's center so the whole circle stays inside.
    pub fn clamp_circle(&self, center: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            center.x.clamp(radius, (self.width - radius).max(radius)),
            center.y.clamp(radius, (self.height - radius).max(radius)),
        )
    }

    /// True if the circle lies fully inside the world.
    pub fn contains_circle(&self, center: Vec2, radius: f32) -> bool {
        center.x - radius >= 0.0
            && center.x + radius <= self.width
            && center.y - radius >= 0.0
            && center.y + radius <= self.height
    }

    /// True if the point lies outside the world grown by `margin`.
    pub fn is_outside(&self, point: Vec2, margin: f32) -> bool {
        point.x < -margin
            || point.x > self.width + margin
            || point.y < -margin
            || point.y > self.height + margin
    }
}

// ============================================================================
// VECTORS & ANGLES
// ============================================================================

/// Unit vector for an angle in radians.
#[inline]
pub fn vector_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of a vector in radians. Zero vectors map to 0.
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Angle from `from` toward `to`.
#[inline]
pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    angle_of(to - from)
}

/// Wrap an angle into `[-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

// ============================================================================
// INTERSECTION
// ============================================================================

/// Segment/segment intersection. Parallel segments never intersect.
pub fn segments_intersect(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let det = d1.perp_dot(d2);
    if det == 0.0 {
        return false;
    }

    let delta = p3 - p1;
    let t = delta.perp_dot(d2) / det;
    let u = delta.perp_dot(d1) / det;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// True if the segment `a`-`b` touches the rectangle.
pub fn segment_intersects_rect(a: Vec2, b: Vec2, rect: &Rect) -> bool {
    if rect.contains(a) || rect.contains(b) {
        return true;
    }
    rect.edges()
        .iter()
        .any(|&(e0, e1)| segments_intersect(a, b, e0, e1))
}

/// True iff the segment `a`-`b` crosses no wall.
pub fn line_of_sight(a: Vec2, b: Vec2, walls: &[Rect]) -> bool {
    !walls.iter().any(|wall| segment_intersects_rect(a, b, wall))
}

/// Aim point that intercepts a constant-velocity target with a projectile of
/// the given speed. `None` when no positive interception time exists.
pub fn predict_intercept(
    shooter: Vec2,
    target: Vec2,
    target_velocity: Vec2,
    projectile_speed: f32,
) -> Option<Vec2> {
    let rel = target - shooter;
    let a = target_velocity.length_squared() - projectile_speed * projectile_speed;
    let b = 2.0 * rel.dot(target_velocity);
    let c = rel.length_squared();

    if a.abs() < f32::EPSILON {
        // Equal speeds: the quadratic degenerates to b*t + c = 0.
        if b.abs() < f32::EPSILON {
            return None;
        }
        let t = -c / b;
        return (t > 0.0).then(|| target + target_velocity * t);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t1 = (-b + sqrt_d) / (2.0 * a);
    let t2 = (-b - sqrt_d) / (2.0 * a);
    let t = match (t1 > 0.0, t2 > 0.0) {
        (true, true) => t1.min(t2),
        (true, false) => t1,
        (false, true) => t2,
        (false, false) => return None,
    };

    Some(target + target_velocity * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_crossing_rect() {
        let wall = Rect::from_xywh(10.0, -5.0, 4.0, 10.0);
        assert!(segment_intersects_rect(Vec2::ZERO, Vec2::new(20.0, 0.0), &wall));
        assert!(!segment_intersects_rect(Vec2::ZERO, Vec2::new(5.0, 0.0), &wall));
        // Endpoint inside
        assert!(segment_intersects_rect(Vec2::ZERO, Vec2::new(12.0, 0.0), &wall));
    }

    #[test]
    fn test_line_of_sight_blocked_and_clear() {
        let walls = vec![Rect::from_xywh(40.0, 0.0, 20.0, 100.0)];
        assert!(!line_of_sight(Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0), &walls));
        assert!(line_of_sight(Vec2::new(0.0, 150.0), Vec2::new(100.0, 150.0), &walls));
        assert!(line_of_sight(Vec2::ZERO, Vec2::new(100.0, 0.0), &[]));
    }

    #[test]
    fn test_parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(10.0, 1.0),
        ));
    }

    #[test]
    fn test_predict_intercept_stationary_target() {
        let aim = predict_intercept(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::ZERO, 500.0)
            .expect("stationary target is always reachable");
        assert!((aim.x - 100.0).abs() < 0.001);
        assert!(aim.y.abs() < 0.001);
    }

    #[test]
    fn test_predict_intercept_leads_moving_target() {
        let aim = predict_intercept(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(0.0, 50.0), 500.0)
            .expect("slow target is reachable");
        assert!(aim.y > 0.0);
    }

    #[test]
    fn test_predict_intercept_no_solution() {
        // Target runs away faster than the projectile.
        let aim = predict_intercept(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(900.0, 0.0), 500.0);
        assert!(aim.is_none());
    }

    #[test]
    fn test_wrap_angle() {
        use std::f32::consts::PI;
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 0.001 || (wrap_angle(3.0 * PI) + PI).abs() < 0.001);
        assert!((wrap_angle(0.5) - 0.5).abs() < 0.001);
        assert!((wrap_angle(-0.5 - 2.0 * PI) + 0.5).abs() < 0.001);
    }

    #[test]
    fn test_bounds_clamp_circle() {
        let bounds = Bounds::new(100.0, 50.0);
        let p = bounds.clamp_circle(Vec2::new(-10.0, 60.0), 5.0);
        assert!((p.x - 5.0).abs() < 0.001);
        assert!((p.y - 45.0).abs() < 0.001);
    }
}
