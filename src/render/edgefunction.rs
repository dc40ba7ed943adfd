//! Edge-function triangle setup shared by every rasterizer.
//!
//! # Edge Function
//!
//! For an edge from point A to point B, the edge function at point P is:
//!
//! ```text
//! E(P) = (P.x - A.x) * (B.y - A.y) - (P.y - A.y) * (B.x - A.x)
//! ```
//!
//! the 2D cross product of (B - A) and (P - A). Evaluated for the three edges and
//! divided by the signed area it yields the barycentric weights of P. A pixel is inside
//! when all three weights are >= 0; either winding order is accepted.
//!
//! # Fill Rule
//!
//! Pixels exactly on an edge (weight == 0) belong to both triangles sharing that edge.
//! With every edge oriented so the interior lies on its positive side, an edge with
//! direction (dx, dy) is *owned* when `dy > 0 || (dy == 0 && dx < 0)` in y-down buffer
//! space, i.e. it is a left or top edge. Of two triangles sharing an edge exactly one
//! owns it. [`Coverage::owned`] reports whether every zero weight of a pixel lies on an
//! owned edge.
//!
//! Pixels are sampled at integer coordinates.

use std::ops::RangeInclusive;

use crate::math::Vec3;

/// Barycentric weights of a covered pixel and its fill-rule ownership.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    pub weights: [f32; 3],
    pub owned: bool,
}

/// A triangle in buffer space prepared for per-pixel coverage queries.
#[derive(Debug, Clone)]
pub struct EdgeSetup {
    points: [Vec3; 3],
    /// Sign of the signed area, folded into every edge value so inside is positive.
    orientation: f32,
    inv_area: f32,
    /// Ownership of the edge opposite each vertex.
    owned: [bool; 3],
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

/// Signed parallelogram area of (b - a) and (p - a).
#[inline]
pub fn edge_function(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// Top-left rule for an edge direction, interior on the positive side.
#[inline]
pub fn is_owned_edge(dx: f32, dy: f32) -> bool {
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

impl EdgeSetup {
    /// Prepares a triangle whose points are already in buffer space.
    ///
    /// Returns `None` for degenerate (zero area) triangles and for triangles whose
    /// bounding box misses the `width` x `height` viewport.
    pub fn new(points: [Vec3; 3], width: u32, height: u32) -> Option<Self> {
        let [v0, v1, v2] = points;

        let area = edge_function(v0, v1, v2);
        if !(area.abs() >= f32::EPSILON) {
            return None; // Degenerate, or NaN from a bad projection
        }
        let orientation = area.signum();

        // Clip the bounding box to the viewport.
        let min_x = (v0.x.min(v1.x).min(v2.x).floor() as i32).max(0);
        let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i32).min(width as i32 - 1);
        let min_y = (v0.y.min(v1.y).min(v2.y).floor() as i32).max(0);
        let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i32).min(height as i32 - 1);
        if min_x > max_x || min_y > max_y {
            return None;
        }

        let edge_owned = |a: Vec3, b: Vec3| {
            is_owned_edge((b.x - a.x) * orientation, (b.y - a.y) * orientation)
        };

        Some(Self {
            points,
            orientation,
            inv_area: 1.0 / area.abs(),
            owned: [edge_owned(v1, v2), edge_owned(v2, v0), edge_owned(v0, v1)],
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    pub fn points(&self) -> [Vec3; 3] {
        self.points
    }

    /// Bounding-box columns.
    pub fn columns(&self) -> RangeInclusive<i32> {
        self.min_x..=self.max_x
    }

    /// Bounding-box rows restricted to `first..=last`; empty when they do not meet.
    pub fn rows_within(&self, first: i32, last: i32) -> RangeInclusive<i32> {
        self.min_y.max(first)..=self.max_y.min(last)
    }

    /// Weights and ownership of pixel (x, y), or None if it lies outside.
    #[inline]
    pub fn coverage(&self, x: i32, y: i32) -> Option<Coverage> {
        let [v0, v1, v2] = self.points;
        let p = Vec3::new(x as f32, y as f32, 0.0);

        let e = [
            edge_function(v1, v2, p) * self.orientation,
            edge_function(v2, v0, p) * self.orientation,
            edge_function(v0, v1, p) * self.orientation,
        ];
        if !(e[0] >= 0.0 && e[1] >= 0.0 && e[2] >= 0.0) {
            return None;
        }

        let owned = (0..3).all(|i| e[i] > 0.0 || self.owned[i]);
        Some(Coverage {
            weights: e.map(|value| value * self.inv_area),
            owned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Buffer-space image of NDC (-1,-1), (1,-1), (0,1) on a 4x4 grid.
    fn scenario() -> EdgeSetup {
        EdgeSetup::new(
            [Vec3::new(0.0, 3.0, 1.0), Vec3::new(3.0, 3.0, 1.0), Vec3::new(1.5, 0.0, 1.0)],
            4,
            4,
        )
        .unwrap()
    }

    #[test]
    fn weights_sum_to_one() {
        let setup = scenario();
        let c = setup.coverage(1, 2).unwrap();
        assert_relative_eq!(c.weights.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert!(c.owned);
    }

    #[test]
    fn winding_order_does_not_matter() {
        let [a, b, c] = scenario().points();
        let reversed = EdgeSetup::new([c, b, a], 4, 4).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(
                    scenario().coverage(x, y).map(|c| c.owned),
                    reversed.coverage(x, y).map(|c| c.owned)
                );
            }
        }
    }

    #[test]
    fn shared_edge_is_owned_by_exactly_one_triangle() {
        // A square split along its diagonal; every diagonal pixel belongs to one half.
        let p = [Vec3::new(0.0, 0.0, 1.0), Vec3::new(6.0, 0.0, 1.0), Vec3::new(6.0, 6.0, 1.0), Vec3::new(0.0, 6.0, 1.0)];
        let upper = EdgeSetup::new([p[0], p[1], p[2]], 8, 8).unwrap();
        let lower = EdgeSetup::new([p[0], p[2], p[3]], 8, 8).unwrap();
        for i in 1..6 {
            let a = upper.coverage(i, i).unwrap().owned;
            let b = lower.coverage(i, i).unwrap().owned;
            assert!(a ^ b, "diagonal pixel {i} owned by both or neither");
        }
    }

    #[test]
    fn degenerate_triangle_is_rejected() {
        let line = [Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 1.0)];
        assert!(EdgeSetup::new(line, 4, 4).is_none());
    }

    #[test]
    fn offscreen_triangle_is_rejected() {
        let far_left = [Vec3::new(-9.0, 0.0, 1.0), Vec3::new(-5.0, 0.0, 1.0), Vec3::new(-7.0, 3.0, 1.0)];
        assert!(EdgeSetup::new(far_left, 4, 4).is_none());
    }
}
