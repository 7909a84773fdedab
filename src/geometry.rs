//! Oriented-rectangle overlap testing (separating axis theorem).

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A rectangle rotated about its center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientedRect {
    pub center: DVec2,
    /// Half width (local X) and half height (local Y).
    pub half_extents: DVec2,
    /// Rotation in degrees, clockwise in screen space.
    pub angle: f64,
}

impl OrientedRect {
    pub fn new(center: DVec2, half_extents: DVec2, angle: f64) -> Self {
        Self {
            center,
            half_extents,
            angle,
        }
    }

    /// An unrotated rectangle.
    pub fn axis_aligned(center: DVec2, half_extents: DVec2) -> Self {
        Self::new(center, half_extents, 0.0)
    }

    /// Local X and Y unit axes in world space.
    pub fn axes(&self) -> [DVec2; 2] {
        let (s, c) = self.angle.to_radians().sin_cos();
        [DVec2::new(c, s), DVec2::new(-s, c)]
    }

    pub fn corners(&self) -> [DVec2; 4] {
        let [ax, ay] = self.axes();
        let x = ax * self.half_extents.x;
        let y = ay * self.half_extents.y;
        [
            self.center + x + y,
            self.center - x + y,
            self.center - x - y,
            self.center + x - y,
        ]
    }

    fn project(&self, axis: DVec2) -> (f64, f64) {
        self.corners()
            .iter()
            .map(|p| p.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Returns `true` when the two rectangles overlap. Touching counts as overlapping.
///
/// Tests the four face normals (two per rectangle); any axis with disjoint
/// projection intervals separates the shapes.
pub fn check_oriented_overlap(a: &OrientedRect, b: &OrientedRect) -> bool {
    let [a0, a1] = a.axes();
    let [b0, b1] = b.axes();
    [a0, a1, b0, b1].into_iter().all(|axis| {
        let (a_min, a_max) = a.project(axis);
        let (b_min, b_max) = b.project(axis);
        !(a_max < b_min || b_max < a_min)
    })
}

/// Clamps `p` so it lies within `[margin, size - margin]` on both axes.
pub fn clamp_to_world(p: DVec2, size: f64, margin: DVec2) -> DVec2 {
    p.clamp(margin, DVec2::splat(size) - margin)
}

/// `true` when `p` is inside the unrotated box centered at `center`.
pub fn point_in_box(p: DVec2, center: DVec2, half_extents: DVec2) -> bool {
    let d = (p - center).abs();
    d.x <= half_extents.x && d.y <= half_extents.y
}
