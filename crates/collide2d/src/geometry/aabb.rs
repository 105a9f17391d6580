//! Axis-aligned bounding box

use serde::{Deserialize, Serialize};

use super::cast::{CastOutput, RayCastInput};
use crate::foundation::math::{self, vec2, Vec2};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub lower_bound: Vec2,
    /// Maximum corner of the bounding box
    pub upper_bound: Vec2,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(lower_bound: Vec2, upper_bound: Vec2) -> Self {
        Self {
            lower_bound,
            upper_bound,
        }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec2, extents: Vec2) -> Self {
        Self {
            lower_bound: center - extents,
            upper_bound: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec2 {
        (self.lower_bound + self.upper_bound) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec2 {
        (self.upper_bound - self.lower_bound) * 0.5
    }

    /// Perimeter, the surface area heuristic used by the dynamic tree
    pub fn perimeter(&self) -> f32 {
        let wx = self.upper_bound.x - self.lower_bound.x;
        let wy = self.upper_bound.y - self.lower_bound.y;
        2.0 * (wx + wy)
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            lower_bound: math::min(self.lower_bound, other.lower_bound),
            upper_bound: math::max(self.upper_bound, other.upper_bound),
        }
    }

    /// Grow this box to contain `other`. Returns true if the box changed.
    pub fn enlarge(&mut self, other: &Self) -> bool {
        let mut changed = false;
        if other.lower_bound.x < self.lower_bound.x {
            self.lower_bound.x = other.lower_bound.x;
            changed = true;
        }
        if other.lower_bound.y < self.lower_bound.y {
            self.lower_bound.y = other.lower_bound.y;
            changed = true;
        }
        if self.upper_bound.x < other.upper_bound.x {
            self.upper_bound.x = other.upper_bound.x;
            changed = true;
        }
        if self.upper_bound.y < other.upper_bound.y {
            self.upper_bound.y = other.upper_bound.y;
            changed = true;
        }
        changed
    }

    /// Box grown by `margin` on every side
    pub fn fattened(&self, margin: f32) -> Self {
        let r = vec2(margin, margin);
        Self {
            lower_bound: self.lower_bound - r,
            upper_bound: self.upper_bound + r,
        }
    }

    /// Does this box fully contain `other`? Touching faces count as contained.
    pub fn contains(&self, other: &Self) -> bool {
        self.lower_bound.x <= other.lower_bound.x
            && self.lower_bound.y <= other.lower_bound.y
            && other.upper_bound.x <= self.upper_bound.x
            && other.upper_bound.y <= self.upper_bound.y
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.lower_bound.x
            && point.x <= self.upper_bound.x
            && point.y >= self.lower_bound.y
            && point.y <= self.upper_bound.y
    }

    /// Check if this AABB overlaps another AABB. Touching faces overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        !(other.lower_bound.x > self.upper_bound.x
            || other.lower_bound.y > self.upper_bound.y
            || self.lower_bound.x > other.upper_bound.x
            || self.lower_bound.y > other.upper_bound.y)
    }

    /// Finite bounds with lower <= upper
    pub fn is_valid(&self) -> bool {
        let d = self.upper_bound - self.lower_bound;
        d.x >= 0.0
            && d.y >= 0.0
            && math::is_valid_vec2(self.lower_bound)
            && math::is_valid_vec2(self.upper_bound)
    }

    /// Test ray intersection with this AABB using the slab method.
    ///
    /// A ray starting inside the box reports no hit.
    pub fn ray_cast(&self, input: &RayCastInput) -> CastOutput {
        let mut output = CastOutput::default();

        let mut tmin = -f32::MAX;
        let mut tmax = f32::MAX;

        let p = input.origin;
        let d = input.translation;
        let abs_d = math::abs(d);

        let mut normal = Vec2::zeros();

        for axis in 0..2 {
            let lower = self.lower_bound[axis];
            let upper = self.upper_bound[axis];

            if abs_d[axis] < f32::EPSILON {
                // Parallel
                if p[axis] < lower || upper < p[axis] {
                    return output;
                }
                continue;
            }

            let inv_d = 1.0 / d[axis];
            let mut t1 = (lower - p[axis]) * inv_d;
            let mut t2 = (upper - p[axis]) * inv_d;

            // Sign of the normal vector
            let mut s = -1.0;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                s = 1.0;
            }

            if t1 > tmin {
                normal = Vec2::zeros();
                normal[axis] = s;
                tmin = t1;
            }

            tmax = tmax.min(t2);
            if tmin > tmax {
                return output;
            }
        }

        // Does the ray start inside the box?
        // Does the ray intersect beyond the max fraction?
        if tmin < 0.0 || input.max_fraction < tmin {
            return output;
        }

        output.fraction = tmin;
        output.normal = normal;
        output.point = p + d * tmin;
        output.hit = true;
        output
    }
}
