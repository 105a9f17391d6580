//! Math utilities and types
//!
//! Provides the 2D vector, rotation, and rigid transform types shared by the
//! broad phase and the narrow phase. Vectors are `nalgebra` column vectors;
//! rotations are stored as a unit complex number (cosine/sine pair) so that
//! rotating and inverse rotating never touch trigonometric functions.

use serde::{Deserialize, Serialize};

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// Shorthand constructor for [`Vec2`]
#[inline]
pub fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

/// Rotation stored as cosine and sine of the angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rot {
    /// Cosine component
    pub c: f32,
    /// Sine component
    pub s: f32,
}

impl Default for Rot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rot {
    /// The identity rotation
    pub const IDENTITY: Self = Self { c: 1.0, s: 0.0 };

    /// Create a rotation from an angle in radians
    pub fn from_angle(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self { c, s }
    }

    /// Get the angle in radians in the range [-pi, pi]
    pub fn angle(self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Rotate a vector
    #[inline]
    pub fn rotate(self, v: Vec2) -> Vec2 {
        vec2(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse rotate a vector
    #[inline]
    pub fn inv_rotate(self, v: Vec2) -> Vec2 {
        vec2(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Multiply two rotations: `self * other`
    #[inline]
    pub fn mul_rot(self, other: Self) -> Self {
        Self {
            c: self.c * other.c - self.s * other.s,
            s: self.s * other.c + self.c * other.s,
        }
    }

    /// Transpose multiply two rotations: `inverse(self) * other`
    #[inline]
    pub fn inv_mul_rot(self, other: Self) -> Self {
        Self {
            c: self.c * other.c + self.s * other.s,
            s: self.c * other.s - self.s * other.c,
        }
    }

    /// Check that the rotation is finite and normalized
    pub fn is_valid(self) -> bool {
        if !self.c.is_finite() || !self.s.is_finite() {
            return false;
        }
        (1.0 - (self.c * self.c + self.s * self.s)).abs() < 6.0 * f32::EPSILON
    }
}

/// Rigid transform: rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation
    pub p: Vec2,
    /// Rotation
    pub q: Rot,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        p: Vec2::new(0.0, 0.0),
        q: Rot::IDENTITY,
    };

    /// Create a transform with position and rotation
    pub fn new(p: Vec2, q: Rot) -> Self {
        Self { p, q }
    }

    /// Create a transform with position and angle
    pub fn from_position_angle(p: Vec2, radians: f32) -> Self {
        Self {
            p,
            q: Rot::from_angle(radians),
        }
    }

    /// Create a transform with only position
    pub fn from_position(p: Vec2) -> Self {
        Self { p, q: Rot::IDENTITY }
    }

    /// Transform a local point into the parent frame
    #[inline]
    pub fn transform_point(&self, v: Vec2) -> Vec2 {
        self.q.rotate(v) + self.p
    }

    /// Transform a parent-frame point into the local frame
    #[inline]
    pub fn inv_transform_point(&self, v: Vec2) -> Vec2 {
        self.q.inv_rotate(v - self.p)
    }

    /// Combine this transform with another: `self * other`
    pub fn mul_transform(&self, other: &Self) -> Self {
        Self {
            q: self.q.mul_rot(other.q),
            p: self.q.rotate(other.p) + self.p,
        }
    }

    /// Express `other` in the frame of `self`: `inverse(self) * other`
    pub fn inv_mul_transform(&self, other: &Self) -> Self {
        Self {
            q: self.q.inv_mul_rot(other.q),
            p: self.q.inv_rotate(other.p - self.p),
        }
    }
}

/// 2D cross product, the z component of the 3D cross product
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a vector and a scalar: `v x s`
#[inline]
pub fn cross_vs(v: Vec2, s: f32) -> Vec2 {
    vec2(s * v.y, -s * v.x)
}

/// Cross product of a scalar and a vector: `s x v`
#[inline]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    vec2(-s * v.y, s * v.x)
}

/// Counter-clockwise perpendicular
#[inline]
pub fn left_perp(v: Vec2) -> Vec2 {
    vec2(-v.y, v.x)
}

/// Clockwise perpendicular
#[inline]
pub fn right_perp(v: Vec2) -> Vec2 {
    vec2(v.y, -v.x)
}

/// Linear interpolation between two points
#[inline]
pub fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a * (1.0 - t) + b * t
}

/// Component-wise absolute value
#[inline]
pub fn abs(v: Vec2) -> Vec2 {
    vec2(v.x.abs(), v.y.abs())
}

/// Component-wise minimum
#[inline]
pub fn min(a: Vec2, b: Vec2) -> Vec2 {
    vec2(a.x.min(b.x), a.y.min(b.y))
}

/// Component-wise maximum
#[inline]
pub fn max(a: Vec2, b: Vec2) -> Vec2 {
    vec2(a.x.max(b.x), a.y.max(b.y))
}

/// Normalize a vector and return its original length.
///
/// Vectors shorter than `f32::EPSILON` yield a zero direction and zero length.
#[inline]
pub fn get_length_and_normalize(v: Vec2) -> (f32, Vec2) {
    let length = v.norm();
    if length < f32::EPSILON {
        return (0.0, Vec2::zeros());
    }
    (length, v / length)
}

/// Normalize a vector, returning zero for vectors that are too short
#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    get_length_and_normalize(v).1
}

/// Check that both components are finite
#[inline]
pub fn is_valid_vec2(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_rotation_round_trip() {
        let q = Rot::from_angle(0.7);
        let v = vec2(1.5, -2.0);

        let back = q.inv_rotate(q.rotate(v));
        assert_relative_eq!(back, v, epsilon = EPSILON);
        assert_relative_eq!(q.angle(), 0.7, epsilon = EPSILON);
    }

    #[test]
    fn test_inv_mul_matches_inverse_composition() {
        let a = Transform::from_position_angle(vec2(1.0, 2.0), 0.3);
        let b = Transform::from_position_angle(vec2(-4.0, 0.5), -1.1);
        let local = vec2(0.25, 0.75);

        let relative = a.inv_mul_transform(&b);
        let expected = a.inv_transform_point(b.transform_point(local));
        assert_relative_eq!(relative.transform_point(local), expected, epsilon = 1e-5);
        assert_relative_eq!(a.mul_transform(&relative).transform_point(local), b.transform_point(local), epsilon = 1e-5);
    }

    #[test]
    fn test_perpendiculars() {
        let v = vec2(1.0, 0.0);
        assert_eq!(left_perp(v), vec2(0.0, 1.0));
        assert_eq!(right_perp(v), vec2(0.0, -1.0));
        assert_eq!(cross_sv(1.0, v), left_perp(v));
        assert_eq!(cross_vs(v, 1.0), right_perp(v));
        assert_relative_eq!(cross(v, vec2(0.0, 2.0)), 2.0);
    }

    #[test]
    fn test_normalize_tiny_vector_is_zero() {
        let (length, n) = get_length_and_normalize(vec2(1e-9, 0.0));
        assert_eq!(length, 0.0);
        assert_eq!(n, Vec2::zeros());
    }
}
