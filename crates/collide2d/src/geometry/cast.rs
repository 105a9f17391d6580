//! Ray and shape cast data contracts
//!
//! These plain value types are shared by the tree traversals and the exact
//! shape-level casts.

use serde::{Deserialize, Serialize};

use super::proxy::ShapeProxy;
use crate::foundation::math::{self, Transform, Vec2};

/// Low level ray cast input data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayCastInput {
    /// Start point of the ray cast
    pub origin: Vec2,
    /// Translation of the ray cast
    pub translation: Vec2,
    /// The maximum fraction of the translation to consider, typically 1
    pub max_fraction: f32,
}

impl RayCastInput {
    /// Create a ray cast input
    pub fn new(origin: Vec2, translation: Vec2, max_fraction: f32) -> Self {
        Self {
            origin,
            translation,
            max_fraction,
        }
    }

    /// Finite origin and translation, and a fraction in `[0, f32::MAX)`
    pub fn is_valid(&self) -> bool {
        math::is_valid_vec2(self.origin)
            && math::is_valid_vec2(self.translation)
            && self.max_fraction.is_finite()
            && (0.0..f32::MAX).contains(&self.max_fraction)
    }
}

/// Low level shape cast input in a common frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCastInput {
    /// The swept point cloud and radius
    pub proxy: ShapeProxy,
    /// Translation of the shape cast
    pub translation: Vec2,
    /// The maximum fraction of the translation to consider, typically 1
    pub max_fraction: f32,
}

impl ShapeCastInput {
    /// Create a shape cast input
    pub fn new(proxy: ShapeProxy, translation: Vec2, max_fraction: f32) -> Self {
        Self {
            proxy,
            translation,
            max_fraction,
        }
    }
}

/// Result of a ray cast or shape cast
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CastOutput {
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Surface hit point
    pub point: Vec2,
    /// Fraction of the input translation at collision
    pub fraction: f32,
    /// Number of iterations used
    pub iterations: u32,
    /// Did the cast hit?
    pub hit: bool,
}

/// Input for a pairwise shape cast where both shapes may move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCastPairInput {
    /// Proxy for shape A, in the local frame of A
    pub proxy_a: ShapeProxy,
    /// Proxy for shape B, in the local frame of B
    pub proxy_b: ShapeProxy,
    /// World transform of shape A
    pub transform_a: Transform,
    /// World transform of shape B
    pub transform_b: Transform,
    /// Translation of shape B
    pub translation_b: Vec2,
    /// The fraction of the translation to consider, typically 1
    pub max_fraction: f32,
}
