//! # collide2d
//!
//! Collision detection for 2D rigid bodies.
//!
//! ## Features
//!
//! - **Broad Phase**: A dynamic AABB tree with fattened leaves, category
//!   filtering, incremental and full rebuilds, and ray and shape casts
//! - **Narrow Phase**: Speculative contact manifolds for circles, capsules,
//!   segments, convex polygons and one-sided chain segments
//! - **Distance Queries**: GJK closest points with warm starting and a
//!   conservative advancement shape cast
//! - **Configuration**: Tree settings loadable from TOML or RON
//!
//! ## Quick Start
//!
//! ```rust
//! use collide2d::prelude::*;
//!
//! let mut tree = DynamicTree::new();
//!
//! let ground = Shape::Polygon(Polygon::make_box(10.0, 0.5));
//! let ball = Shape::Circle(Circle::new(Vec2::zeros(), 0.5));
//! let ground_xf = Transform::IDENTITY;
//! let ball_xf = Transform::from_position(vec2(0.0, 0.99));
//!
//! let ground_id = tree.create_proxy(ground.compute_aabb(&ground_xf), 1, 0);
//! tree.create_proxy(ball.compute_aabb(&ball_xf), 1, 1);
//!
//! let mut candidates = Vec::new();
//! tree.query(&ball.compute_aabb(&ball_xf), u64::MAX, |id, _| {
//!     candidates.push(id);
//!     true
//! });
//! assert!(candidates.contains(&ground_id));
//!
//! let mut cache = SimplexCache::default();
//! let manifold = collide_shapes(&ground, &ground_xf, &ball, &ball_xf, &mut cache);
//! assert_eq!(manifold.point_count, 1);
//! ```

pub mod broad;
pub mod collision;
pub mod config;
pub mod foundation;
pub mod geometry;

#[cfg(test)]
mod tests;

/// Common imports
pub mod prelude {
    pub use crate::{
        broad::{DynamicTree, ProxyId, TreeStats},
        collision::{collide_shapes, DistanceInput, DistanceOutput, Filter, Manifold, ManifoldPoint, SimplexCache},
        config::{Config, ConfigError, TreeConfig},
        foundation::{
            constants::{LINEAR_SLOP, SPECULATIVE_DISTANCE},
            math::{vec2, Rot, Transform, Vec2},
        },
        geometry::{
            CastOutput, Capsule, ChainSegment, Circle, GeometryError, Hull, Polygon, RayCastInput, Segment, Shape,
            ShapeCastInput, ShapeProxy, ShapeType, AABB,
        },
    };
}
