//! Collision module - Narrow phase
//!
//! Contact manifolds for every supported shape pair, the GJK distance and
//! shape cast machinery they share, and pair filtering.

pub mod capsule;
pub mod chain;
pub mod circle;
pub mod dispatch;
pub mod distance;
pub mod filter;
pub mod manifold;
pub mod polygon;

pub use capsule::{collide_capsules, collide_segment_and_capsule};
pub use chain::{collide_chain_segment_and_capsule, collide_chain_segment_and_circle, collide_chain_segment_and_polygon};
pub use circle::{collide_capsule_and_circle, collide_circles, collide_polygon_and_circle, collide_segment_and_circle};
pub use dispatch::{collide_shapes, has_collider};
pub use distance::{
    segment_distance, shape_cast_pair, shape_distance, DistanceInput, DistanceOutput, SegmentDistanceResult,
    SimplexCache,
};
pub use filter::Filter;
pub use manifold::{make_id, Manifold, ManifoldPoint};
pub use polygon::{collide_polygon_and_capsule, collide_polygons, collide_segment_and_polygon};
