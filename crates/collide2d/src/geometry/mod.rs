//! Geometry module - Shape primitives and casts
//!
//! Value types describing convex shapes in their local frame, the bounding
//! box type used by the broad phase, and exact ray and shape casts.

pub mod aabb;
pub mod cast;
pub mod error;
pub mod hull;
pub mod proxy;
pub mod raycast;
pub mod shapes;

pub use aabb::AABB;
pub use cast::{CastOutput, RayCastInput, ShapeCastInput, ShapeCastPairInput};
pub use error::GeometryError;
pub use hull::{compute_hull, validate_hull, Hull};
pub use proxy::ShapeProxy;
pub use shapes::{Capsule, ChainSegment, Circle, Polygon, Segment, Shape, ShapeType};
