//! Shape pair dispatch
//!
//! Routes a pair of [`Shape`]s to the routine registered for their kinds. Pairs
//! that arrive in the reverse order are collided the other way round and the
//! result is flipped so the normal still points from A to B.

use super::capsule::{collide_capsules, collide_segment_and_capsule};
use super::chain::{
    collide_chain_segment_and_capsule, collide_chain_segment_and_circle, collide_chain_segment_and_polygon,
};
use super::circle::{
    collide_capsule_and_circle, collide_circles, collide_polygon_and_circle, collide_segment_and_circle,
};
use super::distance::SimplexCache;
use super::manifold::Manifold;
use super::polygon::{collide_polygon_and_capsule, collide_polygons, collide_segment_and_polygon};
use crate::foundation::math::Transform;
use crate::geometry::shapes::{Shape, ShapeType};

/// Whether a routine exists for the pair in either order
pub fn has_collider(a: ShapeType, b: ShapeType) -> bool {
    is_registered(a, b) || is_registered(b, a)
}

fn is_registered(a: ShapeType, b: ShapeType) -> bool {
    use ShapeType::{Capsule, ChainSegment, Circle, Polygon, Segment};
    matches!(
        (a, b),
        (Circle, Circle)
            | (Capsule, Circle | Capsule)
            | (Polygon, Circle | Capsule | Polygon)
            | (Segment, Circle | Capsule | Polygon)
            | (ChainSegment, Circle | Capsule | Polygon)
    )
}

// Collide in the given order, or None when no routine is registered for it
fn collide_ordered(
    a: &Shape,
    xf_a: &Transform,
    b: &Shape,
    xf_b: &Transform,
    cache: &mut SimplexCache,
) -> Option<Manifold> {
    let manifold = match (a, b) {
        (Shape::Circle(a), Shape::Circle(b)) => collide_circles(a, xf_a, b, xf_b),
        (Shape::Capsule(a), Shape::Circle(b)) => collide_capsule_and_circle(a, xf_a, b, xf_b),
        (Shape::Capsule(a), Shape::Capsule(b)) => collide_capsules(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Circle(b)) => collide_polygon_and_circle(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Capsule(b)) => collide_polygon_and_capsule(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),
        (Shape::Segment(a), Shape::Circle(b)) => collide_segment_and_circle(a, xf_a, b, xf_b),
        (Shape::Segment(a), Shape::Capsule(b)) => collide_segment_and_capsule(a, xf_a, b, xf_b),
        (Shape::Segment(a), Shape::Polygon(b)) => collide_segment_and_polygon(a, xf_a, b, xf_b),
        (Shape::ChainSegment(a), Shape::Circle(b)) => collide_chain_segment_and_circle(a, xf_a, b, xf_b),
        (Shape::ChainSegment(a), Shape::Capsule(b)) => collide_chain_segment_and_capsule(a, xf_a, b, xf_b, cache),
        (Shape::ChainSegment(a), Shape::Polygon(b)) => collide_chain_segment_and_polygon(a, xf_a, b, xf_b, cache),
        _ => return None,
    };
    Some(manifold)
}

/// Compute the manifold for any pair of shapes.
///
/// The normal points from `a` to `b` regardless of which routine handled the
/// pair. Segment and chain pairs have no area and never touch each other, so
/// they produce an empty manifold. `cache` is only read by chain segment
/// routines and should persist per pair.
pub fn collide_shapes(
    a: &Shape,
    xf_a: &Transform,
    b: &Shape,
    xf_b: &Transform,
    cache: &mut SimplexCache,
) -> Manifold {
    if let Some(manifold) = collide_ordered(a, xf_a, b, xf_b, cache) {
        return manifold;
    }

    collide_ordered(b, xf_b, a, xf_a, cache).map_or_else(Manifold::default, |m| m.flipped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{vec2, Vec2};
    use crate::geometry::shapes::{Capsule, ChainSegment, Circle, Polygon, Segment};
    use approx::assert_relative_eq;

    #[test]
    fn test_registered_pairs() {
        assert!(has_collider(ShapeType::Circle, ShapeType::Polygon));
        assert!(has_collider(ShapeType::Polygon, ShapeType::Segment));
        assert!(!has_collider(ShapeType::Segment, ShapeType::Segment));
        assert!(!has_collider(ShapeType::ChainSegment, ShapeType::Segment));
        assert!(!has_collider(ShapeType::ChainSegment, ShapeType::ChainSegment));
    }

    #[test]
    fn test_reverse_order_is_flipped() {
        let circle = Shape::Circle(Circle::new(Vec2::zeros(), 0.5));
        let b = Shape::Polygon(Polygon::make_box(1.0, 1.0));
        let xf_circle = Transform::from_position(vec2(0.0, 1.4));
        let mut cache = SimplexCache::default();

        let forward = collide_shapes(&b, &Transform::IDENTITY, &circle, &xf_circle, &mut cache);
        let reverse = collide_shapes(&circle, &xf_circle, &b, &Transform::IDENTITY, &mut cache);

        assert_eq!(forward.point_count, 1);
        assert_eq!(reverse.point_count, 1);
        assert_relative_eq!(reverse.normal, vec2(0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(reverse.points[0].point, forward.points[0].point, epsilon = 1e-6);
        assert_relative_eq!(reverse.points[0].anchor_a, forward.points[0].anchor_b, epsilon = 1e-6);
        assert_relative_eq!(reverse.points[0].separation, forward.points[0].separation);
    }

    #[test]
    fn test_segments_never_touch() {
        let s = Shape::Segment(Segment::new(vec2(-1.0, 0.0), vec2(1.0, 0.0)));
        let chain = ChainSegment::open_chain(&[vec2(1.0, 0.0), vec2(-1.0, 0.0)], 0);
        let c = Shape::ChainSegment(chain[0]);
        let mut cache = SimplexCache::default();

        assert!(collide_shapes(&s, &Transform::IDENTITY, &s, &Transform::IDENTITY, &mut cache).is_empty());
        assert!(collide_shapes(&c, &Transform::IDENTITY, &s, &Transform::IDENTITY, &mut cache).is_empty());
    }

    #[test]
    fn test_capsule_against_chain_in_both_orders() {
        let chain = ChainSegment::open_chain(&[vec2(4.0, 0.0), vec2(-4.0, 0.0)], 0);
        let c = Shape::ChainSegment(chain[0]);
        let capsule = Shape::Capsule(Capsule::new(vec2(-0.5, 0.0), vec2(0.5, 0.0), 0.25));
        let xf = Transform::from_position(vec2(0.0, 0.24));

        let mut cache = SimplexCache::default();
        let forward = collide_shapes(&c, &Transform::IDENTITY, &capsule, &xf, &mut cache);
        let mut cache = SimplexCache::default();
        let reverse = collide_shapes(&capsule, &xf, &c, &Transform::IDENTITY, &mut cache);

        assert_eq!(forward.point_count, 2);
        assert_eq!(reverse.point_count, 2);
        assert_relative_eq!(reverse.normal, -forward.normal, epsilon = 1e-6);
    }
}
