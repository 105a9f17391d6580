//! Manifolds for shape pairs where B is a circle
//!
//! Each routine works in A's local frame: find the closest point on A to the
//! circle center, then emit a single contact at the midpoint between the two
//! surfaces when the gap is within the speculative distance.

use super::manifold::Manifold;
use crate::foundation::constants::SPECULATIVE_DISTANCE;
use crate::foundation::math::{self, Transform, Vec2};
use crate::geometry::shapes::{Capsule, Circle, Polygon, Segment};

// Single contact between a rounded point on A and the circle center, in A's frame
fn point_contact(
    p_a: Vec2,
    radius_a: f32,
    p_b: Vec2,
    radius_b: f32,
    xf_a: &Transform,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let (distance, normal) = math::get_length_and_normalize(p_b - p_a);

    let separation = distance - radius_a - radius_b;
    if separation > SPECULATIVE_DISTANCE {
        return manifold;
    }

    let c_a = p_a + normal * radius_a;
    let c_b = p_b - normal * radius_b;
    let contact = math::lerp(c_a, c_b, 0.5);

    manifold.normal = normal;
    manifold.push_local(contact, separation, 0);
    manifold.into_world(xf_a, Vec2::zeros(), xf_b)
}

/// Compute the contact manifold between two circles
pub fn collide_circles(circle_a: &Circle, xf_a: &Transform, circle_b: &Circle, xf_b: &Transform) -> Manifold {
    let xf = xf_a.inv_mul_transform(xf_b);

    let point_a = circle_a.center;
    let point_b = xf.transform_point(circle_b.center);

    point_contact(point_a, circle_a.radius, point_b, circle_b.radius, xf_a, xf_b)
}

/// Compute the contact manifold between a capsule and a circle
pub fn collide_capsule_and_circle(
    capsule_a: &Capsule,
    xf_a: &Transform,
    circle_b: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let xf = xf_a.inv_mul_transform(xf_b);

    // Circle position in the frame of the capsule
    let p_b = xf.transform_point(circle_b.center);

    let p1 = capsule_a.center1;
    let p2 = capsule_a.center2;
    let e = p2 - p1;

    // dot(p - pA, e) = 0 with pA = p1 + s1 * e
    let s1 = (p_b - p1).dot(&e);
    let s2 = (p2 - p_b).dot(&e);
    let p_a = if s1 < 0.0 {
        p1
    } else if s2 < 0.0 {
        p2
    } else {
        p1 + e * (s1 / e.dot(&e))
    };

    point_contact(p_a, capsule_a.radius, p_b, circle_b.radius, xf_a, xf_b)
}

/// Compute the contact manifold between a segment and a circle
pub fn collide_segment_and_circle(
    segment_a: &Segment,
    xf_a: &Transform,
    circle_b: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let capsule_a = Capsule::new(segment_a.point1, segment_a.point2, 0.0);
    collide_capsule_and_circle(&capsule_a, xf_a, circle_b, xf_b)
}

/// Compute the contact manifold between a polygon and a circle
pub fn collide_polygon_and_circle(
    polygon_a: &Polygon,
    xf_a: &Transform,
    circle_b: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let xf = xf_a.inv_mul_transform(xf_b);

    // Circle position in the frame of the polygon
    let c = xf.transform_point(circle_b.center);
    let radius_a = polygon_a.radius;
    let radius_b = circle_b.radius;
    let radius = radius_a + radius_b;

    // Find the min separating edge
    let mut normal_index = 0;
    let mut separation = -f32::MAX;
    let count = polygon_a.count;
    let vertices = &polygon_a.vertices;
    let normals = &polygon_a.normals;

    for i in 0..count {
        let s = normals[i].dot(&(c - vertices[i]));
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    if separation - radius > SPECULATIVE_DISTANCE {
        return manifold;
    }

    // Vertices of the reference edge
    let v1 = vertices[normal_index];
    let v2 = vertices[if normal_index + 1 < count { normal_index + 1 } else { 0 }];

    // Barycentric coordinates
    let u1 = (c - v1).dot(&(v2 - v1));
    let u2 = (c - v2).dot(&(v1 - v2));

    let vertex = if u1 < 0.0 && separation > f32::EPSILON {
        Some(v1)
    } else if u2 < 0.0 && separation > f32::EPSILON {
        Some(v2)
    } else {
        None
    };

    if let Some(v) = vertex {
        // Circle center is closest to a vertex and safely outside the polygon
        let normal = math::normalize_or_zero(c - v);
        let separation = (c - v).dot(&normal);
        if separation - radius > SPECULATIVE_DISTANCE {
            return manifold;
        }

        let c_a = v + normal * radius_a;
        let c_b = c - normal * radius_b;
        manifold.normal = normal;
        manifold.push_local(math::lerp(c_a, c_b, 0.5), (c_b - c_a).dot(&normal), 0);
    } else {
        // Circle center is between v1 and v2. Center may be inside the polygon
        let normal = normals[normal_index];

        // Projection of the circle center onto the reference edge
        let c_a = c + normal * (radius_a - (c - v1).dot(&normal));

        // Deepest point on the circle with respect to the reference edge
        let c_b = c - normal * radius_b;

        manifold.normal = normal;
        manifold.push_local(math::lerp(c_a, c_b, 0.5), separation - radius, 0);
    }

    manifold.into_world(xf_a, Vec2::zeros(), xf_b)
}
