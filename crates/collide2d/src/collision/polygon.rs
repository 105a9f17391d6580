//! Polygon manifolds
//!
//! Polygon pairs use the separating axis test on both polygons' normals to
//! pick a reference face, then either clip the incident edge against it or,
//! when the polygons are apart and only corners are nearest, emit a single
//! vertex-vertex point. Capsules and segments reuse this path as rounded two
//! vertex polygons.

use super::distance::segment_distance;
use super::manifold::{make_id, Manifold};
use crate::foundation::constants::{LINEAR_SLOP, SPECULATIVE_DISTANCE};
use crate::foundation::math::{self, Transform};
use crate::geometry::shapes::{Capsule, Polygon, Segment};

// Find the max separation between poly1 and poly2 using edge normals from poly1
fn find_max_separation(poly1: &Polygon, poly2: &Polygon) -> (usize, f32) {
    let mut best_index = 0;
    let mut max_separation = -f32::MAX;

    for i in 0..poly1.count {
        let n = poly1.normals[i];
        let v1 = poly1.vertices[i];

        // Deepest point of poly2 for normal i
        let si = poly2
            .vertices()
            .iter()
            .map(|v2| n.dot(&(v2 - v1)))
            .fold(f32::MAX, f32::min);

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }

    (best_index, max_separation)
}

// Edge most anti-parallel to the reference normal
fn find_incident_edge(poly: &Polygon, reference_normal: math::Vec2) -> usize {
    let mut edge = 0;
    let mut min_dot = f32::MAX;
    for (i, n) in poly.normals().iter().enumerate() {
        let dot = reference_normal.dot(n);
        if dot < min_dot {
            min_dot = dot;
            edge = i;
        }
    }
    edge
}

#[inline]
fn next_index(i: usize, count: usize) -> usize {
    if i + 1 < count {
        i + 1
    } else {
        0
    }
}

// Clip the incident edge against the reference edge side planes.
//
// Both polygons are in the same frame. When `flip` is set polygon B owns the
// reference face and the resulting normal is negated so it still points from A
// to B.
fn clip_polygons(poly_a: &Polygon, poly_b: &Polygon, edge_a: usize, edge_b: usize, flip: bool) -> Manifold {
    let mut manifold = Manifold::default();

    // Reference polygon 1, incident polygon 2
    let (poly1, i11, poly2, i21) = if flip {
        (poly_b, edge_b, poly_a, edge_a)
    } else {
        (poly_a, edge_a, poly_b, edge_b)
    };
    let i12 = next_index(i11, poly1.count);
    let i22 = next_index(i21, poly2.count);

    let normal = poly1.normals[i11];

    // Reference edge vertices
    let v11 = poly1.vertices[i11];
    let v12 = poly1.vertices[i12];

    // Incident edge vertices
    let v21 = poly2.vertices[i21];
    let v22 = poly2.vertices[i22];

    let tangent = math::cross_sv(1.0, normal);

    let lower1 = 0.0;
    let upper1 = (v12 - v11).dot(&tangent);

    // Incident edge points opposite of tangent due to CCW winding
    let upper2 = (v21 - v11).dot(&tangent);
    let lower2 = (v22 - v11).dot(&tangent);

    let v_lower = if lower2 < lower1 && upper2 - lower2 > f32::EPSILON {
        math::lerp(v22, v21, (lower1 - lower2) / (upper2 - lower2))
    } else {
        v22
    };

    let v_upper = if upper2 > upper1 && upper2 - lower2 > f32::EPSILON {
        math::lerp(v22, v21, (upper1 - lower2) / (upper2 - lower2))
    } else {
        v21
    };

    let separation_lower = (v_lower - v11).dot(&normal);
    let separation_upper = (v_upper - v11).dot(&normal);

    // Put contact points at the midpoint, accounting for polygon radius
    let v_lower = v_lower + normal * (0.5 * (poly1.radius - poly2.radius - separation_lower));
    let v_upper = v_upper + normal * (0.5 * (poly1.radius - poly2.radius - separation_upper));

    let radius = poly1.radius + poly2.radius;

    let lower = (v_lower, separation_lower - radius);
    let upper = (v_upper, separation_upper - radius);

    let ordered = if flip {
        manifold.normal = -normal;
        [(upper, make_id(i21, i12)), (lower, make_id(i22, i11))]
    } else {
        manifold.normal = normal;
        [(lower, make_id(i11, i22)), (upper, make_id(i12, i21))]
    };

    for ((anchor, separation), id) in ordered {
        if separation <= SPECULATIVE_DISTANCE {
            manifold.push_local(anchor, separation, id);
        }
    }

    manifold
}

/// Compute the contact manifold between two polygons
pub fn collide_polygons(polygon_a: &Polygon, xf_a: &Transform, polygon_b: &Polygon, xf_b: &Transform) -> Manifold {
    let origin = polygon_a.vertices[0];

    // Shift polygon A so its first vertex is at the origin
    let sf_a = Transform::new(xf_a.p + xf_a.q.rotate(origin), xf_a.q);
    let xf = sf_a.inv_mul_transform(xf_b);

    let mut local_a = *polygon_a;
    for v in &mut local_a.vertices[..local_a.count] {
        *v -= origin;
    }

    // Put polygon B in A's frame to reduce round-off error
    let mut local_b = *polygon_b;
    for i in 0..local_b.count {
        local_b.vertices[i] = xf.transform_point(polygon_b.vertices[i]);
        local_b.normals[i] = xf.q.rotate(polygon_b.normals[i]);
    }

    let (mut edge_a, separation_a) = find_max_separation(&local_a, &local_b);
    let (mut edge_b, separation_b) = find_max_separation(&local_b, &local_a);

    let radius = local_a.radius + local_b.radius;

    if separation_a > SPECULATIVE_DISTANCE + radius || separation_b > SPECULATIVE_DISTANCE + radius {
        return Manifold::default();
    }

    // Find the incident edge
    let flip = separation_b > 0.1 * LINEAR_SLOP + separation_a;
    if flip {
        edge_a = find_incident_edge(&local_a, local_b.normals[edge_b]);
    } else {
        edge_b = find_incident_edge(&local_b, local_a.normals[edge_a]);
    }

    let separation = if flip { separation_b } else { separation_a };

    // Slop keeps vertex-vertex normals safe to normalize
    let manifold = if separation > 0.1 * LINEAR_SLOP {
        let i11 = edge_a;
        let i12 = next_index(edge_a, local_a.count);
        let i21 = edge_b;
        let i22 = next_index(edge_b, local_b.count);

        let v11 = local_a.vertices[i11];
        let v12 = local_a.vertices[i12];
        let v21 = local_b.vertices[i21];
        let v22 = local_b.vertices[i22];

        let result = segment_distance(v11, v12, v21, v22);

        let corner = match (result.fraction1, result.fraction2) {
            (f1, f2) if f1 == 0.0 && f2 == 0.0 => Some((v11, v21, i11, i21)),
            (f1, f2) if f1 == 0.0 && f2 == 1.0 => Some((v11, v22, i11, i22)),
            (f1, f2) if f1 == 1.0 && f2 == 0.0 => Some((v12, v21, i12, i21)),
            (f1, f2) if f1 == 1.0 && f2 == 1.0 => Some((v12, v22, i12, i22)),
            _ => None,
        };

        match corner {
            Some((v1, v2, i1, i2)) => {
                // Polygons are disjoint with a vertex-vertex contact
                let distance = result.distance_squared.sqrt();
                if distance > SPECULATIVE_DISTANCE + radius {
                    return Manifold::default();
                }

                let normal = math::normalize_or_zero(v2 - v1);
                let c1 = v1 + normal * local_a.radius;
                let c2 = v2 - normal * local_b.radius;

                let mut m = Manifold {
                    normal,
                    ..Manifold::default()
                };
                m.push_local(math::lerp(c1, c2, 0.5), distance - radius, make_id(i1, i2));
                m
            }
            // Edge region
            None => clip_polygons(&local_a, &local_b, edge_a, edge_b, flip),
        }
    } else {
        // Polygons overlap
        clip_polygons(&local_a, &local_b, edge_a, edge_b, flip)
    };

    manifold.into_world(xf_a, origin, xf_b)
}

/// Compute the contact manifold between a polygon and a capsule
pub fn collide_polygon_and_capsule(
    polygon_a: &Polygon,
    xf_a: &Transform,
    capsule_b: &Capsule,
    xf_b: &Transform,
) -> Manifold {
    let polygon_b = Polygon::make_capsule(capsule_b.center1, capsule_b.center2, capsule_b.radius);
    collide_polygons(polygon_a, xf_a, &polygon_b, xf_b)
}

/// Compute the contact manifold between a segment and a polygon
pub fn collide_segment_and_polygon(
    segment_a: &Segment,
    xf_a: &Transform,
    polygon_b: &Polygon,
    xf_b: &Transform,
) -> Manifold {
    let polygon_a = Polygon::make_capsule(segment_a.point1, segment_a.point2, 0.0);
    collide_polygons(&polygon_a, xf_a, polygon_b, xf_b)
}
