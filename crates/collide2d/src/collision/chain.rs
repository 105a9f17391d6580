//! Chain segment manifolds
//!
//! Chain segments are one-sided and carry ghost vertices from their
//! neighbors. Contact normals are classified against the Gauss map of the
//! neighboring edges: normals that a convex neighbor would own are skipped,
//! normals near a concave vertex snap to the segment normal. This keeps a
//! shape sliding along a chain from catching on the interior vertices.
//!
//! The polygon routine threads a [`SimplexCache`] so the closest features
//! found on the previous step warm start the next one.

use super::distance::{shape_distance, DistanceInput, SimplexCache};
use super::manifold::{make_id, Manifold};
use crate::foundation::constants::{LINEAR_SLOP, MAX_POLYGON_VERTICES, SPECULATIVE_DISTANCE};
use crate::foundation::math::{self, Transform, Vec2};
use crate::geometry::proxy::ShapeProxy;
use crate::geometry::shapes::{Capsule, ChainSegment, Circle, Polygon};

/// Compute the contact manifold between a chain segment and a circle
pub fn collide_chain_segment_and_circle(
    segment_a: &ChainSegment,
    xf_a: &Transform,
    circle_b: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let xf = xf_a.inv_mul_transform(xf_b);

    // Circle in the frame of the segment
    let p_b = xf.transform_point(circle_b.center);

    let p1 = segment_a.segment.point1;
    let p2 = segment_a.segment.point2;
    let e = p2 - p1;

    // Normal points to the right
    let offset = math::right_perp(e).dot(&(p_b - p1));
    if offset < 0.0 {
        // Collision is one-sided
        return manifold;
    }

    // Barycentric coordinates
    let u = e.dot(&(p2 - p_b));
    let v = e.dot(&(p_b - p1));

    let p_a = if v <= 0.0 {
        // Behind point1. The previous segment owns its Voronoi region.
        let prev_edge = p1 - segment_a.ghost1;
        let u_prev = prev_edge.dot(&(p_b - p1));
        if u_prev <= 0.0 {
            return manifold;
        }
        p1
    } else if u <= 0.0 {
        // Ahead of point2. The next segment owns its Voronoi region.
        let next_edge = segment_a.ghost2 - p2;
        let v_next = next_edge.dot(&(p_b - p2));
        if v_next > 0.0 {
            return manifold;
        }
        p2
    } else {
        let ee = e.dot(&e);
        if ee > 0.0 {
            (p1 * u + p2 * v) / ee
        } else {
            p1
        }
    };

    let (distance, normal) = math::get_length_and_normalize(p_b - p_a);

    let radius = circle_b.radius;
    let separation = distance - radius;
    if separation > SPECULATIVE_DISTANCE {
        return manifold;
    }

    let c_a = p_a;
    let c_b = p_b - normal * radius;
    manifold.normal = normal;
    manifold.push_local(math::lerp(c_a, c_b, 0.5), separation, 0);
    manifold.into_world(xf_a, Vec2::zeros(), xf_b)
}

/// Compute the contact manifold between a chain segment and a capsule
pub fn collide_chain_segment_and_capsule(
    segment_a: &ChainSegment,
    xf_a: &Transform,
    capsule_b: &Capsule,
    xf_b: &Transform,
    cache: &mut SimplexCache,
) -> Manifold {
    let polygon_b = Polygon::make_capsule(capsule_b.center1, capsule_b.center2, capsule_b.radius);
    collide_chain_segment_and_polygon(segment_a, xf_a, &polygon_b, xf_b, cache)
}

// Clip segment b against segment a along `normal`, producing two points in a's frame
fn clip_segments(
    a1: Vec2,
    a2: Vec2,
    b1: Vec2,
    b2: Vec2,
    normal: Vec2,
    ra: f32,
    rb: f32,
    id1: u16,
    id2: u16,
) -> Manifold {
    let mut manifold = Manifold::default();

    let tangent = math::left_perp(normal);

    // Barycentric coordinates of each point relative to a1 along the tangent
    let lower1 = 0.0;
    let upper1 = (a2 - a1).dot(&tangent);

    // Incident edge points opposite of tangent due to CCW winding
    let upper2 = (b1 - a1).dot(&tangent);
    let lower2 = (b2 - a1).dot(&tangent);

    // Do the segments overlap?
    if upper2 < lower1 || upper1 < lower2 {
        return manifold;
    }

    let v_lower = if lower2 < lower1 && upper2 - lower2 > f32::EPSILON {
        math::lerp(b2, b1, (lower1 - lower2) / (upper2 - lower2))
    } else {
        b2
    };

    let v_upper = if upper2 > upper1 && upper2 - lower2 > f32::EPSILON {
        math::lerp(b2, b1, (upper1 - lower2) / (upper2 - lower2))
    } else {
        b1
    };

    let separation_lower = (v_lower - a1).dot(&normal);
    let separation_upper = (v_upper - a1).dot(&normal);

    // Put contact points at the midpoint, accounting for radius
    let v_lower = v_lower + normal * (0.5 * (ra - rb - separation_lower));
    let v_upper = v_upper + normal * (0.5 * (ra - rb - separation_upper));

    let radius = ra + rb;

    manifold.normal = normal;
    for (anchor, separation, id) in [
        (v_lower, separation_lower - radius, id1),
        (v_upper, separation_upper - radius, id2),
    ] {
        if separation <= SPECULATIVE_DISTANCE {
            manifold.push_local(anchor, separation, id);
        }
    }

    manifold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NormalType {
    // Non-smooth relative to a convex vertex, skip it
    Skip,
    // Smooth relative to a convex vertex, use it
    Admit,
    // In the region of a concave vertex, snap to the segment normal
    Snap,
}

#[derive(Debug, Clone, Copy)]
struct SmoothParams {
    edge1: Vec2,
    normal0: Vec2,
    normal2: Vec2,
    convex1: bool,
    convex2: bool,
}

impl SmoothParams {
    fn new(segment: &ChainSegment) -> Self {
        const CONVEX_TOL: f32 = 0.01;

        let p1 = segment.segment.point1;
        let p2 = segment.segment.point2;
        let edge1 = math::normalize_or_zero(p2 - p1);

        let edge0 = math::normalize_or_zero(p1 - segment.ghost1);
        let edge2 = math::normalize_or_zero(segment.ghost2 - p2);

        Self {
            edge1,
            normal0: math::right_perp(edge0),
            normal2: math::right_perp(edge2),
            convex1: math::cross(edge0, edge1) >= CONVEX_TOL,
            convex2: math::cross(edge1, edge2) >= CONVEX_TOL,
        }
    }

    // Evaluate the Gauss map
    fn classify(&self, normal: Vec2) -> NormalType {
        const SIN_TOL: f32 = 0.01;

        if normal.dot(&self.edge1) <= 0.0 {
            // Normal points towards the segment tail
            if !self.convex1 {
                NormalType::Snap
            } else if math::cross(normal, self.normal0) > SIN_TOL {
                NormalType::Skip
            } else {
                NormalType::Admit
            }
        } else if !self.convex2 {
            // Normal points towards the segment head
            NormalType::Snap
        } else if math::cross(self.normal2, normal) > SIN_TOL {
            NormalType::Skip
        } else {
            NormalType::Admit
        }
    }
}

#[inline]
fn next_index(i: usize, count: usize) -> usize {
    if i + 1 < count {
        i + 1
    } else {
        0
    }
}

/// Compute the contact manifold between a chain segment and a rounded polygon.
///
/// `cache` must persist between steps for the same pair and be reset when the
/// pair changes.
pub fn collide_chain_segment_and_polygon(
    segment_a: &ChainSegment,
    xf_a: &Transform,
    polygon_b: &Polygon,
    xf_b: &Transform,
    cache: &mut SimplexCache,
) -> Manifold {
    let empty = Manifold::default();

    let xf = xf_a.inv_mul_transform(xf_b);

    let centroid_b = xf.transform_point(polygon_b.centroid);
    let radius_b = polygon_b.radius;

    let p1 = segment_a.segment.point1;
    let p2 = segment_a.segment.point2;

    let smooth = SmoothParams::new(segment_a);

    // Normal points to the right
    let normal1 = math::right_perp(smooth.edge1);
    let behind1 = normal1.dot(&(centroid_b - p1)) < 0.0;
    let behind0 = !smooth.convex1 || smooth.normal0.dot(&(centroid_b - p1)) < 0.0;
    let behind2 = !smooth.convex2 || smooth.normal2.dot(&(centroid_b - p2)) < 0.0;

    if behind1 && behind0 && behind2 {
        // One-sided collision
        return empty;
    }

    // Polygon B in frame A
    let count = polygon_b.count;
    let mut vertices = [Vec2::zeros(); MAX_POLYGON_VERTICES];
    let mut normals = [Vec2::zeros(); MAX_POLYGON_VERTICES];
    for i in 0..count {
        vertices[i] = xf.transform_point(polygon_b.vertices[i]);
        normals[i] = xf.q.rotate(polygon_b.normals[i]);
    }

    // Distance on the core shapes; radii are folded in below
    let input = DistanceInput {
        proxy_a: ShapeProxy::new(&[p1, p2], 0.0),
        proxy_b: ShapeProxy::new(&vertices[..count], 0.0),
        transform_a: Transform::IDENTITY,
        transform_b: Transform::IDENTITY,
        use_radii: false,
    };

    let output = shape_distance(&input, cache);

    if output.distance > radius_b + SPECULATIVE_DISTANCE {
        return empty;
    }

    // Snap concave normals for the partial polygon
    let n0 = if smooth.convex1 { smooth.normal0 } else { normal1 };
    let n2 = if smooth.convex2 { smooth.normal2 } else { normal1 };

    // Finish a manifold clipped in frame A with the normal given in frame A
    let finish = |manifold: Manifold| manifold.into_world(xf_a, Vec2::zeros(), xf_b);

    // Reject when the neighboring segment is the incident feature for reference normal `n`
    let neighbor_is_incident = |n: Vec2, a1: Vec2| {
        let dot1 = n.dot(&(p1 - a1));
        let dot2 = n.dot(&(p2 - a1));
        if dot1 < dot2 {
            n0.dot(&n) < normal1.dot(&n)
        } else {
            n2.dot(&n) < normal1.dot(&n)
        }
    };

    // Incident polygon vertex, or incident polygon edge by normal index
    let mut incident_index: Option<usize> = None;
    let mut incident_normal: Option<usize> = None;

    if !behind1 && output.distance > 0.1 * LINEAR_SLOP {
        // The closest features may be two vertices or an edge and a vertex
        // even when there should be two points
        if cache.count == 1 {
            // Vertex-vertex collision
            let p_a = output.point_a;
            let p_b = output.point_b;

            let normal = math::normalize_or_zero(p_b - p_a);

            match smooth.classify(normal) {
                NormalType::Skip => return empty,
                NormalType::Admit => {
                    let mut manifold = Manifold {
                        normal,
                        ..Manifold::default()
                    };
                    manifold.push_local(
                        math::lerp(p_a, p_b - normal * radius_b, 0.5),
                        output.distance - radius_b,
                        make_id(usize::from(cache.index_a[0]), usize::from(cache.index_b[0])),
                    );
                    return finish(manifold);
                }
                NormalType::Snap => incident_index = Some(usize::from(cache.index_b[0])),
            }
        } else {
            // Vertex-edge collision
            debug_assert_eq!(cache.count, 2);

            let ia1 = cache.index_a[0];
            let ia2 = cache.index_a[1];
            let ib1 = usize::from(cache.index_b[0]);
            let ib2 = usize::from(cache.index_b[1]);

            if ia1 == ia2 {
                // One point on A, expect two points on B
                debug_assert_ne!(ib1, ib2);

                // Polygon normal most aligned with the vector between the
                // closest points. This sorts ib1 and ib2.
                let normal_b = output.point_a - output.point_b;
                let dot1 = normal_b.dot(&normals[ib1]);
                let dot2 = normal_b.dot(&normals[ib2]);
                let ib = if dot1 > dot2 { ib1 } else { ib2 };

                // Use the accurate normal
                let normal_b = normals[ib];

                match smooth.classify(-normal_b) {
                    NormalType::Skip => return empty,
                    NormalType::Admit => {
                        // Polygon edge associated with the normal
                        let ib1 = ib;
                        let ib2 = next_index(ib, count);

                        let b1 = vertices[ib1];
                        let b2 = vertices[ib2];

                        if neighbor_is_incident(normal_b, b1) {
                            return empty;
                        }

                        let mut manifold =
                            clip_segments(b1, b2, p1, p2, normal_b, radius_b, 0.0, make_id(ib1, 1), make_id(ib2, 0));
                        manifold.normal = -normal_b;
                        return finish(manifold);
                    }
                    NormalType::Snap => incident_normal = Some(ib),
                }
            } else {
                // Index of the incident polygon vertex
                let dot1 = normal1.dot(&(vertices[ib1] - p1));
                let dot2 = normal1.dot(&(vertices[ib2] - p2));
                incident_index = Some(if dot1 < dot2 { ib1 } else { ib2 });
            }
        }
    } else {
        // SAT edge normal
        let mut edge_separation = f32::MAX;
        for (i, v) in vertices[..count].iter().enumerate() {
            let s = normal1.dot(&(v - p1));
            if s < edge_separation {
                edge_separation = s;
                incident_index = Some(i);
            }
        }

        // Check the convex neighbors for edge separation
        let min_along = |n: Vec2, origin: Vec2| {
            vertices[..count]
                .iter()
                .map(|v| n.dot(&(v - origin)))
                .fold(f32::MAX, f32::min)
        };

        if smooth.convex1 {
            let s0 = min_along(smooth.normal0, p1);
            if s0 > edge_separation {
                edge_separation = s0;
                // The neighbor owns the edge separation
                incident_index = None;
            }
        }

        if smooth.convex2 {
            let s2 = min_along(smooth.normal2, p2);
            if s2 > edge_separation {
                edge_separation = s2;
                // The neighbor owns the edge separation
                incident_index = None;
            }
        }

        // SAT polygon normal
        let mut polygon_separation = -f32::MAX;
        let mut reference_index = None;

        for i in 0..count {
            let n = normals[i];

            if smooth.classify(-n) != NormalType::Admit {
                continue;
            }

            let p = vertices[i];
            let s = n.dot(&(p2 - p)).min(n.dot(&(p1 - p)));

            if s > polygon_separation {
                polygon_separation = s;
                reference_index = Some(i);
            }
        }

        if let Some(ia1) = reference_index.filter(|_| polygon_separation > edge_separation) {
            let ia2 = next_index(ia1, count);
            let a1 = vertices[ia1];
            let a2 = vertices[ia2];

            let n = normals[ia1];

            if neighbor_is_incident(n, a1) {
                return empty;
            }

            let mut manifold = clip_segments(a1, a2, p1, p2, n, radius_b, 0.0, make_id(ia1, 1), make_id(ia2, 0));
            manifold.normal = -n;
            return finish(manifold);
        }

        if incident_index.is_none() {
            // The neighboring segment is the separating axis
            return empty;
        }

        // Fall through to the segment normal axis
    }

    debug_assert!(incident_normal.is_some() || incident_index.is_some());

    // Segment normal. Find the incident polygon edge: the one adjacent to the
    // deepest vertex that is most anti-parallel to the segment normal.
    let (ib1, ib2) = match (incident_normal, incident_index) {
        (Some(ib), _) => (ib, next_index(ib, count)),
        (None, Some(i2)) => {
            let i1 = if i2 > 0 { i2 - 1 } else { count - 1 };
            let d1 = normal1.dot(&normals[i1]);
            let d2 = normal1.dot(&normals[i2]);
            if d1 < d2 {
                (i1, i2)
            } else {
                (i2, next_index(i2, count))
            }
        }
        (None, None) => return empty,
    };

    let b1 = vertices[ib1];
    let b2 = vertices[ib2];

    let manifold = clip_segments(p1, p2, b1, b2, normal1, 0.0, radius_b, make_id(0, ib2), make_id(1, ib1));
    finish(manifold)
}
