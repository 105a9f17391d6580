//! Capsule versus capsule manifolds
//!
//! Capsules are handled with segment closest points rather than GJK. When the
//! segments overlap along each other's axis the second segment is clipped
//! against the first to produce two points; otherwise a single point sits
//! between the closest features.

use super::distance::segment_distance;
use super::manifold::{make_id, Manifold};
use crate::foundation::constants::SPECULATIVE_DISTANCE;
use crate::foundation::math::{self, Transform, Vec2};
use crate::geometry::shapes::{Capsule, Segment};

/// Compute the contact manifold between two capsules
pub fn collide_capsules(capsule_a: &Capsule, xf_a: &Transform, capsule_b: &Capsule, xf_b: &Transform) -> Manifold {
    let origin = capsule_a.center1;

    // Shift capsule A to the origin
    let sf_a = Transform::new(xf_a.p + xf_a.q.rotate(origin), xf_a.q);
    let xf = sf_a.inv_mul_transform(xf_b);

    // Local vertices
    let p1 = Vec2::zeros();
    let q1 = capsule_a.center2 - origin;

    // Capsule B in capsule A's frame
    let p2 = xf.transform_point(capsule_b.center1);
    let q2 = xf.transform_point(capsule_b.center2);

    let result = segment_distance(p1, q1, p2, q2);

    let radius_a = capsule_a.radius;
    let radius_b = capsule_b.radius;
    let max_distance = radius_a + radius_b + SPECULATIVE_DISTANCE;
    if result.distance_squared > max_distance * max_distance {
        return Manifold::default();
    }

    let distance = result.distance_squared.sqrt();

    let (length1, u1) = math::get_length_and_normalize(q1 - p1);
    let (length2, u2) = math::get_length_and_normalize(q2 - p2);

    // Endpoint regions
    let fp2 = (p2 - p1).dot(&u1);
    let fq2 = (q2 - p1).dot(&u1);
    let outside_a = (fp2 <= 0.0 && fq2 <= 0.0) || (fp2 >= length1 && fq2 >= length1);

    let fp1 = (p1 - p2).dot(&u2);
    let fq1 = (q1 - p2).dot(&u2);
    let outside_b = (fp1 <= 0.0 && fq1 <= 0.0) || (fp1 >= length2 && fq1 >= length2);

    let mut manifold = Manifold::default();

    if !outside_a && !outside_b && length1 > 0.0 {
        // Project segment B onto segment A and clip to A's extent
        let v_lower = if fp2 < 0.0 && fq2 - fp2 > f32::EPSILON {
            math::lerp(p2, q2, (0.0 - fp2) / (fq2 - fp2))
        } else if fq2 < 0.0 && fp2 - fq2 > f32::EPSILON {
            math::lerp(q2, p2, (0.0 - fq2) / (fp2 - fq2))
        } else if fp2 < fq2 {
            p2
        } else {
            q2
        };

        let v_upper = if fp2 > length1 && fp2 - fq2 > f32::EPSILON {
            math::lerp(p2, q2, (fp2 - length1) / (fp2 - fq2))
        } else if fq2 > length1 && fq2 - fp2 > f32::EPSILON {
            math::lerp(q2, p2, (fq2 - length1) / (fq2 - fp2))
        } else if fp2 < fq2 {
            q2
        } else {
            p2
        };

        // Feature on B that bounds each clipped point
        let (i_lower, i_upper) = if fp2 < fq2 { (0, 1) } else { (1, 0) };

        // Segment A normal, facing B
        let mut normal = math::left_perp(u1);
        let mut side = normal.dot(&(result.closest2 - result.closest1));
        if side.abs() <= f32::EPSILON {
            side = normal.dot(&(math::lerp(p2, q2, 0.5) - p1));
        }
        if side < 0.0 {
            normal = -normal;
        }

        let separation_lower = (v_lower - p1).dot(&normal);
        let separation_upper = (v_upper - p1).dot(&normal);

        // Put contact points at the midpoint, accounting for capsule radius
        let v_lower = v_lower + normal * (0.5 * (radius_a - radius_b - separation_lower));
        let v_upper = v_upper + normal * (0.5 * (radius_a - radius_b - separation_upper));

        let radius = radius_a + radius_b;

        manifold.normal = normal;
        if separation_lower - radius <= SPECULATIVE_DISTANCE {
            manifold.push_local(v_lower, separation_lower - radius, make_id(0, i_lower));
        }
        if separation_upper - radius <= SPECULATIVE_DISTANCE {
            manifold.push_local(v_upper, separation_upper - radius, make_id(1, i_upper));
        }
    } else {
        // Closest features
        let p_a = result.closest1;
        let p_b = result.closest2;

        let normal = if distance > f32::EPSILON {
            (p_b - p_a) / distance
        } else {
            // Touching cores; fall back to a perpendicular of A, or of B when A is a point
            let axis = if length1 > 0.0 { u1 } else { u2 };
            let n = math::left_perp(axis);
            if n.dot(&(math::lerp(p2, q2, 0.5) - p1)) < 0.0 {
                -n
            } else {
                n
            }
        };

        let c_a = p_a + normal * radius_a;
        let c_b = p_b - normal * radius_b;
        let contact = math::lerp(c_a, c_b, 0.5);

        let i1 = usize::from(result.fraction1 > 0.5);
        let i2 = usize::from(result.fraction2 > 0.5);

        manifold.normal = normal;
        manifold.push_local(contact, distance - (radius_a + radius_b), make_id(i1, i2));
    }

    manifold.into_world(xf_a, origin, xf_b)
}

/// Compute the contact manifold between a segment and a capsule
pub fn collide_segment_and_capsule(
    segment_a: &Segment,
    xf_a: &Transform,
    capsule_b: &Capsule,
    xf_b: &Transform,
) -> Manifold {
    let capsule_a = Capsule::new(segment_a.point1, segment_a.point2, 0.0);
    collide_capsules(&capsule_a, xf_a, capsule_b, xf_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::vec2;
    use approx::assert_relative_eq;

    fn horizontal(radius: f32) -> Capsule {
        Capsule::new(vec2(-1.0, 0.0), vec2(1.0, 0.0), radius)
    }

    #[test]
    fn test_parallel_capsules_two_points() {
        let a = horizontal(0.25);
        let b = horizontal(0.25);
        let m = collide_capsules(&a, &Transform::IDENTITY, &b, &Transform::from_position(vec2(0.5, 0.45)));

        assert_eq!(m.point_count, 2);
        assert_relative_eq!(m.normal, vec2(0.0, 1.0), epsilon = 1e-6);
        for mp in m.points() {
            assert_relative_eq!(mp.separation, -0.05, epsilon = 1e-5);
        }
        // Overlap spans x in [-0.5, 1]
        assert_relative_eq!(m.points[0].point.x, -0.5, epsilon = 1e-5);
        assert_relative_eq!(m.points[1].point.x, 1.0, epsilon = 1e-5);
        assert_ne!(m.points[0].id, m.points[1].id);
    }

    #[test]
    fn test_capsule_below_flips_normal() {
        let a = horizontal(0.25);
        let b = horizontal(0.25);
        let m = collide_capsules(&a, &Transform::IDENTITY, &b, &Transform::from_position(vec2(0.0, -0.45)));
        assert_eq!(m.point_count, 2);
        assert_relative_eq!(m.normal, vec2(0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_end_to_end_capsules_single_point() {
        let a = horizontal(0.25);
        let b = horizontal(0.25);
        let m = collide_capsules(&a, &Transform::IDENTITY, &b, &Transform::from_position(vec2(2.4, 0.0)));

        assert_eq!(m.point_count, 1);
        assert_relative_eq!(m.normal, vec2(1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(m.points[0].separation, -0.1, epsilon = 1e-5);
        assert_eq!(m.points[0].id, make_id(1, 0));
    }

    #[test]
    fn test_crossed_capsules() {
        let a = horizontal(0.1);
        let b = Capsule::new(vec2(0.0, -1.0), vec2(0.0, 1.0), 0.1);
        let m = collide_capsules(&a, &Transform::IDENTITY, &b, &Transform::from_position(vec2(0.0, 1.15)));

        assert_eq!(m.point_count, 1);
        assert_relative_eq!(m.normal, vec2(0.0, 1.0), epsilon = 1e-5);
        assert_relative_eq!(m.points[0].separation, -0.05, epsilon = 1e-5);
    }

    #[test]
    fn test_far_capsules_empty() {
        let a = horizontal(0.25);
        let m = collide_capsules(&a, &Transform::IDENTITY, &a, &Transform::from_position(vec2(0.0, 3.0)));
        assert!(m.is_empty());
    }

    #[test]
    fn test_segment_capsule() {
        let segment = Segment::new(vec2(-2.0, 0.0), vec2(2.0, 0.0));
        let b = horizontal(0.5);
        let m = collide_segment_and_capsule(&segment, &Transform::IDENTITY, &b, &Transform::from_position(vec2(0.0, 0.49)));
        assert_eq!(m.point_count, 2);
        assert_relative_eq!(m.normal, vec2(0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(m.points[0].separation, -0.01, epsilon = 1e-5);
    }
}
