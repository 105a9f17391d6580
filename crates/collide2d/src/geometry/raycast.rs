//! Exact ray casts and shape casts against single shapes
//!
//! All inputs are in the shape's local frame. A ray that starts inside a solid
//! shape reports no hit.

use super::cast::{CastOutput, RayCastInput, ShapeCastInput, ShapeCastPairInput};
use super::proxy::ShapeProxy;
use super::shapes::{Capsule, Circle, Polygon, Segment, Shape};
use crate::collision::distance::shape_cast_pair;
use crate::foundation::math::{self, Transform};

/// Ray cast against a circle
pub fn ray_cast_circle(input: &RayCastInput, shape: &Circle) -> CastOutput {
    debug_assert!(input.is_valid());
    let mut output = CastOutput::default();

    let p = shape.center;

    // Shift ray so circle center is the origin
    let s = input.origin - p;
    let (length, d) = math::get_length_and_normalize(input.translation);
    if length == 0.0 {
        // Zero length ray
        return output;
    }

    // Closest point on the infinite ray to the center
    let t = -s.dot(&d);
    let c = s + d * t;

    let cc = c.dot(&c);
    let rr = shape.radius * shape.radius;
    if cc > rr {
        return output;
    }

    // Pythagoras
    let h = (rr - cc).sqrt();
    let fraction = t - h;
    if fraction < 0.0 || input.max_fraction * length < fraction {
        return output;
    }

    let hit_point = s + d * fraction;

    output.fraction = fraction / length;
    output.normal = math::normalize_or_zero(hit_point);
    output.point = p + output.normal * shape.radius;
    output.hit = true;
    output
}

/// Ray cast against a capsule
pub fn ray_cast_capsule(input: &RayCastInput, shape: &Capsule) -> CastOutput {
    debug_assert!(input.is_valid());
    let output = CastOutput::default();

    let v1 = shape.center1;
    let v2 = shape.center2;
    let radius = shape.radius;

    let (capsule_length, a) = math::get_length_and_normalize(v2 - v1);
    if capsule_length < f32::EPSILON {
        return ray_cast_circle(input, &Circle::new(v1, radius));
    }

    let p1 = input.origin;
    let d = input.translation;

    // Ray from capsule start to ray start
    let q = p1 - v1;
    let qa = q.dot(&a);

    // Vector to ray start that is perpendicular to the capsule axis
    let qp = q - a * qa;

    // Does the ray start within the infinite length capsule?
    if qp.dot(&qp) < radius * radius {
        if qa < 0.0 {
            // Start point behind capsule segment
            return ray_cast_circle(input, &Circle::new(v1, radius));
        }
        if qa > capsule_length {
            // Start point ahead of capsule segment
            return ray_cast_circle(input, &Circle::new(v2, radius));
        }
        // Ray starts inside capsule
        return output;
    }

    // Perpendicular to the capsule axis, pointing right
    let mut n = math::right_perp(a);

    let (ray_length, u) = math::get_length_and_normalize(d);

    // Intersect the ray with both sides of the infinite capsule using
    // Cramer's rule on [a -u]
    let den = -a.x * u.y + u.x * a.y;
    if -f32::EPSILON < den && den < f32::EPSILON {
        // Parallel and outside the infinite capsule
        return output;
    }

    let b1 = q - n * radius;
    let b2 = q + n * radius;
    let inv_den = 1.0 / den;

    let s21 = (a.x * b1.y - b1.x * a.y) * inv_den;
    let s22 = (a.x * b2.y - b2.x * a.y) * inv_den;

    let (s2, b) = if s21 < s22 {
        (s21, b1)
    } else {
        n = -n;
        (s22, b2)
    };

    if s2 < 0.0 || input.max_fraction * ray_length < s2 {
        return output;
    }

    // Position along the capsule axis
    let s1 = (-b.x * u.y + u.x * b.y) * inv_den;

    if s1 < 0.0 {
        ray_cast_circle(input, &Circle::new(v1, radius))
    } else if capsule_length < s1 {
        ray_cast_circle(input, &Circle::new(v2, radius))
    } else {
        CastOutput {
            fraction: s2 / ray_length,
            point: math::lerp(v1, v2, s1 / capsule_length) + n * radius,
            normal: n,
            iterations: 0,
            hit: true,
        }
    }
}

/// Ray cast against a segment. One-sided segments only collide from the right.
pub fn ray_cast_segment(input: &RayCastInput, shape: &Segment, one_sided: bool) -> CastOutput {
    let output = CastOutput::default();

    if one_sided {
        // Skip left-side collision
        let offset = math::cross(input.origin - shape.point1, shape.point2 - shape.point1);
        if offset < 0.0 {
            return output;
        }
    }

    let p1 = input.origin;
    let d = input.translation;

    let v1 = shape.point1;
    let v2 = shape.point2;

    let (length, e_unit) = math::get_length_and_normalize(v2 - v1);
    if length == 0.0 {
        return output;
    }

    // Normal points to the right, looking from v1 towards v2
    let mut normal = math::right_perp(e_unit);

    // Intersect the ray with the infinite line: dot(normal, p1 + t * d - v1) = 0
    let numerator = normal.dot(&(v1 - p1));
    let denominator = normal.dot(&d);

    if denominator == 0.0 {
        // Parallel
        return output;
    }

    let t = numerator / denominator;
    if t < 0.0 || input.max_fraction < t {
        return output;
    }

    let p = p1 + d * t;

    let s = (p - v1).dot(&e_unit);
    if s < 0.0 || length < s {
        return output;
    }

    if numerator > 0.0 {
        normal = -normal;
    }

    CastOutput {
        fraction: t,
        point: p,
        normal,
        iterations: 0,
        hit: true,
    }
}

/// Ray cast against a polygon. Rounded polygons fall back to a shape cast.
pub fn ray_cast_polygon(input: &RayCastInput, shape: &Polygon) -> CastOutput {
    debug_assert!(input.is_valid());

    if shape.radius == 0.0 {
        let output = CastOutput::default();

        let p1 = input.origin;
        let d = input.translation;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        for i in 0..shape.count {
            // dot(normal, p1 + a * d - v) = 0
            let numerator = shape.normals[i].dot(&(shape.vertices[i] - p1));
            let denominator = shape.normals[i].dot(&d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return output;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                // The segment enters this half-space
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                // The segment exits this half-space
                upper = numerator / denominator;
            }

            if upper < lower {
                return output;
            }
        }

        debug_assert!(0.0 <= lower && lower <= input.max_fraction);

        return match index {
            Some(i) => CastOutput {
                fraction: lower,
                normal: shape.normals[i],
                point: p1 + d * lower,
                iterations: 0,
                hit: true,
            },
            None => output,
        };
    }

    let cast_input = ShapeCastPairInput {
        proxy_a: ShapeProxy::new(shape.vertices(), shape.radius),
        proxy_b: ShapeProxy::new(&[input.origin], 0.0),
        transform_a: Transform::IDENTITY,
        transform_b: Transform::IDENTITY,
        translation_b: input.translation,
        max_fraction: input.max_fraction,
    };
    shape_cast_pair(&cast_input)
}

fn cast_against(proxy_a: ShapeProxy, input: &ShapeCastInput) -> CastOutput {
    let pair = ShapeCastPairInput {
        proxy_a,
        proxy_b: input.proxy,
        transform_a: Transform::IDENTITY,
        transform_b: Transform::IDENTITY,
        translation_b: input.translation,
        max_fraction: input.max_fraction,
    };
    shape_cast_pair(&pair)
}

/// Sweep a point cloud against a circle
pub fn shape_cast_circle(input: &ShapeCastInput, shape: &Circle) -> CastOutput {
    cast_against(ShapeProxy::new(&[shape.center], shape.radius), input)
}

/// Sweep a point cloud against a capsule
pub fn shape_cast_capsule(input: &ShapeCastInput, shape: &Capsule) -> CastOutput {
    cast_against(
        ShapeProxy::new(&[shape.center1, shape.center2], shape.radius),
        input,
    )
}

/// Sweep a point cloud against a segment
pub fn shape_cast_segment(input: &ShapeCastInput, shape: &Segment) -> CastOutput {
    cast_against(ShapeProxy::new(&[shape.point1, shape.point2], 0.0), input)
}

/// Sweep a point cloud against a polygon
pub fn shape_cast_polygon(input: &ShapeCastInput, shape: &Polygon) -> CastOutput {
    cast_against(ShapeProxy::new(shape.vertices(), shape.radius), input)
}

impl Shape {
    /// Exact ray cast in the shape's local frame
    pub fn ray_cast(&self, input: &RayCastInput) -> CastOutput {
        match self {
            Self::Circle(c) => ray_cast_circle(input, c),
            Self::Capsule(c) => ray_cast_capsule(input, c),
            Self::Segment(s) => ray_cast_segment(input, s, false),
            Self::Polygon(p) => ray_cast_polygon(input, p),
            Self::ChainSegment(c) => ray_cast_segment(input, &c.segment, true),
        }
    }

    /// Exact shape cast in the shape's local frame
    pub fn shape_cast(&self, input: &ShapeCastInput) -> CastOutput {
        match self {
            Self::Circle(c) => shape_cast_circle(input, c),
            Self::Capsule(c) => shape_cast_capsule(input, c),
            Self::Segment(s) => shape_cast_segment(input, s),
            Self::Polygon(p) => shape_cast_polygon(input, p),
            Self::ChainSegment(c) => shape_cast_segment(input, &c.segment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{vec2, Vec2};
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_hits_circle() {
        let circle = Circle::new(vec2(0.0, 0.0), 1.0);
        let input = RayCastInput::new(vec2(-4.0, 0.0), vec2(8.0, 0.0), 1.0);
        let output = ray_cast_circle(&input, &circle);

        assert!(output.hit);
        assert_relative_eq!(output.fraction, 0.375, epsilon = 1e-6);
        assert_relative_eq!(output.point, vec2(-1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(output.normal, vec2(-1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_ray_inside_circle_misses() {
        let circle = Circle::new(vec2(0.0, 0.0), 1.0);
        let input = RayCastInput::new(vec2(0.0, 0.0), vec2(8.0, 0.0), 1.0);
        assert!(!ray_cast_circle(&input, &circle).hit);
    }

    #[test]
    fn test_ray_hits_capsule_side_and_cap() {
        let capsule = Capsule::new(vec2(-1.0, 0.0), vec2(1.0, 0.0), 0.5);

        let down = RayCastInput::new(vec2(0.0, 2.0), vec2(0.0, -4.0), 1.0);
        let output = ray_cast_capsule(&down, &capsule);
        assert!(output.hit);
        assert_relative_eq!(output.point, vec2(0.0, 0.5), epsilon = 1e-5);
        assert_relative_eq!(output.normal, vec2(0.0, 1.0), epsilon = 1e-5);

        let along = RayCastInput::new(vec2(-4.0, 0.0), vec2(8.0, 0.0), 1.0);
        let output = ray_cast_capsule(&along, &capsule);
        assert!(output.hit);
        assert_relative_eq!(output.point, vec2(-1.5, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_one_sided_segment() {
        let segment = Segment::new(vec2(-1.0, 0.0), vec2(1.0, 0.0));

        // From below, the right side of point1 -> point2
        let from_right = RayCastInput::new(vec2(0.0, -1.0), vec2(0.0, 2.0), 1.0);
        let output = ray_cast_segment(&from_right, &segment, true);
        assert!(output.hit);
        assert_relative_eq!(output.fraction, 0.5);
        assert_eq!(output.normal, vec2(0.0, -1.0));

        let from_left = RayCastInput::new(vec2(0.0, 1.0), vec2(0.0, -2.0), 1.0);
        assert!(!ray_cast_segment(&from_left, &segment, true).hit);
        assert!(ray_cast_segment(&from_left, &segment, false).hit);
    }

    #[test]
    fn test_ray_hits_box() {
        let b = Polygon::make_box(1.0, 1.0);
        let input = RayCastInput::new(vec2(-3.0, 0.5), vec2(4.0, 0.0), 1.0);
        let output = ray_cast_polygon(&input, &b);

        assert!(output.hit);
        assert_relative_eq!(output.fraction, 0.5);
        assert_eq!(output.normal, vec2(-1.0, 0.0));
        assert_relative_eq!(output.point, vec2(-1.0, 0.5));

        let inside = RayCastInput::new(Vec2::zeros(), vec2(4.0, 0.0), 1.0);
        assert!(!ray_cast_polygon(&inside, &b).hit);
    }

    #[test]
    fn test_ray_hits_rounded_box() {
        let b = Polygon::make_rounded_box(1.0, 1.0, 0.5);
        let input = RayCastInput::new(vec2(-4.0, 0.0), vec2(4.0, 0.0), 1.0);
        let output = ray_cast_polygon(&input, &b);

        assert!(output.hit);
        assert_relative_eq!(output.fraction, 2.5 / 4.0, epsilon = 0.01);
        assert_relative_eq!(output.normal, vec2(-1.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn test_shape_cast_circle_against_box() {
        let b = Polygon::make_box(1.0, 1.0);
        let input = ShapeCastInput::new(
            ShapeProxy::new(&[vec2(-5.0, 0.0)], 0.5),
            vec2(10.0, 0.0),
            1.0,
        );
        let output = shape_cast_polygon(&input, &b);

        assert!(output.hit);
        assert_relative_eq!(output.fraction, 0.35, epsilon = 0.01);
        assert_relative_eq!(output.point.x, -1.0, epsilon = 0.01);
    }
}
