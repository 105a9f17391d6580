use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::collision::{collide_shapes, Manifold, SimplexCache};
use crate::foundation::math::{vec2, Transform, Vec2};
use crate::geometry::shapes::{Capsule, ChainSegment, Circle, Polygon, Shape};

fn random_transform(rng: &mut StdRng, spread: f32) -> Transform {
    Transform::from_position_angle(
        vec2(rng.gen_range(-spread..spread), rng.gen_range(-spread..spread)),
        rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI),
    )
}

fn random_shape(rng: &mut StdRng) -> Shape {
    match rng.gen_range(0..4) {
        0 => Shape::Circle(Circle::new(vec2(rng.gen_range(-0.2..0.2), 0.0), rng.gen_range(0.2..0.8))),
        1 => Shape::Capsule(Capsule::new(vec2(-0.5, 0.0), vec2(0.5, 0.0), rng.gen_range(0.1..0.4))),
        2 => Shape::Polygon(Polygon::make_box(rng.gen_range(0.2..0.8), rng.gen_range(0.2..0.8))),
        _ => Shape::Polygon(Polygon::make_rounded_box(0.4, 0.3, 0.1)),
    }
}

fn sorted_separations(m: &Manifold) -> Vec<f32> {
    let mut s: Vec<f32> = m.points().iter().map(|mp| mp.separation).collect();
    s.sort_by(f32::total_cmp);
    s
}

fn collide_both_ways(a: &Shape, xf_a: &Transform, b: &Shape, xf_b: &Transform) -> (Manifold, Manifold) {
    let ab = collide_shapes(a, xf_a, b, xf_b, &mut SimplexCache::default());
    let ba = collide_shapes(b, xf_b, a, xf_a, &mut SimplexCache::default());
    (ab, ba)
}

// Same contacts seen from either shape, in any point order
fn assert_mirrored(ab: &Manifold, ba: &Manifold) {
    assert_eq!(ab.point_count, ba.point_count);
    if ab.is_empty() {
        return;
    }

    assert_relative_eq!(ab.normal, -ba.normal, epsilon = 1e-5);
    for p in ab.points() {
        let matched = ba.points().iter().any(|q| {
            (p.point - q.point).norm() < 1e-4 && (p.separation - q.separation).abs() < 1e-4
        });
        assert!(matched, "no mirrored contact for {p:?} in {ba:?}");
    }
}

#[test]
fn test_parallel_capsules_are_mirrored() {
    let a = Shape::Capsule(Capsule::new(vec2(-1.0, 0.0), vec2(1.0, 0.0), 0.25));
    let b = Shape::Capsule(Capsule::new(vec2(-1.0, 0.0), vec2(1.0, 0.0), 0.25));
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_position(vec2(0.5, 0.49));

    let (ab, ba) = collide_both_ways(&a, &xf_a, &b, &xf_b);

    assert_eq!(ab.point_count, 2);
    assert_relative_eq!(ab.normal, vec2(0.0, 1.0), epsilon = 1e-6);
    for mp in ab.points() {
        assert_relative_eq!(mp.separation, -0.01, epsilon = 1e-5);
        assert_relative_eq!(mp.point.y, 0.245, epsilon = 1e-5);
    }
    assert_mirrored(&ab, &ba);
}

#[test]
fn test_crossed_capsules_are_mirrored() {
    let a = Shape::Capsule(Capsule::new(vec2(-1.0, 0.0), vec2(1.0, 0.0), 0.25));
    let b = Shape::Capsule(Capsule::new(vec2(0.0, -0.5), vec2(0.0, 0.5), 0.25));
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_position(vec2(0.3, 0.99));

    let (ab, ba) = collide_both_ways(&a, &xf_a, &b, &xf_b);

    assert_eq!(ab.point_count, 1);
    assert_relative_eq!(ab.normal, vec2(0.0, 1.0), epsilon = 1e-6);
    assert_relative_eq!(ab.points[0].separation, -0.01, epsilon = 1e-5);
    assert_relative_eq!(ab.points[0].point, vec2(0.3, 0.245), epsilon = 1e-5);
    assert_mirrored(&ab, &ba);
}

#[test]
fn test_circle_pairs_are_mirrored() {
    let mut rng = StdRng::seed_from_u64(9);

    for _ in 0..200 {
        let a = Shape::Circle(Circle::new(Vec2::zeros(), rng.gen_range(0.2..1.0)));
        let b = Shape::Circle(Circle::new(Vec2::zeros(), rng.gen_range(0.2..1.0)));
        let xf_a = random_transform(&mut rng, 1.0);
        let xf_b = random_transform(&mut rng, 1.0);

        let (ab, ba) = collide_both_ways(&a, &xf_a, &b, &xf_b);
        assert_mirrored(&ab, &ba);
    }
}

#[test]
fn test_stacked_boxes_are_mirrored() {
    let a = Shape::Polygon(Polygon::make_box(1.0, 0.5));
    let b = Shape::Polygon(Polygon::make_box(1.0, 0.5));
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_position(vec2(0.3, 0.99));

    let (ab, ba) = collide_both_ways(&a, &xf_a, &b, &xf_b);

    assert_eq!(ab.point_count, 2);
    assert_relative_eq!(ab.normal, vec2(0.0, 1.0), epsilon = 1e-6);
    assert_eq!(sorted_separations(&ab).len(), 2);
    for s in sorted_separations(&ab) {
        assert_relative_eq!(s, -0.01, epsilon = 1e-5);
    }
    assert_mirrored(&ab, &ba);
}

#[test]
fn test_box_corner_on_face_is_mirrored() {
    let a = Shape::Polygon(Polygon::make_box(2.0, 0.5));
    let b = Shape::Polygon(Polygon::make_box(0.5, 0.5));
    let corner = 0.5 * std::f32::consts::SQRT_2;
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_position_angle(vec2(0.2, 0.5 + corner - 0.01), std::f32::consts::FRAC_PI_4);

    let (ab, ba) = collide_both_ways(&a, &xf_a, &b, &xf_b);

    assert_eq!(ab.point_count, 1);
    assert_relative_eq!(ab.normal, vec2(0.0, 1.0), epsilon = 1e-5);
    assert_relative_eq!(ab.points[0].separation, -0.01, epsilon = 1e-4);
    assert_relative_eq!(ab.points[0].point.x, 0.2, epsilon = 1e-4);
    assert_mirrored(&ab, &ba);
}

#[test]
fn test_circle_on_box_contact() {
    let ground = Shape::Polygon(Polygon::make_box(1.0, 0.5));
    let ball = Shape::Circle(Circle::new(Vec2::zeros(), 0.5));
    let xf_ground = Transform::IDENTITY;
    let xf_ball = Transform::from_position(vec2(0.3, 0.99));

    let (ab, ba) = collide_both_ways(&ground, &xf_ground, &ball, &xf_ball);

    assert_eq!(ab.point_count, 1);
    assert_relative_eq!(ab.normal, vec2(0.0, 1.0), epsilon = 1e-6);
    assert_relative_eq!(ab.points[0].separation, -0.01, epsilon = 1e-5);
    assert_relative_eq!(ab.points[0].point, vec2(0.3, 0.495), epsilon = 1e-5);

    // Ball first: the normal points from the ball into the ground
    assert_eq!(ba.point_count, 1);
    assert_relative_eq!(ba.normal, vec2(0.0, -1.0), epsilon = 1e-6);
    assert_relative_eq!(ba.points[0].separation, -0.01, epsilon = 1e-5);
    assert_relative_eq!(ba.points[0].point, vec2(0.3, 0.495), epsilon = 1e-5);
    assert_relative_eq!(ba.points[0].anchor_a, vec2(0.0, -0.495), epsilon = 1e-5);
}

#[test]
fn test_capsule_on_box_contact() {
    let ground = Shape::Polygon(Polygon::make_box(1.0, 0.5));
    let capsule = Shape::Capsule(Capsule::new(vec2(-0.5, 0.0), vec2(0.5, 0.0), 0.25));
    let xf_ground = Transform::IDENTITY;
    let xf_capsule = Transform::from_position(vec2(0.2, 0.74));

    let (_, ba) = collide_both_ways(&ground, &xf_ground, &capsule, &xf_capsule);

    assert_eq!(ba.point_count, 2);
    assert_relative_eq!(ba.normal, vec2(0.0, -1.0), epsilon = 1e-5);

    let mut xs: Vec<f32> = ba.points().iter().map(|mp| mp.point.x).collect();
    xs.sort_by(f32::total_cmp);
    assert_relative_eq!(xs[0], -0.3, epsilon = 1e-4);
    assert_relative_eq!(xs[1], 0.7, epsilon = 1e-4);
    for mp in ba.points() {
        assert_relative_eq!(mp.separation, -0.01, epsilon = 1e-5);
        assert_relative_eq!(mp.point.y, 0.495, epsilon = 1e-5);
    }
}

// Slide a shape along a flat two-segment chain across the shared vertex at
// the origin. `half_width` is the half width of the shape's core face.
fn slide_across_vertex(shape: &Shape, height: f32, half_width: f32, separation: f32) {
    // Points run right to left so the solid side faces up
    let chain = ChainSegment::open_chain(&[vec2(4.0, 0.0), vec2(0.0, 0.0), vec2(-4.0, 0.0)], 1);
    let segments: Vec<Shape> = chain.into_iter().map(Shape::ChainSegment).collect();
    let extents = [(0.0, 4.0), (-4.0, 0.0)];
    let mut caches = vec![SimplexCache::default(); segments.len()];

    for step in 0..=80 {
        let x = 2.0 - 0.05 * step as f32;
        let xf_b = Transform::from_position(vec2(x, height));

        let mut total = 0;
        for ((segment, cache), (lower, upper)) in segments.iter().zip(caches.iter_mut()).zip(extents) {
            let m = collide_shapes(segment, &Transform::IDENTITY, shape, &xf_b, cache);
            for mp in m.points() {
                assert_relative_eq!(m.normal, vec2(0.0, 1.0), epsilon = 1e-4);
                assert_relative_eq!(mp.separation, separation, epsilon = 1e-4);

                // Each segment only reports contacts over its own extent
                assert!(
                    mp.point.x >= lower - 1e-4 && mp.point.x <= upper + 1e-4,
                    "contact at {} outside segment [{lower}, {upper}] at x = {x}",
                    mp.point.x
                );
            }
            total += m.point_count;
        }

        assert!(total > 0, "lost contact at x = {x}");

        // Away from the vertex only one segment touches; across it each
        // segment clips the face to its own half
        let straddling = x.abs() < half_width;
        if (x.abs() - half_width).abs() > 0.01 {
            let bound = if straddling { 4 } else { 2 };
            assert!(total <= bound, "{total} points at x = {x}");
        } else {
            assert!(total <= 4, "{total} points at x = {x}");
        }
    }
}

#[test]
fn test_capsule_slides_across_chain_vertex() {
    let capsule = Shape::Capsule(Capsule::new(vec2(-0.5, 0.0), vec2(0.5, 0.0), 0.25));
    slide_across_vertex(&capsule, 0.24, 0.5, -0.01);
}

#[test]
fn test_box_slides_across_chain_vertex() {
    let b = Shape::Polygon(Polygon::make_box(0.5, 0.5));
    slide_across_vertex(&b, 0.495, 0.5, -0.005);
}

#[test]
fn test_rounded_box_slides_across_chain_vertex() {
    let b = Shape::Polygon(Polygon::make_rounded_box(0.4, 0.4, 0.1));
    slide_across_vertex(&b, 0.49, 0.4, -0.01);
}

#[test]
fn test_collide_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(21);
    let chain = ChainSegment::open_chain(&[vec2(2.0, 0.0), vec2(0.0, 0.1), vec2(-2.0, 0.0)], 0);

    for _ in 0..100 {
        let a = if rng.gen_bool(0.3) {
            Shape::ChainSegment(chain[rng.gen_range(0..chain.len())])
        } else {
            random_shape(&mut rng)
        };
        let b = random_shape(&mut rng);
        let xf_a = random_transform(&mut rng, 0.3);
        let xf_b = random_transform(&mut rng, 1.0);

        let mut cache1 = SimplexCache::default();
        let mut cache2 = SimplexCache::default();

        // Two frames each, so the warm started path is compared too
        for _ in 0..2 {
            let m1 = collide_shapes(&a, &xf_a, &b, &xf_b, &mut cache1);
            let m2 = collide_shapes(&a, &xf_a, &b, &xf_b, &mut cache2);

            let text1 = ron::to_string(&m1).unwrap();
            let text2 = ron::to_string(&m2).unwrap();
            assert_eq!(text1, text2);
            assert_eq!(cache1, cache2);
        }
    }
}
