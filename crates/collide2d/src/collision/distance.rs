//! Closest features between convex point clouds
//!
//! GJK distance over [`ShapeProxy`] pairs, with a [`SimplexCache`] that carries
//! the winning feature indices between calls, plus a conservative-advancement
//! shape cast built on the same simplex solver.

use serde::{Deserialize, Serialize};

use crate::foundation::constants::{GJK_MAX_ITERATIONS, LINEAR_SLOP};
use crate::foundation::math::{self, Transform, Vec2};
use crate::geometry::cast::{CastOutput, ShapeCastPairInput};
use crate::geometry::proxy::ShapeProxy;

/// Closest points between two segments
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentDistanceResult {
    /// The closest point on the first segment
    pub closest1: Vec2,
    /// The closest point on the second segment
    pub closest2: Vec2,
    /// The barycentric coordinate on the first segment
    pub fraction1: f32,
    /// The barycentric coordinate on the second segment
    pub fraction2: f32,
    /// The squared distance between the closest points
    pub distance_squared: f32,
}

/// Compute the closest points between segments `p1 -> q1` and `p2 -> q2`
pub fn segment_distance(p1: Vec2, q1: Vec2, p2: Vec2, q2: Vec2) -> SegmentDistanceResult {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let dd1 = d1.dot(&d1);
    let dd2 = d2.dot(&d2);
    let rd1 = r.dot(&d1);
    let rd2 = r.dot(&d2);

    let eps_sqr = f32::EPSILON * f32::EPSILON;

    let (fraction1, fraction2) = if dd1 < eps_sqr || dd2 < eps_sqr {
        // Handle all degeneracies
        if dd1 >= eps_sqr {
            // Segment 2 is degenerate
            ((-rd1 / dd1).clamp(0.0, 1.0), 0.0)
        } else if dd2 >= eps_sqr {
            // Segment 1 is degenerate
            (0.0, (rd2 / dd2).clamp(0.0, 1.0))
        } else {
            (0.0, 0.0)
        }
    } else {
        let d12 = d1.dot(&d2);
        let denom = dd1 * dd2 - d12 * d12;

        // Fraction on segment 1, zero when parallel
        let mut f1 = 0.0;
        if denom != 0.0 {
            f1 = ((d12 * rd2 - rd1 * dd2) / denom).clamp(0.0, 1.0);
        }

        // Point on segment 2 closest to p1 + f1 * d1
        let mut f2 = (d12 * f1 + rd2) / dd2;

        // Clamping segment 2 requires a do over on segment 1
        if f2 < 0.0 {
            f2 = 0.0;
            f1 = (-rd1 / dd1).clamp(0.0, 1.0);
        } else if f2 > 1.0 {
            f2 = 1.0;
            f1 = ((d12 - rd1) / dd1).clamp(0.0, 1.0);
        }

        (f1, f2)
    };

    let closest1 = p1 + d1 * fraction1;
    let closest2 = p2 + d2 * fraction2;
    SegmentDistanceResult {
        closest1,
        closest2,
        fraction1,
        fraction2,
        distance_squared: (closest2 - closest1).norm_squared(),
    }
}

/// Warm-start data for GJK: the support indices of the last simplex.
///
/// A zeroed cache means "no prior result" and triggers a cold start. The
/// cache must be reset by the caller whenever the shape pair changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct SimplexCache {
    /// The number of stored simplex points
    pub count: u16,
    /// The cached simplex indices on shape A
    pub index_a: [u8; 3],
    /// The cached simplex indices on shape B
    pub index_b: [u8; 3],
}

impl SimplexCache {
    /// Forget the stored features
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Input for [`shape_distance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceInput {
    /// The proxy for shape A
    pub proxy_a: ShapeProxy,
    /// The proxy for shape B
    pub proxy_b: ShapeProxy,
    /// The world transform for shape A
    pub transform_a: Transform,
    /// The world transform for shape B
    pub transform_b: Transform,
    /// Should the proxy radius be considered?
    pub use_radii: bool,
}

/// Output for [`shape_distance`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceOutput {
    /// Closest point on shape A
    pub point_a: Vec2,
    /// Closest point on shape B
    pub point_b: Vec2,
    /// Unit normal from A to B, zero when the points coincide
    pub normal: Vec2,
    /// The final distance, zero if overlapped
    pub distance: f32,
    /// Number of GJK iterations used
    pub iterations: usize,
    /// The number of simplex vertices at termination
    pub simplex_count: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimplexVertex {
    // Support point in proxy A
    w_a: Vec2,
    // Support point in proxy B
    w_b: Vec2,
    // w_b - w_a
    w: Vec2,
    // Barycentric coordinate for the closest point
    a: f32,
    index_a: usize,
    index_b: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

fn support_vertex(
    proxy_a: &ShapeProxy,
    transform_a: &Transform,
    index_a: usize,
    proxy_b: &ShapeProxy,
    transform_b: &Transform,
    index_b: usize,
) -> SimplexVertex {
    let w_a = transform_a.transform_point(proxy_a.points[index_a]);
    let w_b = transform_b.transform_point(proxy_b.points[index_b]);
    SimplexVertex {
        w_a,
        w_b,
        w: w_b - w_a,
        a: 1.0,
        index_a,
        index_b,
    }
}

impl Simplex {
    fn from_cache(
        cache: &SimplexCache,
        proxy_a: &ShapeProxy,
        transform_a: &Transform,
        proxy_b: &ShapeProxy,
        transform_b: &Transform,
    ) -> Self {
        let mut s = Self::default();

        // A cache from a different pair may hold indices past the end
        let count = usize::from(cache.count).min(3);
        let in_range = (0..count).all(|i| {
            usize::from(cache.index_a[i]) < proxy_a.count && usize::from(cache.index_b[i]) < proxy_b.count
        });

        if in_range {
            for i in 0..count {
                let mut v = support_vertex(
                    proxy_a,
                    transform_a,
                    usize::from(cache.index_a[i]),
                    proxy_b,
                    transform_b,
                    usize::from(cache.index_b[i]),
                );
                // Invalid until solved
                v.a = -1.0;
                s.v[i] = v;
            }
            s.count = count;
        }

        if s.count == 0 {
            s.v[0] = support_vertex(proxy_a, transform_a, 0, proxy_b, transform_b, 0);
            s.count = 1;
        }

        s
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        // Indices are bounded by MAX_POLYGON_VERTICES
        cache.count = self.count as u16;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a as u8;
            cache.index_b[i] = self.v[i].index_b as u8;
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = math::cross(e12, -self.v[0].w);
                if sgn > 0.0 {
                    // Origin is left of e12
                    math::left_perp(e12)
                } else {
                    // Origin is right of e12
                    math::right_perp(e12)
                }
            }
            _ => {
                debug_assert!(false, "invalid simplex count {}", self.count);
                Vec2::zeros()
            }
        }
    }

    fn closest_point(&self) -> Vec2 {
        match self.count {
            1 => self.v[0].w,
            2 => self.v[0].w * self.v[0].a + self.v[1].w * self.v[1].a,
            _ => Vec2::zeros(),
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        let [v1, v2, v3] = &self.v;
        match self.count {
            1 => (v1.w_a, v1.w_b),
            2 => (
                v1.w_a * v1.a + v2.w_a * v2.a,
                v1.w_b * v1.a + v2.w_b * v2.a,
            ),
            3 => {
                let a = v1.w_a * v1.a + v2.w_a * v2.a + v3.w_a * v3.a;
                // Triangle contains the origin, so both witnesses coincide
                (a, a)
            }
            _ => {
                debug_assert!(false, "invalid simplex count {}", self.count);
                (Vec2::zeros(), Vec2::zeros())
            }
        }
    }

    // Solve a line segment using barycentric coordinates.
    //
    // p = a1 * w1 + a2 * w2, a1 + a2 = 1
    // The vector from the origin to the closest point on the line is
    // perpendicular to the line: e12 = w2 - w1, dot(p, e) = 0
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        // w1 region
        let d12_2 = -w1.dot(&e12);
        if d12_2 <= 0.0 {
            // a2 <= 0, so we clamp it to 0
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // w2 region
        let d12_1 = w2.dot(&e12);
        if d12_1 <= 0.0 {
            // a1 <= 0, so we clamp it to 0
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // Must be in e12 region
        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    // Possible regions:
    // - points[2]
    // - edge points[0]-points[2]
    // - edge points[1]-points[2]
    // - inside the triangle
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        // Edge12
        let e12 = w2 - w1;
        let d12_1 = w2.dot(&e12);
        let d12_2 = -w1.dot(&e12);

        // Edge13
        let e13 = w3 - w1;
        let d13_1 = w3.dot(&e13);
        let d13_2 = -w1.dot(&e13);

        // Edge23
        let e23 = w3 - w2;
        let d23_1 = w3.dot(&e23);
        let d23_2 = -w2.dot(&e23);

        // Triangle123
        let n123 = math::cross(e12, e13);

        let d123_1 = n123 * math::cross(w2, w3);
        let d123_2 = n123 * math::cross(w3, w1);
        let d123_3 = n123 * math::cross(w1, w2);

        // w1 region
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // e12
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv_d12 = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv_d12;
            self.v[1].a = d12_2 * inv_d12;
            self.count = 2;
            return;
        }

        // e13
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv_d13 = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv_d13;
            self.v[2].a = d13_2 * inv_d13;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // w2 region
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // w3 region
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[2].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[2];
            return;
        }

        // e23
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv_d23 = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv_d23;
            self.v[2].a = d23_2 * inv_d23;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // Must be in triangle123
        let inv_d123 = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv_d123;
        self.v[1].a = d123_2 * inv_d123;
        self.v[2].a = d123_3 * inv_d123;
        self.count = 3;
    }

    fn solve(&mut self) {
        match self.count {
            1 => {}
            2 => self.solve2(),
            3 => self.solve3(),
            _ => debug_assert!(false, "invalid simplex count {}", self.count),
        }
    }
}

/// Compute the closest points between two shapes represented as point clouds.
///
/// The cache is read to warm start the simplex and overwritten with the final
/// simplex. When `use_radii` is false the result is the distance between the
/// core point clouds.
pub fn shape_distance(input: &DistanceInput, cache: &mut SimplexCache) -> DistanceOutput {
    let mut output = DistanceOutput::default();

    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;
    let transform_a = &input.transform_a;
    let transform_b = &input.transform_b;

    let mut simplex = Simplex::from_cache(cache, proxy_a, transform_a, proxy_b, transform_b);

    // Vertices of the last simplex, used to detect cycling
    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    let mut iter = 0;
    while iter < GJK_MAX_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        simplex.solve();

        // If we have 3 points, then the origin is in the corresponding triangle
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();

        // The origin is probably contained by a segment or triangle, so the
        // shapes overlap
        if d.dot(&d) < f32::EPSILON * f32::EPSILON {
            break;
        }

        // support = support(b, d) - support(a, -d)
        let index_a = proxy_a.find_support(transform_a.q.inv_rotate(-d));
        let index_b = proxy_b.find_support(transform_b.q.inv_rotate(d));
        let vertex = support_vertex(proxy_a, transform_a, index_a, proxy_b, transform_b, index_b);

        // Iteration count is equated to the number of support point calls
        iter += 1;

        // Duplicate support points are the main termination criteria
        let duplicate = (0..save_count).any(|i| save_a[i] == index_a && save_b[i] == index_b);
        if duplicate {
            break;
        }

        simplex.v[simplex.count] = vertex;
        simplex.count += 1;
    }

    let (point_a, point_b) = simplex.witness_points();
    output.point_a = point_a;
    output.point_b = point_b;
    output.distance = (point_b - point_a).norm();
    output.normal = math::normalize_or_zero(point_b - point_a);
    output.iterations = iter;
    output.simplex_count = simplex.count;

    simplex.write_cache(cache);

    if input.use_radii {
        if output.distance < f32::EPSILON {
            // Shapes are too close to safely compute a normal
            let p = (output.point_a + output.point_b) * 0.5;
            output.point_a = p;
            output.point_b = p;
            output.distance = 0.0;
        } else {
            // Keep closest points on the perimeter even if overlapped so the
            // points move smoothly
            let r_a = proxy_a.radius;
            let r_b = proxy_b.radius;
            output.distance = (output.distance - r_a - r_b).max(0.0);
            output.point_a += output.normal * r_a;
            output.point_b -= output.normal * r_b;
        }
    }

    output
}

/// Sweep proxy B along its translation against proxy A.
///
/// Uses conservative advancement: each iteration advances to the plane
/// furthest from A's support and restarts the simplex whenever it moves.
/// Shapes that overlap at the start report no hit.
pub fn shape_cast_pair(input: &ShapeCastPairInput) -> CastOutput {
    let mut output = CastOutput {
        fraction: input.max_fraction,
        ..CastOutput::default()
    };

    let proxy_a = &input.proxy_a;

    let xf_a = &input.transform_a;
    let xf = xf_a.inv_mul_transform(&input.transform_b);

    // Put proxy B in proxy A's frame to reduce round-off error
    let proxy_b = ShapeProxy::with_transform(input.proxy_b.points(), input.proxy_b.radius, &xf);

    let radius = proxy_a.radius + proxy_b.radius;

    let r = xf.q.rotate(input.translation_b);
    let mut lambda = 0.0;
    let max_fraction = input.max_fraction;

    let mut simplex = Simplex::default();

    // Support point in the -r direction
    let mut index_a = proxy_a.find_support(-r);
    let mut w_a = proxy_a.points[index_a];
    let mut index_b = proxy_b.find_support(r);
    let mut w_b = proxy_b.points[index_b];
    let mut v = w_a - w_b;

    // Target distance between the proxies
    let sigma = LINEAR_SLOP.max(radius - LINEAR_SLOP);

    let tolerance = 0.5 * LINEAR_SLOP;
    let mut iteration = 0;
    while iteration < GJK_MAX_ITERATIONS && v.norm() > sigma + tolerance {
        debug_assert!(simplex.count < 3);

        output.iterations += 1;

        // Support in direction -v (A - B)
        index_a = proxy_a.find_support(-v);
        w_a = proxy_a.points[index_a];
        index_b = proxy_b.find_support(v);
        w_b = proxy_b.points[index_b];
        let p = w_a - w_b;

        // -v is a normal at p, normalize to work with sigma
        v = math::normalize_or_zero(v);

        // Intersect the ray with the plane
        let vp = v.dot(&p);
        let vr = v.dot(&r);
        if vp - sigma > lambda * vr {
            if vr <= 0.0 {
                // Miss
                return output;
            }

            lambda = (vp - sigma) / vr;
            if lambda > max_fraction {
                // Too far
                return output;
            }

            // Reset the simplex
            simplex.count = 0;
        }

        // Reverse the simplex since it works with B - A. Shift by lambda * r to
        // find the closest point to the current clip point. The support point
        // p is not shifted so the plane is formed in unshifted space.
        let vertex = &mut simplex.v[simplex.count];
        vertex.index_a = index_b;
        vertex.w_a = w_b + r * lambda;
        vertex.index_b = index_a;
        vertex.w_b = w_a;
        vertex.w = vertex.w_b - vertex.w_a;
        vertex.a = 1.0;
        simplex.count += 1;

        simplex.solve();

        // If we have 3 points, then the origin is in the corresponding triangle
        if simplex.count == 3 {
            // Overlap
            return output;
        }

        v = simplex.closest_point();

        iteration += 1;
    }

    if iteration == 0 || lambda == 0.0 {
        // Initial overlap
        return output;
    }

    // Witness points come back reversed
    let (_point_b, point_a) = simplex.witness_points();

    let n = math::normalize_or_zero(-v);
    let point = point_a + n * proxy_a.radius;

    output.point = xf_a.transform_point(point);
    output.normal = xf_a.q.rotate(n);
    output.fraction = lambda;
    output.iterations = iteration as u32;
    output.hit = true;
    output
}
