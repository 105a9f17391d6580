//! Convex shape primitives
//!
//! All shapes are described in their local frame and positioned with a
//! [`Transform`]. Polygons are stored with precomputed outward normals and a
//! centroid; a two vertex polygon with a radius doubles as a capsule so the
//! polygon routines can handle capsules without a separate code path.

use serde::{Deserialize, Serialize};

use super::aabb::AABB;
use super::error::GeometryError;
use super::hull::Hull;
use super::proxy::ShapeProxy;
use crate::foundation::constants::MAX_POLYGON_VERTICES;
use crate::foundation::math::{self, vec2, Rot, Transform, Vec2};

/// A solid circle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Circle {
    /// Local center
    pub center: Vec2,
    /// Radius
    pub radius: f32,
}

impl Circle {
    /// Create a circle
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// A solid capsule: two semicircles joined by a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Capsule {
    /// Local center of the first semicircle
    pub center1: Vec2,
    /// Local center of the second semicircle
    pub center2: Vec2,
    /// Radius of the semicircles
    pub radius: f32,
}

impl Capsule {
    /// Create a capsule
    pub fn new(center1: Vec2, center2: Vec2, radius: f32) -> Self {
        Self {
            center1,
            center2,
            radius,
        }
    }
}

/// A line segment with two-sided collision
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    /// The first point
    pub point1: Vec2,
    /// The second point
    pub point2: Vec2,
}

impl Segment {
    /// Create a segment
    pub fn new(point1: Vec2, point2: Vec2) -> Self {
        Self { point1, point2 }
    }
}

/// A one-sided segment belonging to a chain.
///
/// The ghost points are the far ends of the neighboring segments. They are
/// never collided against; they only decide which contact normals are
/// admitted near the shared vertices.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainSegment {
    /// The tail ghost vertex
    pub ghost1: Vec2,
    /// The collidable segment
    pub segment: Segment,
    /// The head ghost vertex
    pub ghost2: Vec2,
    /// The owning chain
    pub chain_id: u32,
}

impl ChainSegment {
    /// Create a chain segment
    pub fn new(ghost1: Vec2, segment: Segment, ghost2: Vec2) -> Self {
        Self {
            ghost1,
            segment,
            ghost2,
            chain_id: 0,
        }
    }

    /// Build the one-sided segments of an open chain.
    ///
    /// The end segments use their own far endpoint, extended along the
    /// segment direction, as the ghost so the chain ends are not smoothed.
    pub fn open_chain(points: &[Vec2], chain_id: u32) -> Vec<Self> {
        if points.len() < 2 {
            return Vec::new();
        }
        let n = points.len();
        (0..n - 1)
            .map(|i| {
                let p1 = points[i];
                let p2 = points[i + 1];
                let ghost1 = if i == 0 { p1 + (p1 - p2) } else { points[i - 1] };
                let ghost2 = if i + 2 < n { points[i + 2] } else { p2 + (p2 - p1) };
                Self {
                    ghost1,
                    segment: Segment::new(p1, p2),
                    ghost2,
                    chain_id,
                }
            })
            .collect()
    }
}

/// A solid convex polygon, optionally rounded.
///
/// Vertices are counter-clockwise. The vertex count is at most
/// [`MAX_POLYGON_VERTICES`]; two vertices describe a capsule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// The polygon vertices
    pub vertices: [Vec2; MAX_POLYGON_VERTICES],
    /// The outward edge normals
    pub normals: [Vec2; MAX_POLYGON_VERTICES],
    /// The centroid of the polygon
    pub centroid: Vec2,
    /// The external radius for rounded polygons
    pub radius: f32,
    /// The number of polygon vertices
    pub count: usize,
}

impl Default for Polygon {
    fn default() -> Self {
        Self {
            vertices: [Vec2::zeros(); MAX_POLYGON_VERTICES],
            normals: [Vec2::zeros(); MAX_POLYGON_VERTICES],
            centroid: Vec2::zeros(),
            radius: 0.0,
            count: 0,
        }
    }
}

fn compute_polygon_centroid(vertices: &[Vec2]) -> Vec2 {
    let mut center = Vec2::zeros();
    let mut area = 0.0;

    // Triangle fan about the first vertex keeps the sums small
    let origin = vertices[0];
    let inv3 = 1.0 / 3.0;

    for i in 1..vertices.len() - 1 {
        let e1 = vertices[i] - origin;
        let e2 = vertices[i + 1] - origin;
        let a = 0.5 * math::cross(e1, e2);

        center += (e1 + e2) * (a * inv3);
        area += a;
    }

    debug_assert!(area > f32::EPSILON);
    center / area + origin
}

impl Polygon {
    /// Build a polygon from a validated convex hull
    pub fn from_hull(hull: &Hull, radius: f32) -> Result<Self, GeometryError> {
        if hull.count() < 3 {
            return Err(GeometryError::TooFewPoints(hull.count()));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(GeometryError::InvalidRadius(radius));
        }

        let points = hull.points();
        let count = points.len();
        let mut shape = Self {
            count,
            radius,
            ..Self::default()
        };
        shape.vertices[..count].copy_from_slice(points);

        for i in 0..count {
            let i2 = if i + 1 < count { i + 1 } else { 0 };
            let edge = points[i2] - points[i];
            if edge.norm_squared() <= f32::EPSILON * f32::EPSILON {
                return Err(GeometryError::Degenerate);
            }
            shape.normals[i] = math::normalize_or_zero(math::cross_vs(edge, 1.0));
        }

        shape.centroid = compute_polygon_centroid(points);
        Ok(shape)
    }

    /// Build an offset polygon from a hull
    pub fn from_hull_offset(
        hull: &Hull,
        radius: f32,
        transform: &Transform,
    ) -> Result<Self, GeometryError> {
        let local = Self::from_hull(hull, radius)?;
        Ok(local.transformed(transform))
    }

    /// Square with the given half-width
    pub fn make_square(half_width: f32) -> Self {
        Self::make_box(half_width, half_width)
    }

    /// Box centered on the origin
    pub fn make_box(half_width: f32, half_height: f32) -> Self {
        debug_assert!(half_width.is_finite() && half_width > 0.0);
        debug_assert!(half_height.is_finite() && half_height > 0.0);

        let mut shape = Self {
            count: 4,
            ..Self::default()
        };
        shape.vertices[0] = vec2(-half_width, -half_height);
        shape.vertices[1] = vec2(half_width, -half_height);
        shape.vertices[2] = vec2(half_width, half_height);
        shape.vertices[3] = vec2(-half_width, half_height);
        shape.normals[0] = vec2(0.0, -1.0);
        shape.normals[1] = vec2(1.0, 0.0);
        shape.normals[2] = vec2(0.0, 1.0);
        shape.normals[3] = vec2(-1.0, 0.0);
        shape
    }

    /// Box with rounded corners
    pub fn make_rounded_box(half_width: f32, half_height: f32, radius: f32) -> Self {
        debug_assert!(radius.is_finite() && radius >= 0.0);
        Self {
            radius,
            ..Self::make_box(half_width, half_height)
        }
    }

    /// Box offset from the origin and rotated
    pub fn make_offset_box(half_width: f32, half_height: f32, center: Vec2, rotation: Rot) -> Self {
        Self::make_box(half_width, half_height).transformed(&Transform::new(center, rotation))
    }

    /// Rounded box offset from the origin and rotated
    pub fn make_offset_rounded_box(
        half_width: f32,
        half_height: f32,
        center: Vec2,
        rotation: Rot,
        radius: f32,
    ) -> Self {
        Self::make_rounded_box(half_width, half_height, radius)
            .transformed(&Transform::new(center, rotation))
    }

    /// Capsule expressed as a rounded two vertex polygon
    pub fn make_capsule(p1: Vec2, p2: Vec2, radius: f32) -> Self {
        let mut shape = Self {
            count: 2,
            radius,
            centroid: math::lerp(p1, p2, 0.5),
            ..Self::default()
        };
        shape.vertices[0] = p1;
        shape.vertices[1] = p2;

        let axis = math::normalize_or_zero(p2 - p1);
        let normal = math::right_perp(axis);
        shape.normals[0] = normal;
        shape.normals[1] = -normal;
        shape
    }

    /// Move the polygon into another frame
    pub fn transformed(&self, transform: &Transform) -> Self {
        let mut p = *self;
        for i in 0..p.count {
            p.vertices[i] = transform.transform_point(p.vertices[i]);
            p.normals[i] = transform.q.rotate(p.normals[i]);
        }
        p.centroid = transform.transform_point(p.centroid);
        p
    }

    /// The live vertices
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    /// The live normals
    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }
}

/// Shape discriminant, ordered so dispatch can canonicalize pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    /// A circle with an offset
    Circle,
    /// A capsule
    Capsule,
    /// A two-sided segment
    Segment,
    /// A convex polygon
    Polygon,
    /// A one-sided chain segment
    ChainSegment,
}

/// Any supported convex primitive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Circle
    Circle(Circle),
    /// Capsule
    Capsule(Capsule),
    /// Segment
    Segment(Segment),
    /// Polygon
    Polygon(Polygon),
    /// Chain segment
    ChainSegment(ChainSegment),
}

impl Shape {
    /// The shape discriminant
    pub fn kind(&self) -> ShapeType {
        match self {
            Self::Circle(_) => ShapeType::Circle,
            Self::Capsule(_) => ShapeType::Capsule,
            Self::Segment(_) => ShapeType::Segment,
            Self::Polygon(_) => ShapeType::Polygon,
            Self::ChainSegment(_) => ShapeType::ChainSegment,
        }
    }

    /// Bounding box of the shape in the frame given by `transform`
    pub fn compute_aabb(&self, transform: &Transform) -> AABB {
        match self {
            Self::Circle(c) => compute_circle_aabb(c, transform),
            Self::Capsule(c) => compute_capsule_aabb(c, transform),
            Self::Segment(s) => compute_segment_aabb(s, transform),
            Self::Polygon(p) => compute_polygon_aabb(p, transform),
            Self::ChainSegment(c) => compute_segment_aabb(&c.segment, transform),
        }
    }

    /// Local point cloud used by the distance and cast algorithms
    pub fn make_proxy(&self) -> ShapeProxy {
        match self {
            Self::Circle(c) => ShapeProxy::new(&[c.center], c.radius),
            Self::Capsule(c) => ShapeProxy::new(&[c.center1, c.center2], c.radius),
            Self::Segment(s) => ShapeProxy::new(&[s.point1, s.point2], 0.0),
            Self::Polygon(p) => ShapeProxy::new(p.vertices(), p.radius),
            Self::ChainSegment(c) => ShapeProxy::new(&[c.segment.point1, c.segment.point2], 0.0),
        }
    }

    /// Test a local point for overlap. Segments have no area and never contain a point.
    pub fn test_point(&self, transform: &Transform, point: Vec2) -> bool {
        let local = transform.inv_transform_point(point);
        match self {
            Self::Circle(c) => point_in_circle(local, c),
            Self::Capsule(c) => point_in_capsule(local, c),
            Self::Polygon(p) => point_in_polygon(local, p),
            Self::Segment(_) | Self::ChainSegment(_) => false,
        }
    }
}

/// Bounding box of a transformed circle
pub fn compute_circle_aabb(shape: &Circle, transform: &Transform) -> AABB {
    let p = transform.transform_point(shape.center);
    let r = vec2(shape.radius, shape.radius);
    AABB::new(p - r, p + r)
}

/// Bounding box of a transformed capsule
pub fn compute_capsule_aabb(shape: &Capsule, transform: &Transform) -> AABB {
    let v1 = transform.transform_point(shape.center1);
    let v2 = transform.transform_point(shape.center2);
    let r = vec2(shape.radius, shape.radius);
    AABB::new(math::min(v1, v2) - r, math::max(v1, v2) + r)
}

/// Bounding box of a transformed polygon, including its radius
pub fn compute_polygon_aabb(shape: &Polygon, transform: &Transform) -> AABB {
    debug_assert!(shape.count > 0);
    let first = transform.transform_point(shape.vertices[0]);
    let (lower, upper) = shape.vertices()[1..]
        .iter()
        .map(|v| transform.transform_point(*v))
        .fold((first, first), |(lo, hi), v| (math::min(lo, v), math::max(hi, v)));
    let r = vec2(shape.radius, shape.radius);
    AABB::new(lower - r, upper + r)
}

/// Bounding box of a transformed segment
pub fn compute_segment_aabb(shape: &Segment, transform: &Transform) -> AABB {
    let v1 = transform.transform_point(shape.point1);
    let v2 = transform.transform_point(shape.point2);
    AABB::new(math::min(v1, v2), math::max(v1, v2))
}

/// Test a point in the circle's local frame
pub fn point_in_circle(point: Vec2, shape: &Circle) -> bool {
    (point - shape.center).norm_squared() <= shape.radius * shape.radius
}

/// Test a point in the capsule's local frame
pub fn point_in_capsule(point: Vec2, shape: &Capsule) -> bool {
    let closest = closest_point_on_segment(point, shape.center1, shape.center2);
    (point - closest).norm_squared() <= shape.radius * shape.radius
}

/// Test a point in the polygon's local frame, including the rounded border
pub fn point_in_polygon(point: Vec2, shape: &Polygon) -> bool {
    let count = shape.count;
    let inside_core = (0..count).all(|i| shape.normals[i].dot(&(point - shape.vertices[i])) <= 0.0);
    if inside_core {
        return true;
    }
    if shape.radius == 0.0 {
        return false;
    }

    let r2 = shape.radius * shape.radius;
    (0..count).any(|i| {
        let i2 = if i + 1 < count { i + 1 } else { 0 };
        let closest = closest_point_on_segment(point, shape.vertices[i], shape.vertices[i2]);
        (point - closest).norm_squared() <= r2
    })
}

pub(crate) fn closest_point_on_segment(point: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let e = b - a;
    let ee = e.norm_squared();
    if ee < f32::EPSILON * f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(&e) / ee).clamp(0.0, 1.0);
    a + e * t
}
