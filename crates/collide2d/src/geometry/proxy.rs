//! Rounded point cloud used by the distance and cast algorithms

use crate::foundation::constants::MAX_POLYGON_VERTICES;
use crate::foundation::math::{Transform, Vec2};

/// A convex point cloud with a radius.
///
/// Circles are one point, capsules and segments two, polygons up to
/// [`MAX_POLYGON_VERTICES`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeProxy {
    /// The point cloud
    pub points: [Vec2; MAX_POLYGON_VERTICES],
    /// The number of points
    pub count: usize,
    /// The external radius of the point cloud
    pub radius: f32,
}

impl Default for ShapeProxy {
    fn default() -> Self {
        Self {
            points: [Vec2::zeros(); MAX_POLYGON_VERTICES],
            count: 0,
            radius: 0.0,
        }
    }
}

impl ShapeProxy {
    /// Build a proxy from points and a radius.
    ///
    /// At most [`MAX_POLYGON_VERTICES`] points are accepted. Release builds
    /// keep the leading points and drop the rest.
    pub fn new(points: &[Vec2], radius: f32) -> Self {
        debug_assert!(points.len() <= MAX_POLYGON_VERTICES, "too many proxy points: {}", points.len());
        let count = points.len().min(MAX_POLYGON_VERTICES);
        let mut proxy = Self {
            count,
            radius,
            ..Self::default()
        };
        proxy.points[..count].copy_from_slice(&points[..count]);
        proxy
    }

    /// Build a proxy from points moved by a transform
    pub fn with_transform(points: &[Vec2], radius: f32, transform: &Transform) -> Self {
        let mut proxy = Self::new(points, radius);
        for p in &mut proxy.points[..proxy.count] {
            *p = transform.transform_point(*p);
        }
        proxy
    }

    /// The live points
    pub fn points(&self) -> &[Vec2] {
        &self.points[..self.count]
    }

    /// Index of the point furthest along `direction`
    pub fn find_support(&self, direction: Vec2) -> usize {
        let mut best_index = 0;
        let mut best_value = self.points[0].dot(&direction);
        for (i, p) in self.points().iter().enumerate().skip(1) {
            let value = p.dot(&direction);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }
        best_index
    }
}
