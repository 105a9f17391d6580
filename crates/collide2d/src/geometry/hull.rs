//! Convex hull construction
//!
//! Hulls are built with gift wrapping over at most [`MAX_POLYGON_VERTICES`]
//! points. Points closer than [`LINEAR_SLOP`] are welded and vertices that lie
//! within a slop of the line through their neighbors are removed, so the
//! resulting polygon has no tiny or flat edges for the manifold code to trip on.

use super::error::GeometryError;
use crate::foundation::constants::{LINEAR_SLOP, MAX_POLYGON_VERTICES};
use crate::foundation::math::{self, Vec2};

/// A counter-clockwise convex hull
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hull {
    points: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
}

impl Hull {
    /// Wrap points that are already a convex counter-clockwise hull
    pub fn new(points: &[Vec2]) -> Result<Self, GeometryError> {
        check_input(points)?;
        let hull = Self::from_slice(points);
        validate_hull(&hull)?;
        Ok(hull)
    }

    fn from_slice(points: &[Vec2]) -> Self {
        let mut hull = Self {
            points: [Vec2::zeros(); MAX_POLYGON_VERTICES],
            count: points.len(),
        };
        hull.points[..points.len()].copy_from_slice(points);
        hull
    }

    /// Hull vertices in counter-clockwise order
    pub fn points(&self) -> &[Vec2] {
        &self.points[..self.count]
    }

    /// Number of hull vertices
    pub fn count(&self) -> usize {
        self.count
    }
}

fn check_input(points: &[Vec2]) -> Result<(), GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints(points.len()));
    }
    if points.len() > MAX_POLYGON_VERTICES {
        return Err(GeometryError::TooManyPoints(points.len()));
    }
    if let Some(i) = points.iter().position(|p| !math::is_valid_vec2(*p)) {
        return Err(GeometryError::NonFinite(i));
    }
    Ok(())
}

/// Compute the convex hull of a point cloud
pub fn compute_hull(points: &[Vec2]) -> Result<Hull, GeometryError> {
    check_input(points)?;

    // Weld close points
    let tol_sqr = 16.0 * LINEAR_SLOP * LINEAR_SLOP;
    let mut welded: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        if welded.iter().all(|q| (p - q).norm_squared() >= tol_sqr) {
            welded.push(*p);
        }
    }
    if welded.len() < 3 {
        return Err(GeometryError::TooFewPoints(welded.len()));
    }

    // Start from the lowest-left point, which is always on the hull
    let start = welded
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
        .map_or(0, |(i, _)| i);

    let mut hull: Vec<Vec2> = Vec::with_capacity(welded.len());
    let mut current = start;
    loop {
        hull.push(welded[current]);

        let mut candidate = if current == 0 { 1 } else { 0 };
        for (i, p) in welded.iter().enumerate() {
            if i == current || i == candidate {
                continue;
            }
            let c = welded[current];
            let e = welded[candidate] - c;
            let turn = math::cross(e, p - c);
            // Clockwise of the candidate edge, or collinear and farther
            if turn < 0.0 || (turn == 0.0 && (p - c).norm_squared() > e.norm_squared()) {
                candidate = i;
            }
        }

        current = candidate;
        if current == start || hull.len() > welded.len() {
            break;
        }
    }

    if hull.len() > welded.len() {
        return Err(GeometryError::Degenerate);
    }

    // Remove collinear points until none remain
    let linear_slop = LINEAR_SLOP;
    let mut searching = true;
    while searching && hull.len() > 2 {
        searching = false;
        let n = hull.len();
        for i in 0..n {
            let p1 = hull[(i + n - 1) % n];
            let p2 = hull[i];
            let p3 = hull[(i + 1) % n];

            let (_, e) = math::get_length_and_normalize(p3 - p1);
            let distance = math::cross(p2 - p1, e);
            if distance <= 2.0 * linear_slop {
                hull.remove(i);
                searching = true;
                break;
            }
        }
    }

    if hull.len() < 3 {
        return Err(GeometryError::Degenerate);
    }

    Ok(Hull::from_slice(&hull))
}

/// Check that a hull is convex, counter-clockwise, and free of collinear vertices
pub fn validate_hull(hull: &Hull) -> Result<(), GeometryError> {
    let points = hull.points();
    let n = points.len();
    if !(3..=MAX_POLYGON_VERTICES).contains(&n) {
        return Err(GeometryError::InvalidHull(format!("vertex count {n}")));
    }

    // Every other point must be strictly to the left of each edge
    for i in 0..n {
        let i2 = (i + 1) % n;
        let p = points[i];
        let e = math::normalize_or_zero(points[i2] - p);

        for (j, q) in points.iter().enumerate() {
            if j == i || j == i2 {
                continue;
            }
            if math::cross(e, q - p) <= 0.0 {
                return Err(GeometryError::InvalidHull(format!(
                    "vertex {j} is not inside edge {i}"
                )));
            }
        }
    }

    // No collinear vertices
    for i in 0..n {
        let p1 = points[(i + n - 1) % n];
        let p2 = points[i];
        let p3 = points[(i + 1) % n];

        let e = math::normalize_or_zero(p3 - p1);
        if math::cross(p2 - p1, e) <= LINEAR_SLOP {
            return Err(GeometryError::InvalidHull(format!("vertex {i} is collinear")));
        }
    }

    Ok(())
}
