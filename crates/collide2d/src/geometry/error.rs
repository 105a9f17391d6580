//! Shape construction errors

use crate::foundation::constants::MAX_POLYGON_VERTICES;

/// Errors raised while building polygons and hulls
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Fewer than three usable points
    #[error("Not enough points: {0} (need at least 3)")]
    TooFewPoints(usize),

    /// More points than a polygon can hold
    #[error("Too many points: {0} (limit is {MAX_POLYGON_VERTICES})")]
    TooManyPoints(usize),

    /// All points lie on a line after welding
    #[error("Degenerate hull: points are collinear or coincident")]
    Degenerate,

    /// A coordinate is NaN or infinite
    #[error("Non-finite coordinate at index {0}")]
    NonFinite(usize),

    /// Hull is not convex or not counter-clockwise
    #[error("Invalid hull: {0}")]
    InvalidHull(String),

    /// Negative or non-finite radius
    #[error("Invalid radius: {0}")]
    InvalidRadius(f32),
}
