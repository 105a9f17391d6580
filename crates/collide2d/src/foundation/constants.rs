//! Engine-wide tuning constants
//!
//! Lengths are in meters. The values assume objects between roughly 0.1 and
//! 10 meters; scaling the world far outside that range degrades the
//! tolerances below.

/// Collision and constraint tolerance. Chosen to be numerically significant
/// but visually insignificant.
pub const LINEAR_SLOP: f32 = 0.005;

/// Contacts are generated up to this far apart so the solver can react before
/// shapes touch.
pub const SPECULATIVE_DISTANCE: f32 = 4.0 * LINEAR_SLOP;

/// Default fattening applied to broad-phase proxies.
pub const AABB_MARGIN: f32 = 0.1;

/// Maximum number of vertices on a convex polygon.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Rounding radius used by the rounded box helpers.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Default category of a proxy.
pub const DEFAULT_CATEGORY_BITS: u64 = 1;

/// Default mask, accepting every category.
pub const DEFAULT_MASK_BITS: u64 = u64::MAX;

/// Iteration cap for GJK distance and shape cast loops.
pub const GJK_MAX_ITERATIONS: usize = 20;
