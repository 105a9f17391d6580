//! Broad phase tuning

use serde::{Deserialize, Serialize};

use super::Config;
use crate::foundation::constants::AABB_MARGIN;

/// Settings for a [`crate::broad::DynamicTree`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Margin added on every side of a proxy box when it is inserted or moved
    pub aabb_margin: f32,
    /// Node slots reserved up front
    pub initial_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            aabb_margin: AABB_MARGIN,
            initial_capacity: 16,
        }
    }
}

impl Config for TreeConfig {}

impl TreeConfig {
    /// Replace values the tree cannot use with defaults
    pub fn validated(self) -> Self {
        let mut config = self;
        if !config.aabb_margin.is_finite() || config.aabb_margin < 0.0 {
            log::warn!(
                "Rejected aabb_margin {}, using {}",
                config.aabb_margin,
                AABB_MARGIN
            );
            config.aabb_margin = AABB_MARGIN;
        }
        config
    }
}
