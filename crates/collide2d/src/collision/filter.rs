//! Category and mask filtering for candidate pairs
//!
//! A shape carries a category (what it is) and a mask (what it touches). Two
//! shapes are a pair only when each one's category is in the other's mask.
//! The dynamic tree stores the category bits per proxy so traversals can
//! cull on the query mask before any callback runs.

use serde::{Deserialize, Serialize};

use crate::foundation::constants::{DEFAULT_CATEGORY_BITS, DEFAULT_MASK_BITS};

/// Collision filter data for a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Category bits, usually a single bit
    pub category_bits: u64,
    /// Categories this shape accepts
    pub mask_bits: u64,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category_bits: DEFAULT_CATEGORY_BITS,
            mask_bits: DEFAULT_MASK_BITS,
        }
    }
}

impl Filter {
    /// Filter that rejects everything
    pub const NONE: Self = Self {
        category_bits: 0,
        mask_bits: 0,
    };

    /// Create a filter
    pub const fn new(category_bits: u64, mask_bits: u64) -> Self {
        Self {
            category_bits,
            mask_bits,
        }
    }

    /// Check if two filters admit each other
    ///
    /// # Example
    /// ```
    /// use collide2d::collision::Filter;
    ///
    /// const PLAYER: u64 = 1 << 0;
    /// const ENEMY: u64 = 1 << 1;
    /// const WALL: u64 = 1 << 2;
    ///
    /// let player = Filter::new(PLAYER, ENEMY | WALL);
    /// let enemy = Filter::new(ENEMY, PLAYER);
    /// assert!(player.should_collide(&enemy));
    /// ```
    pub const fn should_collide(&self, other: &Self) -> bool {
        (self.category_bits & other.mask_bits) != 0 && (other.category_bits & self.mask_bits) != 0
    }

    /// Check a stored category against a query mask
    #[inline]
    pub const fn accepts(mask_bits: u64, category_bits: u64) -> bool {
        (mask_bits & category_bits) != 0
    }

    /// Combine several category bits into a mask
    pub fn mask(categories: &[u64]) -> u64 {
        categories.iter().fold(0, |acc, &bits| acc | bits)
    }
}
