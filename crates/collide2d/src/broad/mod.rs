//! Broad phase
//!
//! The dynamic AABB tree and its traversals.

mod dynamic_tree;
mod insert;
mod rebuild;
mod traverse;
mod validate;

pub use dynamic_tree::{DynamicTree, ProxyId, TreeStats};
