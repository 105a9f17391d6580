//! Tree queries
//!
//! All traversals use an explicit stack and prune on the node box and on the
//! category bits summarized at every internal node. Callbacks must not modify
//! the tree; the borrow checker enforces this since traversals hold `&self`.

use super::dynamic_tree::{DynamicTree, NodeId, NodeKind, ProxyId, TreeStats};
use crate::collision::filter::Filter;
use crate::foundation::math::{self, Vec2};
use crate::geometry::aabb::AABB;
use crate::geometry::cast::{RayCastInput, ShapeCastInput};

const STACK_CAPACITY: usize = 64;

impl DynamicTree {
    /// Visit every proxy whose fat box overlaps `aabb` and whose category is
    /// accepted by `mask_bits`.
    ///
    /// The callback returns `false` to stop the query.
    pub fn query<F>(&self, aabb: &AABB, mask_bits: u64, mut callback: F) -> TreeStats
    where
        F: FnMut(ProxyId, u64) -> bool,
    {
        let mut stats = TreeStats::default();

        let Some(root) = self.root else {
            return stats;
        };

        let mut stack: Vec<NodeId> = Vec::with_capacity(STACK_CAPACITY);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            stats.node_visits += 1;

            if !node.aabb.overlaps(aabb) || !Filter::accepts(mask_bits, node.category_bits) {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { user_data } => {
                    stats.leaf_visits += 1;
                    if !callback(ProxyId(index), user_data) {
                        return stats;
                    }
                }
                NodeKind::Internal { child1, child2 } => {
                    stack.push(child1);
                    stack.push(child2);
                }
            }
        }

        stats
    }

    /// Cast a ray through the tree.
    ///
    /// The callback receives the input clipped to the current max fraction and
    /// returns the new max fraction:
    /// - `0` terminates the cast
    /// - a value in `(0, max_fraction]` clips the ray
    /// - a negative value ignores the proxy
    /// - `input.max_fraction` continues unclipped
    ///
    /// # Panics
    /// In debug builds if the ray is not valid.
    pub fn ray_cast<F>(&self, input: &RayCastInput, mask_bits: u64, mut callback: F) -> TreeStats
    where
        F: FnMut(&RayCastInput, ProxyId, u64) -> f32,
    {
        debug_assert!(input.is_valid());

        let mut stats = TreeStats::default();

        let Some(root) = self.root else {
            return stats;
        };

        let p1 = input.origin;
        let d = input.translation;

        let r = math::normalize_or_zero(d);

        // v is perpendicular to the segment
        let v = math::cross_sv(1.0, r);
        let abs_v = math::abs(v);

        // Separating axis for segment (Gino, p80).
        // |dot(v, p1 - c)| > dot(|v|, h)

        let mut max_fraction = input.max_fraction;

        // Bounding box for the segment
        let mut segment_aabb = segment_box(p1, p1 + d * max_fraction);

        let mut sub_input = *input;

        let mut stack: Vec<NodeId> = Vec::with_capacity(STACK_CAPACITY);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            stats.node_visits += 1;

            if !Filter::accepts(mask_bits, node.category_bits) || !node.aabb.overlaps(&segment_aabb) {
                continue;
            }

            let c = node.aabb.center();
            let h = node.aabb.extents();
            let term1 = v.dot(&(p1 - c)).abs();
            let term2 = abs_v.dot(&h);
            if term2 < term1 {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { user_data } => {
                    sub_input.max_fraction = max_fraction;

                    let value = callback(&sub_input, ProxyId(index), user_data);
                    stats.leaf_visits += 1;

                    if value == 0.0 {
                        // The client has terminated the ray cast
                        return stats;
                    }

                    if 0.0 < value && value <= max_fraction {
                        max_fraction = value;
                        segment_aabb = segment_box(p1, p1 + d * max_fraction);
                    }
                }
                NodeKind::Internal { child1, child2 } => {
                    stack.push(child1);
                    stack.push(child2);
                }
            }
        }

        stats
    }

    /// Sweep a shape through the tree.
    ///
    /// Callback semantics match [`Self::ray_cast`].
    pub fn shape_cast<F>(&self, input: &ShapeCastInput, mask_bits: u64, mut callback: F) -> TreeStats
    where
        F: FnMut(&ShapeCastInput, ProxyId, u64) -> f32,
    {
        let mut stats = TreeStats::default();

        let Some(root) = self.root else {
            return stats;
        };
        let points = input.proxy.points();
        if points.is_empty() {
            return stats;
        }

        let mut origin_aabb = AABB::new(points[0], points[0]);
        for &p in &points[1..] {
            origin_aabb.lower_bound = math::min(origin_aabb.lower_bound, p);
            origin_aabb.upper_bound = math::max(origin_aabb.upper_bound, p);
        }
        let origin_aabb = origin_aabb.fattened(input.proxy.radius);

        let p1 = origin_aabb.center();
        let extension = origin_aabb.extents();

        // v is perpendicular to the segment
        let r = input.translation;
        let v = math::cross_sv(1.0, r);
        let abs_v = math::abs(v);

        let mut max_fraction = input.max_fraction;

        // Box around the whole sweep
        let mut total_aabb = swept_box(&origin_aabb, r * max_fraction);

        let mut sub_input = *input;

        let mut stack: Vec<NodeId> = Vec::with_capacity(STACK_CAPACITY);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            stats.node_visits += 1;

            if !Filter::accepts(mask_bits, node.category_bits) || !node.aabb.overlaps(&total_aabb) {
                continue;
            }

            // The swept shape's extents are added to the node
            let c = node.aabb.center();
            let h = node.aabb.extents() + extension;
            let term1 = v.dot(&(p1 - c)).abs();
            let term2 = abs_v.dot(&h);
            if term2 < term1 {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { user_data } => {
                    sub_input.max_fraction = max_fraction;

                    let value = callback(&sub_input, ProxyId(index), user_data);
                    stats.leaf_visits += 1;

                    if value == 0.0 {
                        return stats;
                    }

                    if 0.0 < value && value < max_fraction {
                        max_fraction = value;
                        total_aabb = swept_box(&origin_aabb, r * max_fraction);
                    }
                }
                NodeKind::Internal { child1, child2 } => {
                    stack.push(child1);
                    stack.push(child2);
                }
            }
        }

        stats
    }
}

fn segment_box(p1: Vec2, p2: Vec2) -> AABB {
    AABB::new(math::min(p1, p2), math::max(p1, p2))
}

fn swept_box(aabb: &AABB, t: Vec2) -> AABB {
    AABB::new(
        math::min(aabb.lower_bound, aabb.lower_bound + t),
        math::max(aabb.upper_bound, aabb.upper_bound + t),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::vec2;
    use crate::geometry::proxy::ShapeProxy;

    fn grid_tree() -> (DynamicTree, Vec<ProxyId>) {
        let mut tree = DynamicTree::new();
        let mut ids = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                let lower = vec2(i as f32 * 3.0, j as f32 * 3.0);
                let category = if (i + j) % 2 == 0 { 0b01 } else { 0b10 };
                ids.push(tree.create_proxy(AABB::new(lower, lower + vec2(1.0, 1.0)), category, (j * 4 + i) as u64));
            }
        }
        (tree, ids)
    }

    #[test]
    fn test_query_region() {
        let (tree, _) = grid_tree();
        let mut hits = Vec::new();
        let stats = tree.query(&AABB::new(vec2(-0.5, -0.5), vec2(4.5, 1.5)), u64::MAX, |_, data| {
            hits.push(data);
            true
        });
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
        assert_eq!(stats.leaf_visits, 2);
        assert!(stats.node_visits >= 3);
    }

    #[test]
    fn test_query_mask_prunes() {
        let (tree, _) = grid_tree();
        let mut hits = Vec::new();
        tree.query(&AABB::new(vec2(-1.0, -1.0), vec2(20.0, 20.0)), 0b10, |id, data| {
            assert_eq!(tree.get_category_bits(id), 0b10);
            hits.push(data);
            true
        });
        assert_eq!(hits.len(), 8);
    }

    #[test]
    fn test_query_early_exit() {
        let (tree, _) = grid_tree();
        let mut count = 0;
        let stats = tree.query(&AABB::new(vec2(-1.0, -1.0), vec2(20.0, 20.0)), u64::MAX, |_, _| {
            count += 1;
            false
        });
        assert_eq!(count, 1);
        assert_eq!(stats.leaf_visits, 1);
    }

    #[test]
    fn test_ray_cast_clips_to_closest() {
        let (tree, _) = grid_tree();

        // Ray along the bottom row, y = 0.5
        let input = RayCastInput::new(vec2(-5.0, 0.5), vec2(20.0, 0.0), 1.0);
        let mut closest = (f32::MAX, u64::MAX);
        tree.ray_cast(&input, u64::MAX, |sub, id, data| {
            let output = tree.fat_aabb(id).ray_cast(sub);
            if !output.hit {
                return -1.0;
            }
            if output.fraction < closest.0 {
                closest = (output.fraction, data);
            }
            output.fraction
        });

        assert_eq!(closest.1, 0);
    }

    #[test]
    fn test_ray_cast_terminate() {
        let (tree, _) = grid_tree();
        let input = RayCastInput::new(vec2(-5.0, 0.5), vec2(20.0, 0.0), 1.0);
        let mut calls = 0;
        tree.ray_cast(&input, u64::MAX, |_, _, _| {
            calls += 1;
            0.0
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_ray_misses_empty_tree() {
        let tree = DynamicTree::new();
        let input = RayCastInput::new(Vec2::zeros(), vec2(1.0, 0.0), 1.0);
        let stats = tree.ray_cast(&input, u64::MAX, |_, _, _| panic!("no proxies"));
        assert_eq!(stats, TreeStats::default());
    }

    #[test]
    fn test_shape_cast_visits_column() {
        let (tree, _) = grid_tree();

        // Sweep a small box up the first column
        let proxy = ShapeProxy::new(&[vec2(0.2, -2.0), vec2(0.8, -2.0), vec2(0.8, -1.6), vec2(0.2, -1.6)], 0.0);
        let input = ShapeCastInput::new(proxy, vec2(0.0, 20.0), 1.0);

        let mut hits = Vec::new();
        tree.shape_cast(&input, u64::MAX, |sub, _, data| {
            hits.push(data);
            sub.max_fraction
        });
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 4, 8, 12]);
    }
}
