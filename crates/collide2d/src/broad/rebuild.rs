//! Top-down tree rebuild
//!
//! Collects subtrees to keep as leaves, frees the internal nodes above them,
//! then builds a new hierarchy by recursively partitioning the leaves with a
//! binned surface area heuristic along the longest centroid axis.

use super::dynamic_tree::{DynamicTree, NodeId, NodeKind, TreeNode};
use crate::foundation::math::{self, vec2, Vec2};
use crate::geometry::aabb::AABB;

const BIN_COUNT: usize = 64;
const PLANE_COUNT: usize = BIN_COUNT - 1;

/// Buffers reused across rebuilds
#[derive(Debug, Clone, Default)]
pub(crate) struct RebuildScratch {
    leaf_indices: Vec<NodeId>,
    leaf_boxes: Vec<AABB>,
    leaf_centers: Vec<Vec2>,
    bin_indices: Vec<usize>,
}

impl RebuildScratch {
    fn clear(&mut self) {
        self.leaf_indices.clear();
        self.leaf_boxes.clear();
        self.leaf_centers.clear();
        self.bin_indices.clear();
    }

    fn push(&mut self, index: NodeId, aabb: AABB) {
        self.leaf_indices.push(index);
        self.leaf_boxes.push(aabb);
        self.leaf_centers.push(aabb.center());
        self.bin_indices.push(0);
    }

    fn len(&self) -> usize {
        self.leaf_indices.len()
    }

    pub(crate) fn byte_count(&self) -> usize {
        self.leaf_indices.capacity() * std::mem::size_of::<NodeId>()
            + self.leaf_boxes.capacity() * std::mem::size_of::<AABB>()
            + self.leaf_centers.capacity() * std::mem::size_of::<Vec2>()
            + self.bin_indices.capacity() * std::mem::size_of::<usize>()
    }

    // Swap two entries in every parallel array
    fn swap(&mut self, i: usize, j: usize) {
        self.leaf_indices.swap(i, j);
        self.leaf_boxes.swap(i, j);
        self.leaf_centers.swap(i, j);
        self.bin_indices.swap(i, j);
    }

    /// Split `start..end` in two and return the split index.
    ///
    /// Leaves are binned by centroid along the longest axis of the centroid
    /// bounds. The plane between bins with the lowest count-weighted perimeter
    /// cost wins, and the range is partitioned in place around it.
    fn partition_sah(&mut self, start: usize, end: usize) -> usize {
        let count = end - start;
        debug_assert!(count > 1);

        let centers = &self.leaf_centers[start..end];
        let mut centroid_lower = centers[0];
        let mut centroid_upper = centers[0];
        for &c in &centers[1..] {
            centroid_lower = math::min(centroid_lower, c);
            centroid_upper = math::max(centroid_upper, c);
        }

        let d = centroid_upper - centroid_lower;

        // Longest axis
        let axis = usize::from(d.x <= d.y);
        let span = d[axis];
        let inv_d = if span > 0.0 { 1.0 / span } else { 0.0 };
        let min_c = centroid_lower[axis];

        let empty = AABB::new(vec2(f32::MAX, f32::MAX), vec2(-f32::MAX, -f32::MAX));
        let mut bin_boxes = [empty; BIN_COUNT];
        let mut bin_counts = [0usize; BIN_COUNT];

        // Assign boxes to bins and compute bin boxes
        for i in start..end {
            let c = self.leaf_centers[i][axis];
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bin = ((BIN_COUNT as f32 * (c - min_c) * inv_d) as usize).min(BIN_COUNT - 1);
            self.bin_indices[i] = bin;
            bin_counts[bin] += 1;
            bin_boxes[bin] = bin_boxes[bin].union(&self.leaf_boxes[i]);
        }

        // Left side of each plane
        let mut left_counts = [0usize; PLANE_COUNT];
        let mut left_boxes = [empty; PLANE_COUNT];
        left_counts[0] = bin_counts[0];
        left_boxes[0] = bin_boxes[0];
        for i in 1..PLANE_COUNT {
            left_counts[i] = left_counts[i - 1] + bin_counts[i];
            left_boxes[i] = left_boxes[i - 1].union(&bin_boxes[i]);
        }

        // Right side of each plane
        let mut right_counts = [0usize; PLANE_COUNT];
        let mut right_boxes = [empty; PLANE_COUNT];
        right_counts[PLANE_COUNT - 1] = bin_counts[PLANE_COUNT];
        right_boxes[PLANE_COUNT - 1] = bin_boxes[PLANE_COUNT];
        for i in (0..PLANE_COUNT - 1).rev() {
            right_counts[i] = right_counts[i + 1] + bin_counts[i + 1];
            right_boxes[i] = right_boxes[i + 1].union(&bin_boxes[i + 1]);
        }

        // Find the split that minimizes the heuristic
        let mut min_cost = f32::MAX;
        let mut best_plane = 0;
        for i in 0..PLANE_COUNT {
            let left_count = left_counts[i];
            let right_count = right_counts[i];
            if left_count == 0 || right_count == 0 {
                continue;
            }

            #[allow(clippy::cast_precision_loss)]
            let cost = left_count as f32 * left_boxes[i].perimeter() + right_count as f32 * right_boxes[i].perimeter();
            if cost < min_cost {
                best_plane = i;
                min_cost = cost;
            }
        }

        // Hoare partition around the plane
        let mut i1 = start;
        let mut i2 = end;
        while i1 < i2 {
            while i1 < i2 && self.bin_indices[i1] <= best_plane {
                i1 += 1;
            }
            while i1 < i2 && self.bin_indices[i2 - 1] > best_plane {
                i2 -= 1;
            }
            if i1 < i2 {
                self.swap(i1, i2 - 1);
                i1 += 1;
                i2 -= 1;
            }
        }
        debug_assert_eq!(i1, i2);

        if i1 > start && i1 < end {
            i1
        } else {
            // All centroids coincide; split down the middle
            start + count / 2
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BuildItem {
    node: NodeId,
    child_count: u8,
    start: usize,
    split: usize,
    end: usize,
}

impl DynamicTree {
    /// Rebuild the tree top-down.
    ///
    /// A full build replaces every internal node. Otherwise only internal
    /// nodes flagged by [`Self::enlarge_proxy`] are replaced and untouched
    /// subtrees are kept whole. Returns the number of subtrees that were
    /// partitioned, which is the proxy count for a full build.
    pub fn rebuild(&mut self, full_build: bool) -> usize {
        let Some(root) = self.root else {
            return 0;
        };

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();

        // Gather every proxy that grew and every internal node that did not.
        // Both are leaves of the rebuild. Free the internal nodes that grew.
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = self.nodes[index];
            match node.kind {
                NodeKind::Internal { child1, child2 } if full_build || node.enlarged => {
                    self.nodes.remove(index);
                    stack.push(child2);
                    stack.push(child1);
                }
                _ => {
                    let keep = &mut self.nodes[index];
                    keep.parent = None;
                    if keep.is_leaf() {
                        keep.enlarged = false;
                    }
                    scratch.push(index, keep.aabb);
                }
            }
        }

        let leaf_count = scratch.len();
        let new_root = self.build_tree(&mut scratch);
        self.root = Some(new_root);
        self.scratch = scratch;

        log::debug!(
            "Rebuilt dynamic tree ({}) from {} subtrees, height {}",
            if full_build { "full" } else { "partial" },
            leaf_count,
            self.get_height()
        );

        leaf_count
    }

    fn build_tree(&mut self, scratch: &mut RebuildScratch) -> NodeId {
        let leaf_count = scratch.len();
        debug_assert!(leaf_count > 0);

        if leaf_count == 1 {
            let index = scratch.leaf_indices[0];
            self.nodes[index].parent = None;
            return index;
        }

        let root = self.allocate_node(TreeNode::internal());
        let mut stack = vec![BuildItem {
            node: root,
            child_count: 0,
            start: 0,
            split: scratch.partition_sah(0, leaf_count),
            end: leaf_count,
        }];

        while let Some(item) = stack.last_mut() {
            if item.child_count == 2 {
                // Both children are established
                let node = item.node;
                stack.pop();
                self.refit(node);
                continue;
            }

            let side = item.child_count;
            item.child_count += 1;
            let parent = item.node;
            let (start, end) = if side == 0 {
                (item.start, item.split)
            } else {
                (item.split, item.end)
            };

            let child = if end - start == 1 {
                scratch.leaf_indices[start]
            } else {
                let node = self.allocate_node(TreeNode::internal());
                stack.push(BuildItem {
                    node,
                    child_count: 0,
                    start,
                    split: scratch.partition_sah(start, end),
                    end,
                });
                node
            };

            self.nodes[child].parent = Some(parent);
            if let NodeKind::Internal { child1, child2 } = &mut self.nodes[parent].kind {
                if side == 0 {
                    *child1 = child;
                } else {
                    *child2 = child;
                }
            }
        }

        root
    }
}
