//! Leaf insertion and removal
//!
//! Insertion descends from the root toward the sibling that minimizes the
//! total perimeter of the tree, using a branch and bound on the inherited
//! cost. Ancestors are refit on the way back up and rotated when swapping a
//! child with a grandchild lowers the cost.

use super::dynamic_tree::{DynamicTree, NodeId, NodeKind, TreeNode};
use crate::geometry::aabb::AABB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

impl DynamicTree {
    fn find_best_sibling(&self, box_d: &AABB) -> NodeId {
        let Some(root) = self.root else {
            unreachable!("sibling search on an empty tree")
        };

        let center_d = box_d.center();
        let area_d = box_d.perimeter();

        let root_box = self.nodes[root].aabb;

        // Area of the current node
        let mut area_base = root_box.perimeter();

        // Area of the current node plus D
        let mut direct_cost = root_box.union(box_d).perimeter();

        // Area increase of all ancestors
        let mut inherited_cost = 0.0;

        let mut best_sibling = root;
        let mut best_cost = direct_cost;

        let mut index = root;
        while let Some((child1, child2)) = self.nodes[index].children() {
            // Cost of creating a new parent for this node and the new leaf
            let cost = direct_cost + inherited_cost;
            if cost < best_cost {
                best_sibling = index;
                best_cost = cost;
            }

            // Inheritance cost seen by children
            inherited_cost += direct_cost - area_base;

            let node1 = &self.nodes[child1];
            let node2 = &self.nodes[child2];
            let leaf1 = node1.is_leaf();
            let leaf2 = node2.is_leaf();

            // Cost of descending into child 1
            let mut lower_cost1 = f32::MAX;
            let direct_cost1 = node1.aabb.union(box_d).perimeter();
            let mut area1 = 0.0;
            if leaf1 {
                // Child 1 is a leaf. Cost of creating a new parent node and the new leaf.
                let cost1 = direct_cost1 + inherited_cost;
                if cost1 < best_cost {
                    best_sibling = child1;
                    best_cost = cost1;
                }
            } else {
                // Lower bound cost of inserting under child 1
                area1 = node1.aabb.perimeter();
                lower_cost1 = inherited_cost + direct_cost1 + (area_d - area1).min(0.0);
            }

            // Cost of descending into child 2
            let mut lower_cost2 = f32::MAX;
            let direct_cost2 = node2.aabb.union(box_d).perimeter();
            let mut area2 = 0.0;
            if leaf2 {
                let cost2 = direct_cost2 + inherited_cost;
                if cost2 < best_cost {
                    best_sibling = child2;
                    best_cost = cost2;
                }
            } else {
                area2 = node2.aabb.perimeter();
                lower_cost2 = inherited_cost + direct_cost2 + (area_d - area2).min(0.0);
            }

            if leaf1 && leaf2 {
                break;
            }

            // Can the cost possibly be decreased?
            if best_cost <= lower_cost1 && best_cost <= lower_cost2 {
                break;
            }

            let descend_first = if lower_cost1 == lower_cost2 && !leaf1 && !leaf2 {
                // Equal bounds: favor the shorter subtree, then the closer centroid
                match node1.height.cmp(&node2.height) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Greater => false,
                    std::cmp::Ordering::Equal => {
                        let d1 = node1.aabb.center() - center_d;
                        let d2 = node2.aabb.center() - center_d;
                        d1.norm_squared() < d2.norm_squared()
                    }
                }
            } else {
                lower_cost1 < lower_cost2 && !leaf1
            };

            // Descend
            if descend_first {
                index = child1;
                area_base = area1;
                direct_cost = direct_cost1;
            } else {
                index = child2;
                area_base = area2;
                direct_cost = direct_cost2;
            }
        }

        best_sibling
    }

    pub(crate) fn insert_leaf(&mut self, leaf: NodeId, should_rotate: bool) {
        if self.root.is_none() {
            self.root = Some(leaf);
            self.nodes[leaf].parent = None;
            return;
        }

        // Stage 1: find the best sibling for this node
        let leaf_aabb = self.nodes[leaf].aabb;
        let sibling = self.find_best_sibling(&leaf_aabb);

        // Stage 2: create a new parent for the leaf and sibling
        let old_parent = self.nodes[sibling].parent;
        let sibling_node = self.nodes[sibling];
        let leaf_node = self.nodes[leaf];

        let new_parent = self.allocate_node(TreeNode {
            aabb: leaf_aabb.union(&sibling_node.aabb),
            category_bits: leaf_node.category_bits | sibling_node.category_bits,
            parent: old_parent,
            kind: NodeKind::Internal {
                child1: sibling,
                child2: leaf,
            },
            height: sibling_node.height + 1,
            enlarged: false,
        });

        match old_parent {
            Some(old_parent) => self.replace_child(old_parent, sibling, new_parent),
            None => self.root = Some(new_parent),
        }
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        // Stage 3: walk back up the tree fixing heights and boxes
        let mut index = self.nodes[leaf].parent;
        while let Some(i) = index {
            self.refit(i);

            if should_rotate {
                self.rotate_nodes(i);
            }

            index = self.nodes[i].parent;
        }
    }

    pub(crate) fn remove_leaf(&mut self, leaf: NodeId) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }

        let Some(parent) = self.nodes[leaf].parent else {
            unreachable!("attached leaf without a parent")
        };
        let grand_parent = self.nodes[parent].parent;
        let sibling = match self.nodes[parent].kind {
            NodeKind::Internal { child1, child2 } => {
                if child1 == leaf {
                    child2
                } else {
                    child1
                }
            }
            NodeKind::Leaf { .. } => unreachable!("leaf parent is a leaf"),
        };

        self.nodes[leaf].parent = None;
        self.nodes.remove(parent);

        if let Some(grand_parent) = grand_parent {
            // Destroy the parent and connect the sibling to the grandparent
            self.replace_child(grand_parent, parent, sibling);
            self.nodes[sibling].parent = Some(grand_parent);

            // Adjust ancestor bounds
            let mut index = Some(grand_parent);
            while let Some(i) = index {
                self.refit(i);
                index = self.nodes[i].parent;
            }
        } else {
            self.root = Some(sibling);
            self.nodes[sibling].parent = None;
        }
    }

    // Recompute box, category, height and flag of an internal node from its children
    pub(crate) fn refit(&mut self, index: NodeId) {
        let Some((child1, child2)) = self.nodes[index].children() else {
            return;
        };
        let n1 = self.nodes[child1];
        let n2 = self.nodes[child2];

        let node = &mut self.nodes[index];
        node.aabb = n1.aabb.union(&n2.aabb);
        node.category_bits = n1.category_bits | n2.category_bits;
        node.height = 1 + n1.height.max(n2.height);
        node.enlarged = n1.enlarged || n2.enlarged;
    }

    fn replace_child(&mut self, parent: NodeId, old_child: NodeId, new_child: NodeId) {
        if let NodeKind::Internal { child1, child2 } = &mut self.nodes[parent].kind {
            if *child1 == old_child {
                *child1 = new_child;
            } else {
                debug_assert_eq!(*child2, old_child);
                *child2 = new_child;
            }
        }
    }

    fn set_child(&mut self, parent: NodeId, side: Side, child: NodeId) {
        if let NodeKind::Internal { child1, child2 } = &mut self.nodes[parent].kind {
            match side {
                Side::First => *child1 = child,
                Side::Second => *child2 = child,
            }
        }
    }

    // Perform a left or right rotation if node A is imbalanced.
    //
    //           A
    //         /   \
    //        B     C
    //       / \   / \
    //      D   E F   G
    //
    // A child of A (B or C) swaps places with a grandchild on the other side
    // when that lowers the summed perimeter of A's internal children.
    fn rotate_nodes(&mut self, a: NodeId) {
        let node_a = self.nodes[a];
        if node_a.height < 2 {
            return;
        }
        let Some((b, c)) = node_a.children() else {
            return;
        };

        let node_b = self.nodes[b];
        let node_c = self.nodes[c];

        let area_of = |node: &TreeNode| if node.is_leaf() { 0.0 } else { node.aabb.perimeter() };
        let cost_base = area_of(&node_b) + area_of(&node_c);

        // (side of A that moves down, receiving node, receiving side)
        let mut best: Option<(Side, NodeId, Side)> = None;
        let mut best_cost = cost_base;

        for (moving_side, moving, receiver) in [(Side::First, &node_b, &node_c), (Side::Second, &node_c, &node_b)] {
            let Some((r1, r2)) = receiver.children() else {
                continue;
            };
            let receiver_id = if moving_side == Side::First { c } else { b };

            for (slot, kept) in [(Side::First, r2), (Side::Second, r1)] {
                // Moving node takes `slot` in the receiver next to `kept`
                let cost = area_of(moving) + moving.aabb.union(&self.nodes[kept].aabb).perimeter();
                if cost < best_cost {
                    best_cost = cost;
                    best = Some((moving_side, receiver_id, slot));
                }
            }
        }

        let Some((moving_side, receiver, slot)) = best else {
            // Rotation does not improve cost
            return;
        };

        let moving = if moving_side == Side::First { b } else { c };
        let Some((r1, r2)) = self.nodes[receiver].children() else {
            return;
        };
        let promoted = if slot == Side::First { r1 } else { r2 };

        // Swap the moving child of A with a grandchild under the receiver
        self.set_child(a, moving_side, promoted);
        self.set_child(receiver, slot, moving);
        self.nodes[moving].parent = Some(receiver);
        self.nodes[promoted].parent = Some(a);

        self.refit(receiver);
        self.refit(a);
    }
}

#[cfg(test)]
mod tests {
    use crate::broad::DynamicTree;
    use crate::foundation::math::vec2;
    use crate::geometry::aabb::AABB;

    #[test]
    fn test_row_of_boxes_stays_valid() {
        let mut tree = DynamicTree::new();
        for i in 0..64 {
            let x = i as f32;
            tree.create_proxy(AABB::new(vec2(x, 0.0), vec2(x + 0.5, 0.5)), 1, i);
        }
        tree.validate();
        assert_eq!(tree.proxy_count(), 64);
        assert!(tree.get_height() >= 6);
        assert!(tree.get_height() < 63, "degenerated into a list");
    }

    #[test]
    fn test_sibling_is_nearby_leaf() {
        let mut tree = DynamicTree::new();
        let far = tree.create_proxy(AABB::new(vec2(100.0, 100.0), vec2(101.0, 101.0)), 1, 0);
        let near = tree.create_proxy(AABB::new(vec2(0.0, 0.0), vec2(1.0, 1.0)), 1, 1);
        let new = tree.create_proxy(AABB::new(vec2(1.5, 0.0), vec2(2.5, 1.0)), 1, 2);
        tree.validate();

        // The new leaf pairs with the nearby leaf, not the far one
        let parent_new = tree.nodes[new.0].parent;
        let parent_near = tree.nodes[near.0].parent;
        assert_eq!(parent_new, parent_near);
        assert_ne!(tree.nodes[far.0].parent, parent_new);
    }
}
