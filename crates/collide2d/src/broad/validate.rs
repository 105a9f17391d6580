//! Tree invariant checks for tests and debugging

use super::dynamic_tree::{DynamicTree, NodeId, NodeKind};

impl DynamicTree {
    /// Check the tree structure and metrics.
    ///
    /// Verifies parent and child links, heights, that every internal box and
    /// category equals the union of its children, and that every allocated
    /// node is reachable from the root.
    ///
    /// # Panics
    /// On the first violated invariant.
    pub fn validate(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.nodes.len(), 0, "empty tree holds nodes");
            assert_eq!(self.proxy_count, 0, "empty tree counts proxies");
            return;
        };

        assert!(self.nodes[root].parent.is_none(), "root has a parent");

        let mut reached = 0;
        let mut leaves = 0;
        let mut stack = vec![root];

        while let Some(index) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                panic!("dangling node {index:?}");
            };
            reached += 1;

            match node.kind {
                NodeKind::Leaf { .. } => {
                    assert_eq!(node.height, 0, "leaf height");
                    leaves += 1;
                }
                NodeKind::Internal { child1, child2 } => {
                    assert_ne!(child1, child2, "duplicate child");
                    let n1 = &self.nodes[child1];
                    let n2 = &self.nodes[child2];

                    assert_eq!(n1.parent, Some(index), "child 1 parent link");
                    assert_eq!(n2.parent, Some(index), "child 2 parent link");
                    assert_eq!(node.height, 1 + n1.height.max(n2.height), "internal height");
                    assert_eq!(node.aabb, n1.aabb.union(&n2.aabb), "internal box");
                    assert_eq!(node.category_bits, n1.category_bits | n2.category_bits, "category bits");

                    if n1.enlarged || n2.enlarged {
                        assert!(node.enlarged, "enlarged child under a clean parent");
                    }

                    stack.push(child1);
                    stack.push(child2);
                }
            }
        }

        assert_eq!(reached, self.nodes.len(), "unreachable nodes");
        assert_eq!(leaves, self.proxy_count, "proxy count");
    }

    /// Check the tree and that no node is flagged as enlarged.
    ///
    /// Holds after a rebuild that follows every enlargement.
    ///
    /// # Panics
    /// On the first violated invariant.
    pub fn validate_no_enlarged(&self) {
        self.validate();

        let enlarged: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.enlarged)
            .map(|(id, _)| id)
            .collect();
        assert!(enlarged.is_empty(), "enlarged nodes {enlarged:?}");
    }
}

#[cfg(test)]
mod tests {
    use crate::broad::DynamicTree;
    use crate::foundation::math::vec2;
    use crate::geometry::aabb::AABB;

    #[test]
    #[should_panic(expected = "enlarged nodes")]
    fn test_enlarged_detected() {
        let mut tree = DynamicTree::new();
        let a = tree.create_proxy(AABB::new(vec2(0.0, 0.0), vec2(1.0, 1.0)), 1, 0);
        tree.create_proxy(AABB::new(vec2(3.0, 0.0), vec2(4.0, 1.0)), 1, 1);
        tree.enlarge_proxy(a, AABB::new(vec2(-5.0, 0.0), vec2(1.0, 1.0)));
        tree.validate_no_enlarged();
    }

    #[test]
    #[should_panic(expected = "internal box")]
    fn test_stale_box_detected() {
        let mut tree = DynamicTree::new();
        let a = tree.create_proxy(AABB::new(vec2(0.0, 0.0), vec2(1.0, 1.0)), 1, 0);
        tree.create_proxy(AABB::new(vec2(3.0, 0.0), vec2(4.0, 1.0)), 1, 1);
        tree.nodes[a.0].aabb = AABB::new(vec2(0.0, 0.0), vec2(0.5, 0.5));
        tree.validate();
    }
}
