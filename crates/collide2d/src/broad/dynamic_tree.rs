//! Dynamic AABB tree
//!
//! A binary bounding volume hierarchy over fattened leaf boxes. Leaves are
//! proxies handed out to callers; internal nodes are created and destroyed as
//! the tree is restructured. Nodes live in a slot map so proxy ids carry a
//! generation and a stale id is caught on first use.

use slotmap::{new_key_type, SlotMap};

use super::rebuild::RebuildScratch;
use crate::config::TreeConfig;
use crate::foundation::math::Vec2;
use crate::geometry::aabb::AABB;

new_key_type! {
    /// Slot of a tree node, leaf or internal
    pub(crate) struct NodeId;
}

/// Handle to a leaf in a [`DynamicTree`]
///
/// Ids stay valid until the proxy is destroyed. A destroyed id is never
/// confused with a later proxy that reuses the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(pub(crate) NodeId);

impl ProxyId {
    /// Slot index in the node pool. Reused after the proxy is destroyed.
    pub fn slot(self) -> u32 {
        (slotmap::Key::data(&self.0).as_ffi() & 0xFFFF_FFFF) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NodeKind {
    Leaf { user_data: u64 },
    Internal { child1: NodeId, child2: NodeId },
}

/// A node in the dynamic tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TreeNode {
    /// Fattened box for leaves, union of the children for internal nodes
    pub aabb: AABB,
    /// Leaf category, or the union of all leaf categories below
    pub category_bits: u64,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    /// Leaf = 0
    pub height: u16,
    /// Grown since the last rebuild
    pub enlarged: bool,
}

impl TreeNode {
    pub fn leaf(aabb: AABB, category_bits: u64, user_data: u64) -> Self {
        Self {
            aabb,
            category_bits,
            parent: None,
            kind: NodeKind::Leaf { user_data },
            height: 0,
            enlarged: false,
        }
    }

    pub fn internal() -> Self {
        Self {
            aabb: AABB::default(),
            category_bits: 0,
            parent: None,
            kind: NodeKind::Internal {
                child1: NodeId::default(),
                child2: NodeId::default(),
            },
            height: 1,
            enlarged: false,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    #[inline]
    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Internal { child1, child2 } => Some((child1, child2)),
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// Counters returned by tree traversals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    /// Nodes popped from the traversal stack
    pub node_visits: usize,
    /// Leaves handed to the callback
    pub leaf_visits: usize,
}

impl std::ops::AddAssign for TreeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.node_visits += rhs.node_visits;
        self.leaf_visits += rhs.leaf_visits;
    }
}

/// A dynamic AABB tree broad-phase.
///
/// Proxies are inserted with a fattened box so small motions do not force a
/// reinsertion. Mutation requires `&mut self`; traversals take `&self` and may
/// run from several threads at once.
#[derive(Debug, Clone)]
pub struct DynamicTree {
    pub(crate) nodes: SlotMap<NodeId, TreeNode>,
    pub(crate) root: Option<NodeId>,
    pub(crate) proxy_count: usize,
    pub(crate) scratch: RebuildScratch,
    pub(crate) config: TreeConfig,
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicTree {
    /// Create an empty tree with default settings
    pub fn new() -> Self {
        Self::with_config(&TreeConfig::default())
    }

    /// Create an empty tree
    pub fn with_config(config: &TreeConfig) -> Self {
        let config = config.validated();
        Self {
            nodes: SlotMap::with_capacity_and_key(config.initial_capacity),
            root: None,
            proxy_count: 0,
            scratch: RebuildScratch::default(),
            config,
        }
    }

    /// Settings in use
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Create a proxy. The box is fattened by the configured margin.
    pub fn create_proxy(&mut self, aabb: AABB, category_bits: u64, user_data: u64) -> ProxyId {
        debug_assert!(aabb.is_valid());

        let fat_aabb = aabb.fattened(self.config.aabb_margin);
        let leaf = self.allocate_node(TreeNode::leaf(fat_aabb, category_bits, user_data));
        self.insert_leaf(leaf, true);
        self.proxy_count += 1;

        ProxyId(leaf)
    }

    /// Destroy a proxy.
    ///
    /// # Panics
    /// If `id` does not name a live proxy.
    pub fn destroy_proxy(&mut self, id: ProxyId) {
        self.leaf(id);

        self.remove_leaf(id.0);
        self.nodes.remove(id.0);
        self.proxy_count -= 1;
    }

    /// Move a proxy to a new box by removing and reinserting it with a fresh margin.
    ///
    /// Callers usually do this only once the tight box has left the fat box.
    ///
    /// # Panics
    /// If `id` does not name a live proxy.
    pub fn move_proxy(&mut self, id: ProxyId, aabb: AABB) {
        debug_assert!(aabb.is_valid());
        self.leaf(id);

        self.remove_leaf(id.0);
        self.nodes[id.0].aabb = aabb.fattened(self.config.aabb_margin);
        self.insert_leaf(id.0, false);
    }

    /// Grow a proxy to contain `aabb` without restructuring.
    ///
    /// The leaf and every ancestor are flagged so a partial rebuild revisits
    /// them.
    ///
    /// # Panics
    /// If `id` does not name a live proxy.
    pub fn enlarge_proxy(&mut self, id: ProxyId, aabb: AABB) {
        debug_assert!(aabb.is_valid());

        let leaf = self.leaf_mut(id);
        if !leaf.aabb.enlarge(&aabb) {
            return;
        }
        leaf.enlarged = true;
        let leaf_aabb = leaf.aabb;

        let mut parent = leaf.parent;
        while let Some(index) = parent {
            let node = &mut self.nodes[index];
            let changed = node.aabb.enlarge(&leaf_aabb);
            node.enlarged = true;
            parent = node.parent;

            if !changed {
                break;
            }
        }

        while let Some(index) = parent {
            let node = &mut self.nodes[index];
            if node.enlarged {
                // Already ascended from here
                break;
            }
            node.enlarged = true;
            parent = node.parent;
        }
    }

    /// Change the category of a proxy and refresh its ancestors.
    ///
    /// Costs a walk to the root.
    ///
    /// # Panics
    /// If `id` does not name a live proxy.
    pub fn set_category_bits(&mut self, id: ProxyId, category_bits: u64) {
        let leaf = self.leaf_mut(id);
        leaf.category_bits = category_bits;

        let mut parent = leaf.parent;
        while let Some(index) = parent {
            let bits = self.child_category_bits(index);
            let node = &mut self.nodes[index];
            node.category_bits = bits;
            parent = node.parent;
        }
    }

    /// Category of a proxy
    ///
    /// # Panics
    /// If `id` does not name a live proxy.
    pub fn get_category_bits(&self, id: ProxyId) -> u64 {
        self.leaf(id).category_bits
    }

    /// User data given at creation
    ///
    /// # Panics
    /// If `id` does not name a live proxy.
    pub fn user_data(&self, id: ProxyId) -> u64 {
        match self.leaf(id).kind {
            NodeKind::Leaf { user_data } => user_data,
            NodeKind::Internal { .. } => unreachable!(),
        }
    }

    /// Fattened box stored for a proxy
    ///
    /// # Panics
    /// If `id` does not name a live proxy.
    pub fn fat_aabb(&self, id: ProxyId) -> AABB {
        self.leaf(id).aabb
    }

    /// Whether `id` names a live proxy
    pub fn contains(&self, id: ProxyId) -> bool {
        self.nodes.get(id.0).is_some_and(TreeNode::is_leaf)
    }

    /// Number of live proxies
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Number of allocated nodes, leaves and internal
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Height of the root, 0 for an empty tree or a single leaf
    pub fn get_height(&self) -> usize {
        self.root.map_or(0, |root| usize::from(self.nodes[root].height))
    }

    /// Sum of internal node perimeters over the root perimeter.
    ///
    /// Lower is better. Zero for an empty tree.
    pub fn get_area_ratio(&self) -> f32 {
        let Some(root) = self.root else {
            return 0.0;
        };

        let root_area = self.nodes[root].aabb.perimeter();

        let total_area: f32 = self
            .nodes
            .iter()
            .filter(|&(id, node)| id != root && !node.is_leaf())
            .map(|(_, node)| node.aabb.perimeter())
            .sum();

        if root_area > 0.0 {
            total_area / root_area
        } else {
            0.0
        }
    }

    /// Box around every proxy, or `None` when empty
    pub fn get_root_bounds(&self) -> Option<AABB> {
        self.root.map(|root| self.nodes[root].aabb)
    }

    /// Heap and inline bytes held by the tree
    pub fn byte_count(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.nodes.capacity() * std::mem::size_of::<TreeNode>()
            + self.scratch.byte_count()
    }

    /// Shift the world origin. Every stored box moves by `-new_origin`.
    pub fn shift_origin(&mut self, new_origin: Vec2) {
        for node in self.nodes.values_mut() {
            node.aabb.lower_bound -= new_origin;
            node.aabb.upper_bound -= new_origin;
        }
    }

    pub(crate) fn allocate_node(&mut self, node: TreeNode) -> NodeId {
        if self.nodes.len() == self.nodes.capacity() {
            log::trace!("Growing tree node pool past {} nodes", self.nodes.capacity());
        }
        self.nodes.insert(node)
    }

    pub(crate) fn child_category_bits(&self, index: NodeId) -> u64 {
        let (child1, child2) = self.nodes[index]
            .children()
            .unwrap_or_else(|| unreachable!("leaf has no children"));
        self.nodes[child1].category_bits | self.nodes[child2].category_bits
    }

    fn leaf(&self, id: ProxyId) -> &TreeNode {
        match self.nodes.get(id.0) {
            Some(node) if node.is_leaf() => node,
            _ => panic!("invalid proxy id {id:?}"),
        }
    }

    fn leaf_mut(&mut self, id: ProxyId) -> &mut TreeNode {
        match self.nodes.get_mut(id.0) {
            Some(node) if node.is_leaf() => node,
            _ => panic!("invalid proxy id {id:?}"),
        }
    }
}
