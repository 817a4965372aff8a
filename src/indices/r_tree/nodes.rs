use super::*;

use crate::geometry::{planar::FloatSize, HasPerimeter};

use std::{collections::VecDeque, fmt, marker::PhantomData};

pub type NodeId = usize;

/// Slack allowed when checking that a parent box covers its children.
const CONTAINMENT_EPSILON: FloatSize = 1e-9;

#[derive(Debug, Clone)]
pub struct LeafNode<S> {
    pub bbox: BoundingBox,
    pub shape: S,
}

#[derive(Debug, Clone)]
pub struct IndexNode {
    pub bbox: BoundingBox,
    pub children: Vec<NodeId>,
    /// Handle of the tree root, where evicted shapes are re-inserted
    pub root: NodeId,
}

#[derive(Debug, Clone)]
pub enum TreeNode<S> {
    Leaf(LeafNode<S>),
    Index(IndexNode),
}

impl<S> TreeNode<S> {
    pub fn bbox(&self) -> &BoundingBox {
        match self {
            TreeNode::Leaf(leaf) => &leaf.bbox,
            TreeNode::Index(node) => &node.bbox,
        }
    }

    pub fn set_bbox(&mut self, bbox: BoundingBox) {
        match self {
            TreeNode::Leaf(leaf) => leaf.bbox = bbox,
            TreeNode::Index(node) => node.bbox = bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf(_))
    }

    /// Number of children, or `None` for a leaf
    pub fn child_count(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf(_) => None,
            TreeNode::Index(node) => Some(node.children.len()),
        }
    }

    pub fn as_index(&self) -> &IndexNode {
        match self {
            TreeNode::Index(node) => node,
            TreeNode::Leaf(_) => panic!("Cannot borrow leaf as index node"),
        }
    }

    pub fn as_index_mut(&mut self) -> &mut IndexNode {
        match self {
            TreeNode::Index(node) => node,
            TreeNode::Leaf(_) => panic!("Cannot borrow leaf as index node"),
        }
    }
}

/// Shape of a tree at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub shapes: usize,
    pub index_nodes: usize,
    pub depth: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} shapes in {} index nodes, depth {}",
            self.shapes, self.index_nodes, self.depth
        )
    }
}

pub struct RTree<S, M>
where
    M: NodeManager<S>,
{
    pub(super) root: NodeId,
    extent: BoundingBox,
    pub(super) manager: M,
    pub(super) len: usize,
    marker: PhantomData<S>,
}

impl<S, M> RTree<S, M>
where
    M: NodeManager<S>,
{
    /// An empty tree whose root covers the declared extent
    ///
    /// The extent is only the root's starting box; shapes outside it are
    /// still accepted.
    pub fn with_manager(mut manager: M, extent: BoundingBox) -> Self {
        let root = manager.fresh_index(extent, None);
        RTree {
            root,
            extent,
            manager,
            len: 0,
            marker: PhantomData,
        }
    }

    pub fn extent(&self) -> &BoundingBox {
        &self.extent
    }

    /// Number of shapes held
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every shape, keeping the declared extent
    pub fn empty(&mut self) -> &mut Self {
        self.manager.clear();
        self.root = self.manager.fresh_index(self.extent, None);
        self.len = 0;
        log::debug!("Emptied tree with extent {}", self.extent);
        self
    }

    pub(super) fn index_node(&self, id: NodeId) -> &IndexNode {
        self.manager.get(id).as_index()
    }

    fn index_node_mut(&mut self, id: NodeId) -> &mut IndexNode {
        self.manager.get_mut(id).as_index_mut()
    }

    /// All leaves below `id` in depth-first order
    pub(super) fn leaves_below(&self, id: NodeId) -> Vec<&LeafNode<S>> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.manager.get(current) {
                TreeNode::Leaf(leaf) => leaves.push(leaf),
                TreeNode::Index(node) => stack.extend(node.children.iter().rev()),
            }
        }
        leaves
    }

    /// All shapes in depth-first order
    pub fn shapes(&self) -> impl Iterator<Item = &S> {
        self.leaves_below(self.root).into_iter().map(|leaf| &leaf.shape)
    }

    /// Number of index levels on the longest path from the root
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut to_search: VecDeque<(NodeId, usize)> = VecDeque::from([(self.root, 1)]);
        while let Some((id, level)) = to_search.pop_front() {
            if let TreeNode::Index(node) = self.manager.get(id) {
                deepest = deepest.max(level);
                to_search.extend(node.children.iter().map(|child| (*child, level + 1)));
            }
        }
        deepest
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            shapes: self.len,
            index_nodes: self.manager.live_nodes() - self.len,
            depth: self.depth(),
        }
    }

    /// Logs statistics about the tree
    pub fn print_stats(&self) {
        log::info!("RTree holds {}", self.stats());
        self.manager.print_stats();
    }

    /// Checks the whole tree to determine it is sound
    pub fn assert_invariants(&self) {
        let mut leaves = 0;
        let mut to_search: VecDeque<NodeId> = VecDeque::from([self.root]);
        while let Some(current_id) = to_search.pop_front() {
            match self.manager.get(current_id) {
                TreeNode::Index(node) => {
                    assert_eq!(node.root, self.root, "node {current_id} lost its root");
                    assert!(
                        node.children.len() <= MAX_FANOUT,
                        "node {current_id} has {} children",
                        node.children.len()
                    );
                    // the root box is the declared extent, which shapes may exceed
                    let is_root = current_id == self.root;
                    if !is_root {
                        assert!(
                            node.children.len() >= 2,
                            "non-root node {current_id} has {} children",
                            node.children.len()
                        );
                    }
                    for child_id in node.children.iter() {
                        let child = self.manager.get(*child_id);
                        assert!(
                            is_root || node.bbox.covers(child.bbox(), CONTAINMENT_EPSILON),
                            "{} does not cover child {}",
                            node.bbox,
                            child.bbox()
                        );
                        to_search.push_back(*child_id);
                    }
                }
                TreeNode::Leaf(_) => leaves += 1,
            }
        }
        assert_eq!(self.len, leaves);
    }
}

impl<S, M> RTree<S, M>
where
    S: Collidable,
    M: NodeManager<S>,
{
    /// Adds `shape` to the tree
    pub fn insert_shape(&mut self, shape: S) -> Result<(), IndexError> {
        let bbox = leaf_box(&shape)?;
        self.insert_at(self.root, bbox, shape, true);
        self.len += 1;
        Ok(())
    }

    /// Places a shape below `node_id`
    ///
    /// The node is expected to cover `bbox` once this returns; callers
    /// recursing into a child overwrite that child's box afterwards.
    pub(super) fn insert_at(
        &mut self,
        node_id: NodeId,
        bbox: BoundingBox,
        shape: S,
        allow_forced_reinsertion: bool,
    ) {
        let node = self.index_node(node_id);
        let root = node.root;
        if node.children.len() < MAX_FANOUT {
            log::trace!("Placing {bbox} directly in node {node_id}");
            let leaf = self.manager.fresh_leaf(bbox, shape);
            self.index_node_mut(node_id).children.push(leaf);
            return;
        }
        let has_leaf_child = node
            .children
            .iter()
            .any(|child| self.manager.get(*child).is_leaf());
        if allow_forced_reinsertion && has_leaf_child {
            let leaf = self.manager.fresh_leaf(bbox, shape);
            self.index_node_mut(node_id).children.push(leaf);
            self.evict_farthest(node_id);
            return;
        }

        let (chosen, candidate_box) = self.choose_subtree(node_id, &bbox);
        log::trace!("Chose child {chosen} of node {node_id}, enlarged to {candidate_box}");
        if self.manager.get(chosen).is_leaf() {
            let promoted = self.manager.fresh_index(candidate_box, Some(root));
            if let Some(slot) = self
                .index_node_mut(node_id)
                .children
                .iter_mut()
                .find(|child| **child == chosen)
            {
                *slot = promoted;
            }
            let TreeNode::Leaf(old) = self.manager.release(chosen) else {
                unreachable!("checked to be a leaf above");
            };
            log::debug!("Promoted leaf {} to index node {promoted}", old.bbox);
            self.insert_at(promoted, bbox, shape, true);
            self.insert_at(promoted, old.bbox, old.shape, true);
        } else {
            self.insert_at(chosen, bbox, shape, allow_forced_reinsertion);
            self.manager.get_mut(chosen).set_bbox(candidate_box);
        }
    }

    /// Removes the child farthest from the node's center and re-inserts its
    /// shapes at the root, without further forced reinsertion
    fn evict_farthest(&mut self, node_id: NodeId) {
        let node = self.index_node(node_id);
        let center = node.bbox.center;
        let root = node.root;
        let mut farthest: Option<(NodeId, FloatSize)> = None;
        for child in node.children.iter() {
            let distance = self.manager.get(*child).bbox().center.distance(center);
            if farthest.map_or(true, |(_, best)| distance > best) {
                farthest = Some((*child, distance));
            }
        }
        let Some((evicted, distance)) = farthest else {
            return;
        };
        self.index_node_mut(node_id)
            .children
            .retain(|child| *child != evicted);

        let mut displaced = Vec::new();
        self.release_subtree(evicted, &mut displaced);
        log::debug!(
            "Evicted {} shapes at distance {distance} from {center}",
            displaced.len()
        );
        for LeafNode { bbox, shape } in displaced {
            self.insert_at(root, bbox, shape, false);
        }
    }

    /// Takes every node below `id` out of storage, collecting its leaves depth-first
    fn release_subtree(&mut self, id: NodeId, leaves: &mut Vec<LeafNode<S>>) {
        match self.manager.release(id) {
            TreeNode::Leaf(leaf) => leaves.push(leaf),
            TreeNode::Index(node) => {
                for child in node.children {
                    self.release_subtree(child, leaves);
                }
            }
        }
    }

    /// Picks the child of `node_id` to receive `bbox`
    ///
    /// Leaf children are preferred, then children with spare capacity. Among
    /// those, the one whose enlarged box overlaps its siblings least wins,
    /// ties broken by the smaller enlarged perimeter and then child order.
    /// Returns the chosen child and its enlarged box.
    fn choose_subtree(&self, node_id: NodeId, bbox: &BoundingBox) -> (NodeId, BoundingBox) {
        let children = &self.index_node(node_id).children;
        let leaves: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|child| self.manager.get(*child).is_leaf())
            .collect();
        let eligible = if !leaves.is_empty() {
            leaves
        } else {
            let spare: Vec<NodeId> = children
                .iter()
                .copied()
                .filter(|child| {
                    self.manager
                        .get(*child)
                        .child_count()
                        .map_or(false, |count| count < MAX_FANOUT)
                })
                .collect();
            if spare.is_empty() {
                children.clone()
            } else {
                spare
            }
        };

        let mut best: Option<(NodeId, BoundingBox, FloatSize, FloatSize)> = None;
        for candidate in eligible {
            let enlarged = self.manager.get(candidate).bbox().union(bbox);
            let overlap: FloatSize = children
                .iter()
                .filter(|sibling| **sibling != candidate)
                .filter_map(|sibling| self.manager.get(*sibling).bbox().overlap_region(&enlarged))
                .map(|region| region.perimeter())
                .sum();
            let perimeter = enlarged.perimeter();
            let better = match best {
                None => true,
                Some((_, _, best_overlap, best_perimeter)) => {
                    overlap < best_overlap
                        || (overlap == best_overlap && perimeter < best_perimeter)
                }
            };
            if better {
                best = Some((candidate, enlarged, overlap, perimeter));
            }
        }
        match best {
            Some((chosen, enlarged, _, _)) => (chosen, enlarged),
            None => unreachable!("a full node always has eligible children"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{in_memory, tests::*};
    use super::*;
    use crate::{geometry::Bounding, shapes::Shape};
    use approx::assert_abs_diff_eq;

    fn unit_box(x: FloatSize, id: usize) -> Tagged {
        Tagged {
            id,
            shape: Shape::rectangle(Point::new(x, 0.0), 1.0, 1.0),
        }
    }

    fn root_children(tree: &in_memory::RTree<Tagged>) -> Vec<&TreeNode<Tagged>> {
        tree.index_node(tree.root)
            .children
            .iter()
            .map(|id| tree.manager.get(*id))
            .collect()
    }

    fn leaf_ids(tree: &in_memory::RTree<Tagged>, id: NodeId) -> Vec<usize> {
        tree.leaves_below(id).iter().map(|leaf| leaf.shape.id).collect()
    }

    #[test]
    fn test_direct_placement() {
        let mut tree = in_memory::new(100.0, 100.0, Point::ORIGIN);
        for (id, x) in [1.0, 3.0, 5.0].into_iter().enumerate() {
            tree.insert_shape(unit_box(x, id)).expect("valid shape");
        }
        let children = root_children(&tree);
        assert_eq!(3, children.len());
        assert!(children.iter().all(|child| child.is_leaf()));
        assert_eq!(vec![0, 1, 2], leaf_ids(&tree, tree.root));
        assert_eq!(1, tree.depth());
        tree.assert_invariants();
    }

    #[test]
    fn test_new_shape_evicted_when_farthest() {
        let mut tree = in_memory::new(100.0, 100.0, Point::ORIGIN);
        for (id, x) in [1.0, 3.0, 5.0, 50.0].into_iter().enumerate() {
            tree.insert_shape(unit_box(x, id)).expect("valid shape");
        }
        tree.assert_invariants();
        let children = root_children(&tree);
        assert_eq!(3, children.len());
        assert!(children[0].is_leaf());
        assert!(children[1].is_leaf());
        // the evicted shape lands next to its least-overlapping neighbour
        let TreeNode::Index(promoted) = children[2] else {
            panic!("expected an index node");
        };
        assert_eq!(vec![3, 2], leaf_ids(&tree, tree.index_node(tree.root).children[2]));
        assert_abs_diff_eq!(promoted.bbox.leftmost(), 4.5, epsilon = 1e-9);
        assert_abs_diff_eq!(promoted.bbox.rightmost(), 50.5, epsilon = 1e-9);
        assert_eq!(2, tree.depth());
    }

    #[test]
    fn test_existing_child_evicted_when_farthest() {
        let mut tree = in_memory::new(100.0, 100.0, Point::ORIGIN);
        for (id, x) in [1.0, 3.0, 40.0, 5.0].into_iter().enumerate() {
            tree.insert_shape(unit_box(x, id)).expect("valid shape");
        }
        tree.assert_invariants();
        let root = tree.index_node(tree.root);
        assert_eq!(vec![0], leaf_ids(&tree, root.children[0]));
        assert_eq!(vec![1], leaf_ids(&tree, root.children[1]));
        // the evicted far shape is inserted first into the promoted node
        assert_eq!(vec![2, 3], leaf_ids(&tree, root.children[2]));
    }

    #[test]
    fn test_fanout_and_containment() {
        let mut tree = in_memory::new(100.0, 100.0, Point::new(50.0, 50.0));
        for shape in scattered_shapes(500, 11) {
            tree.insert_shape(shape).expect("valid shape");
        }
        tree.assert_invariants();
        assert_eq!(500, tree.len());
        assert_eq!(500, tree.shapes().count());
        let stats = tree.stats();
        assert_eq!(500, stats.shapes);
        assert!(stats.index_nodes >= 500 / MAX_FANOUT);
        assert!(stats.depth > 1);
    }

    #[test]
    fn test_recursed_boxes_may_overstate_extent() {
        // Nodes keep the box computed before recursing even if forced
        // reinsertion moved shapes elsewhere; they still cover their content.
        let mut tree = in_memory::new(100.0, 100.0, Point::new(50.0, 50.0));
        for shape in scattered_shapes(200, 3) {
            tree.insert_shape(shape).expect("valid shape");
        }
        let mut stack = vec![tree.root];
        while let Some(id) = stack.pop() {
            if let TreeNode::Index(node) = tree.manager.get(id) {
                let child_boxes: Vec<BoundingBox> = node
                    .children
                    .iter()
                    .map(|child| *tree.manager.get(*child).bbox())
                    .collect();
                if let Some(tight) = BoundingBox::bound_all(child_boxes.iter()) {
                    assert!(node.bbox.covers(&tight, 1e-9));
                }
                stack.extend(node.children.iter().copied());
            }
        }
    }

    #[test]
    fn test_rejects_degenerate_shapes() {
        struct Segment;
        impl Collidable for Segment {
            fn vertices(&self) -> Vec<Point> {
                vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]
            }

            fn center(&self) -> Point {
                Point::new(0.5, 0.0)
            }
        }
        let mut tree = in_memory::new(10.0, 10.0, Point::ORIGIN);
        assert!(matches!(
            tree.insert_shape(Segment),
            Err(IndexError::DegenerateShape { vertices: 2 })
        ));
        assert!(tree.is_empty());
        tree.assert_invariants();
    }

    #[test]
    fn test_empty() {
        let mut tree = in_memory::new(100.0, 100.0, Point::new(50.0, 50.0));
        for shape in scattered_shapes(50, 5) {
            tree.insert_shape(shape).expect("valid shape");
        }
        assert!(tree.empty().is_empty());
        assert_eq!(0, tree.shapes().count());
        assert_eq!(1, tree.depth());
        assert_abs_diff_eq!(*tree.manager.get(tree.root).bbox(), *tree.extent());
        tree.assert_invariants();
        tree.insert_shape(unit_box(1.0, 0)).expect("valid shape");
        assert_eq!(1, tree.len());
    }
}
