use super::*;

use crate::geometry::planar::FloatSize;

pub type RTree<S> = nodes::RTree<S, InMemoryNodeManager<S>>;

impl<S> RTree<S> {
    /// An empty tree with the declared extent `length` x `width` around `center`
    pub fn new(length: FloatSize, width: FloatSize, center: Point) -> Self {
        nodes::RTree::with_manager(
            InMemoryNodeManager::new(),
            BoundingBox::new(center, length, width),
        )
    }
}

pub fn new<S>(length: FloatSize, width: FloatSize, center: Point) -> RTree<S> {
    RTree::new(length, width, center)
}

/// Like [RTree::new], with storage reserved for about `capacity` shapes
pub fn with_capacity<S>(
    length: FloatSize,
    width: FloatSize,
    center: Point,
    capacity: usize,
) -> RTree<S> {
    // every index node holds at least two children
    let num_nodes = capacity * 2;
    nodes::RTree::with_manager(
        InMemoryNodeManager::with_capacity(num_nodes),
        BoundingBox::new(center, length, width),
    )
}

/// Arena of nodes; released slots are reused by later allocations
pub struct InMemoryNodeManager<S> {
    nodes: Vec<Option<TreeNode<S>>>,
    free: Vec<NodeId>,
}

impl<S> InMemoryNodeManager<S> {
    fn new() -> Self {
        InMemoryNodeManager {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    fn with_capacity(capacity: usize) -> Self {
        InMemoryNodeManager {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    fn next_id(&self) -> NodeId {
        self.free.last().copied().unwrap_or(self.nodes.len())
    }

    fn store(&mut self, node: TreeNode<S>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }
}

impl<S> NodeManager<S> for InMemoryNodeManager<S> {
    fn get(&self, id: NodeId) -> &TreeNode<S> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .expect("Never ask for node ids that don't exist!")
    }

    fn get_mut(&mut self, id: NodeId) -> &mut TreeNode<S> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .expect("Never ask for node ids that don't exist!")
    }

    fn fresh_leaf(&mut self, bbox: BoundingBox, shape: S) -> NodeId {
        self.store(TreeNode::Leaf(LeafNode { bbox, shape }))
    }

    fn fresh_index(&mut self, bbox: BoundingBox, root: Option<NodeId>) -> NodeId {
        let root = root.unwrap_or_else(|| self.next_id());
        self.store(TreeNode::Index(IndexNode {
            bbox,
            children: Vec::with_capacity(MAX_FANOUT + 1),
            root,
        }))
    }

    fn release(&mut self, id: NodeId) -> TreeNode<S> {
        let node = self
            .nodes
            .get_mut(id)
            .and_then(Option::take)
            .expect("Never release node ids that don't exist!");
        self.free.push(id);
        node
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }

    fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn print_stats(&self) {
        log::info!(
            "In-memory RTree index holding {} nodes ({} free slots)",
            self.live_nodes(),
            self.free.len()
        );
    }
}

impl<S> Default for InMemoryNodeManager<S> {
    fn default() -> Self {
        InMemoryNodeManager::new()
    }
}
