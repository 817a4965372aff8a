use super::*;

use crate::geometry::{planar::Vector, Intersecting};

use itertools::Itertools;

impl<S, M> nodes::RTree<S, M>
where
    M: NodeManager<S>,
{
    /// Reports every pair of shapes the narrow phase considers colliding
    ///
    /// Only pairs whose leaf boxes overlap are handed to `narrow_phase`.
    /// A pair may be reported more than once when it is reachable through
    /// several overlapping subtrees; callers that need a set must deduplicate.
    pub fn detect_collisions<N, C>(&self, mut narrow_phase: N, mut on_collision: C)
    where
        N: FnMut(&S, &S) -> Option<Vector>,
        C: FnMut(&S, &S, Vector),
    {
        self.detect_below(self.root, &mut narrow_phase, &mut on_collision);
    }

    /// Collects the colliding pairs together with their separation vectors
    pub fn collisions<N>(&self, mut narrow_phase: N) -> Vec<(&S, &S, Vector)>
    where
        N: FnMut(&S, &S) -> Option<Vector>,
    {
        let mut found = Vec::new();
        self.detect_below(self.root, &mut narrow_phase, &mut |a, b, vector| {
            found.push((a, b, vector))
        });
        found
    }

    fn detect_below<'a, N, C>(&'a self, node_id: NodeId, narrow_phase: &mut N, on_collision: &mut C)
    where
        N: FnMut(&S, &S) -> Option<Vector>,
        C: FnMut(&'a S, &'a S, Vector),
    {
        let node = self.index_node(node_id);
        if node.children.len() < 2 {
            return;
        }
        for (first, second) in node.children.iter().tuple_combinations() {
            let first_node = self.manager.get(*first);
            let second_node = self.manager.get(*second);
            if !first_node.bbox().intersects(second_node.bbox()) {
                continue;
            }
            if let (TreeNode::Leaf(a), TreeNode::Leaf(b)) = (first_node, second_node) {
                if let Some(vector) = narrow_phase(&a.shape, &b.shape) {
                    on_collision(&a.shape, &b.shape, vector);
                }
                continue;
            }
            let Some(region) = first_node.bbox().intersection(second_node.bbox()) else {
                continue;
            };
            let nearby: Vec<&LeafNode<S>> = self
                .leaves_below(*first)
                .into_iter()
                .chain(self.leaves_below(*second))
                .filter(|leaf| leaf.bbox.intersects(&region))
                .collect();
            log::trace!("{} leaves near overlap region {region}", nearby.len());
            for (a, b) in nearby.into_iter().tuple_combinations() {
                if !a.bbox.intersects(&b.bbox) {
                    continue;
                }
                if let Some(vector) = narrow_phase(&a.shape, &b.shape) {
                    on_collision(&a.shape, &b.shape, vector);
                }
            }
        }
        for child in node.children.iter() {
            if !self.manager.get(*child).is_leaf() {
                self.detect_below(*child, narrow_phase, on_collision);
            }
        }
    }
}
