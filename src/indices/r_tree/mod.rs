//! A bounded-fanout R-tree variant used as collision broad phase.
//!
//! Nodes hold at most [MAX_FANOUT] children. Instead of splitting a full
//! node, insertion evicts the child farthest from the node's center and
//! re-inserts its shapes from the root (forced reinsertion). The resulting
//! tree is not balanced; that is accepted.
//!
//! # Usage discipline
//!
//! Insertion takes `&mut self` and enumeration `&self`, so a batch of
//! insertions must complete before collisions are enumerated. Nothing is
//! locked internally.

mod bulk;
mod collisions;
pub mod in_memory;
mod nodes;

pub use nodes::{IndexNode, LeafNode, NodeId, TreeNode, TreeStats};

use crate::{
    geometry::planar::{BoundingBox, Point},
    shapes::Collidable,
};
use snafu::prelude::*;

/// Maximum number of children of an index node at steady state.
pub const MAX_FANOUT: usize = 3;

/// Storage for the nodes of a tree, addressed by [NodeId].
pub trait NodeManager<S> {
    fn get(&self, id: NodeId) -> &TreeNode<S>;

    fn get_mut(&mut self, id: NodeId) -> &mut TreeNode<S>;

    fn fresh_leaf(&mut self, bbox: BoundingBox, shape: S) -> NodeId;

    /// Create an empty index node
    ///
    /// `root` is the handle of the tree root; `None` makes the new node the root itself.
    fn fresh_index(&mut self, bbox: BoundingBox, root: Option<NodeId>) -> NodeId;

    /// Take the node out of storage, freeing its id
    fn release(&mut self, id: NodeId) -> TreeNode<S>;

    /// Drop every node
    fn clear(&mut self);

    fn live_nodes(&self) -> usize;

    fn print_stats(&self);
}

#[derive(Debug, Snafu)]
pub enum IndexError {
    #[snafu(display("A shape needs at least 3 vertices to be indexed, got {vertices}"))]
    DegenerateShape { vertices: usize },
    #[snafu(display("Shape vertex {point} is not finite"))]
    NonFiniteVertex { point: Point },
}

/// The box stored in a shape's leaf
fn leaf_box<S>(shape: &S) -> Result<BoundingBox, IndexError>
where
    S: Collidable,
{
    let vertices = shape.vertices();
    if let Some(point) = vertices.iter().find(|p| !p.is_finite()) {
        return NonFiniteVertexSnafu { point: *point }.fail();
    }
    BoundingBox::mbb(&vertices).context(DegenerateShapeSnafu {
        vertices: vertices.len(),
    })
}
