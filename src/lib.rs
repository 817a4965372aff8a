//! 2D collision detection for circles and convex polygons.
//!
//! Shapes are organised in a bounded-fanout R-tree variant ([RTree]) that
//! prunes candidate pairs by bounding box overlap, and colliding pairs are
//! confirmed with a separating-axis test ([SatDetector]).

pub mod collision;
pub mod geometry;
pub mod indices;
pub mod scene;
pub mod shapes;

pub use collision::{detect_collision, SatConfig, SatDetector};
pub use indices::r_tree::{in_memory::RTree, IndexError};
pub use shapes::{Collidable, Shape};
