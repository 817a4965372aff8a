//! Narrow-phase collision detection.

pub mod sat;

pub use sat::{detect_collision, SatConfig, SatDetector, DEFAULT_DAMPING};
