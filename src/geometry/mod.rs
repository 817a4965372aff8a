pub mod planar;

use planar::BoundingBox;

/// Types implementing this trait can be checked for intersections with `Rhs`
pub trait Intersecting<Rhs = Self> {
    type IntersectionShape;
    /// Returns `true` if `self` intersects with `other`.
    fn intersects(&self, other: &Rhs) -> bool;
    /// Produce the shape of the intersection, if possible
    fn intersection(&self, other: &Rhs) -> Option<Self::IntersectionShape>;
    /// Returns true if `other` not only intersects `self`, but is completely
    /// contained within the confines of this shape
    fn contains(&self, other: &Rhs) -> bool;
}

/// Can produce a unitless area
pub trait HasArea {
    fn area(&self) -> f64;
}

/// Can produce the length of its outline
///
/// The index compares boxes by perimeter rather than by area.
pub trait HasPerimeter {
    fn perimeter(&self) -> f64;
}

pub trait Bounding: Sized {
    /// Calculate a box that contains all `entries`
    ///
    /// Returns `None` for an empty iterator.
    fn bound_all<'a>(entries: impl Iterator<Item = &'a Self>) -> Option<BoundingBox>
    where
        Self: 'a;
}
