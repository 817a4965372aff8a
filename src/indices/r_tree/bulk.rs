use super::*;

use crate::geometry::planar::FloatSize;

use itertools::Itertools;
use std::iter;

/// Order in which to insert shapes whose centers lie at `xs`
///
/// Starts with the leftmost and rightmost shape, followed by the median of
/// the rest, the two leftmost and the two rightmost of the rest, and then
/// everything else from left to right. Each index appears exactly once.
pub(super) fn bulk_order(xs: &[FloatSize]) -> Vec<usize> {
    let Some(leftmost) = xs.iter().position_min_by(|a, b| a.total_cmp(b)) else {
        return Vec::new();
    };
    // first of the maxima
    let rightmost = (0..xs.len())
        .filter(|i| *i != leftmost)
        .min_by(|a, b| xs[*b].total_cmp(&xs[*a]));

    let remainder: Vec<usize> = (0..xs.len())
        .filter(|i| *i != leftmost && Some(*i) != rightmost)
        .sorted_by(|a, b| xs[*a].total_cmp(&xs[*b]))
        .collect();
    let median = remainder.get(remainder.len() / 2).copied();
    let first_two = &remainder[..remainder.len().min(2)];
    let last_two = &remainder[remainder.len().saturating_sub(2)..];

    let mut placed = vec![false; xs.len()];
    iter::once(leftmost)
        .chain(rightmost)
        .chain(median)
        .chain(first_two.iter().copied())
        .chain(last_two.iter().copied())
        .chain(remainder.iter().copied())
        .filter(|i| !std::mem::replace(&mut placed[*i], true))
        .collect()
}

impl<S, M> nodes::RTree<S, M>
where
    S: Collidable,
    M: NodeManager<S>,
{
    /// Inserts a batch of shapes, spatial extremes and the median first
    ///
    /// Every shape is validated before any is inserted, so a rejected batch
    /// leaves the tree untouched.
    pub fn bulk_insert(&mut self, shapes: Vec<S>) -> Result<(), IndexError> {
        let boxes = shapes
            .iter()
            .map(leaf_box)
            .collect::<Result<Vec<_>, _>>()?;
        let xs: Vec<FloatSize> = shapes.iter().map(|shape| shape.center().x).collect();
        let order = bulk_order(&xs);
        log::debug!("Bulk insertion order: {order:?}");

        let mut pending: Vec<Option<(BoundingBox, S)>> =
            boxes.into_iter().zip(shapes).map(Some).collect();
        for index in order {
            if let Some((bbox, shape)) = pending[index].take() {
                self.insert_at(self.root, bbox, shape, true);
                self.len += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{in_memory, tests::*};
    use super::*;
    use crate::shapes::Shape;
    use std::collections::BTreeSet;

    #[test]
    fn test_bulk_order() {
        assert_eq!(
            vec![1, 2, 0, 5, 3, 4, 6],
            bulk_order(&[5.0, 1.0, 9.0, 3.0, 7.0, 2.0, 8.0])
        );
        assert_eq!(
            vec![0, 9, 5, 1, 2, 7, 8, 3, 4, 6],
            bulk_order(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])
        );
    }

    #[test]
    fn test_bulk_order_small_batches() {
        assert!(bulk_order(&[]).is_empty());
        assert_eq!(vec![0], bulk_order(&[4.0]));
        assert_eq!(vec![1, 0], bulk_order(&[4.0, 2.0]));
        assert_eq!(vec![1, 2, 0], bulk_order(&[2.0, 1.0, 3.0]));
        // ties keep the first occurrence as the starting points
        assert_eq!(vec![0, 1, 2], bulk_order(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_bulk_matches_sequential() {
        let shapes = scattered_shapes(250, 42);
        let expected = brute_force_pairs(&shapes);

        let mut sequential = in_memory::new(100.0, 100.0, Point::new(50.0, 50.0));
        for shape in shapes.iter().cloned() {
            sequential.insert_shape(shape).expect("valid shape");
        }
        let mut bulk = in_memory::new(100.0, 100.0, Point::new(50.0, 50.0));
        bulk.bulk_insert(shapes).expect("valid shapes");
        bulk.assert_invariants();
        assert_eq!(250, bulk.len());

        let mut from_sequential = BTreeSet::new();
        sequential.detect_collisions(narrow_phase, |a, b, _| {
            from_sequential.insert(pair(a, b));
        });
        let mut from_bulk = BTreeSet::new();
        bulk.detect_collisions(narrow_phase, |a, b, _| {
            from_bulk.insert(pair(a, b));
        });
        assert_eq!(expected, from_sequential);
        assert_eq!(expected, from_bulk);
    }

    #[test]
    fn test_bulk_insert_rejects_whole_batch() {
        let mut shapes = scattered_shapes(10, 9);
        shapes.push(Tagged {
            id: 10,
            shape: Shape::triangle(
                Point::new(f64::INFINITY, 0.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
            ),
        });
        let mut tree = in_memory::new(100.0, 100.0, Point::new(50.0, 50.0));
        assert!(matches!(
            tree.bulk_insert(shapes),
            Err(IndexError::NonFiniteVertex { .. })
        ));
        assert!(tree.is_empty());
        tree.bulk_insert(Vec::new()).expect("empty batch");
        assert!(tree.is_empty());
    }
}
