//! User-defined lookup table remapping.

use rankdb_common::Result;

use crate::{
    custom_linear::CustomPoint,
    doc_itr::{BoxedDocItr, DocId, DocItr},
};

/// Scores `table[child]` for exact matches of the child score, `default`
/// otherwise.
pub struct CustomMapDocItr {
    points: Vec<CustomPoint>,
    default: f32,
    child: BoxedDocItr,
}

impl CustomMapDocItr {
    /// `points` must be sorted by strictly increasing `x`.
    pub fn new(points: Vec<CustomPoint>, default: f32, child: BoxedDocItr) -> CustomMapDocItr {
        debug_assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        CustomMapDocItr {
            points,
            default,
            child,
        }
    }

    fn lookup(&self, x: f32) -> f32 {
        match self.points.binary_search_by(|p| p.x.total_cmp(&x)) {
            Ok(idx) => self.points[idx].y,
            Err(_) => self.default,
        }
    }
}

impl DocItr for CustomMapDocItr {
    fn cur(&self) -> (DocId, f32) {
        let (id, score) = self.child.cur();
        (id, self.lookup(score))
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        self.child.next(min_id)
    }

    fn get_bounds(&self) -> (f32, f32) {
        let (inside_min, inside_max) = self.child.get_bounds();
        self.points
            .iter()
            .filter(|p| inside_min <= p.x && p.x <= inside_max)
            .fold((self.default, self.default), |(min, max), p| {
                (min.min(p.y), max.max(p.y))
            })
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        if min <= self.default && self.default <= max {
            // Any unmapped input still qualifies.
            return true;
        }
        let (lo, hi) = self
            .points
            .iter()
            .filter(|p| min <= p.y && p.y <= max)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            });
        self.child.set_bounds(lo, hi)
    }

    fn close(&mut self) {
        self.child.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocItr;

    fn zig_zag(child: BoxedDocItr) -> CustomMapDocItr {
        CustomMapDocItr::new(
            vec![
                CustomPoint::new(-2.0, -2.0),
                CustomPoint::new(2.0, 2.0),
                CustomPoint::new(5.0, 3.0),
                CustomPoint::new(6.0, 1.0),
            ],
            0.0,
            child,
        )
    }

    #[test]
    fn test_lookup_bounds() {
        let inside = MemoryDocItr::from_scores(&[-1.0, 0.0, 2.0, 8.0, 5.0, 9.0, 12.0]);
        let mut outside = zig_zag(Box::new(inside));
        assert_eq!(outside.child.get_bounds(), (-1.0, 12.0));
        assert_eq!(outside.get_bounds(), (0.0, 3.0));

        // The default is inside the window: nothing to narrow.
        assert!(outside.set_bounds(-2.0, 4.0));
        assert_eq!(outside.child.get_bounds(), (-1.0, 12.0));
        assert_eq!(outside.get_bounds(), (0.0, 3.0));

        assert!(outside.set_bounds(0.25, 3.0));
        assert_eq!(outside.child.get_bounds(), (2.0, 6.0));
        assert_eq!(outside.get_bounds(), (0.0, 3.0));

        assert!(outside.set_bounds(0.5, 1.5));
        assert_eq!(outside.child.get_bounds(), (6.0, 6.0));
        assert_eq!(outside.get_bounds(), (0.0, 1.0));
    }

    #[test]
    fn test_lookup_scores() {
        let inside = MemoryDocItr::from_scores(&[2.0, 3.0, 6.0]);
        let mut outside = zig_zag(Box::new(inside));
        let mut seen = Vec::new();
        let mut min_id = 0;
        while outside.next(min_id).unwrap() {
            seen.push(outside.cur());
            min_id = outside.cur().0 + 1;
        }
        assert_eq!(seen, vec![(1, 2.0), (2, 0.0), (3, 1.0)]);
    }

    #[test]
    fn test_no_mapped_value_in_window() {
        let inside = MemoryDocItr::from_scores(&[2.0, 3.0]);
        let mut outside = zig_zag(Box::new(inside));
        assert!(!outside.set_bounds(10.0, 20.0));
    }
}
