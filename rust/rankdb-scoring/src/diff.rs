//! Absolute distance from a constant.

use rankdb_common::Result;

use crate::doc_itr::{BoxedDocItr, DocId, DocItr, round_down, round_up, rounding_slack};

/// Scores `|child - target|`.
pub struct DiffDocItr {
    target: f32,
    child: BoxedDocItr,
}

impl DiffDocItr {
    pub fn new(target: f32, child: BoxedDocItr) -> DiffDocItr {
        DiffDocItr { target, child }
    }
}

impl DocItr for DiffDocItr {
    fn cur(&self) -> (DocId, f32) {
        let (id, score) = self.child.cur();
        (id, (score - self.target).abs())
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        self.child.next(min_id)
    }

    fn get_bounds(&self) -> (f32, f32) {
        let (min, max) = self.child.get_bounds();
        let d1 = (min - self.target).abs();
        let d2 = (max - self.target).abs();
        let farthest = d1.max(d2);
        if min <= self.target && self.target <= max {
            (0.0, farthest)
        } else {
            (d1.min(d2), farthest)
        }
    }

    fn set_bounds(&mut self, _min: f32, max: f32) -> bool {
        // A lower distance bound excludes a band around the target, which cannot be
        // expressed as a single child window.
        let (target, max) = (self.target as f64, max as f64);
        let slack = rounding_slack(target.abs() + max.abs(), 1);
        self.child
            .set_bounds(round_down(target - max, slack), round_up(target + max, slack))
    }

    fn close(&mut self) {
        self.child.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocItr;

    #[test]
    fn test_diff_bounds() {
        let itr = DiffDocItr::new(5.0, Box::new(MemoryDocItr::from_scores(&[2.0, 9.0])));
        assert_eq!(itr.get_bounds(), (0.0, 4.0));

        let itr = DiffDocItr::new(10.0, Box::new(MemoryDocItr::from_scores(&[2.0, 9.0])));
        assert_eq!(itr.get_bounds(), (1.0, 8.0));
    }

    #[test]
    fn test_diff_set_bounds_pushes_max_only() {
        let mut itr = DiffDocItr::new(
            5.0,
            Box::new(MemoryDocItr::from_scores(&[2.0, 4.5, 9.0, 5.5])),
        );
        assert!(itr.set_bounds(0.25, 1.0));
        let (min, max) = itr.get_bounds();
        assert_eq!(min, 0.0);
        assert!((1.0..1.00001).contains(&max), "{max}");
        let (child_min, child_max) = itr.child.get_bounds();
        assert!((3.9999..=4.0).contains(&child_min), "{child_min}");
        assert!((6.0..6.0001).contains(&child_max), "{child_max}");
        assert!(!itr.set_bounds(0.0, -1.0));
    }
}
