//! Multiplication by a constant.

use rankdb_common::Result;

use crate::doc_itr::{BoxedDocItr, DocId, DocItr, round_down, round_up, rounding_slack};

/// Scores `factor * child`.
pub struct ScaleDocItr {
    factor: f32,
    child: BoxedDocItr,
}

impl ScaleDocItr {
    pub fn new(factor: f32, child: BoxedDocItr) -> ScaleDocItr {
        ScaleDocItr { factor, child }
    }
}

impl DocItr for ScaleDocItr {
    fn cur(&self) -> (DocId, f32) {
        let (id, score) = self.child.cur();
        (id, score * self.factor)
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        self.child.next(min_id)
    }

    fn get_bounds(&self) -> (f32, f32) {
        let (min, max) = self.child.get_bounds();
        if self.factor >= 0.0 {
            (min * self.factor, max * self.factor)
        } else {
            (max * self.factor, min * self.factor)
        }
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        let factor = self.factor;
        if factor == 0.0 {
            // Every score is zero; the child cannot be narrowed.
            return min <= 0.0 && 0.0 <= max;
        }
        let (lo, hi) = if factor > 0.0 {
            (min as f64 / factor as f64, max as f64 / factor as f64)
        } else {
            (max as f64 / factor as f64, min as f64 / factor as f64)
        };
        self.child.set_bounds(
            round_down(lo, rounding_slack(lo.abs(), 1)),
            round_up(hi, rounding_slack(hi.abs(), 1)),
        )
    }

    fn close(&mut self) {
        self.child.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocItr;

    fn assert_near(actual: f32, expected: f32) {
        assert!((actual - expected).abs() <= 1e-5, "{actual} != {expected}");
    }

    #[test]
    fn test_positive_factor() {
        let mut itr = ScaleDocItr::new(2.0, Box::new(MemoryDocItr::from_scores(&[1.0, 3.0])));
        assert_eq!(itr.get_bounds(), (2.0, 6.0));
        assert!(itr.set_bounds(4.0, 100.0));
        let (min, max) = itr.get_bounds();
        assert!(min <= 4.0);
        assert_near(min, 4.0);
        assert_eq!(max, 6.0);
        assert!(itr.next(0).unwrap());
        assert_eq!(itr.cur(), (1, 2.0));
    }

    #[test]
    fn test_negative_factor_swaps() {
        let mut itr = ScaleDocItr::new(-1.0, Box::new(MemoryDocItr::from_scores(&[1.0, 3.0])));
        assert_eq!(itr.get_bounds(), (-3.0, -1.0));
        assert!(itr.set_bounds(-2.0, 0.0));
        let (min, max) = itr.get_bounds();
        assert!(min <= -2.0);
        assert_near(min, -2.0);
        assert_eq!(max, -1.0);
        assert!(!itr.set_bounds(0.0, 0.5));
    }

    #[test]
    fn test_inverted_window_admits_boundary_value() {
        // 965.6778 * 3.3 rounds in f32, so the exact quotient of the product by
        // the factor can land one ulp below the original value.
        let value = 965.6778f32;
        let factor = 3.3f32;
        let mut itr = ScaleDocItr::new(factor, Box::new(MemoryDocItr::from_scores(&[value])));
        let scaled = value * factor;
        assert!(itr.set_bounds(scaled, scaled));
        assert!(itr.next(0).unwrap());
        assert_eq!(itr.cur(), (1, scaled));
    }

    #[test]
    fn test_zero_factor() {
        let mut itr = ScaleDocItr::new(0.0, Box::new(MemoryDocItr::from_scores(&[1.0, 3.0])));
        assert_eq!(itr.get_bounds(), (0.0, 0.0));
        assert!(itr.set_bounds(-1.0, 1.0));
        assert!(!itr.set_bounds(0.5, 1.0));
    }
}
