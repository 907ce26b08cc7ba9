//! Constant exponent.

use rankdb_common::Result;

use crate::doc_itr::{BoxedDocItr, DocId, DocItr, round_down, round_up, rounding_slack};

/// Scores `child ^ exp`.
///
/// Bound propagation assumes non-negative child scores (distances, squared terms),
/// which is how the operator is used by the query language. For children that can
/// go negative the reported bounds stay sound but loose, and no window is pushed
/// down.
pub struct PowDocItr {
    exp: f32,
    child: BoxedDocItr,
}

impl PowDocItr {
    pub fn new(child: BoxedDocItr, exp: f32) -> PowDocItr {
        PowDocItr { exp, child }
    }
}

impl DocItr for PowDocItr {
    fn cur(&self) -> (DocId, f32) {
        let (id, score) = self.child.cur();
        (id, score.powf(self.exp))
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        self.child.next(min_id)
    }

    fn get_bounds(&self) -> (f32, f32) {
        let (min, max) = self.child.get_bounds();
        pow_bounds(min, max, self.exp)
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        if self.exp == 0.0 {
            return min <= 1.0 && 1.0 <= max;
        }
        let (child_min, _) = self.child.get_bounds();
        if child_min < 0.0 {
            return true;
        }
        let inv = 1.0 / self.exp as f64;
        let lo = (min as f64).max(0.0).powf(inv);
        let hi = (max as f64).powf(inv);
        if lo.is_nan() || hi.is_nan() {
            return true;
        }
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        // A relative error in the f32 power grows by |1/exp| through the root.
        let ops = inv.abs().ceil() as usize + 1;
        self.child.set_bounds(
            round_down(lo, rounding_slack(lo.abs(), ops)),
            round_up(hi, rounding_slack(hi.abs(), ops)),
        )
    }

    fn close(&mut self) {
        self.child.close();
    }
}

/// Image of `[min, max]` under `x ^ exp`.
fn pow_bounds(min: f32, max: f32, exp: f32) -> (f32, f32) {
    if min >= 0.0 {
        return ordered(min.powf(exp), max.powf(exp));
    }
    // Negative bases: only integral exponents are defined, and the extremes are at
    // the endpoints or at zero.
    if exp.fract() != 0.0 || (exp < 0.0 && max >= 0.0) {
        return (f32::NEG_INFINITY, f32::INFINITY);
    }
    let mut lo = min.powf(exp).min(max.powf(exp));
    let mut hi = min.powf(exp).max(max.powf(exp));
    if max >= 0.0 {
        let at_zero = 0.0f32.powf(exp);
        lo = lo.min(at_zero);
        hi = hi.max(at_zero);
    }
    (lo, hi)
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}
