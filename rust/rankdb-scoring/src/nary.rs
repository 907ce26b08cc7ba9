//! N-ary combinators: sum, product and minimum.
//!
//! All three share the same synchronization loop: children are advanced until
//! they agree on a common document id, the combined score is computed and
//! checked against the current window, and a rejected candidate restarts the scan
//! at the next id. They differ in how scores combine and how a narrowed window is
//! propagated back to each child:
//!
//! - **sum**: linear elimination, each child receives the window minus the extreme
//!   contributions of all the others;
//! - **product**: division by the extremes of the others, applied when all other
//!   children are non-negative;
//! - **min**: only the lower bound is invertible, since `min(a, b) >= m` implies
//!   both `a >= m` and `b >= m`, while an upper bound constrains no single child.
//!
//! Child windows are computed in f64 and rounded outward by the error the f32
//! combination can introduce, so a document whose combined score lands in the
//! window is never dropped by a child.

use rankdb_common::Result;

use crate::doc_itr::{
    BoxedDocItr, DocId, DocItr, NOT_POSITIONED, intersect_bounds, round_down, round_up,
    rounding_slack,
};

/// Combination performed by a [`NaryDocItr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaryOp {
    Sum,
    Product,
    Min,
}

impl NaryOp {
    fn identity(self) -> f32 {
        match self {
            NaryOp::Sum => 0.0,
            NaryOp::Product => 1.0,
            NaryOp::Min => f32::INFINITY,
        }
    }

    fn combine(self, acc: f32, score: f32) -> f32 {
        match self {
            NaryOp::Sum => acc + score,
            NaryOp::Product => acc * score,
            NaryOp::Min => acc.min(score),
        }
    }

    fn combine_bounds(self, acc: (f32, f32), child: (f32, f32)) -> (f32, f32) {
        match self {
            NaryOp::Sum => (acc.0 + child.0, acc.1 + child.1),
            NaryOp::Product => {
                let corners = [
                    acc.0 * child.0,
                    acc.0 * child.1,
                    acc.1 * child.0,
                    acc.1 * child.1,
                ];
                corners
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &c| {
                        (lo.min(c), hi.max(c))
                    })
            }
            NaryOp::Min => (acc.0.min(child.0), acc.1.min(child.1)),
        }
    }
}

struct Part {
    itr: BoxedDocItr,
    spread: f32,
}

/// Combines the scores of documents present in every child.
///
/// Children are visited widest range first: the child with the largest spread is
/// the most likely to reject a candidate, which saves advancing the others.
pub struct NaryDocItr {
    op: NaryOp,
    parts: Vec<Part>,
    doc_id: DocId,
    score: f32,
    bounds: (f32, f32),
}

impl NaryDocItr {
    pub fn new(op: NaryOp, children: Vec<BoxedDocItr>) -> NaryDocItr {
        let mut parts = children
            .into_iter()
            .map(|itr| {
                let (min, max) = itr.get_bounds();
                Part {
                    itr,
                    spread: (max - min).abs(),
                }
            })
            .collect::<Vec<_>>();
        parts.sort_by(|a, b| b.spread.total_cmp(&a.spread));
        // Combined in the same order as `next`: f32 rounding is monotonic, so the
        // bounds then contain every score the loop can compute.
        let bounds = parts
            .iter()
            .map(|part| part.itr.get_bounds())
            .reduce(|acc, child| op.combine_bounds(acc, child))
            .unwrap_or((f32::INFINITY, f32::NEG_INFINITY));
        NaryDocItr {
            op,
            parts,
            doc_id: NOT_POSITIONED,
            score: 0.0,
            bounds,
        }
    }

    pub fn sum(children: Vec<BoxedDocItr>) -> NaryDocItr {
        NaryDocItr::new(NaryOp::Sum, children)
    }

    pub fn product(children: Vec<BoxedDocItr>) -> NaryDocItr {
        NaryDocItr::new(NaryOp::Product, children)
    }

    pub fn min(children: Vec<BoxedDocItr>) -> NaryDocItr {
        NaryDocItr::new(NaryOp::Min, children)
    }

    pub fn op(&self) -> NaryOp {
        self.op
    }

    /// Pushes the window to child `idx` if it is tighter than the child's current
    /// bounds.
    fn push_child_bounds(&mut self, idx: usize, min: f32, max: f32) -> bool {
        let child = &mut self.parts[idx].itr;
        let current = child.get_bounds();
        let (new_min, new_max) = intersect_bounds(current, min, max);
        if (new_min, new_max) != current {
            child.set_bounds(new_min, new_max)
        } else {
            new_min <= new_max
        }
    }

    fn set_sum_bounds(&mut self) -> bool {
        let (min, max) = (self.bounds.0 as f64, self.bounds.1 as f64);
        let ops = self.parts.len();
        for idx in 0..self.parts.len() {
            let (mut new_min, mut new_max) = (min, max);
            let (mut min_magnitude, mut max_magnitude) = (min.abs(), max.abs());
            for (other_idx, other) in self.parts.iter().enumerate() {
                if other_idx != idx {
                    let (other_min, other_max) = other.itr.get_bounds();
                    new_min -= other_max as f64;
                    new_max -= other_min as f64;
                    min_magnitude += (other_max as f64).abs();
                    max_magnitude += (other_min as f64).abs();
                }
            }
            let new_min = round_down(new_min, rounding_slack(min_magnitude, ops));
            let new_max = round_up(new_max, rounding_slack(max_magnitude, ops));
            if !self.push_child_bounds(idx, new_min, new_max) {
                return false;
            }
        }
        true
    }

    fn set_product_bounds(&mut self) -> bool {
        let (min, max) = (self.bounds.0 as f64, self.bounds.1 as f64);
        let ops = self.parts.len();
        for idx in 0..self.parts.len() {
            let mut others_min = 1.0f64;
            let mut others_max = 1.0f64;
            let mut others_non_negative = true;
            for (other_idx, other) in self.parts.iter().enumerate() {
                if other_idx != idx {
                    let (other_min, other_max) = other.itr.get_bounds();
                    others_non_negative &= other_min >= 0.0;
                    others_min *= other_min as f64;
                    others_max *= other_max as f64;
                }
            }
            if !others_non_negative {
                continue;
            }
            let new_min = if min > 0.0 {
                if others_max == 0.0 { 0.0 } else { min / others_max }
            } else {
                f64::NEG_INFINITY
            };
            let new_max = if max >= 0.0 {
                if others_min == 0.0 {
                    f64::INFINITY
                } else {
                    max / others_min
                }
            } else if others_max == 0.0 {
                f64::INFINITY
            } else {
                max / others_max
            };
            let new_min = round_down(new_min, rounding_slack(new_min.abs(), ops));
            let new_max = round_up(new_max, rounding_slack(new_max.abs(), ops));
            if !self.push_child_bounds(idx, new_min, new_max) {
                return false;
            }
        }
        true
    }

    fn set_min_bounds(&mut self) -> bool {
        let (min, _) = self.bounds;
        for part in self.parts.iter_mut() {
            let (child_min, child_max) = part.itr.get_bounds();
            if child_min < min && !part.itr.set_bounds(min, child_max) {
                return false;
            }
        }
        true
    }
}

impl DocItr for NaryDocItr {
    fn cur(&self) -> (DocId, f32) {
        (self.doc_id, self.score)
    }

    fn next(&mut self, mut min_id: DocId) -> Result<bool> {
        if self.parts.is_empty() {
            return Ok(false);
        }
        'candidate: loop {
            let mut score = self.op.identity();
            for part in self.parts.iter_mut() {
                while part.itr.cur().0 < min_id {
                    if !part.itr.next(min_id)? {
                        return Ok(false);
                    }
                }
                let (id, child_score) = part.itr.cur();
                if id > min_id {
                    min_id = id;
                    continue 'candidate;
                }
                score = self.op.combine(score, child_score);
            }
            if score < self.bounds.0 || score > self.bounds.1 {
                min_id += 1;
                continue;
            }
            self.doc_id = min_id;
            self.score = score;
            return Ok(true);
        }
    }

    fn get_bounds(&self) -> (f32, f32) {
        self.bounds
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        self.bounds = intersect_bounds(self.bounds, min, max);
        if self.bounds.0 > self.bounds.1 {
            return false;
        }
        match self.op {
            NaryOp::Sum => self.set_sum_bounds(),
            NaryOp::Product => self.set_product_bounds(),
            NaryOp::Min => self.set_min_bounds(),
        }
    }

    fn close(&mut self) {
        for part in self.parts.iter_mut() {
            part.itr.close();
        }
    }
}
