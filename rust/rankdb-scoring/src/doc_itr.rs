//! The score iterator contract shared by storage leaves and combinators.

use rankdb_common::Result;

/// Internal document identifier.
///
/// Identifiers are dense and assigned in insertion order. Negative values never
/// identify a document; [`NOT_POSITIONED`] marks an iterator that has not produced
/// a value yet.
pub type DocId = i64;

/// Document id reported by [`DocItr::cur`] before the first successful
/// [`DocItr::next`].
pub const NOT_POSITIONED: DocId = -1;

/// A forward-only stream of `(document id, score)` pairs in ascending id order,
/// with a narrowable window of scores it may still produce.
///
/// Iterators form trees: every composite owns its children and forwards
/// [`close`](DocItr::close) to them. Within one query the score window only ever
/// shrinks, so the bounds reported by [`get_bounds`](DocItr::get_bounds) are
/// non-increasing in width for the lifetime of the iterator.
///
/// The trait requires `Send` so that whole subtrees can be moved to shard worker
/// threads.
pub trait DocItr: Send {
    /// Returns the current `(id, score)`, or `(NOT_POSITIONED, _)` before the first
    /// call to [`next`](DocItr::next). The score is unspecified while not positioned.
    fn cur(&self) -> (DocId, f32);

    /// Advances to the first position whose id is `>= min_id`.
    ///
    /// Leaf iterators always move at least one entry forward. Returns `Ok(false)`
    /// once the stream is exhausted; the current position is then unspecified.
    fn next(&mut self, min_id: DocId) -> Result<bool>;

    /// Returns the provable `(min, max)` range of scores this iterator can still
    /// produce. An iterator with no data may report an inverted range.
    fn get_bounds(&self) -> (f32, f32);

    /// Narrows the window of scores the consumer is interested in.
    ///
    /// The new window is intersected with the current one, never widening it.
    /// Returns `false` when it is proven that no remaining value can fall inside
    /// the window; the consumer may then stop pulling from this iterator.
    fn set_bounds(&mut self, min: f32, max: f32) -> bool;

    /// Releases file handles and other resources held by the iterator tree.
    ///
    /// Closing is idempotent. A closed iterator must not be advanced again.
    fn close(&mut self);
}

/// Type-erased, owned score iterator.
pub type BoxedDocItr = Box<dyn DocItr>;

/// Intersects a `(min, max)` range with a requested window.
///
/// `NaN` window ends leave the corresponding side unchanged.
#[inline]
pub fn intersect_bounds(current: (f32, f32), min: f32, max: f32) -> (f32, f32) {
    (current.0.max(min), current.1.min(max))
}

/// Returns `true` if `score` lies within the inclusive `(min, max)` window.
#[inline]
pub fn in_bounds(score: f32, (min, max): (f32, f32)) -> bool {
    min <= score && score <= max
}

/// Absolute error allowance for `ops` rounded f32 operations on operands whose
/// absolute values sum to at most `magnitude`.
#[inline]
pub fn rounding_slack(magnitude: f64, ops: usize) -> f64 {
    magnitude * (ops as f64 + 1.0) * f32::EPSILON as f64
}

/// Lowers `value` by `slack` and rounds down to the next representable f32.
///
/// Child windows derived by inverting a combinator are computed in f64 and
/// rounded outward with this and [`round_up`], so that a child value whose f32
/// result lands inside the parent window is never excluded.
#[inline]
pub fn round_down(value: f64, slack: f64) -> f32 {
    let lowered = value - slack;
    if lowered.is_nan() {
        return f32::NEG_INFINITY;
    }
    (lowered as f32).next_down()
}

/// Raises `value` by `slack` and rounds up to the next representable f32.
#[inline]
pub fn round_up(value: f64, slack: f64) -> f32 {
    let raised = value + slack;
    if raised.is_nan() {
        return f32::INFINITY;
    }
    (raised as f32).next_up()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_bounds() {
        assert_eq!(intersect_bounds((0.0, 10.0), 2.0, 20.0), (2.0, 10.0));
        assert_eq!(intersect_bounds((0.0, 10.0), f32::NAN, 5.0), (0.0, 5.0));
        let (min, max) = intersect_bounds((0.0, 1.0), 5.0, 6.0);
        assert!(min > max);
        assert!(in_bounds(1.0, (1.0, 1.0)));
        assert!(!in_bounds(f32::NAN, (f32::NEG_INFINITY, f32::INFINITY)));
    }

    #[test]
    fn test_outward_rounding() {
        let lo = round_down(2.0, 0.0);
        let hi = round_up(2.0, 0.0);
        assert!(lo < 2.0 && hi > 2.0);
        assert_eq!(lo.next_up(), 2.0);

        // 1000.0 - 999.99 in f32 is off by far more than one ulp of the result.
        let slack = rounding_slack(1000.0 + 999.99, 2);
        let lo = round_down(1000.0 - 999.99f32 as f64, slack);
        assert!(lo <= 1000.0f32 - 999.99f32);

        assert_eq!(round_down(f64::NEG_INFINITY, 1.0), f32::NEG_INFINITY);
        assert_eq!(round_up(f64::INFINITY, 1.0), f32::INFINITY);
        assert_eq!(round_down(f64::INFINITY - f64::INFINITY, 0.0), f32::NEG_INFINITY);
        assert_eq!(round_up(1.0, f64::NAN), f32::INFINITY);
    }
}
