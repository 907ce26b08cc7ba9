//! User-defined piecewise-linear remapping.

use rankdb_common::{Error, Result};

use crate::doc_itr::{BoxedDocItr, DocId, DocItr, round_down, round_up, rounding_slack};

/// A control point `(x, y)` of a user-defined function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomPoint {
    pub x: f32,
    pub y: f32,
}

impl CustomPoint {
    pub fn new(x: f32, y: f32) -> CustomPoint {
        CustomPoint { x, y }
    }
}

#[derive(Clone, Copy)]
struct Point64 {
    x: f64,
    y: f64,
}

impl From<CustomPoint> for Point64 {
    fn from(p: CustomPoint) -> Self {
        Point64 {
            x: p.x as f64,
            y: p.y as f64,
        }
    }
}

/// Sorts control points by `x` and rejects empty sets, non-finite coordinates and
/// duplicate `x` values.
pub fn normalize_points(mut points: Vec<CustomPoint>, function: &str) -> Result<Vec<CustomPoint>> {
    if points.is_empty() {
        return Err(Error::invalid_query(format!(
            "{function} requires at least one control point"
        )));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Error::invalid_query(format!(
            "{function} control points must be finite numbers"
        )));
    }
    points.sort_by(|a, b| a.x.total_cmp(&b.x));
    if points.windows(2).any(|w| w[0].x == w[1].x) {
        return Err(Error::invalid_query(format!(
            "{function} control points must have distinct x values"
        )));
    }
    Ok(points)
}

/// Evaluates the piecewise-linear function through `points` (sorted by `x`).
///
/// Inputs left of the first point or right of the last one are clamped to that
/// point's `y`. Interpolated values never leave the `y` range of their segment.
pub fn interpolate(x: f32, points: &[CustomPoint]) -> f32 {
    let idx = points.partition_point(|p| p.x < x);
    if idx == 0 {
        points[0].y
    } else if idx == points.len() {
        points[points.len() - 1].y
    } else {
        let p1 = points[idx - 1];
        let p2 = points[idx];
        let t = (x - p1.x) / (p2.x - p1.x);
        (p2.y * t + p1.y * (1.0 - t))
            .max(p1.y.min(p2.y))
            .min(p1.y.max(p2.y))
    }
}

/// Range of values `interpolate` can return for inputs at `x`, allowing for
/// rounding when `x` falls strictly inside a segment.
fn interpolated_range(x: f32, points: &[CustomPoint]) -> (f32, f32) {
    let y = interpolate(x, points);
    let idx = points.partition_point(|p| p.x < x);
    if idx == 0 || idx == points.len() || points[idx].x == x {
        return (y, y);
    }
    let (p1, p2) = (points[idx - 1], points[idx]);
    let slack = rounding_slack((p1.y as f64).abs() + (p2.y as f64).abs(), 4);
    (
        round_down(y as f64, slack).max(p1.y.min(p2.y)),
        round_up(y as f64, slack).min(p1.y.max(p2.y)),
    )
}

/// Scores `f(child)` for a piecewise-linear `f`.
///
/// The function need not be monotonic: bounds take interior control points into
/// account, and narrowing computes the pre-image of the requested window over
/// every segment.
pub struct CustomLinearDocItr {
    points: Vec<CustomPoint>,
    child: BoxedDocItr,
}

impl CustomLinearDocItr {
    /// `points` must be non-empty and sorted by strictly increasing `x`
    /// (see [`normalize_points`]).
    pub fn new(points: Vec<CustomPoint>, child: BoxedDocItr) -> CustomLinearDocItr {
        debug_assert!(!points.is_empty());
        debug_assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        CustomLinearDocItr { points, child }
    }
}

/// Widens `(lo, hi)` to include the `x` at which segment `p1..p2` reaches `y`, if
/// it does.
fn include_crossing(y: f64, p1: CustomPoint, p2: CustomPoint, lo: &mut f64, hi: &mut f64) {
    let (p1, p2) = (Point64::from(p1), Point64::from(p2));
    let x = if p1.y <= y && y <= p2.y {
        if p1.y == p2.y {
            p1.x
        } else {
            let earliness = (p2.y - y) / (p2.y - p1.y);
            p1.x * earliness + p2.x * (1.0 - earliness)
        }
    } else if p1.y >= y && y >= p2.y {
        let lateness = (p1.y - y) / (p1.y - p2.y);
        p2.x * lateness + p1.x * (1.0 - lateness)
    } else {
        return;
    };
    *lo = lo.min(x);
    *hi = hi.max(x);
}

impl DocItr for CustomLinearDocItr {
    fn cur(&self) -> (DocId, f32) {
        let (id, score) = self.child.cur();
        (id, interpolate(score, &self.points))
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        self.child.next(min_id)
    }

    fn get_bounds(&self) -> (f32, f32) {
        let (inside_min, inside_max) = self.child.get_bounds();
        let a = interpolated_range(inside_min, &self.points);
        let b = interpolated_range(inside_max, &self.points);
        let (mut min, mut max) = (a.0.min(b.0), a.1.max(b.1));
        for point in &self.points {
            if point.x <= inside_min {
                continue;
            }
            if point.x >= inside_max {
                break;
            }
            min = min.min(point.y);
            max = max.max(point.y);
        }
        (min, max)
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        let points = &self.points;
        // Interpolation rounds, so the window is widened before taking its
        // pre-image.
        let (y_magnitude, x_magnitude) = points.iter().fold((0.0f64, 0.0f64), |(y, x), p| {
            (y.max((p.y as f64).abs()), x.max((p.x as f64).abs()))
        });
        let y_slack = rounding_slack(2.0 * y_magnitude, 4);
        let (min, max) = (min as f64 - y_slack, max as f64 + y_slack);
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for pair in points.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            include_crossing(min, p1, p2, &mut lo, &mut hi);
            include_crossing(max, p1, p2, &mut lo, &mut hi);
            let y = p2.y as f64;
            if min <= y && y <= max {
                lo = lo.min(p2.x as f64);
                hi = hi.max(p2.x as f64);
            }
        }
        let first = points[0].y as f64;
        if min <= first && first <= max {
            lo = f64::NEG_INFINITY;
        }
        let last = points[points.len() - 1].y as f64;
        if min <= last && last <= max {
            hi = f64::INFINITY;
        }
        let x_slack = rounding_slack(x_magnitude, 4);
        self.child
            .set_bounds(round_down(lo, x_slack), round_up(hi, x_slack))
    }

    fn close(&mut self) {
        self.child.close();
    }
}
