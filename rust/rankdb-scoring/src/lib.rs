//! Score iterator algebra for rankdb queries.
//!
//! A query is executed as a tree of [`DocItr`]s. Leaves stream the `(document id,
//! value)` pairs of one field; composites transform or combine the scores of their
//! children. Every iterator produces documents in ascending id order, which lets
//! the n-ary combinators intersect their children with a simple merge.
//!
//! # Bound propagation
//!
//! Each iterator can report the range of scores it may still produce
//! ([`DocItr::get_bounds`]) and accept a narrower window of interesting scores
//! ([`DocItr::set_bounds`]). A composite translates a window on its output into
//! windows on its inputs by inverting its function:
//!
//! | Iterator | Output | Window pushed to the child |
//! |---|---|---|
//! | [`ScaleDocItr`] | `c * x` | `[min / c, max / c]`, swapped for `c < 0` |
//! | [`DiffDocItr`] | `abs(x - t)` | `[t - max, t + max]` |
//! | [`PowDocItr`] | `x ^ e` | `[min ^ (1/e), max ^ (1/e)]`, reordered |
//! | [`NaryDocItr`] sum | `x1 + x2 + ...` | window minus the extremes of the others |
//! | [`NaryDocItr`] product | `x1 * x2 * ...` | window divided by the extremes of the others |
//! | [`NaryDocItr`] min | `min(x1, x2, ...)` | lower bound only |
//! | [`CustomLinearDocItr`] | piecewise linear | pre-image over every segment |
//! | [`CustomMapDocItr`] | lookup table | matching table inputs |
//!
//! Leaves apply the window directly: the field merge evicts whole buckets whose
//! value range falls outside it. The top-K engine drives this by raising the lower
//! bound to the worst retained score whenever its heap is full.

pub mod custom_linear;
pub mod custom_map;
pub mod diff;
pub mod doc_itr;
pub mod field_merge;
pub mod geo;
pub mod memory;
pub mod nary;
pub mod pow;
pub mod scale;

pub use custom_linear::{CustomLinearDocItr, CustomPoint};
pub use custom_map::CustomMapDocItr;
pub use diff::DiffDocItr;
pub use doc_itr::{BoxedDocItr, DocId, DocItr, NOT_POSITIONED};
pub use field_merge::FieldMergeDocItr;
pub use geo::geo_distance;
pub use memory::MemoryDocItr;
pub use nary::{NaryDocItr, NaryOp};
pub use pow::PowDocItr;
pub use scale::ScaleDocItr;
