//! On-disk posting lists for rankdb fields.
//!
//! Every field is stored as a set of *buckets*. A bucket holds the postings
//! `(document id, value)` whose `f32` bit patterns share a fixed-length prefix,
//! so each bucket covers a contiguous sub-range of the value space and carries
//! its own `min`/`max`. When a query narrows its score window, whole buckets
//! outside the window are skipped without being read.
//!
//! # Bucket file format
//!
//! A bucket file starts with a fixed 40-byte [`BucketHeader`] holding the value
//! range, the first posting (inline), the last document id and the entry count.
//! It is followed by a bit stream (see `rankdb_bits`) of entries:
//!
//! ```text
//! varuint(delta * 2 + has_remainder) [remainder: variable_bits]
//! ```
//!
//! `delta` is the gap to the previous document id of the bucket, and the
//! remainder is the low `variable_bits` bits of the value, omitted when zero.
//! Values whose low bits are all zero (small integers, for instance) therefore
//! cost nothing beyond the document id gap.
//!
//! # Splitting
//!
//! Buckets start wide (keyed by sign and exponent by default). When a bucket
//! exceeds the capacity allowed by its [`SplitPolicy`], new postings for its
//! prefix are routed to a narrower bucket and the old one is frozen.

pub mod bucket;
pub mod header;
pub mod policy;
pub mod reader;
pub mod store;

pub use bucket::BucketKey;
pub use header::{BucketHeader, FORMAT_VERSION, HEADER_SIZE};
pub use policy::SplitPolicy;
pub use reader::PostingListDocItr;
pub use store::{PostingStore, StoreOptions, WriteBatch, validate_field_name, validate_value};
