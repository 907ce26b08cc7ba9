//! Bucket sizing and splitting policy.

use serde::{Deserialize, Serialize};

use crate::{bucket::BucketKey, header::BucketHeader};

/// Controls how values are routed to buckets and when a bucket is retired in
/// favour of a narrower one.
///
/// A bucket with `v` variable bits accepts new postings until its entry count
/// exceeds [`capacity`](SplitPolicy::capacity). After that, postings matching its
/// prefix go to a new bucket with `v - split_step_bits` variable bits, and the
/// old bucket stays read-only. Wide buckets therefore split early and narrow
/// buckets grow large, which keeps the number of entries scanned per distinct
/// value range bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitPolicy {
    /// Variable bits of the first bucket created for a value range. The default
    /// of 23 keys buckets by sign and exponent.
    pub initial_variable_bits: u8,
    /// Variable bits removed by each split.
    pub split_step_bits: u8,
    /// Entry count every bucket may reach regardless of its width.
    pub base_capacity: u64,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        SplitPolicy {
            initial_variable_bits: 23,
            split_step_bits: 4,
            base_capacity: 20 * 1568,
        }
    }
}

impl SplitPolicy {
    pub fn with_initial_variable_bits(mut self, bits: u8) -> Self {
        self.initial_variable_bits = bits.min(BucketKey::MAX_VARIABLE_BITS);
        self
    }

    pub fn with_split_step_bits(mut self, bits: u8) -> Self {
        self.split_step_bits = bits.max(1);
        self
    }

    pub fn with_base_capacity(mut self, capacity: u64) -> Self {
        self.base_capacity = capacity;
        self
    }

    /// Maximum entry count of a bucket with `variable_bits` variable bits.
    pub fn capacity(&self, variable_bits: u8) -> u64 {
        let fixed = BucketKey::MAX_VARIABLE_BITS.saturating_sub(variable_bits) as u32;
        let fraction_bits = fixed.saturating_sub(9).min(62);
        self.base_capacity.saturating_add(1u64 << fraction_bits)
    }

    /// Returns `true` if new postings for `key` must go to a narrower bucket.
    pub fn should_split(&self, key: &BucketKey, header: &BucketHeader) -> bool {
        key.variable_bits > 0
            && header.min != header.max
            && header.count > self.capacity(key.variable_bits)
    }

    /// Variable bits of the bucket that replaces a full bucket with `variable_bits`.
    pub fn split_variable_bits(&self, variable_bits: u8) -> u8 {
        variable_bits.saturating_sub(self.split_step_bits.max(1))
    }
}
