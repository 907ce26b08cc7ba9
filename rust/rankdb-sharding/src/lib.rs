//! Sharded execution for rankdb.
//!
//! A shard is a complete, independent storage and query stack. [`ShardedDb`]
//! routes indexing batches to shards and answers queries by running every
//! shard's iterator tree on its own thread, merging the candidates in the
//! consumer (see [`parallel`]).

pub mod db;
pub mod ids;
pub mod parallel;

use serde::{Deserialize, Serialize};

pub use db::ShardedDb;
pub use ids::{DEFAULT_SHARD_BITS, ShardIds};
pub use parallel::ParallelDocItr;

/// Options of a shard set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardOptions {
    /// High id bits reserved for the shard number.
    pub shard_bits: u32,
    /// Worker threads are named `{prefix}-{shard}`.
    pub worker_thread_prefix: String,
}

impl ShardOptions {
    pub fn with_shard_bits(mut self, shard_bits: u32) -> Self {
        self.shard_bits = shard_bits;
        self
    }

    pub fn with_worker_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.worker_thread_prefix = prefix.into();
        self
    }
}

impl Default for ShardOptions {
    fn default() -> Self {
        ShardOptions {
            shard_bits: DEFAULT_SHARD_BITS,
            worker_thread_prefix: "rankdb-shard".to_string(),
        }
    }
}
