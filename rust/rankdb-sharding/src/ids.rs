//! Packing of shard numbers into document ids.
//!
//! A sharded id keeps the sign bit clear, stores the shard number in the next
//! `shard_bits` bits and the shard-local id in the remaining low bits:
//!
//! ```text
//!  63  62 ........... 63-shard_bits  ..................... 0
//! [ 0 ][ shard number            ][ local id              ]
//! ```

use rankdb_common::{Error, Result, verify_arg};
use rankdb_scoring::DocId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHARD_BITS: u32 = 14;

/// Largest supported shard bit count; at least one bit is left for local ids.
pub const MAX_SHARD_BITS: u32 = 62;

/// Id layout for a fixed number of reserved shard bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardIds {
    shard_bits: u32,
}

impl ShardIds {
    pub fn new(shard_bits: u32) -> Result<ShardIds> {
        verify_arg!(shard_bits, shard_bits <= MAX_SHARD_BITS);
        Ok(ShardIds { shard_bits })
    }

    pub fn shard_bits(&self) -> u32 {
        self.shard_bits
    }

    #[inline]
    fn local_bits(&self) -> u32 {
        63 - self.shard_bits
    }

    /// Number of shards addressable with this layout.
    pub fn max_shards(&self) -> usize {
        1usize << self.shard_bits
    }

    /// Largest shard-local id.
    pub fn max_local_id(&self) -> DocId {
        ((1u64 << self.local_bits()) - 1) as DocId
    }

    /// Fails with `ResourceExhausted` if `shard_count` shards do not fit.
    pub fn check_shard_count(&self, shard_count: usize) -> Result<()> {
        if shard_count > self.max_shards() {
            return Err(Error::resource_exhausted(
                "shard ids",
                format!(
                    "{shard_count} shards do not fit in {} shard bits (at most {})",
                    self.shard_bits,
                    self.max_shards()
                ),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn pack(&self, shard: usize, local: DocId) -> Result<DocId> {
        if shard >= self.max_shards() {
            return Err(Error::resource_exhausted(
                "shard ids",
                format!("shard {shard} does not fit in {} bits", self.shard_bits),
            ));
        }
        if !(0..=self.max_local_id()).contains(&local) {
            return Err(Error::resource_exhausted(
                "document ids",
                format!(
                    "local id {local} of shard {shard} does not fit in {} bits",
                    self.local_bits()
                ),
            ));
        }
        Ok(((shard as DocId) << self.local_bits()) | local)
    }

    /// Splits a packed id into `(shard, local id)`.
    #[inline]
    pub fn unpack(&self, id: DocId) -> (usize, DocId) {
        ((id >> self.local_bits()) as usize, id & self.max_local_id())
    }
}

impl Default for ShardIds {
    fn default() -> Self {
        ShardIds {
            shard_bits: DEFAULT_SHARD_BITS,
        }
    }
}
