//! Database options and construction.

use std::path::PathBuf;

use rankdb_common::{Error, Result};
use rankdb_postings::{SplitPolicy, StoreOptions};
use rankdb_query::{BackendDb, ScoreDb, StreamingDb};
use rankdb_sharding::{DEFAULT_SHARD_BITS, ShardIds, ShardOptions, ShardedDb};
use serde::{Deserialize, Serialize};

use crate::{fs::FsBackend, memory::MemoryBackend};

/// A database with its layers erased, as built by [`DbOptions::open`].
pub type Db = ScoreDb<Box<dyn StreamingDb>>;

/// Options controlling how a database is opened.
///
/// ```
/// # use rankdb::DbOptions;
/// let options: DbOptions = serde_json::from_str(r#"{"shard_count": 4}"#).unwrap();
/// assert_eq!(options, DbOptions::default().with_shard_count(4));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbOptions {
    /// Data directory; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Number of shards. With more than one, each shard of an on-disk database
    /// lives in its own `shard-NNNN` subdirectory.
    pub shard_count: usize,
    pub shard_bits: u32,
    pub split_policy: SplitPolicy,
}

impl Default for DbOptions {
    fn default() -> Self {
        DbOptions {
            data_dir: None,
            shard_count: 1,
            shard_bits: DEFAULT_SHARD_BITS,
            split_policy: SplitPolicy::default(),
        }
    }
}

impl DbOptions {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_shard_bits(mut self, shard_bits: u32) -> Self {
        self.shard_bits = shard_bits;
        self
    }

    pub fn with_split_policy(mut self, split_policy: SplitPolicy) -> Self {
        self.split_policy = split_policy;
        self
    }

    /// Opens a database with these options.
    pub fn open(&self) -> Result<Db> {
        if self.shard_count == 0 {
            return Err(Error::invalid_arg("shard_count", "must be at least 1"));
        }
        let inner: Box<dyn StreamingDb> = if self.shard_count == 1 {
            match &self.data_dir {
                Some(dir) => Box::new(BackendDb::new(FsBackend::open(dir, self.store_options())?)),
                None => Box::new(BackendDb::new(MemoryBackend::new())),
            }
        } else {
            ShardIds::new(self.shard_bits)?.check_shard_count(self.shard_count)?;
            let shard_options = ShardOptions::default().with_shard_bits(self.shard_bits);
            match &self.data_dir {
                Some(dir) => {
                    let shards = (0..self.shard_count)
                        .map(|shard| {
                            let shard_dir = dir.join(format!("shard-{shard:04}"));
                            FsBackend::open(shard_dir, self.store_options()).map(BackendDb::new)
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Box::new(ShardedDb::new(shards, shard_options)?)
                }
                None => {
                    let shards = (0..self.shard_count)
                        .map(|_| BackendDb::new(MemoryBackend::new()))
                        .collect();
                    Box::new(ShardedDb::new(shards, shard_options)?)
                }
            }
        };
        Ok(ScoreDb::new(inner))
    }

    fn store_options(&self) -> StoreOptions {
        StoreOptions::default().with_split_policy(self.split_policy.clone())
    }
}
