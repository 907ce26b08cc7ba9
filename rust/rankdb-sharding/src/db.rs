use rankdb_common::{Error, Result};
use rankdb_query::{Record, ScorerExpr, StreamingDb};
use rankdb_scoring::{BoxedDocItr, DocId};

use crate::{ShardOptions, ids::ShardIds, parallel::ParallelDocItr};

/// A [`StreamingDb`] spread over independent shards.
///
/// Each indexing batch goes to one shard, chosen round-robin, and the returned
/// ids carry the shard number in their high bits. Queries compile one subtree
/// per shard and merge them with a [`ParallelDocItr`].
pub struct ShardedDb<S> {
    shards: Vec<S>,
    ids: ShardIds,
    options: ShardOptions,
    next_shard: usize,
}

impl<S: StreamingDb> ShardedDb<S> {
    /// Fails with `ResourceExhausted` if the shards do not fit in the configured
    /// shard bits.
    pub fn new(shards: Vec<S>, options: ShardOptions) -> Result<ShardedDb<S>> {
        if shards.is_empty() {
            return Err(Error::invalid_arg("shards", "at least one shard is required"));
        }
        let ids = ShardIds::new(options.shard_bits)?;
        ids.check_shard_count(shards.len())?;
        Ok(ShardedDb {
            shards,
            ids,
            options,
            next_shard: 0,
        })
    }

    pub fn shards(&self) -> &[S] {
        &self.shards
    }

    pub fn ids(&self) -> ShardIds {
        self.ids
    }
}

impl<S: StreamingDb> StreamingDb for ShardedDb<S> {
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>> {
        let shard = self.next_shard;
        self.next_shard = (self.next_shard + 1) % self.shards.len();
        let local_ids = self.shards[shard].bulk_index(records)?;
        local_ids
            .into_iter()
            .map(|local| self.ids.pack(shard, local))
            .collect()
    }

    fn query_itr(&self, scorer: &ScorerExpr) -> Result<BoxedDocItr> {
        let mut children: Vec<BoxedDocItr> = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            match shard.query_itr(scorer) {
                Ok(itr) => children.push(itr),
                Err(e) => {
                    children.iter_mut().for_each(|child| child.close());
                    return Err(e);
                }
            }
        }
        Ok(Box::new(ParallelDocItr::new(children, &self.options)?))
    }
}
