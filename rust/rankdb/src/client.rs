//! Translation between client-supplied string ids and internal document ids.

use ahash::AHashMap;
use rankdb_common::{Error, Result};
use rankdb_query::{Query, Record, ScoreDb, StreamingDb};
use rankdb_scoring::DocId;
use serde::{Deserialize, Serialize};

/// Persistent mapping of internal ids to client ids.
pub trait IdMap {
    /// Associates `client_ids[i]` with `internal_ids[i]`.
    fn put(&mut self, internal_ids: &[DocId], client_ids: &[String]) -> Result<()>;

    /// Looks up the client id of every internal id. Fails if any id is unknown.
    fn get(&self, internal_ids: &[DocId]) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct MemoryIdMap {
    ids: AHashMap<DocId, String>,
}

impl MemoryIdMap {
    pub fn new() -> MemoryIdMap {
        MemoryIdMap::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl IdMap for MemoryIdMap {
    fn put(&mut self, internal_ids: &[DocId], client_ids: &[String]) -> Result<()> {
        if internal_ids.len() != client_ids.len() {
            return Err(Error::invalid_arg(
                "client_ids",
                format!(
                    "{} client ids for {} internal ids",
                    client_ids.len(),
                    internal_ids.len()
                ),
            ));
        }
        self.ids
            .extend(internal_ids.iter().copied().zip(client_ids.iter().cloned()));
        Ok(())
    }

    fn get(&self, internal_ids: &[DocId]) -> Result<Vec<String>> {
        internal_ids
            .iter()
            .map(|id| {
                self.ids.get(id).cloned().ok_or_else(|| {
                    Error::invalid_arg("id", format!("no client id for internal id {id}"))
                })
            })
            .collect()
    }
}

/// A query hit named by its client id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientHit {
    pub id: String,
    pub score: f32,
}

/// A [`ScoreDb`] addressed by client ids.
pub struct ClientDb<S, M> {
    db: ScoreDb<S>,
    id_map: M,
}

impl<S: StreamingDb, M: IdMap> ClientDb<S, M> {
    pub fn new(db: ScoreDb<S>, id_map: M) -> ClientDb<S, M> {
        ClientDb { db, id_map }
    }

    pub fn db(&self) -> &ScoreDb<S> {
        &self.db
    }

    pub fn id_map(&self) -> &M {
        &self.id_map
    }

    /// Indexes `(client id, record)` pairs.
    pub fn bulk_index(&mut self, records: Vec<(String, Record)>) -> Result<()> {
        let (client_ids, records): (Vec<_>, Vec<_>) = records.into_iter().unzip();
        let internal_ids = self.db.bulk_index(&records)?;
        self.id_map.put(&internal_ids, &client_ids)
    }

    pub fn index(&mut self, id: impl Into<String>, record: Record) -> Result<()> {
        self.bulk_index(vec![(id.into(), record)])
    }

    /// Runs `query` and returns hits with client ids, best first.
    pub fn query(&self, query: &Query) -> Result<Vec<ClientHit>> {
        let result = self.db.query(query)?;
        let ids = self.id_map.get(&result.ids())?;
        Ok(ids
            .into_iter()
            .zip(&result.hits)
            .map(|(id, hit)| ClientHit {
                id,
                score: hit.score,
            })
            .collect())
    }
}
