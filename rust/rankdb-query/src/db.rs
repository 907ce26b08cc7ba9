//! Database layering: storage backends, streaming databases and the top-K
//! front end.
//!
//! ```text
//! ScoreDb ── query(&Query) ─► StreamingDb::query_itr ─► compile ─► FieldSource
//!                                 (BackendDb, sharded dbs)          (backends)
//! ```

use std::collections::BTreeMap;

use rankdb_common::Result;
use rankdb_scoring::{BoxedDocItr, DocId};
use serde::{Deserialize, Serialize};

use crate::{
    compile::{FieldSource, compile},
    expr::ScorerExpr,
    top_k::{DocScore, top_k},
};

/// A record to be indexed: named numeric fields.
pub type Record = BTreeMap<String, f32>;

/// A storage backend able to index records and serve per-field iterators.
pub trait IndexBackend: FieldSource {
    /// Indexes `records` and returns their internal ids, in order.
    ///
    /// Ids are assigned contiguously and increase across calls.
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>>;
}

/// A database producing a single merged score iterator for an expression.
pub trait StreamingDb {
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>>;

    fn query_itr(&self, scorer: &ScorerExpr) -> Result<BoxedDocItr>;
}

impl<S: StreamingDb + ?Sized> StreamingDb for Box<S> {
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>> {
        (**self).bulk_index(records)
    }

    fn query_itr(&self, scorer: &ScorerExpr) -> Result<BoxedDocItr> {
        (**self).query_itr(scorer)
    }
}

/// A [`StreamingDb`] over a single backend.
pub struct BackendDb<B> {
    backend: B,
}

impl<B: IndexBackend> BackendDb<B> {
    pub fn new(backend: B) -> BackendDb<B> {
        BackendDb { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

impl<B: IndexBackend> StreamingDb for BackendDb<B> {
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>> {
        self.backend.bulk_index(records)
    }

    fn query_itr(&self, scorer: &ScorerExpr) -> Result<BoxedDocItr> {
        compile(scorer, &self.backend)
    }
}

fn default_limit() -> usize {
    10
}

/// A top-K query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Candidates scoring below this value are never returned.
    #[serde(default)]
    pub min_score: Option<f32>,
    pub scorer: ScorerExpr,
}

impl Query {
    pub fn new(scorer: ScorerExpr) -> Query {
        Query {
            offset: 0,
            limit: default_limit(),
            min_score: None,
            scorer,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// Ranked hits, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<DocScore>,
}

impl QueryResult {
    pub fn ids(&self) -> Vec<DocId> {
        self.hits.iter().map(|hit| hit.doc_id).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// The outermost database layer: indexes records and answers top-K queries.
pub struct ScoreDb<S> {
    inner: S,
}

impl<S: StreamingDb> ScoreDb<S> {
    pub fn new(inner: S) -> ScoreDb<S> {
        ScoreDb { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>> {
        self.inner.bulk_index(records)
    }

    pub fn index(&mut self, record: Record) -> Result<DocId> {
        let ids = self.inner.bulk_index(std::slice::from_ref(&record))?;
        ids.first()
            .copied()
            .ok_or_else(|| rankdb_common::Error::invalid_operation("index returned no id"))
    }

    pub fn query(&self, query: &Query) -> Result<QueryResult> {
        if query.limit == 0 {
            return Ok(QueryResult::default());
        }
        let itr = self.inner.query_itr(&query.scorer)?;
        let min_score = query.min_score.unwrap_or(f32::NEG_INFINITY);
        let hits = top_k(itr, query.offset, query.limit, min_score)?;
        Ok(QueryResult { hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_json() {
        let query: Query =
            serde_json::from_str(r#"{"scorer": ["field", "age"], "offset": 2}"#).unwrap();
        assert_eq!(query.offset, 2);
        assert_eq!(query.limit, 10);
        assert_eq!(query.min_score, None);
        assert_eq!(query.scorer, ScorerExpr::field("age"));

        let err = serde_json::from_str::<Query>(r#"{"scorer": ["fields", "age"]}"#).unwrap_err();
        assert!(err.to_string().contains("not recognized"), "{err}");
    }
}
