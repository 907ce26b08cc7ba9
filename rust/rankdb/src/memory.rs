//! In-memory storage backend.

use std::sync::Arc;

use ahash::AHashMap;
use rankdb_common::Result;
use rankdb_postings::{validate_field_name, validate_value};
use rankdb_query::{FieldSource, IndexBackend, Record};
use rankdb_scoring::{BoxedDocItr, DocId, MemoryDocItr};

/// Keeps every field as an append-only vector of `(doc id, value)` postings.
///
/// Iterators share the vector through an `Arc`; indexing while a query holds an
/// iterator copies the field on write.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    fields: AHashMap<String, Arc<Vec<(DocId, f32)>>>,
    next_doc_id: DocId,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    /// Number of documents indexed so far.
    pub fn doc_count(&self) -> usize {
        self.next_doc_id as usize
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl FieldSource for MemoryBackend {
    fn field_doc_itr(&self, field: &str) -> Result<BoxedDocItr> {
        let itr = match self.fields.get(field) {
            Some(postings) => MemoryDocItr::new(postings.clone()),
            None => MemoryDocItr::empty(),
        };
        Ok(Box::new(itr))
    }
}

impl IndexBackend for MemoryBackend {
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>> {
        for record in records {
            for (name, &value) in record {
                validate_field_name(name)?;
                validate_value(name, value)?;
            }
        }
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            self.next_doc_id += 1;
            for (name, &value) in record {
                let postings = self.fields.entry(name.clone()).or_default();
                Arc::make_mut(postings).push((self.next_doc_id, value));
            }
            ids.push(self.next_doc_id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use rankdb_common::ErrorKind;
    use rankdb_scoring::DocItr;

    use rankdb_testkit::record;

    use super::*;

    #[test]
    fn test_index_and_iterate() {
        let mut backend = MemoryBackend::new();
        let ids = backend
            .bulk_index(&[record(&[("a", 1.0)]), record(&[("a", 2.0), ("b", 5.0)])])
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        let mut itr = backend.field_doc_itr("b").unwrap();
        assert_eq!(itr.get_bounds(), (5.0, 5.0));
        assert!(itr.next(0).unwrap());
        assert_eq!(itr.cur(), (2, 5.0));
        assert!(!itr.next(3).unwrap());

        let mut missing = backend.field_doc_itr("zzz").unwrap();
        assert!(!missing.next(0).unwrap());
    }

    #[test]
    fn test_open_iterator_keeps_snapshot() {
        let mut backend = MemoryBackend::new();
        backend.bulk_index(&[record(&[("a", 1.0)])]).unwrap();
        let mut itr = backend.field_doc_itr("a").unwrap();
        backend.bulk_index(&[record(&[("a", 2.0)])]).unwrap();
        assert!(itr.next(0).unwrap());
        assert!(!itr.next(2).unwrap());
        assert_eq!(backend.doc_count(), 2);
    }

    #[test]
    fn test_rejects_invalid_records_atomically() {
        let mut backend = MemoryBackend::new();
        let err = backend
            .bulk_index(&[record(&[("a", 1.0)]), record(&[("b", f32::NAN)])])
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        assert!(backend.bulk_index(&[record(&[("../x", 1.0)])]).is_err());
        assert_eq!(backend.doc_count(), 0);
        assert_eq!(backend.field_names().count(), 0);
    }
}
