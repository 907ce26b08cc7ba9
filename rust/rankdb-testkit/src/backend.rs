use std::{collections::HashMap, sync::Arc};

use rankdb_common::Result;
use rankdb_query::{FieldSource, IndexBackend, Record};
use rankdb_scoring::{BoxedDocItr, DocId, MemoryDocItr};

/// Stores each field as a plain vector of postings. Ids start at 1.
#[derive(Debug, Default)]
pub struct VecBackend {
    next_id: DocId,
    fields: HashMap<String, Vec<(DocId, f32)>>,
}

impl VecBackend {
    pub fn new() -> VecBackend {
        VecBackend::default()
    }
}

impl FieldSource for VecBackend {
    fn field_doc_itr(&self, field: &str) -> Result<BoxedDocItr> {
        let postings = self.fields.get(field).cloned().unwrap_or_default();
        Ok(Box::new(MemoryDocItr::new(Arc::new(postings))))
    }
}

impl IndexBackend for VecBackend {
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            self.next_id += 1;
            for (name, &value) in record {
                self.fields
                    .entry(name.clone())
                    .or_default()
                    .push((self.next_id, value));
            }
            ids.push(self.next_id);
        }
        Ok(ids)
    }
}
