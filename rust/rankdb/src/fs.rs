//! Filesystem storage backend.

use std::path::{Path, PathBuf};

use rankdb_common::{Error, Result, verify_data};
use rankdb_postings::{PostingStore, StoreOptions, validate_field_name, validate_value};
use rankdb_query::{FieldSource, IndexBackend, Record};
use rankdb_scoring::{BoxedDocItr, DocId};
use serde::{Deserialize, Serialize};

/// Catalogue file kept next to the posting store.
pub const META_FILE: &str = "meta.json";

pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Meta {
    version: u32,
    next_doc_id: DocId,
}

/// Stores fields as bucketed posting lists in a data directory.
///
/// Every [`bulk_index`](IndexBackend::bulk_index) call is one posting store
/// batch. The batch's ids are reserved in `meta.json` before any posting is
/// written, so ids of a failed or interrupted batch are skipped rather than
/// handed out again. Opening also starts past the last id found in any bucket,
/// which covers a catalogue older than the postings.
pub struct FsBackend {
    dir: PathBuf,
    store: PostingStore,
    next_doc_id: DocId,
}

impl FsBackend {
    /// Opens the backend at `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>, options: StoreOptions) -> Result<FsBackend> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
        let from_meta = match read_meta(&dir)? {
            Some(meta) => meta.next_doc_id,
            None => 1,
        };
        let store = PostingStore::open(&dir, options)?;
        let next_doc_id = match store.last_doc_id() {
            Some(last) if last >= from_meta => {
                log::warn!(
                    "{} in {} is behind stored doc {last}; resuming after it",
                    META_FILE,
                    dir.display()
                );
                last + 1
            }
            _ => from_meta,
        };
        log::info!(
            "opened rankdb data directory {} at doc id {next_doc_id}",
            dir.display()
        );
        Ok(FsBackend {
            dir,
            store,
            next_doc_id,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self) -> &PostingStore {
        &self.store
    }

    /// Id that the next indexed record will receive.
    pub fn next_doc_id(&self) -> DocId {
        self.next_doc_id
    }
}

impl FieldSource for FsBackend {
    fn field_doc_itr(&self, field: &str) -> Result<BoxedDocItr> {
        Ok(self.store.field_doc_itr(field))
    }
}

impl IndexBackend for FsBackend {
    fn bulk_index(&mut self, records: &[Record]) -> Result<Vec<DocId>> {
        for record in records {
            for (name, &value) in record {
                validate_field_name(name)?;
                validate_value(name, value)?;
            }
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let first = self.next_doc_id;
        let end = first + records.len() as DocId;
        write_meta(
            &self.dir,
            &Meta {
                version: META_VERSION,
                next_doc_id: end,
            },
        )?;
        self.next_doc_id = end;

        let mut batch = self.store.begin_batch();
        for (doc_id, record) in (first..).zip(records) {
            for (name, &value) in record {
                batch.write(name, doc_id, value)?;
            }
        }
        batch.commit()?;
        Ok((first..end).collect())
    }
}

fn read_meta(dir: &Path) -> Result<Option<Meta>> {
    let path = dir.join(META_FILE);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path.display().to_string(), e)),
    };
    let meta: Meta = serde_json::from_slice(&bytes)
        .map_err(|e| Error::corrupted(path.display().to_string(), e.to_string()))?;
    if meta.version != META_VERSION {
        return Err(Error::corrupted(
            path.display().to_string(),
            format!("unsupported version {}", meta.version),
        ));
    }
    verify_data!(meta_json, meta.next_doc_id >= 1);
    Ok(Some(meta))
}

fn write_meta(dir: &Path, meta: &Meta) -> Result<()> {
    let path = dir.join(META_FILE);
    let tmp = dir.join(format!("{META_FILE}.tmp"));
    let bytes = serde_json::to_vec_pretty(meta)
        .map_err(|e| Error::invalid_operation(format!("serialize {META_FILE}: {e}")))?;
    std::fs::write(&tmp, bytes).map_err(|e| Error::io(tmp.display().to_string(), e))?;
    std::fs::rename(&tmp, &path).map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(())
}
