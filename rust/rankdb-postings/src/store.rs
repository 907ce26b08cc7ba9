//! The per-field bucket catalogue and the batched write path.

use std::{
    collections::{BTreeMap, BTreeSet, hash_map::Entry},
    fs::{File, OpenOptions},
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use ahash::AHashMap;
use rankdb_bits::BitWriter;
use rankdb_common::{Error, Result};
use rankdb_scoring::{BoxedDocItr, DocId, FieldMergeDocItr};
use serde::{Deserialize, Serialize};

use crate::{
    bucket::BucketKey,
    header::{BucketHeader, HEADER_SIZE},
    policy::SplitPolicy,
    reader::PostingListDocItr,
};

/// Name of the directory under the store root that holds one directory per field.
pub const FIELDS_DIR: &str = "fields";

/// Options of a [`PostingStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub split_policy: SplitPolicy,
}

impl StoreOptions {
    pub fn with_split_policy(mut self, split_policy: SplitPolicy) -> Self {
        self.split_policy = split_policy;
        self
    }
}

/// Buckets of one field, ordered most specific first.
#[derive(Default)]
struct FieldBuckets {
    buckets: BTreeMap<BucketKey, BucketHeader>,
    /// Distinct `variable_bits` values in use, ascending.
    levels: BTreeSet<u8>,
}

impl FieldBuckets {
    fn insert(&mut self, key: BucketKey, header: BucketHeader) {
        self.levels.insert(key.variable_bits);
        self.buckets.insert(key, header);
    }

    /// The most specific existing bucket whose range contains `value`.
    fn find(&self, value: f32) -> Option<(BucketKey, &BucketHeader)> {
        self.levels.iter().find_map(|&variable_bits| {
            let key = BucketKey::for_value(value, variable_bits);
            self.buckets.get(&key).map(|header| (key, header))
        })
    }
}

/// Posting lists of all fields of one database directory.
///
/// On disk, every field is a directory of bucket files:
///
/// ```text
/// <root>/fields/<field>/<fixed bits>-<prefix hex>
/// ```
///
/// The store exclusively owns the bucket catalogue (the headers of all
/// buckets). Readers get a snapshot of the relevant headers and open the files
/// read-only; writes go through a [`WriteBatch`], which requires exclusive
/// access to the store.
pub struct PostingStore {
    root: PathBuf,
    options: StoreOptions,
    fields: AHashMap<String, FieldBuckets>,
}

impl PostingStore {
    /// Opens (or initializes) the store at `root`, loading every bucket header.
    pub fn open(root: impl Into<PathBuf>, options: StoreOptions) -> Result<PostingStore> {
        let root = root.into();
        let fields_dir = root.join(FIELDS_DIR);
        std::fs::create_dir_all(&fields_dir)
            .map_err(|e| Error::io(fields_dir.display().to_string(), e))?;

        let mut fields = AHashMap::new();
        let mut bucket_count = 0usize;
        for entry in read_dir(&fields_dir)? {
            let entry = entry.map_err(|e| Error::io(fields_dir.display().to_string(), e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let field = entry.file_name().to_string_lossy().into_owned();
            let buckets = load_field(&entry.path())?;
            bucket_count += buckets.buckets.len();
            fields.insert(field, buckets);
        }
        log::info!(
            "opened posting store at {}: {} fields, {} buckets",
            root.display(),
            fields.len(),
            bucket_count
        );
        Ok(PostingStore {
            root,
            options,
            fields,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|name| name.as_str())
    }

    /// Bucket keys and headers of `field`, most specific first.
    pub fn buckets(&self, field: &str) -> Vec<(BucketKey, BucketHeader)> {
        self.fields
            .get(field)
            .map(|f| f.buckets.iter().map(|(k, h)| (*k, *h)).collect())
            .unwrap_or_default()
    }

    /// Largest document id recorded in any bucket header, if any bucket exists.
    pub fn last_doc_id(&self) -> Option<DocId> {
        self.fields
            .values()
            .flat_map(|f| f.buckets.values())
            .map(|header| header.last_doc_id)
            .max()
    }

    /// Builds the iterator over all postings of `field`: one reader per bucket,
    /// merged by document id. An unknown field yields an empty iterator.
    pub fn field_doc_itr(&self, field: &str) -> BoxedDocItr {
        let children = self
            .fields
            .get(field)
            .map(|f| {
                f.buckets
                    .iter()
                    .map(|(key, header)| {
                        Box::new(PostingListDocItr::new(
                            self.bucket_path(field, key),
                            *key,
                            *header,
                        )) as BoxedDocItr
                    })
                    .collect()
            })
            .unwrap_or_default();
        Box::new(FieldMergeDocItr::new(field, children))
    }

    /// Starts a batch of writes. Document ids written through one batch must be
    /// non-decreasing per field and larger than every id already stored.
    pub fn begin_batch(&mut self) -> WriteBatch<'_> {
        WriteBatch {
            store: self,
            writers: AHashMap::new(),
        }
    }

    fn field_dir(&self, field: &str) -> PathBuf {
        self.root.join(FIELDS_DIR).join(field)
    }

    fn bucket_path(&self, field: &str, key: &BucketKey) -> PathBuf {
        self.field_dir(field).join(key.file_name())
    }
}

fn read_dir(path: &Path) -> Result<std::fs::ReadDir> {
    std::fs::read_dir(path).map_err(|e| Error::io(path.display().to_string(), e))
}

fn load_field(dir: &Path) -> Result<FieldBuckets> {
    let mut buckets = FieldBuckets::default();
    for entry in read_dir(dir)? {
        let entry = entry.map_err(|e| Error::io(dir.display().to_string(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = BucketKey::parse_file_name(&name)?;
        let path = entry.path();
        let mut bytes = [0u8; HEADER_SIZE];
        File::open(&path)
            .and_then(|mut file| file.read_exact(&mut bytes))
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        buckets.insert(key, BucketHeader::decode(&bytes)?);
    }
    Ok(buckets)
}

/// Rejects field names that cannot be used as a directory name.
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(Error::invalid_arg(
            "field",
            format!("'{name}' is not a valid field name"),
        ));
    }
    Ok(())
}

/// Rejects values that cannot be ordered.
pub fn validate_value(field: &str, value: f32) -> Result<()> {
    if value.is_nan() {
        return Err(Error::invalid_arg(
            "value",
            format!("field '{field}' has a NaN value"),
        ));
    }
    Ok(())
}

/// An in-progress group of appends to a [`PostingStore`].
///
/// Bucket writers are opened lazily and kept open for the whole batch.
/// [`commit`](WriteBatch::commit) rewrites the header of every touched bucket
/// and closes its writer; dropping an uncommitted batch does the same on a
/// best-effort basis.
pub struct WriteBatch<'a> {
    store: &'a mut PostingStore,
    writers: AHashMap<(String, BucketKey), BitWriter<BufWriter<File>>>,
}

impl WriteBatch<'_> {
    /// Appends the posting `(doc_id, value)` to `field`.
    pub fn write(&mut self, field: &str, doc_id: DocId, value: f32) -> Result<()> {
        validate_field_name(field)?;
        validate_value(field, value)?;
        if doc_id < 0 {
            return Err(Error::invalid_arg("doc_id", format!("{doc_id} is negative")));
        }
        let key = self.find_or_create_writable_bucket(field, value, doc_id)?;
        self.write_entry(field, key, doc_id, value)
    }

    /// Returns the bucket that should receive `value`, creating it when the value
    /// range has no bucket yet or its most specific bucket is full.
    ///
    /// A newly created bucket already holds `(doc_id, value)` in its header.
    pub fn find_or_create_writable_bucket(
        &mut self,
        field: &str,
        value: f32,
        doc_id: DocId,
    ) -> Result<BucketKey> {
        let policy = &self.store.options.split_policy;
        let found = self
            .store
            .fields
            .get(field)
            .and_then(|f| f.find(value))
            .map(|(key, header)| (key, policy.should_split(&key, header)));
        let key = match found {
            Some((key, false)) => return Ok(key),
            Some((full, true)) => {
                let key = BucketKey::for_value(value, policy.split_variable_bits(full.variable_bits));
                log::debug!("field '{field}': bucket {full} is full, splitting into {key}");
                key
            }
            None => BucketKey::for_value(value, policy.initial_variable_bits),
        };
        self.create_bucket(field, key, doc_id, value)?;
        Ok(key)
    }

    fn create_bucket(&mut self, field: &str, key: BucketKey, doc_id: DocId, value: f32) -> Result<()> {
        let dir = self.store.field_dir(field);
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
        let path = dir.join(key.file_name());
        let header = BucketHeader::new(doc_id, value);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|mut file| file.write_all(&header.encode()))
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        log::debug!("field '{field}': created bucket {key} at doc {doc_id}");
        self.store
            .fields
            .entry(field.to_string())
            .or_default()
            .insert(key, header);
        Ok(())
    }

    /// Appends one entry to bucket `key`: `varuint(delta * 2 + has_remainder)`
    /// followed by the remainder bits when they are non-zero.
    pub fn write_entry(&mut self, field: &str, key: BucketKey, doc_id: DocId, value: f32) -> Result<()> {
        let path = self.store.bucket_path(field, &key);
        let Some(header) = self
            .store
            .fields
            .get_mut(field)
            .and_then(|f| f.buckets.get_mut(&key))
        else {
            return Err(Error::invalid_operation(format!(
                "write to unknown bucket {key} of field '{field}'"
            )));
        };
        let delta = doc_id - header.last_doc_id;
        if delta == 0 {
            return Ok(());
        }
        if delta < 0 {
            return Err(Error::invalid_arg(
                "doc_id",
                format!(
                    "{doc_id} is not after doc {} in field '{field}'",
                    header.last_doc_id
                ),
            ));
        }
        let remainder = key.remainder(value);
        let encoded = (delta as u64)
            .checked_mul(2)
            .map(|d| d + (remainder != 0) as u64)
            .filter(|&d| d <= u32::MAX as u64)
            .ok_or_else(|| {
                Error::resource_exhausted(
                    "posting delta",
                    format!("gap of {delta} documents in field '{field}' is too large to encode"),
                )
            })?;

        let io_err = |e| Error::io(path.display().to_string(), e);
        let writer = match self.writers.entry((field.to_string(), key)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(&path)
                    .map_err(io_err)?;
                entry.insert(BitWriter::open_append(file, HEADER_SIZE as u64).map_err(io_err)?)
            }
        };
        writer.write_var_uint(encoded as u32).map_err(io_err)?;
        if remainder != 0 {
            writer
                .write_bits(remainder as u64, key.variable_bits as u32)
                .map_err(io_err)?;
        }
        header.record(doc_id, value);
        Ok(())
    }

    /// Rewrites the headers of all touched buckets and closes their writers.
    pub fn commit(mut self) -> Result<()> {
        self.finish_writers()
    }

    fn finish_writers(&mut self) -> Result<()> {
        let mut result = Ok(());
        for ((field, key), mut writer) in self.writers.drain() {
            let path = self.store.bucket_path(&field, &key);
            let Some(header) = self.store.fields.get(&field).and_then(|f| f.buckets.get(&key)) else {
                continue;
            };
            let finished = writer
                .write_at(0, &header.encode())
                .and_then(|_| writer.finish_and_sync())
                .map_err(|e| Error::io(path.display().to_string(), e));
            if let Err(e) = finished {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

impl Drop for WriteBatch<'_> {
    fn drop(&mut self) {
        if !self.writers.is_empty() {
            if let Err(e) = self.finish_writers() {
                log::warn!("failed to finalize posting batch: {e}");
            }
        }
    }
}
