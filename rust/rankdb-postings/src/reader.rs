//! Sequential reader over one bucket file.

use std::path::PathBuf;

use memmap2::Mmap;
use rankdb_bits::BitReader;
use rankdb_common::{Error, Result};
use rankdb_scoring::{
    DocId, DocItr, NOT_POSITIONED,
    doc_itr::intersect_bounds,
};

use crate::{
    bucket::BucketKey,
    header::{BucketHeader, HEADER_SIZE},
};

/// Streams the postings of a single bucket.
///
/// The first posting comes from the header, so a bucket holding one entry is
/// served without opening its file. Later postings are decoded from the
/// memory-mapped entry stream until the header's `last_doc_id` is reached;
/// anything appended after the header snapshot was taken is ignored.
///
/// Narrowing the bounds never hides a posting. A window that misses the bucket's
/// range entirely makes [`set_bounds`](DocItr::set_bounds) fail, which is how the
/// field merge drops the bucket.
pub struct PostingListDocItr {
    path: PathBuf,
    key: BucketKey,
    header: BucketHeader,
    reader: Option<BitReader<Mmap>>,
    started: bool,
    done: bool,
    doc_id: DocId,
    score: f32,
    bounds: (f32, f32),
}

impl PostingListDocItr {
    pub fn new(path: PathBuf, key: BucketKey, header: BucketHeader) -> PostingListDocItr {
        PostingListDocItr {
            path,
            key,
            header,
            reader: None,
            started: false,
            done: false,
            doc_id: NOT_POSITIONED,
            score: 0.0,
            bounds: (header.min, header.max),
        }
    }

    pub fn key(&self) -> BucketKey {
        self.key
    }

    fn corrupted(&self, message: impl Into<String>) -> Error {
        Error::corrupted(self.path.display().to_string(), message)
    }

    fn decode_next(&mut self) -> Result<()> {
        if self.reader.is_none() {
            let reader = BitReader::open_mapped(&self.path, HEADER_SIZE)
                .map_err(|e| Error::io(self.path.display().to_string(), e))?;
            self.reader = Some(reader);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Err(Error::invalid_operation("posting reader not open"));
        };
        let Some(encoded) = reader.read_var_uint() else {
            return Err(self.corrupted(format!(
                "entry stream ends at doc {} before last doc {}",
                self.doc_id, self.header.last_doc_id
            )));
        };
        let delta = (encoded >> 1) as DocId;
        let remainder = if encoded & 1 == 1 {
            let width = self.key.variable_bits as u32;
            match reader.read_bits(width) {
                Some(bits) => bits as u32,
                None => return Err(self.corrupted("entry stream ends inside a value")),
            }
        } else {
            0
        };
        if delta == 0 {
            return Err(self.corrupted(format!("zero doc id delta after doc {}", self.doc_id)));
        }
        let doc_id = self.doc_id + delta;
        if doc_id > self.header.last_doc_id {
            return Err(self.corrupted(format!(
                "doc {doc_id} is past last doc {}",
                self.header.last_doc_id
            )));
        }
        self.doc_id = doc_id;
        self.score = self.key.value(remainder);
        Ok(())
    }
}

impl DocItr for PostingListDocItr {
    fn cur(&self) -> (DocId, f32) {
        (self.doc_id, self.score)
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        loop {
            if !self.started {
                self.started = true;
                self.doc_id = self.header.first_doc_id;
                self.score = self.header.first_score;
            } else if self.doc_id >= self.header.last_doc_id {
                self.close();
                return Ok(false);
            } else if let Err(e) = self.decode_next() {
                self.close();
                return Err(e);
            }
            if self.doc_id >= min_id {
                return Ok(true);
            }
        }
    }

    fn get_bounds(&self) -> (f32, f32) {
        self.bounds
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        self.bounds = intersect_bounds(self.bounds, min, max);
        self.bounds.0 <= self.bounds.1
    }

    fn close(&mut self) {
        self.done = true;
        self.reader = None;
    }
}
