//! Fixed-size bucket file header.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rankdb_common::{Error, Result, verify_data};
use rankdb_scoring::DocId;

/// Current bucket format version.
pub const FORMAT_VERSION: u32 = 1;

/// Encoded size of [`BucketHeader`]; the entry stream starts at this offset.
pub const HEADER_SIZE: usize = 40;

/// Summary of a bucket, stored little-endian at offset 0 of its file and
/// rewritten in place whenever a batch appends to the bucket.
///
/// | Offset | Size | Field |
/// |---|---|---|
/// | 0 | 4 | `version` |
/// | 4 | 4 | `min` |
/// | 8 | 4 | `max` |
/// | 12 | 8 | `first_doc_id` |
/// | 20 | 4 | `first_score` |
/// | 24 | 8 | `last_doc_id` |
/// | 32 | 8 | `count` |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketHeader {
    pub version: u32,
    pub min: f32,
    pub max: f32,
    /// The first posting is kept inline so single-entry buckets never touch the
    /// entry stream.
    pub first_doc_id: DocId,
    pub first_score: f32,
    pub last_doc_id: DocId,
    pub count: u64,
}

impl BucketHeader {
    /// Header of a bucket holding a single posting.
    pub fn new(doc_id: DocId, value: f32) -> BucketHeader {
        BucketHeader {
            version: FORMAT_VERSION,
            min: value,
            max: value,
            first_doc_id: doc_id,
            first_score: value,
            last_doc_id: doc_id,
            count: 1,
        }
    }

    /// Accounts for a posting appended after `last_doc_id`.
    pub fn record(&mut self, doc_id: DocId, value: f32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last_doc_id = doc_id;
        self.count += 1;
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut cursor = &mut buf[..];
        // Writing into a correctly sized slice cannot fail.
        let _ = self.write_to(&mut cursor);
        buf
    }

    fn write_to(&self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        out.write_u32::<LittleEndian>(self.version)?;
        out.write_f32::<LittleEndian>(self.min)?;
        out.write_f32::<LittleEndian>(self.max)?;
        out.write_i64::<LittleEndian>(self.first_doc_id)?;
        out.write_f32::<LittleEndian>(self.first_score)?;
        out.write_i64::<LittleEndian>(self.last_doc_id)?;
        out.write_u64::<LittleEndian>(self.count)
    }

    pub fn decode(bytes: &[u8]) -> Result<BucketHeader> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::corrupted(
                "bucket header",
                format!("{} bytes, expected {HEADER_SIZE}", bytes.len()),
            ));
        }
        let mut cursor = &bytes[..HEADER_SIZE];
        let header = BucketHeader {
            version: cursor.read_u32::<LittleEndian>()?,
            min: cursor.read_f32::<LittleEndian>()?,
            max: cursor.read_f32::<LittleEndian>()?,
            first_doc_id: cursor.read_i64::<LittleEndian>()?,
            first_score: cursor.read_f32::<LittleEndian>()?,
            last_doc_id: cursor.read_i64::<LittleEndian>()?,
            count: cursor.read_u64::<LittleEndian>()?,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(Error::corrupted(
                "bucket header",
                format!("unsupported format version {}", self.version),
            ));
        }
        verify_data!(bucket_header, self.count > 0);
        verify_data!(bucket_header, self.first_doc_id >= 0);
        verify_data!(bucket_header, self.last_doc_id >= self.first_doc_id);
        // Also rejects NaN on either side.
        verify_data!(bucket_header, self.min <= self.max);
        Ok(())
    }
}
