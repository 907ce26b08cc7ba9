//! Bit-level codec for rankdb posting lists.
//!
//! Values are written MSB-first into a byte stream. Two primitives are provided:
//!
//! - Fixed-width fields: [`BitWriter::write_bits`] / [`BitReader::read_bits`] append or
//!   consume the low `width` bits of a value.
//! - Self-describing unsigned integers: [`BitWriter::write_var_uint`] /
//!   [`BitReader::read_var_uint`] emit a 2-bit size class followed by the value in
//!   4, 8, 16 or 32 bits. A small document-id gap costs as little as 6 bits.
//!
//! # Stream trailer
//!
//! When a writer is finished it flushes the partially filled last byte (left-aligned)
//! followed by a single trailer byte holding the number of padding bits in that last
//! byte. [`BitWriter::open_append`] reads the trailer back, reconstructs the pending
//! bits and resumes mid-byte, so a stream can be closed and extended any number of
//! times without corrupting earlier entries.
//!
//! # Reading
//!
//! [`BitReader`] works over any byte slice; [`BitReader::open_mapped`] memory-maps a
//! file for random, allocation-free access. Running out of data is reported as `None`,
//! which is distinct from the I/O errors that can only happen while opening.
//!
//! ```rust
//! use rankdb_bits::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.write_var_uint(7).unwrap();
//! writer.write_bits(42, 21).unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let mut reader = BitReader::new(bytes, 0);
//! assert_eq!(reader.read_var_uint(), Some(7));
//! assert_eq!(reader.read_bits(21), Some(42));
//! ```

pub mod reader;
pub mod writer;

pub use reader::BitReader;
pub use writer::BitWriter;

/// Number of bits used to encode the size class of a variable-width integer.
pub const VAR_UINT_CLASS_BITS: u32 = 2;

/// Size in bytes of the stream tail written by [`BitWriter::finish`]: the last
/// (possibly partial) data byte plus the padding-count trailer byte.
pub const STREAM_TAIL_LEN: u64 = 2;

/// Returns the size class (0..=3) of a variable-width unsigned integer.
#[inline]
pub fn var_uint_class(value: u32) -> u32 {
    if value & 0xffff_fff0 == 0 {
        0
    } else if value & 0xffff_ff00 == 0 {
        1
    } else if value & 0xffff_0000 == 0 {
        2
    } else {
        3
    }
}

/// Returns the payload width in bits for a variable-width size class.
#[inline]
pub fn var_uint_width(class: u32) -> u32 {
    4 << class
}

/// Total number of bits `write_var_uint(value)` appends to a stream.
#[inline]
pub fn var_uint_encoded_bits(value: u32) -> u32 {
    VAR_UINT_CLASS_BITS + var_uint_width(var_uint_class(value))
}
