//! Bit stream reader over in-memory or memory-mapped bytes.

use std::{fs::File, path::Path};

use memmap2::Mmap;

use crate::{VAR_UINT_CLASS_BITS, var_uint_width};

/// Maximum width accepted by [`BitReader::read_bits`]. A refill always leaves at
/// least this many bits in the lookahead register when the data permits.
pub const MAX_READ_BITS: u32 = 57;

/// Reads fields written by [`BitWriter`](crate::BitWriter).
///
/// The reader keeps a 64-bit lookahead register with the next unread bits left-aligned.
/// The register is refilled a whole big-endian word at a time when it is empty and
/// byte by byte otherwise.
///
/// The reader has no knowledge of the stream trailer: callers are expected to know how
/// many entries to decode (posting lists stop at their recorded last document id).
pub struct BitReader<B: AsRef<[u8]>> {
    data: B,
    pos: usize,
    cur: u64,
    bits_left: u32,
}

impl<B: AsRef<[u8]>> BitReader<B> {
    /// Creates a reader that starts at byte offset `start` of `data`.
    pub fn new(data: B, start: usize) -> BitReader<B> {
        BitReader {
            data,
            pos: start,
            cur: 0,
            bits_left: 0,
        }
    }

    /// Reads `width` bits (at most [`MAX_READ_BITS`]) as an unsigned value.
    ///
    /// Returns `None` when the underlying data is exhausted. A zero width always
    /// succeeds with `0`.
    pub fn read_bits(&mut self, width: u32) -> Option<u64> {
        debug_assert!(width <= MAX_READ_BITS);
        if width == 0 {
            return Some(0);
        }
        if self.bits_left < width {
            self.refill();
            if self.bits_left < width {
                return None;
            }
        }
        let value = self.cur >> (64 - width);
        self.cur <<= width;
        self.bits_left -= width;
        Some(value)
    }

    /// Reads a variable-width unsigned integer (2-bit class + payload).
    pub fn read_var_uint(&mut self) -> Option<u32> {
        let class = self.read_bits(VAR_UINT_CLASS_BITS)? as u32;
        self.read_bits(var_uint_width(class)).map(|v| v as u32)
    }

    /// Number of bits consumed since the beginning of `data`, including the bytes
    /// skipped by the start offset.
    pub fn bit_position(&self) -> u64 {
        self.pos as u64 * 8 - self.bits_left as u64
    }

    /// Returns `true` when no unread bytes remain, trailer included.
    pub fn is_at_end(&self) -> bool {
        self.bits_left == 0 && self.pos >= self.data.as_ref().len()
    }

    fn refill(&mut self) {
        let data = self.data.as_ref();
        if self.bits_left == 0 && self.pos + 8 <= data.len() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&data[self.pos..self.pos + 8]);
            self.cur = u64::from_be_bytes(word);
            self.bits_left = 64;
            self.pos += 8;
            return;
        }
        while self.bits_left <= 56 && self.pos < data.len() {
            self.cur |= (data[self.pos] as u64) << (56 - self.bits_left);
            self.bits_left += 8;
            self.pos += 1;
        }
    }
}

impl BitReader<Mmap> {
    /// Memory-maps `path` read-only and positions the reader at byte offset `start`.
    pub fn open_mapped(path: impl AsRef<Path>, start: usize) -> std::io::Result<Self> {
        let file = File::open(path)?;
        // Safety: posting files are only appended to by the writer that owns them
        // while no reader maps them.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(BitReader::new(mmap, start))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use super::*;
    use crate::BitWriter;

    #[test]
    fn test_write_reopen_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits");
        let header = b"HDR!";

        {
            let mut file = File::create(&path).unwrap();
            file.write_all(header).unwrap();
            let mut writer = BitWriter::open_append(file, 4).unwrap();
            writer.write_var_uint(3).unwrap();
            writer.write_bits(0x7, 3).unwrap();
            writer.write_var_uint(1000).unwrap();
            writer.finish().unwrap();
        }
        {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .unwrap();
            let mut writer = BitWriter::open_append(file, 4).unwrap();
            writer.write_var_uint(70000).unwrap();
            writer.write_bits(1, 1).unwrap();
            writer.finish().unwrap();
        }

        let mut reader = BitReader::open_mapped(&path, 4).unwrap();
        assert_eq!(reader.read_var_uint(), Some(3));
        assert_eq!(reader.read_bits(3), Some(0x7));
        assert_eq!(reader.read_var_uint(), Some(1000));
        assert_eq!(reader.read_var_uint(), Some(70000));
        assert_eq!(reader.read_bits(1), Some(1));
        assert_eq!(&std::fs::read(&path).unwrap()[..4], header);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut reader = BitReader::new(vec![0xf0u8], 0);
        assert_eq!(reader.read_bits(0), Some(0));
        assert_eq!(reader.read_bits(4), Some(0xf));
        assert_eq!(reader.read_bits(4), Some(0));
        assert!(reader.is_at_end());
        assert_eq!(reader.read_bits(1), None);
        assert_eq!(reader.read_var_uint(), None);
    }

    #[test]
    fn test_word_and_byte_refill_mix() {
        let data: Vec<u8> = (0u8..=40).collect();
        let mut reader = BitReader::new(&data[..], 3);
        assert_eq!(reader.read_bits(8), Some(3));
        assert_eq!(reader.bit_position(), 32);
        for expected in 4u8..=40 {
            assert_eq!(reader.read_bits(8), Some(expected as u64));
        }
        assert_eq!(reader.read_bits(8), None);
    }

    #[test]
    fn test_random_round_trip() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let mut fields = Vec::new();
        let mut writer = BitWriter::new(Vec::new());
        for _ in 0..5000 {
            if rng.bool() {
                let value = match rng.u8(0..4) {
                    0 => rng.u32(0..16),
                    1 => rng.u32(0..256),
                    2 => rng.u32(0..65536),
                    _ => rng.u32(..),
                };
                writer.write_var_uint(value).unwrap();
                fields.push((None, value as u64));
            } else {
                let width = rng.u32(0..=40);
                let value = if width == 0 {
                    0
                } else {
                    rng.u64(..) >> (64 - width)
                };
                writer.write_bits(value, width).unwrap();
                fields.push((Some(width), value));
            }
        }
        let bytes = writer.finish().unwrap();

        let mut reader = BitReader::new(bytes, 0);
        for (width, value) in fields {
            match width {
                None => assert_eq!(reader.read_var_uint(), Some(value as u32)),
                Some(width) => assert_eq!(reader.read_bits(width), Some(value)),
            }
        }
    }
}
