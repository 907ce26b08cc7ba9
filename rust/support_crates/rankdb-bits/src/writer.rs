//! Append-only bit stream writer.

use std::{
    fs::File,
    io::{BufWriter, Read, Seek, SeekFrom, Write},
};

use crate::{STREAM_TAIL_LEN, var_uint_class, var_uint_width};

/// Writes fixed-width bit fields and variable-width unsigned integers to a byte sink.
///
/// Bits accumulate in a 64-bit register and full bytes are emitted as soon as they are
/// complete. [`finish`](Self::finish) must be called to flush the trailing partial byte
/// together with the padding trailer; a writer dropped without finishing loses its
/// pending bits.
pub struct BitWriter<W: Write> {
    out: Option<W>,
    cur: u64,
    bits_used: u32,
}

impl<W: Write> BitWriter<W> {
    /// Creates a writer positioned at the start of an empty stream.
    pub fn new(out: W) -> BitWriter<W> {
        BitWriter {
            out: Some(out),
            cur: 0,
            bits_used: 0,
        }
    }

    /// Appends the low `width` bits of `value`.
    ///
    /// The caller guarantees that the bits of `value` above `width` are zero.
    pub fn write_bits(&mut self, value: u64, width: u32) -> std::io::Result<()> {
        debug_assert!(width <= 56);
        debug_assert!(width == 0 || value >> width == 0);
        if width == 0 {
            return Ok(());
        }
        self.cur = (self.cur << width) | value;
        self.bits_used += width;
        self.flush_full_bytes()
    }

    /// Appends a 2-bit size class followed by `value` in 4, 8, 16 or 32 bits.
    pub fn write_var_uint(&mut self, value: u32) -> std::io::Result<()> {
        let class = var_uint_class(value);
        let width = var_uint_width(class);
        self.cur = (self.cur << 2) | class as u64;
        self.cur = (self.cur << width) | value as u64;
        self.bits_used += 2 + width;
        self.flush_full_bytes()
    }

    /// Number of bits accumulated but not yet emitted as a full byte (always < 8).
    pub fn pending_bits(&self) -> u32 {
        self.bits_used
    }

    /// Writes the left-aligned partial byte and the padding trailer, flushes the sink
    /// and returns it.
    pub fn finish(mut self) -> std::io::Result<W> {
        let padding = 8 - self.bits_used;
        let tail = (self.cur << padding) as u8;
        let mut out = self.take_out()?;
        out.write_all(&[tail, padding as u8])?;
        out.flush()?;
        Ok(out)
    }

    fn flush_full_bytes(&mut self) -> std::io::Result<()> {
        let out = self.out.as_mut().ok_or_else(finished_error)?;
        while self.bits_used >= 8 {
            self.bits_used -= 8;
            out.write_all(&[(self.cur >> self.bits_used) as u8])?;
        }
        self.cur &= (1u64 << self.bits_used) - 1;
        Ok(())
    }

    fn take_out(&mut self) -> std::io::Result<W> {
        self.out.take().ok_or_else(finished_error)
    }
}

impl BitWriter<BufWriter<File>> {
    /// Reopens a previously finished stream for appending.
    ///
    /// `data_start` is the byte offset at which the bit stream begins (anything before
    /// it, such as a fixed-size header, is left untouched). If the file holds no stream
    /// yet, writing starts at `data_start`. Otherwise the trailer is read back, the
    /// pending bits of the last byte are restored, and the tail is truncated so that
    /// new bits continue exactly where the previous writer stopped.
    pub fn open_append(mut file: File, data_start: u64) -> std::io::Result<Self> {
        let len = file.metadata()?.len();
        if len < data_start {
            return Err(invalid_data(format!(
                "stream file is {len} bytes, shorter than its {data_start}-byte prefix"
            )));
        }
        let mut writer_state = (0u64, 0u32);
        if len > data_start {
            if len < data_start + STREAM_TAIL_LEN {
                return Err(invalid_data("truncated bit stream tail".to_string()));
            }
            let mut tail = [0u8; 2];
            file.seek(SeekFrom::Start(len - STREAM_TAIL_LEN))?;
            file.read_exact(&mut tail)?;
            let padding = tail[1] as u32;
            if padding == 0 || padding > 8 {
                return Err(invalid_data(format!(
                    "invalid bit stream trailer: {padding} padding bits"
                )));
            }
            writer_state = ((tail[0] as u64) >> padding, 8 - padding);
            file.set_len(len - STREAM_TAIL_LEN)?;
            file.seek(SeekFrom::Start(len - STREAM_TAIL_LEN))?;
        } else {
            file.seek(SeekFrom::Start(data_start))?;
        }
        let (cur, bits_used) = writer_state;
        Ok(BitWriter {
            out: Some(BufWriter::new(file)),
            cur,
            bits_used,
        })
    }

    /// Overwrites `bytes` at an absolute file offset (typically a header at offset 0).
    ///
    /// Buffered bits are flushed first; the append position is saved and restored, so
    /// the stream continues unaffected.
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> std::io::Result<()> {
        let out = self.out.as_mut().ok_or_else(finished_error)?;
        out.flush()?;
        let file = out.get_mut();
        let pos = file.stream_position()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Finishes the stream and syncs the file contents to disk.
    pub fn finish_and_sync(self) -> std::io::Result<()> {
        let out = self.finish()?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if self.out.is_some() && !std::thread::panicking() {
            log::warn!(
                "bit writer dropped without finish, {} pending bits discarded",
                self.bits_used
            );
        }
    }
}

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

fn finished_error() -> std::io::Error {
    std::io::Error::other("bit writer already finished")
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;

    use super::*;

    #[test]
    fn test_finish_emits_tail_and_padding() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3).unwrap();
        assert_eq!(writer.pending_bits(), 3);
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes, vec![0b1010_0000, 5]);
    }

    #[test]
    fn test_byte_aligned_finish() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0xab, 8).unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes, vec![0xab, 0, 8]);
    }

    #[test]
    fn test_var_uint_layout() {
        let mut writer = BitWriter::new(Vec::new());
        // class 0 (00) + 4-bit payload 0111, then class 1 (01) + 8-bit payload
        writer.write_var_uint(7).unwrap();
        writer.write_var_uint(0x5a).unwrap();
        let bytes = writer.finish().unwrap();
        // 000111 01 01011010 -> 0x1d 0x5a, exact fit
        assert_eq!(bytes, vec![0x1d, 0x5a, 0x00, 8]);
    }

    #[test]
    fn test_open_append_resumes_mid_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream");
        let header = [0xffu8; 4];
        {
            let mut file = File::create(&path).unwrap();
            file.write_all(&header).unwrap();
            let mut writer = BitWriter::open_append(file, 4).unwrap();
            writer.write_bits(0b1, 1).unwrap();
            writer.finish().unwrap();
        }
        {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .unwrap();
            let mut writer = BitWriter::open_append(file, 4).unwrap();
            assert_eq!(writer.pending_bits(), 1);
            writer.write_bits(0b0110011, 7).unwrap();
            writer.write_at(0, &[1, 2, 3, 4]).unwrap();
            writer.finish().unwrap();
        }
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4, 0b1011_0011, 0, 8]);
    }

    #[test]
    fn test_open_append_rejects_bad_trailer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream");
        std::fs::write(&path, [0u8, 0, 0x10, 0]).unwrap();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        let err = BitWriter::open_append(file, 2).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
