//! Structured binary I/O for segment files.
//!
//! Every segment file is a little-endian stream of fixed-width integers,
//! varints, and length-prefixed strings followed by a CRC32 trailer of
//! everything before it. [`StructWriter`] produces that layout over any
//! writer; [`StructReader`] decodes it from an in-memory buffer, which is how
//! segment readers hold their files.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{GlaiveError, Result};
use crate::storage::{Storage, StorageOutput};
use crate::util::varint;

/// A structured file writer for binary data.
pub struct StructWriter<W: Write> {
    writer: W,
    hasher: crc32fast::Hasher,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    /// Create a new structured file writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: crc32fast::Hasher::new(),
            position: 0,
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a f32 value (little-endian).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a variable-length u32.
    pub fn write_vint(&mut self, value: u32) -> Result<()> {
        self.write_raw(&varint::encode_u32(value))
    }

    /// Write a variable-length u64.
    pub fn write_vlong(&mut self, value: u64) -> Result<()> {
        let mut buf = Vec::with_capacity(10);
        varint::push_u64(&mut buf, value);
        self.write_raw(&buf)
    }

    /// Write a string with length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Write raw bytes with length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_vlong(value.len() as u64)?;
        self.write_raw(value)
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.hasher.update(value);
        self.position += value.len() as u64;
        Ok(())
    }

    /// Bytes written so far, excluding the trailer.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append the checksum trailer and hand back the inner writer.
    pub fn finish(mut self) -> Result<W> {
        let checksum = self.hasher.clone().finalize();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        Ok(self.writer)
    }
}

impl<W: StorageOutput> StructWriter<W> {
    /// Write the trailer, sync, and publish the file.
    pub fn close(self) -> Result<()> {
        let mut writer = self.finish()?;
        writer.flush_and_sync()?;
        writer.close()
    }
}

/// Read `name` fully and strip its verified checksum trailer.
pub fn read_checked(storage: &dyn Storage, name: &str) -> Result<Vec<u8>> {
    let mut bytes = storage.read_all(name)?;
    if bytes.len() < 4 {
        return Err(GlaiveError::corrupt(format!("{name}: file too short")));
    }
    let body_len = bytes.len() - 4;
    let stored = LittleEndian::read_u32(&bytes[body_len..]);
    let actual = crc32fast::hash(&bytes[..body_len]);
    if stored != actual {
        return Err(GlaiveError::corrupt(format!(
            "{name}: checksum mismatch (stored {stored:08x}, computed {actual:08x})"
        )));
    }
    bytes.truncate(body_len);
    Ok(bytes)
}

/// A cursor decoding the layout written by [`StructWriter`].
#[derive(Debug, Clone)]
pub struct StructReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> StructReader<'a> {
    /// Create a reader positioned at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        StructReader { bytes, position: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                GlaiveError::corrupt(format!(
                    "read of {len} bytes at {} past end ({})",
                    self.position,
                    self.bytes.len()
                ))
            })?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read a f32 value (little-endian).
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Read a variable-length u32.
    pub fn read_vint(&mut self) -> Result<u32> {
        varint::read_u32_at(self.bytes, &mut self.position)
    }

    /// Read a variable-length u64.
    pub fn read_vlong(&mut self) -> Result<u64> {
        varint::read_u64_at(self.bytes, &mut self.position)
    }

    /// Read a length-prefixed byte slice without copying.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_vlong()? as usize;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| GlaiveError::corrupt(format!("invalid UTF-8 string: {e}")))
    }

    /// Read `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to an absolute offset.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.bytes.len() {
            return Err(GlaiveError::corrupt(format!(
                "seek to {position} past end ({})",
                self.bytes.len()
            )));
        }
        self.position = position;
        Ok(())
    }

    /// Whether every byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.position >= self.bytes.len()
    }
}

/// Write a file header: a four byte magic tag followed by a format version.
pub fn write_header<W: Write>(writer: &mut StructWriter<W>, magic: &[u8; 4], version: u32) -> Result<()> {
    writer.write_raw(magic)?;
    writer.write_u32(version)
}

/// Check a header written by [`write_header`].
pub fn check_header(reader: &mut StructReader<'_>, name: &str, magic: &[u8; 4], version: u32) -> Result<()> {
    let found = reader.read_raw(4)?;
    if found != magic {
        return Err(GlaiveError::corrupt(format!(
            "{name}: bad magic {:?}, expected {:?}",
            String::from_utf8_lossy(found),
            String::from_utf8_lossy(magic)
        )));
    }
    let found_version = reader.read_u32()?;
    if found_version != version {
        return Err(GlaiveError::corrupt(format!(
            "{name}: unsupported format version {found_version}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn test_struct_writer_reader() {
        let storage = MemoryStorage::default();
        let output = storage.create_output("test.bin").unwrap();
        let mut writer = StructWriter::new(output);

        write_header(&mut writer, b"TEST", 1).unwrap();
        writer.write_u8(42).unwrap();
        writer.write_u32(123456).unwrap();
        writer.write_u64(9876543210).unwrap();
        writer.write_vint(300).unwrap();
        writer.write_f32(3.5).unwrap();
        writer.write_string("hello").unwrap();
        writer.write_bytes(&[1, 2, 3]).unwrap();
        writer.close().unwrap();

        let bytes = read_checked(&storage, "test.bin").unwrap();
        let mut reader = StructReader::new(&bytes);
        check_header(&mut reader, "test.bin", b"TEST", 1).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 42);
        assert_eq!(reader.read_u32().unwrap(), 123456);
        assert_eq!(reader.read_u64().unwrap(), 9876543210);
        assert_eq!(reader.read_vint().unwrap(), 300);
        assert_eq!(reader.read_f32().unwrap(), 3.5);
        assert_eq!(reader.read_string().unwrap(), "hello");
        assert_eq!(reader.read_bytes().unwrap(), &[1, 2, 3]);
        assert!(reader.is_eof());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut writer = StructWriter::new(Vec::new());
        writer.write_string("segments").unwrap();
        let mut bytes = writer.finish().unwrap();
        bytes[2] ^= 0xFF;

        let storage = MemoryStorage::default();
        let mut out = storage.create_output("bad").unwrap();
        out.write_all(&bytes).unwrap();
        out.close().unwrap();

        let err = read_checked(&storage, "bad").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptIndex);
    }

    #[test]
    fn test_wrong_magic_is_corruption() {
        let mut writer = StructWriter::new(Vec::new());
        write_header(&mut writer, b"ABCD", 1).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = StructReader::new(&bytes);
        let err = check_header(&mut reader, "x", b"WXYZ", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptIndex);
    }

    #[test]
    fn test_read_past_end() {
        let bytes = [1u8, 2];
        let mut reader = StructReader::new(&bytes);
        assert!(reader.read_u32().is_err());
        assert_eq!(reader.read_u8().unwrap(), 1);
    }
}
