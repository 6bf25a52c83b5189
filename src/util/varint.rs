//! Variable-length integer encoding used by postings, positions and the
//! term dictionary.
//!
//! Values are written 7 bits per byte, low bits first, with the high bit
//! set on every byte except the last.

use std::io::{Read, Write};

use byteorder::ReadBytesExt;

use crate::error::{GlaiveError, Result};

/// Append a variable-length u32 to `buf`.
pub fn push_u32(buf: &mut Vec<u8>, value: u32) {
    push_u64(buf, value as u64);
}

/// Append a variable-length u64 to `buf`.
pub fn push_u64(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Encode a u32 into a fresh buffer.
pub fn encode_u32(value: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(5);
    push_u32(&mut bytes, value);
    bytes
}

/// Decode a u32 starting at `bytes[0]`, returning the value and the number
/// of bytes consumed.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let (value, read) = decode_u64(bytes)?;
    u32::try_from(value)
        .map(|v| (v, read))
        .map_err(|_| GlaiveError::corrupt("VarInt overflow"))
}

/// Decode a u64 starting at `bytes[0]`.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            return Err(GlaiveError::corrupt("VarInt overflow"));
        }
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    Err(GlaiveError::corrupt("Incomplete VarInt"))
}

/// Decode a u32 at `*pos` and advance `*pos` past it.
#[inline]
pub fn read_u32_at(bytes: &[u8], pos: &mut usize) -> Result<u32> {
    let tail = bytes
        .get(*pos..)
        .ok_or_else(|| GlaiveError::corrupt("VarInt read past end of buffer"))?;
    let (value, read) = decode_u32(tail)?;
    *pos += read;
    Ok(value)
}

/// Decode a u64 at `*pos` and advance `*pos` past it.
#[inline]
pub fn read_u64_at(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let tail = bytes
        .get(*pos..)
        .ok_or_else(|| GlaiveError::corrupt("VarInt read past end of buffer"))?;
    let (value, read) = decode_u64(tail)?;
    *pos += read;
    Ok(value)
}

/// Write a variable-length encoded u32 to a writer.
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<usize> {
    write_u64(writer, value as u64)
}

/// Write a variable-length encoded u64 to a writer.
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<usize> {
    let mut bytes = Vec::with_capacity(10);
    push_u64(&mut bytes, value);
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Read a variable-length encoded u32 from a reader.
pub fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let value = read_u64(reader)?;
    u32::try_from(value).map_err(|_| GlaiveError::corrupt("VarInt overflow"))
}

/// Read a variable-length encoded u64 from a reader.
pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;

    loop {
        let byte = reader.read_u8()?;
        if shift >= 64 {
            return Err(GlaiveError::corrupt("VarInt overflow"));
        }
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_decode_u32() {
        for &value in &[0, 1, 127, 128, 16383, 16384, u32::MAX] {
            let encoded = encode_u32(value);
            let (decoded, bytes_read) = decode_u32(&encoded).unwrap();
            assert_eq!(value, decoded);
            assert_eq!(encoded.len(), bytes_read);
        }
    }

    #[test]
    fn test_read_at_advances() {
        let mut buf = Vec::new();
        push_u32(&mut buf, 300);
        push_u64(&mut buf, 1 << 40);
        push_u32(&mut buf, 5);

        let mut pos = 0;
        assert_eq!(read_u32_at(&buf, &mut pos).unwrap(), 300);
        assert_eq!(read_u64_at(&buf, &mut pos).unwrap(), 1 << 40);
        assert_eq!(read_u32_at(&buf, &mut pos).unwrap(), 5);
        assert_eq!(pos, buf.len());
        assert!(read_u32_at(&buf, &mut pos).is_err());
    }

    #[test]
    fn test_write_read_stream() {
        let mut buffer = Vec::new();
        write_u32(&mut buffer, 12345).unwrap();
        write_u64(&mut buffer, 123456789012345).unwrap();

        let mut cursor = Cursor::new(buffer);
        assert_eq!(read_u32(&mut cursor).unwrap(), 12345);
        assert_eq!(read_u64(&mut cursor).unwrap(), 123456789012345);
    }

    #[test]
    fn test_encoding_efficiency() {
        assert_eq!(encode_u32(127).len(), 1);
        assert_eq!(encode_u32(128).len(), 2);
        assert_eq!(encode_u32(16384).len(), 3);
        assert!(encode_u32(u32::MAX).len() <= 5);
    }

    #[test]
    fn test_incomplete_and_overflow() {
        assert!(decode_u32(&[0x80]).is_err());
        assert!(decode_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]).is_err());
    }
}
