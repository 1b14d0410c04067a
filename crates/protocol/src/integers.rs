//! Fixed- and variable-width integer codecs.
//!
//! All fixed-width values are little-endian. Long values use the legacy
//! variable-width encoding: a value that fits `[0, i32::MAX]` is written as a
//! plain 4-byte signed integer; anything larger is written as a `-1` sentinel
//! followed by the full 8-byte value. Readers must check for the sentinel.

use std::io::{self, Read, Write};

/// Sentinel marking an 8-byte long value.
const LONG_ESCAPE: i32 = -1;

/// Reads a single byte.
pub fn read_byte<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Writes a single byte.
pub fn write_byte<W: Write>(writer: &mut W, value: u8) -> io::Result<()> {
    writer.write_all(&[value])
}

/// Reads a little-endian signed 32-bit integer.
pub fn read_int<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Writes a little-endian signed 32-bit integer.
pub fn write_int<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Reads a little-endian unsigned 32-bit integer.
pub fn read_uint<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Writes a little-endian unsigned 32-bit integer.
pub fn write_uint<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Reads a variable-width long value.
///
/// A leading `-1` announces an 8-byte value; any other negative leading
/// integer is malformed. Values on the 4-byte fast path are non-negative by
/// construction.
pub fn read_long<R: Read>(reader: &mut R) -> io::Result<u64> {
    let fast = read_int(reader)?;
    if fast == LONG_ESCAPE {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        return Ok(u64::from_le_bytes(buf));
    }
    u64::try_from(fast).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative long value {fast} on the wire"),
        )
    })
}

/// Writes a variable-width long value.
///
/// Values up to [`i32::MAX`] occupy 4 bytes; larger values occupy 12.
pub fn write_long<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    if let Ok(small) = i32::try_from(value) {
        return write_int(writer, small);
    }
    write_int(writer, LONG_ESCAPE)?;
    writer.write_all(&value.to_le_bytes())
}
