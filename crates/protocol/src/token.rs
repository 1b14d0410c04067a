//! Delta token stream codec.
//!
//! Each file's delta is a sequence of signed 32-bit markers: `n > 0`
//! announces `n` literal bytes, `n < 0` references basis block `-n - 1`, and
//! `0` terminates the file. The terminator is followed by the 16-byte
//! whole-file digest, which is read separately by the downloader.

use std::io::{self, Read, Write};

use crate::CHUNK_SIZE;
use crate::integers::{read_int, write_int};

/// One decoded element of a file's token stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// A run of literal bytes to append to the output.
    Literal(Vec<u8>),
    /// Copy basis block `index` to the output.
    Copy(u32),
    /// End of this file's stream.
    Done,
}

impl Token {
    /// Returns `true` for the end-of-file marker.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Reads the next token from the stream.
///
/// Literal payload bytes are consumed as part of the same call so the stream
/// is always positioned at a marker boundary between calls.
pub fn read_token<R: Read>(reader: &mut R) -> io::Result<Token> {
    let marker = read_int(reader)?;
    if marker == 0 {
        return Ok(Token::Done);
    }
    if marker > 0 {
        let mut payload = vec![0u8; marker as usize];
        reader.read_exact(&mut payload)?;
        return Ok(Token::Literal(payload));
    }
    let index = u32::try_from(-i64::from(marker) - 1).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("copy token {marker} out of range"),
        )
    })?;
    Ok(Token::Copy(index))
}

/// Writes a literal run, splitting it into wire-sized chunks.
pub fn write_literal<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    for chunk in data.chunks(CHUNK_SIZE) {
        let len = i32::try_from(chunk.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "literal chunk exceeds i32 range")
        })?;
        write_int(writer, len)?;
        writer.write_all(chunk)?;
    }
    Ok(())
}

/// Writes a copy token referencing basis block `index`.
pub fn write_copy<W: Write>(writer: &mut W, index: u32) -> io::Result<()> {
    let marker = i32::try_from(i64::from(index) + 1).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("block index {index} exceeds token range"),
        )
    })?;
    write_int(writer, -marker)
}

/// Writes the end-of-file marker.
pub fn write_done<W: Write>(writer: &mut W) -> io::Result<()> {
    write_int(writer, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn literal_round_trips() {
        let mut wire = Vec::new();
        write_literal(&mut wire, b"some literal bytes").unwrap();
        write_done(&mut wire).unwrap();

        let mut cursor = Cursor::new(wire);
        assert_eq!(
            read_token(&mut cursor).unwrap(),
            Token::Literal(b"some literal bytes".to_vec())
        );
        assert!(read_token(&mut cursor).unwrap().is_done());
    }

    #[test]
    fn copy_token_encodes_negated_index_plus_one() {
        let mut wire = Vec::new();
        write_copy(&mut wire, 0).unwrap();
        write_copy(&mut wire, 41).unwrap();
        assert_eq!(&wire[..4], (-1i32).to_le_bytes());
        assert_eq!(&wire[4..], (-42i32).to_le_bytes());

        let mut cursor = Cursor::new(wire);
        assert_eq!(read_token(&mut cursor).unwrap(), Token::Copy(0));
        assert_eq!(read_token(&mut cursor).unwrap(), Token::Copy(41));
    }

    #[test]
    fn oversized_literal_is_split() {
        let data = vec![3u8; CHUNK_SIZE + 1];
        let mut wire = Vec::new();
        write_literal(&mut wire, &data).unwrap();

        let mut cursor = Cursor::new(wire);
        let Token::Literal(first) = read_token(&mut cursor).unwrap() else {
            panic!("expected literal");
        };
        assert_eq!(first.len(), CHUNK_SIZE);
        let Token::Literal(second) = read_token(&mut cursor).unwrap() else {
            panic!("expected literal");
        };
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn empty_literal_writes_nothing() {
        let mut wire = Vec::new();
        write_literal(&mut wire, b"").unwrap();
        assert!(wire.is_empty());
    }

    #[test]
    fn truncated_literal_reports_eof() {
        let mut wire = Vec::new();
        write_int(&mut wire, 10).unwrap();
        wire.extend_from_slice(b"short");
        let err = read_token(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn max_negative_marker_is_valid_copy() {
        let mut wire = Vec::new();
        write_int(&mut wire, i32::MIN).unwrap();
        let token = read_token(&mut Cursor::new(wire)).unwrap();
        assert_eq!(token, Token::Copy(i32::MAX as u32));
    }
}
