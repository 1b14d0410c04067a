//! Checksum-request header codec.
//!
//! Every per-file checksum request opens with four signed 32-bit integers
//! describing the block layout of the receiver's basis file. The sender
//! echoes the same header back in front of the token stream, a symmetry the
//! legacy protocol requires.

use std::io::{self, Read, Write};

use crate::integers::{read_int, write_int};
use crate::session::FULL_CSUM_LEN;

/// Block layout parameters for one file's checksum set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SumHead {
    /// Number of blocks that follow the header.
    pub block_count: u32,
    /// Length of every block except possibly the last.
    pub block_length: u32,
    /// Strong-checksum prefix length in bytes.
    pub checksum_length: u32,
    /// Length of the trailing short block, or zero when the file divides evenly.
    pub remainder: u32,
}

impl SumHead {
    /// Reads a header from the wire, validating each field's range.
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let block_count = read_non_negative(reader, "block count")?;
        let block_length = read_non_negative(reader, "block length")?;
        let checksum_length = read_non_negative(reader, "checksum length")?;
        let remainder = read_non_negative(reader, "remainder")?;

        if checksum_length > FULL_CSUM_LEN as u32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("checksum length {checksum_length} exceeds digest width {FULL_CSUM_LEN}"),
            ));
        }
        if block_count > 0 && block_length == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "zero block length with a non-empty block list",
            ));
        }
        if remainder >= block_length && remainder != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("remainder {remainder} not smaller than block length {block_length}"),
            ));
        }

        Ok(Self {
            block_count,
            block_length,
            checksum_length,
            remainder,
        })
    }

    /// Writes the header to the wire.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for field in [
            self.block_count,
            self.block_length,
            self.checksum_length,
            self.remainder,
        ] {
            let value = i32::try_from(field).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("sum head field {field} does not fit a signed 32-bit integer"),
                )
            })?;
            write_int(writer, value)?;
        }
        Ok(())
    }

    /// Total file size described by this layout.
    #[must_use]
    pub const fn file_size(&self) -> u64 {
        if self.block_count == 0 {
            return 0;
        }
        let full_blocks = if self.remainder > 0 {
            self.block_count - 1
        } else {
            self.block_count
        };
        full_blocks as u64 * self.block_length as u64 + self.remainder as u64
    }

    /// Length of the block at `index`, honouring the trailing remainder.
    #[must_use]
    pub const fn block_len_at(&self, index: u32) -> u32 {
        if self.remainder > 0 && index == self.block_count - 1 {
            self.remainder
        } else {
            self.block_length
        }
    }
}

fn read_non_negative<R: Read>(reader: &mut R, what: &str) -> io::Result<u32> {
    let value = read_int(reader)?;
    u32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative {what} {value} in sum head"),
        )
    })
}
