use std::io::{self, Read, Write};

use checksums::{RollingChecksum, STRONG_SUM_LEN, block_digest};
use protocol::SumHead;
use protocol::integers::{read_uint, write_uint};

use crate::block::Block;
use crate::layout::{SignatureLayoutError, layout_for};

/// A complete block-checksum description of one basis file.
///
/// Created when the receiver decides a file needs comparison, sent over the
/// wire once, matched against once on the sender, then dropped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSignature {
    head: SumHead,
    blocks: Vec<Block>,
}

impl FileSignature {
    /// Computes the signature of `data` under the session `seed`.
    ///
    /// # Errors
    ///
    /// Propagates [`SignatureLayoutError`] from the layout derivation.
    pub fn generate(
        data: &[u8],
        seed: i32,
        checksum_length: usize,
    ) -> Result<Self, SignatureLayoutError> {
        let head = layout_for(data.len() as u64, checksum_length)?;
        Ok(Self::from_head(data, seed, head))
    }

    /// Computes a signature with an explicit block length.
    ///
    /// # Errors
    ///
    /// Propagates [`SignatureLayoutError`] from the layout derivation.
    pub fn generate_with_block_length(
        data: &[u8],
        seed: i32,
        checksum_length: usize,
        block_length: u32,
    ) -> Result<Self, SignatureLayoutError> {
        let head =
            crate::layout::layout_with_block_length(data.len() as u64, block_length, checksum_length)?;
        Ok(Self::from_head(data, seed, head))
    }

    fn from_head(data: &[u8], seed: i32, head: SumHead) -> Self {
        let mut blocks = Vec::with_capacity(head.block_count as usize);

        let mut offset = 0u64;
        for index in 0..head.block_count {
            let len = head.block_len_at(index);
            let chunk = &data[offset as usize..offset as usize + len as usize];
            blocks.push(Block::new(
                index,
                offset,
                len,
                RollingChecksum::of(chunk).value(),
                block_digest(chunk, seed),
            ));
            offset += u64::from(len);
        }

        Self { head, blocks }
    }

    /// The signature of an absent basis file: no blocks, forcing a full
    /// literal transfer.
    #[must_use]
    pub fn empty(checksum_length: usize) -> Self {
        Self {
            head: SumHead {
                checksum_length: checksum_length as u32,
                ..SumHead::default()
            },
            blocks: Vec::new(),
        }
    }

    /// Returns the block layout header.
    #[must_use]
    pub const fn head(&self) -> SumHead {
        self.head
    }

    /// Returns the block descriptors in file order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the block at `index`, if it exists.
    #[must_use]
    pub fn block(&self, index: u32) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// Total size of the file the signature describes.
    #[must_use]
    pub const fn file_size(&self) -> u64 {
        self.head.file_size()
    }

    /// Writes the checksum list that follows the [`SumHead`] on the wire.
    ///
    /// Layout per block: the packed weak checksum as a 32-bit little-endian
    /// integer, then the negotiated prefix of the strong checksum.
    pub fn write_blocks<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let prefix = self.head.checksum_length as usize;
        for block in &self.blocks {
            write_uint(writer, block.weak())?;
            writer.write_all(block.strong_prefix(prefix))?;
        }
        Ok(())
    }

    /// Reconstructs a signature from an already-read [`SumHead`] and the
    /// checksum list that follows it on the wire.
    ///
    /// Strong checksums arrive truncated to the negotiated prefix; the
    /// remaining bytes are zero and are never compared.
    pub fn read_blocks<R: Read>(head: SumHead, reader: &mut R) -> io::Result<Self> {
        let prefix = head.checksum_length as usize;
        let mut blocks = Vec::with_capacity(head.block_count as usize);

        let mut offset = 0u64;
        for index in 0..head.block_count {
            let weak = read_uint(reader)?;
            let mut strong = [0u8; STRONG_SUM_LEN];
            reader.read_exact(&mut strong[..prefix])?;

            let len = head.block_len_at(index);
            blocks.push(Block::new(index, offset, len, weak, strong));
            offset += u64::from(len);
        }

        Ok(Self { head, blocks })
    }
}
