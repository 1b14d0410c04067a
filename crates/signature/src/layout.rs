//! Block layout derivation.
//!
//! `block_length` is fixed at [`MIN_BLOCK_LENGTH`] for files smaller than
//! `MIN_BLOCK_LENGTH²` bytes; beyond that it is `ceil(sqrt(file_size))`
//! rounded up to a multiple of 8. The layout is derived once per file and
//! never changes for the life of its signature.

use protocol::SumHead;

/// Smallest (and default) block length in bytes.
pub const MIN_BLOCK_LENGTH: u32 = 700;

/// Largest block length the wire format tolerates.
const MAX_BLOCK_LENGTH: u32 = 1 << 29;

/// Failures while deriving a block layout.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SignatureLayoutError {
    /// The block count does not fit the signed 32-bit wire field.
    #[error("file of {file_size} bytes yields {block_count} blocks, exceeding the wire limit")]
    BlockCountOverflow {
        /// Size of the file being described.
        file_size: u64,
        /// Number of blocks the layout would need.
        block_count: u64,
    },
}

/// Derives the block length for a file of `file_size` bytes.
#[must_use]
pub fn block_length_for(file_size: u64) -> u32 {
    if file_size < u64::from(MIN_BLOCK_LENGTH) * u64::from(MIN_BLOCK_LENGTH) {
        return MIN_BLOCK_LENGTH;
    }

    let root = file_size.isqrt();
    let root = if root * root == file_size { root } else { root + 1 };
    let rounded = (root + 7) & !7;
    u32::try_from(rounded)
        .unwrap_or(MAX_BLOCK_LENGTH)
        .min(MAX_BLOCK_LENGTH)
}

/// Derives the full [`SumHead`] layout for a file.
///
/// # Errors
///
/// [`SignatureLayoutError::BlockCountOverflow`] when the block count exceeds
/// the signed 32-bit wire field. With sqrt-scaled block lengths this cannot
/// happen for real file sizes; the guard mirrors the wire-format limit.
pub fn layout_for(
    file_size: u64,
    checksum_length: usize,
) -> Result<SumHead, SignatureLayoutError> {
    layout_with_block_length(file_size, block_length_for(file_size), checksum_length)
}

/// Derives a layout with an explicit block length, for callers overriding the
/// size-derived default.
///
/// # Errors
///
/// [`SignatureLayoutError::BlockCountOverflow`] when the forced block length
/// makes the block count exceed the signed 32-bit wire field.
pub fn layout_with_block_length(
    file_size: u64,
    block_length: u32,
    checksum_length: usize,
) -> Result<SumHead, SignatureLayoutError> {
    let block_length = block_length.clamp(1, MAX_BLOCK_LENGTH);
    let full_blocks = file_size / u64::from(block_length);
    let remainder = (file_size % u64::from(block_length)) as u32;
    let block_count = full_blocks + u64::from(remainder > 0);

    let block_count = u32::try_from(block_count)
        .ok()
        .filter(|&count| count <= i32::MAX as u32)
        .ok_or(SignatureLayoutError::BlockCountOverflow {
            file_size,
            block_count,
        })?;

    Ok(SumHead {
        block_count,
        block_length,
        checksum_length: checksum_length as u32,
        remainder,
    })
}
