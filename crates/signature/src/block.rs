use checksums::STRONG_SUM_LEN;

/// One checksummed chunk of a basis file.
///
/// Immutable once computed; owned by the [`FileSignature`](crate::FileSignature)
/// that created it. The strong checksum is stored at full width, but only the
/// negotiated prefix is compared or sent on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Block {
    index: u32,
    offset: u64,
    len: u32,
    weak: u32,
    strong: [u8; STRONG_SUM_LEN],
}

impl Block {
    /// Creates a block descriptor.
    #[must_use]
    pub const fn new(
        index: u32,
        offset: u64,
        len: u32,
        weak: u32,
        strong: [u8; STRONG_SUM_LEN],
    ) -> Self {
        Self {
            index,
            offset,
            len,
            weak,
            strong,
        }
    }

    /// Zero-based position of the block within its file.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Byte offset of the block within its file.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the block in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Reports whether the block covers zero bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed 32-bit rolling checksum of the block.
    #[inline]
    #[must_use]
    pub const fn weak(&self) -> u32 {
        self.weak
    }

    /// The first `prefix_len` bytes of the strong checksum.
    #[inline]
    #[must_use]
    pub fn strong_prefix(&self, prefix_len: usize) -> &[u8] {
        &self.strong[..prefix_len.min(STRONG_SUM_LEN)]
    }

    /// Compares a freshly computed digest against the stored prefix.
    #[inline]
    #[must_use]
    pub fn strong_matches(&self, digest: &[u8; STRONG_SUM_LEN], prefix_len: usize) -> bool {
        self.strong_prefix(prefix_len) == &digest[..prefix_len.min(STRONG_SUM_LEN)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_return_construction_values() {
        let strong = [9u8; STRONG_SUM_LEN];
        let block = Block::new(4, 2800, 700, 0xDEAD_BEEF, strong);
        assert_eq!(block.index(), 4);
        assert_eq!(block.offset(), 2800);
        assert_eq!(block.len(), 700);
        assert_eq!(block.weak(), 0xDEAD_BEEF);
        assert!(!block.is_empty());
    }

    #[test]
    fn strong_prefix_truncates_to_negotiated_length() {
        let mut strong = [0u8; STRONG_SUM_LEN];
        strong[0] = 0xAA;
        strong[1] = 0xBB;
        strong[2] = 0xCC;
        let block = Block::new(0, 0, 1, 0, strong);
        assert_eq!(block.strong_prefix(2), &[0xAA, 0xBB]);
        assert_eq!(block.strong_prefix(64).len(), STRONG_SUM_LEN);
    }

    #[test]
    fn strong_matches_compares_only_the_prefix() {
        let mut stored = [0u8; STRONG_SUM_LEN];
        stored[0] = 1;
        stored[1] = 2;
        let block = Block::new(0, 0, 1, 0, stored);

        let mut candidate = [0xFFu8; STRONG_SUM_LEN];
        candidate[0] = 1;
        candidate[1] = 2;
        assert!(block.strong_matches(&candidate, 2));
        assert!(!block.strong_matches(&candidate, 3));
    }
}
