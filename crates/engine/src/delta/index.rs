//! Weak-checksum lookup table over a file signature.

use rustc_hash::FxHashMap;

use signature::FileSignature;

/// Hash table from weak checksum to the blocks that carry it.
///
/// Built fresh for each file the sender is about to match and discarded when
/// the match completes; it models "the blocks the receiver already has for
/// this file". Blocks sharing a weak checksum keep their file order, which is
/// also the probe order — the first strong-confirmed candidate wins.
#[derive(Debug, Default)]
pub struct SignatureIndex {
    buckets: FxHashMap<u32, Vec<u32>>,
}

impl SignatureIndex {
    /// Indexes every block of `signature` by its weak checksum.
    #[must_use]
    pub fn build(signature: &FileSignature) -> Self {
        let mut buckets: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for block in signature.blocks() {
            buckets.entry(block.weak()).or_default().push(block.index());
        }
        Self { buckets }
    }

    /// Returns the indexes of all blocks whose weak checksum equals `weak`.
    #[must_use]
    pub fn candidates(&self, weak: u32) -> &[u32] {
        self.buckets.get(&weak).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct weak checksums present.
    #[must_use]
    pub fn distinct_weak_sums(&self) -> usize {
        self.buckets.len()
    }

    /// Reports whether the index holds no blocks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
