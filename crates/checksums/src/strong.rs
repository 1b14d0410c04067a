use digest::Digest;
use md4::Md4;

/// Width of a full MD4 digest in bytes.
pub const STRONG_SUM_LEN: usize = 16;

/// Computes the strong checksum of one block.
///
/// The session seed is appended *after* the block bytes, matching the
/// per-block order of the legacy wire format. Only the negotiated prefix of
/// the digest travels on the wire; callers truncate as needed.
#[must_use]
pub fn block_digest(block: &[u8], seed: i32) -> [u8; STRONG_SUM_LEN] {
    let mut hasher = Md4::new();
    hasher.update(block);
    hasher.update(seed.to_le_bytes());
    hasher.finalize().into()
}

/// Incremental whole-file strong checksum.
///
/// The seed is fed *before* the file content, which is the opposite order
/// from [`block_digest`]. Both sides stream the reconstructed file through
/// this digest and compare the results byte for byte.
#[derive(Clone)]
pub struct FileDigest {
    hasher: Md4,
}

impl FileDigest {
    /// Starts a whole-file digest for the given session seed.
    #[must_use]
    pub fn new(seed: i32) -> Self {
        let mut hasher = Md4::new();
        hasher.update(seed.to_le_bytes());
        Self { hasher }
    }

    /// Feeds `data` into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalizes and returns the 16-byte digest.
    #[must_use]
    pub fn finalize(self) -> [u8; STRONG_SUM_LEN] {
        self.hasher.finalize().into()
    }

    /// Convenience helper hashing an entire buffer in one call.
    #[must_use]
    pub fn digest_of(data: &[u8], seed: i32) -> [u8; STRONG_SUM_LEN] {
        let mut digest = Self::new(seed);
        digest.update(data);
        digest.finalize()
    }
}

impl std::fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDigest").finish_non_exhaustive()
    }
}
