//! Negotiated per-run parameters and transfer statistics.

use core::fmt;

/// Strong-checksum prefix length used during the first transfer phase.
pub const PHASE1_CSUM_LEN: usize = 2;

/// Full strong-checksum length (one MD4 digest).
pub const FULL_CSUM_LEN: usize = 16;

/// A negotiated rsync protocol version.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct ProtocolVersion(u32);

impl ProtocolVersion {
    /// The protocol version this engine implements.
    pub const V27: Self = Self(27);

    /// Oldest version the delta engine semantics are compatible with.
    pub const OLDEST: Self = Self(20);

    /// Creates a version from its wire value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the numeric wire value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Reports whether a peer at this version can drive the engine.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        self.0 >= Self::OLDEST.0 && self.0 <= Self::V27.0
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte accounting for one run.
///
/// Counters separate literal bytes (content that crossed the wire) from
/// matched bytes (content reconstructed from the receiver's basis file), the
/// numbers behind rsync's speedup figure.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Raw bytes read from the peer, framing included.
    pub bytes_read: u64,
    /// Raw bytes written to the peer, framing included.
    pub bytes_written: u64,
    /// File content transmitted as literal data.
    pub literal_bytes: u64,
    /// File content reused from basis files via copy tokens.
    pub matched_bytes: u64,
}

impl Stats {
    /// Total reconstructed file content.
    #[must_use]
    pub const fn total_file_bytes(&self) -> u64 {
        self.literal_bytes + self.matched_bytes
    }
}

/// Process-wide session parameters fixed at connection setup.
///
/// The handshake that produces these lives outside the core; the engine only
/// consumes them. The seed is mixed into every strong checksum so a peer
/// cannot replay digests across sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Session {
    version: ProtocolVersion,
    seed: i32,
    checksum_length: usize,
}

impl Session {
    /// Creates a session for `version` with the given checksum seed.
    ///
    /// The strong-checksum prefix length starts at the phase-1 value.
    #[must_use]
    pub const fn new(version: ProtocolVersion, seed: i32) -> Self {
        Self {
            version,
            seed,
            checksum_length: PHASE1_CSUM_LEN,
        }
    }

    /// Overrides the negotiated strong-checksum prefix length.
    ///
    /// # Panics
    ///
    /// Panics when `length` is zero or exceeds [`FULL_CSUM_LEN`]; both are
    /// configuration errors, not wire conditions.
    #[must_use]
    pub const fn with_checksum_length(mut self, length: usize) -> Self {
        assert!(length >= 1 && length <= FULL_CSUM_LEN);
        self.checksum_length = length;
        self
    }

    /// Returns the negotiated protocol version.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Returns the per-session checksum seed.
    #[must_use]
    pub const fn seed(&self) -> i32 {
        self.seed
    }

    /// Returns the strong-checksum prefix length in bytes.
    #[must_use]
    pub const fn checksum_length(&self) -> usize {
        self.checksum_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v27_is_supported() {
        assert!(ProtocolVersion::V27.is_supported());
        assert_eq!(ProtocolVersion::V27.as_u32(), 27);
    }

    #[test]
    fn future_versions_are_rejected() {
        assert!(!ProtocolVersion::new(28).is_supported());
        assert!(!ProtocolVersion::new(19).is_supported());
    }

    #[test]
    fn session_defaults_to_phase1_checksum_length() {
        let session = Session::new(ProtocolVersion::V27, 0x1234);
        assert_eq!(session.checksum_length(), PHASE1_CSUM_LEN);
        assert_eq!(session.seed(), 0x1234);
    }

    #[test]
    fn checksum_length_can_widen_to_full_digest() {
        let session = Session::new(ProtocolVersion::V27, 1).with_checksum_length(FULL_CSUM_LEN);
        assert_eq!(session.checksum_length(), FULL_CSUM_LEN);
    }

    #[test]
    fn stats_sum_literal_and_matched() {
        let stats = Stats {
            literal_bytes: 50,
            matched_bytes: 1400,
            ..Stats::default()
        };
        assert_eq!(stats.total_file_bytes(), 1450);
    }
}
