//! Per-run transfer configuration.

use std::time::Duration;

use protocol::session::PHASE1_CSUM_LEN;

/// Tunables fixed for the life of one transfer.
///
/// These are the knobs the session setup exposes to callers; everything else
/// the state machines need is negotiated on the wire and carried in
/// [`protocol::Session`].
#[derive(Clone, Copy, Debug)]
pub struct TransferConfig {
    /// Strong-checksum prefix length sent per block.
    pub checksum_length: usize,
    /// Fixed block length overriding the size-derived default.
    pub block_length: Option<u32>,
    /// I/O inactivity window after which the peer is considered gone.
    ///
    /// Enforcement happens at the socket layer; the state machines translate
    /// the resulting `TimedOut` errors into [`crate::TransferError::Timeout`].
    pub io_timeout: Option<Duration>,
    /// Whether basis files that pass the size and mtime quick check are
    /// skipped without generating checksums.
    pub quick_check: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            checksum_length: PHASE1_CSUM_LEN,
            block_length: None,
            io_timeout: None,
            quick_check: true,
        }
    }
}
