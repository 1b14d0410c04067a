#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The rdsync wire layer. A single duplex byte stream carries both file data
//! and out-of-band diagnostics; this crate frames it into tagged sub-channels
//! and provides the fixed- and variable-width integer codecs the protocol
//! relies on.
//!
//! - [`envelope`]: the 4-byte multiplex header, `(channel << 24) | length`.
//! - [`mux`]: [`MuxWriter`] and [`DemuxReader`], which make the framing
//!   transparent — the demux reader renders log frames to a
//!   [`logging::MessageSink`] and never surfaces them as data.
//! - [`integers`]: little-endian `i32`/`u32`/byte helpers plus the
//!   variable-width long codec (4-byte fast path, `-1` sentinel + 8-byte
//!   escape).
//! - [`sums`]: the per-file checksum-request header codec.
//! - [`token`]: the delta token stream codec (`n > 0` literal, `n < 0` block
//!   copy, `0` terminator).
//! - [`session`]: negotiated per-run parameters and transfer statistics.
//!
//! # Failure semantics
//!
//! Any I/O error, timeout, or premature EOF is fatal for the whole transfer;
//! there is no partial-frame recovery. Malformed frames and out-of-range
//! values surface as [`std::io::ErrorKind::InvalidData`] and are escalated by
//! the transfer layer.

pub mod envelope;
pub mod integers;
pub mod mux;
pub mod session;
pub mod sums;
pub mod token;

pub use envelope::{HEADER_LEN, MAX_PAYLOAD_LENGTH, MessageChannel, MessageHeader};
pub use mux::{DemuxReader, MuxWriter};
pub use session::{ProtocolVersion, Session, Stats};
pub use sums::SumHead;
pub use token::Token;

/// Largest chunk written to the wire in one piece.
///
/// Literal runs and checksum payloads are split at this boundary so a peer
/// can interleave out-of-band messages between chunks.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// File-index sentinel that terminates a transfer phase.
pub const NDX_DONE: i32 = -1;
