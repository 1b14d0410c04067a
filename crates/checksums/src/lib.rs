#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Checksum primitives for the rdsync delta-transfer engine:
//!
//! - [`RollingChecksum`]: the weak 32-bit rolling checksum used to scan a
//!   sliding window across the sender's file in O(1) per byte.
//! - [`block_digest`] / [`FileDigest`]: the strong MD4 checksum, mixed with
//!   the per-session seed. Per-block hashing appends the seed after the data;
//!   whole-file hashing feeds the seed first. The two orders are part of the
//!   legacy wire format and must not be unified.
//!
//! A weak-checksum hit is only a candidate; the strong checksum confirms it.
//! Exact strong-checksum collisions are treated as genuine matches.

mod rolling;
mod strong;

pub use rolling::{RollingChecksum, RollingError};
pub use strong::{FileDigest, block_digest, STRONG_SUM_LEN};
