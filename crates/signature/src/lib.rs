#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The block-checksum data model of the rdsync delta engine. A receiver
//! describes its basis file as a [`FileSignature`]: a [`protocol::SumHead`]
//! block layout plus one [`Block`] per fixed-size chunk, each carrying a weak
//! rolling checksum and a seeded MD4 strong checksum. The sender matches its
//! own copy of the file against this signature to decide which bytes need to
//! travel.
//!
//! Block length scales with the square root of the file size (floored at 700
//! bytes), keeping the checksum table at `O(sqrt(n))` while holding the
//! false-positive rate roughly constant across file sizes.

mod block;
mod generation;
pub mod layout;

pub use block::Block;
pub use generation::FileSignature;
pub use layout::{MIN_BLOCK_LENGTH, SignatureLayoutError, layout_for, layout_with_block_length};
