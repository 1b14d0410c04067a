#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The sender-side matching engine. Given a [`signature::FileSignature`]
//! received from the peer and the sender's copy of the file, the
//! [`DeltaMatcher`] scans the file with the weak rolling checksum, confirms
//! candidate hits with the strong checksum, and emits a mixed stream of
//! copy tokens and literal runs through a [`TokenSink`].
//!
//! The scan is O(n) in the file size: the weak checksum rolls one byte at a
//! time, and the strong checksum is only computed when a weak hit (plus a
//! length check) makes a match plausible. A hint block — the block after the
//! previous match — is probed before the hash table, exploiting the spatial
//! locality of typical edits.

pub mod delta;

pub use delta::generator::{DeltaMatcher, MatchStats, TokenSink};
pub use delta::index::SignatureIndex;
pub use delta::script::{DeltaScript, DeltaToken, ScriptSink, apply_script};
