#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The rdsync transfer layer: the state machines that turn the wire protocol
//! into files on disk.
//!
//! Three actors cooperate over one duplex connection. On the receiving side
//! the [`Uploader`] walks the shared file list and sends a checksum request
//! per file that needs content, while the [`Downloader`] consumes the delta
//! responses, rebuilding each file into a temporary and renaming it into
//! place after its whole-file digest verifies. On the sending side the
//! [`Sender`] answers each request with a token stream produced by the
//! matching engine. [`run_receiver`] drives the two receiver halves on
//! separate threads, so checksum generation and reconstruction overlap the
//! way the pipelined protocol intends and neither direction of the
//! connection can back up against the other.
//!
//! All I/O is blocking; progress comes from the explicit state machines and
//! the receiver's two threads rather than from an event loop. Every error is
//! fatal to the phase — see [`TransferError`] for the taxonomy.

pub mod config;
pub mod downloader;
pub mod error;
pub mod flist;
pub mod map_file;
pub mod metadata;
pub mod receiver;
pub mod sender;
pub mod temp_guard;
pub mod timeout;
pub mod uploader;

pub use config::TransferConfig;
pub use downloader::{DownloadStep, Downloader};
pub use error::{Result, TransferError};
pub use flist::{FileEntry, FileKind};
pub use map_file::MapFile;
pub use metadata::{FsMetadataApplier, MetadataApplier, NoopMetadataApplier};
pub use receiver::run_receiver;
pub use sender::Sender;
pub use temp_guard::{TempGuard, create_temp};
pub use timeout::SetIoTimeout;
pub use uploader::{UploadStep, Uploader};
