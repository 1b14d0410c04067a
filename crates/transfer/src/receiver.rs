//! The receiver driver: runs the uploader and downloader halves of the
//! receiver concurrently over one duplex connection.
//!
//! Each half gets its own thread, mirroring the process split of the
//! classic implementation: a generator thread writes checksum requests and
//! the end-of-phase sentinel while the calling thread consumes delta
//! responses. A full socket buffer in one direction only ever stalls the
//! half that owns it; the other half keeps draining its side, so requests
//! and responses of any size flow without wedging the connection.

use std::io::{Read, Write};
use std::path::Path;
use std::thread;

use protocol::{DemuxReader, MuxWriter, Session, Stats};

use crate::config::TransferConfig;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::flist::FileEntry;
use crate::metadata::MetadataApplier;
use crate::uploader::{UploadStep, Uploader};

/// Runs the receiver side of one transfer phase to completion.
///
/// Returns the run's byte accounting once the sender's end-of-phase sentinel
/// has been consumed. Any error aborts the phase; completed files keep their
/// reconstructed contents, everything else is left as it was.
pub fn run_receiver<R: Read, W: Write + Send, M: MetadataApplier>(
    files: &[FileEntry],
    dest_root: &Path,
    session: Session,
    config: TransferConfig,
    reader: &mut DemuxReader<R>,
    writer: &mut MuxWriter<W>,
    applier: M,
) -> Result<Stats> {
    let mut downloader = Downloader::new(files, dest_root, session, applier);

    let outcome: Result<()> = thread::scope(|scope| {
        let generator = scope.spawn(|| {
            let mut uploader = Uploader::new(files, dest_root, session, config);
            while uploader.advance(&mut *writer)? != UploadStep::Finished {}
            Ok(())
        });

        let mut reconstruction: Result<()> = Ok(());
        while !downloader.is_finished() {
            if let Err(error) = downloader.advance(&mut *reader) {
                reconstruction = Err(error);
                break;
            }
        }

        let generation = match generator.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        // A downloader failure usually drags the generator down with it;
        // report the downloader's error as the root cause.
        reconstruction.and(generation)
    });
    outcome?;

    Ok(Stats {
        bytes_read: reader.bytes_read(),
        bytes_written: writer.bytes_written(),
        literal_bytes: downloader.literal_bytes(),
        matched_bytes: downloader.matched_bytes(),
    })
}
