//! The sender: answers checksum requests with delta token streams.
//!
//! For each request the sender reads the file index and block checksums,
//! echoes the index and layout header, runs the matcher over its copy of the
//! file, and follows the token stream with the whole-file digest. The loop
//! ends when the peer's end-of-phase sentinel arrives and is echoed back.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use checksums::FileDigest;
use engine::{DeltaMatcher, TokenSink};
use logging::Message;
use protocol::integers::{read_int, write_int};
use protocol::token::{write_copy, write_done, write_literal};
use protocol::{DemuxReader, MuxWriter, NDX_DONE, Session, Stats, SumHead};
use signature::{Block, FileSignature};

use crate::error::{Result, TransferError};
use crate::flist::{FileEntry, FileKind};
use crate::map_file::MapFile;

/// Streams matcher output straight onto the wire as delta tokens.
struct WireSink<'w, W: Write> {
    writer: &'w mut W,
}

impl<W: Write> TokenSink for WireSink<'_, W> {
    fn literal(&mut self, data: &[u8]) -> io::Result<()> {
        write_literal(self.writer, data)
    }

    fn copy(&mut self, block: &Block) -> io::Result<()> {
        write_copy(self.writer, block.index())
    }
}

/// Serves delta streams for the files the peer requests.
#[derive(Debug)]
pub struct Sender<'a> {
    files: &'a [FileEntry],
    source_root: PathBuf,
    session: Session,
}

impl<'a> Sender<'a> {
    /// Creates a sender reading source files under `source_root`.
    #[must_use]
    pub fn new(files: &'a [FileEntry], source_root: impl Into<PathBuf>, session: Session) -> Self {
        Self {
            files,
            source_root: source_root.into(),
            session,
        }
    }

    /// Serves requests until the end-of-phase sentinel arrives.
    ///
    /// Returns the byte accounting for the phase. Unreadable source files are
    /// reported out of band and degrade to an empty transfer rather than
    /// aborting the run.
    pub fn run<R: Read, W: Write>(
        &self,
        reader: &mut DemuxReader<R>,
        writer: &mut MuxWriter<W>,
    ) -> Result<Stats> {
        let mut stats = Stats::default();

        loop {
            let ndx = read_int(reader).map_err(TransferError::transport)?;
            if ndx == NDX_DONE {
                write_int(writer, NDX_DONE).map_err(TransferError::transport)?;
                writer.flush().map_err(TransferError::transport)?;
                break;
            }

            let entry = self.lookup(ndx)?;
            let head = SumHead::read(reader).map_err(TransferError::transport)?;
            let signature =
                FileSignature::read_blocks(head, reader).map_err(TransferError::transport)?;

            let source = self.map_source(entry, writer)?;
            let data = source.as_ref().map_or(&[][..], |map| map.as_slice());

            write_int(writer, ndx).map_err(TransferError::transport)?;
            head.write(writer).map_err(TransferError::transport)?;

            let matcher = DeltaMatcher::new(&signature, self.session.seed());
            let matched = matcher
                .match_file(data, &mut WireSink { writer: &mut *writer })
                .map_err(TransferError::transport)?;
            stats.literal_bytes += matched.literal_bytes;
            stats.matched_bytes += matched.matched_bytes;

            write_done(writer).map_err(TransferError::transport)?;
            let digest = FileDigest::digest_of(data, self.session.seed());
            writer.write_all(&digest).map_err(TransferError::transport)?;
            writer.flush().map_err(TransferError::transport)?;
        }

        stats.bytes_read = reader.bytes_read();
        stats.bytes_written = writer.bytes_written();
        Ok(stats)
    }

    /// Resolves a requested index to a regular-file entry.
    fn lookup(&self, ndx: i32) -> Result<&FileEntry> {
        let entry = usize::try_from(ndx)
            .ok()
            .and_then(|index| self.files.get(index))
            .ok_or_else(|| {
                TransferError::protocol(format!(
                    "requested file index {ndx} outside list of {} entries",
                    self.files.len()
                ))
            })?;
        if entry.kind != FileKind::Regular {
            return Err(TransferError::protocol(format!(
                "requested index {ndx} is not a regular file"
            )));
        }
        Ok(entry)
    }

    /// Maps the source file, downgrading read failures to an out-of-band
    /// warning and an absent source.
    fn map_source<W: Write>(
        &self,
        entry: &FileEntry,
        writer: &mut MuxWriter<W>,
    ) -> Result<Option<MapFile>> {
        let path = self.source_root.join(&entry.path);
        match MapFile::open(&path) {
            Ok(source) => Ok(source),
            Err(error) => {
                let warning = Message::warning(format!(
                    "cannot read source file {}: {error}",
                    entry.path.display()
                ))
                .with_code(23);
                match writer.write_message(&warning) {
                    Ok(()) => {}
                    // Nowhere to send diagnostics on a plain stream.
                    Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                    Err(e) => return Err(TransferError::transport(e)),
                }
                Ok(None)
            }
        }
    }
}
